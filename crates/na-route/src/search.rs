//! Single-source Dijkstra over a [`NetworkView`].
//!
//! # Determinism
//!
//! Frontier entries are ordered by accumulated cost, then by insertion
//! sequence.  Relaxation uses a strict `<`, so among equal-cost routes the
//! first edge discovered keeps the node.  For a fixed view and source the
//! settled costs and predecessor edges never change between runs.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use fixedbitset::FixedBitSet;
use rustc_hash::FxHashSet;

use na_core::{EdgeId, NodeId};
use na_network::NetworkView;

use crate::Path;

/// Per-run limits.
#[derive(Copy, Clone, Debug, Default)]
pub struct SearchOptions<'t> {
    /// Stop as soon as every one of these nodes is settled.
    pub targets: Option<&'t [NodeId]>,
    /// Never settle a node whose cost exceeds this value.
    pub cutoff:  Option<f64>,
}

impl<'t> SearchOptions<'t> {
    pub fn targets(targets: &'t [NodeId]) -> Self {
        Self { targets: Some(targets), cutoff: None }
    }

    pub fn cutoff(cutoff: f64) -> Self {
        Self { targets: None, cutoff: Some(cutoff) }
    }
}

// ── Frontier ──────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug)]
struct Frontier {
    cost: f64,
    seq:  u64,
    node: NodeId,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    /// Reversed so `BinaryHeap` pops the cheapest, earliest-pushed entry.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

// ── SearchSpace ───────────────────────────────────────────────────────────────

/// Reusable Dijkstra state.
///
/// Arrays grow to the largest view seen and are reset lazily through the
/// list of nodes the last run touched, so a batch of searches on one thread
/// allocates once.
#[derive(Default)]
pub struct SearchSpace {
    dist:    Vec<f64>,
    prev:    Vec<EdgeId>,
    settled: FixedBitSet,
    touched: Vec<NodeId>,
    order:   Vec<NodeId>,
    heap:    BinaryHeap<Frontier>,
    seq:     u64,
    source:  NodeId,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self, nodes: usize) {
        for &n in &self.touched {
            self.dist[n.index()] = f64::INFINITY;
            self.prev[n.index()] = EdgeId::INVALID;
        }
        if self.dist.len() < nodes {
            self.dist.resize(nodes, f64::INFINITY);
            self.prev.resize(nodes, EdgeId::INVALID);
        }
        self.settled.clear();
        self.settled.grow(nodes);
        self.touched.clear();
        self.order.clear();
        self.heap.clear();
        self.seq = 0;
    }

    fn push(&mut self, node: NodeId, cost: f64) {
        self.heap.push(Frontier { cost, seq: self.seq, node });
        self.seq += 1;
    }

    /// Run Dijkstra from `source` and return the number of settled nodes.
    ///
    /// Results stay queryable until the next call.  A source outside the
    /// view settles nothing.
    pub fn run(&mut self, view: NetworkView<'_>, source: NodeId, opts: &SearchOptions<'_>) -> usize {
        let nodes = view.node_count();
        self.reset(nodes);
        self.source = source;
        if source.index() >= nodes {
            return 0;
        }

        let cutoff = opts.cutoff.unwrap_or(f64::INFINITY);
        let mut remaining: Option<FxHashSet<NodeId>> =
            opts.targets.map(|t| t.iter().copied().collect());

        self.dist[source.index()] = 0.0;
        self.touched.push(source);
        self.push(source, 0.0);

        while let Some(Frontier { cost, node, .. }) = self.heap.pop() {
            if self.settled.contains(node.index()) {
                continue;
            }
            if cost > cutoff {
                break;
            }
            self.settled.insert(node.index());
            self.order.push(node);

            if let Some(rem) = remaining.as_mut() {
                rem.remove(&node);
                if rem.is_empty() {
                    break;
                }
            }

            for edge in view.out_edges(node) {
                let next = view.edge_to(edge);
                let next_cost = cost + view.edge_weight(edge);
                if next_cost > cutoff || self.settled.contains(next.index()) {
                    continue;
                }
                let slot = &mut self.dist[next.index()];
                if next_cost < *slot {
                    if slot.is_infinite() {
                        self.touched.push(next);
                    }
                    *slot = next_cost;
                    self.prev[next.index()] = edge;
                    self.push(next, next_cost);
                }
            }
        }

        self.order.len()
    }

    /// Source of the last run.
    pub fn source(&self) -> NodeId {
        self.source
    }

    #[inline]
    pub fn is_settled(&self, node: NodeId) -> bool {
        self.settled.contains(node.index())
    }

    /// Final cost of `node`, or `None` if the last run did not settle it.
    #[inline]
    pub fn cost(&self, node: NodeId) -> Option<f64> {
        self.is_settled(node).then(|| self.dist[node.index()])
    }

    /// Edge through which a settled node was reached; `None` for the source
    /// and for unsettled nodes.
    #[inline]
    pub fn prev_edge(&self, node: NodeId) -> Option<EdgeId> {
        if !self.is_settled(node) {
            return None;
        }
        let e = self.prev[node.index()];
        (e != EdgeId::INVALID).then_some(e)
    }

    /// Settled nodes with their cost, in settlement (non-decreasing cost) order.
    pub fn settled(&self) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.order.iter().map(|&n| (n, self.dist[n.index()]))
    }

    /// Walk predecessor edges back from `target`.
    ///
    /// `view` must be the view the last run used.
    pub fn path(&self, view: NetworkView<'_>, target: NodeId) -> Option<Path> {
        let cost = self.cost(target)?;
        let mut edges = Vec::new();
        let mut cur = target;
        while let Some(e) = self.prev_edge(cur) {
            edges.push(e);
            cur = view.edge_from(e);
        }
        edges.reverse();
        Some(Path { source: self.source, target, edges, cost })
    }
}
