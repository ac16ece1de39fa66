//! Copy-on-write line splits scoped to one analysis call.
//!
//! Splitting a line for a snapped point must not leak into the shared
//! [`Network`].  An `Overlay` records the delta instead: new nodes, the
//! replacement edges, and the set of base edges they replace.  A
//! [`NetworkView`](crate::NetworkView) applies it transparently during
//! search.
//!
//! Overlay node and edge ids continue after the base ids, so arrays sized by
//! the view's counts can hold both.

use std::collections::BTreeMap;

use fixedbitset::FixedBitSet;
use geo::Coord;
use rustc_hash::FxHashMap;

use na_core::geometry::interpolate;
use na_core::{EdgeId, LineId, NodeId};

use crate::Network;

/// One replacement edge: a piece of a base edge between two split points.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayEdge {
    pub from:   NodeId,
    pub to:     NodeId,
    pub weight: f64,
    pub line:   LineId,
    /// `(from, to)` fractions along the line's digitised geometry.
    pub span:   (f64, f64),
    /// The opposite piece on the same line, or `EdgeId::INVALID`.
    pub twin:   EdgeId,
}

pub struct Overlay {
    base_nodes: usize,
    base_edges: usize,
    node_pos:   Vec<Coord<f64>>,
    edges:      Vec<OverlayEdge>,
    out:        FxHashMap<NodeId, Vec<EdgeId>>,
    replaced:   FixedBitSet,
}

impl Overlay {
    /// An overlay that changes nothing.
    pub fn empty(network: &Network) -> Self {
        Self {
            base_nodes: network.node_count(),
            base_edges: network.edge_count(),
            node_pos:   Vec::new(),
            edges:      Vec::new(),
            out:        FxHashMap::default(),
            replaced:   FixedBitSet::with_capacity(network.edge_count()),
        }
    }

    /// Split lines at the given `(line, fraction)` cuts.
    ///
    /// Returns the overlay and, for each cut in input order, the node placed
    /// at it.  Cuts at the same position on the same line share a node; cuts
    /// at fraction 0 or 1 reuse the line's endpoint.  Each piece's weight is
    /// the base weight prorated by its share of the line's length.
    pub fn split(network: &Network, cuts: &[(LineId, f64)]) -> (Self, Vec<NodeId>) {
        let mut overlay = Self::empty(network);

        let mut by_line: BTreeMap<LineId, Vec<f64>> = BTreeMap::new();
        for &(line, fraction) in cuts {
            by_line.entry(line).or_default().push(fraction.clamp(0.0, 1.0));
        }

        let mut placed: FxHashMap<(LineId, u64), NodeId> = FxHashMap::default();

        for (line, mut fractions) in by_line {
            fractions.sort_by(f64::total_cmp);
            fractions.dedup();

            let [start, end] = network.line_ends[line.index()];
            let geometry = &network.line_geometry[line.index()];

            // Stops along the line: start, every interior cut, end.
            let mut stops: Vec<(f64, NodeId)> = vec![(0.0, start)];
            for &f in &fractions {
                let node = if f <= 0.0 {
                    start
                } else if f >= 1.0 {
                    end
                } else {
                    let id = NodeId::from_index(overlay.base_nodes + overlay.node_pos.len());
                    overlay.node_pos.push(interpolate(geometry, f).unwrap_or(geometry.0[0]));
                    stops.push((f, id));
                    id
                };
                placed.insert((line, f.to_bits()), node);
            }
            stops.push((1.0, end));

            if stops.len() == 2 {
                continue;
            }

            let [fwd, bwd] = network.line_edges[line.index()];
            let pieces = stops.len() - 1;
            let first_fwd = overlay.base_edges + overlay.edges.len();
            let first_bwd = first_fwd + if fwd != EdgeId::INVALID { pieces } else { 0 };

            if fwd != EdgeId::INVALID {
                overlay.replaced.insert(fwd.index());
                let w = network.edge_weight[fwd.index()];
                for (i, pair) in stops.windows(2).enumerate() {
                    let twin = if bwd != EdgeId::INVALID {
                        EdgeId::from_index(first_bwd + i)
                    } else {
                        EdgeId::INVALID
                    };
                    overlay.push(OverlayEdge {
                        from:   pair[0].1,
                        to:     pair[1].1,
                        weight: w * (pair[1].0 - pair[0].0),
                        line,
                        span:   (pair[0].0, pair[1].0),
                        twin,
                    });
                }
            }
            if bwd != EdgeId::INVALID {
                overlay.replaced.insert(bwd.index());
                let w = network.edge_weight[bwd.index()];
                for (i, pair) in stops.windows(2).enumerate() {
                    let twin = if fwd != EdgeId::INVALID {
                        EdgeId::from_index(first_fwd + i)
                    } else {
                        EdgeId::INVALID
                    };
                    overlay.push(OverlayEdge {
                        from:   pair[1].1,
                        to:     pair[0].1,
                        weight: w * (pair[1].0 - pair[0].0),
                        line,
                        span:   (pair[1].0, pair[0].0),
                        twin,
                    });
                }
            }
        }

        let nodes = cuts
            .iter()
            .map(|&(line, f)| placed[&(line, f.clamp(0.0, 1.0).to_bits())])
            .collect();
        (overlay, nodes)
    }

    fn push(&mut self, edge: OverlayEdge) {
        let id = EdgeId::from_index(self.base_edges + self.edges.len());
        self.out.entry(edge.from).or_default().push(id);
        self.edges.push(edge);
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn base_node_count(&self) -> usize {
        self.base_nodes
    }

    pub fn base_edge_count(&self) -> usize {
        self.base_edges
    }

    /// Number of nodes added by splits.
    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    /// Number of replacement edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Replacement edges leaving `node`.
    #[inline]
    pub fn out_edges(&self, node: NodeId) -> &[EdgeId] {
        self.out.get(&node).map_or(&[][..], Vec::as_slice)
    }

    /// `true` when the base edge has been cut into overlay pieces.
    #[inline]
    pub fn replaces(&self, base_edge: EdgeId) -> bool {
        self.replaced.contains(base_edge.index())
    }

    /// An overlay edge by its global id.
    #[inline]
    pub fn edge(&self, edge: EdgeId) -> &OverlayEdge {
        &self.edges[edge.index() - self.base_edges]
    }

    /// Position of an overlay node by its global id.
    #[inline]
    pub fn node_pos(&self, node: NodeId) -> Coord<f64> {
        self.node_pos[node.index() - self.base_nodes]
    }
}
