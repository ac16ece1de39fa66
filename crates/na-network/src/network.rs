//! Network representation.
//!
//! # Data layout
//!
//! The graph uses **Compressed Sparse Row (CSR)** format for outgoing edges.
//! Given a `NodeId n`, its outgoing edges occupy the slice:
//!
//! ```text
//! edge_from[ node_out_start[n] .. node_out_start[n+1] ]
//! ```
//!
//! All edge arrays (`edge_from`, `edge_to`, `edge_weight`, `edge_line`,
//! `edge_reversed`) are sorted by source node and indexed by `EdgeId`.
//! Iteration over a node's outgoing edges is therefore a contiguous memory
//! scan, which is what Dijkstra's inner loop wants.
//!
//! Each edge points back at the line it came from.  A line carries at most
//! two edges: one in digitised order and one reversed.
//!
//! # Spatial index
//!
//! A [`SegmentIndex`] maps a coordinate to the nearest usable line.  Used to
//! snap origin and destination points onto the network.

use std::ops::Range;

use geo::{Coord, LineString};

use na_core::geometry::substring;
use na_core::{EdgeId, LineId, NodeId};

use crate::SegmentIndex;

/// Immutable weighted multigraph in CSR format plus its segment index.
///
/// All fields are `pub` for direct indexed access on hot paths.  Do not
/// construct directly; use [`NetworkBuilder`](crate::NetworkBuilder).
pub struct Network {
    // ── Node data ─────────────────────────────────────────────────────────
    /// Position of each node (first endpoint seen for a quantised cell).
    pub node_pos: Vec<Coord<f64>>,

    // ── CSR edge adjacency ────────────────────────────────────────────────
    /// CSR row pointer.  Outgoing edges of node `n` are at EdgeIds
    /// `node_out_start[n] .. node_out_start[n+1]`.
    /// Length = `node_count + 1`.
    pub node_out_start: Vec<u32>,

    // ── Edge data (indexed by EdgeId = position in sorted order) ──────────
    /// Source node of each edge.  Redundant with CSR but required for
    /// route reconstruction (trace `prev_edge` back to source).
    pub edge_from: Vec<NodeId>,

    pub edge_to: Vec<NodeId>,

    /// Non-negative, finite traversal cost.
    pub edge_weight: Vec<f64>,

    /// Line the edge was derived from.
    pub edge_line: Vec<LineId>,

    /// `true` when the edge runs from the line's last vertex to its first.
    pub edge_reversed: Vec<bool>,

    // ── Line data (indexed by LineId) ─────────────────────────────────────
    pub line_geometry: Vec<LineString<f64>>,

    pub line_length: Vec<f64>,

    /// Position of the line in the builder's input.
    pub line_source: Vec<usize>,

    /// `[start node, end node]` in digitised order.
    pub line_ends: Vec<[NodeId; 2]>,

    /// `[forward edge, reversed edge]`; `EdgeId::INVALID` where a direction
    /// is not allowed.
    pub line_edges: Vec<[EdgeId; 2]>,

    pub(crate) directed: bool,

    // ── Spatial index ─────────────────────────────────────────────────────
    pub(crate) index: SegmentIndex,
}

impl Network {
    // ── Graph dimensions ──────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_to.len()
    }

    pub fn line_count(&self) -> usize {
        self.line_geometry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edge_to.is_empty()
    }

    /// Whether the network was built with direction-restricted edges.
    pub fn is_directed(&self) -> bool {
        self.directed
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    /// Index range of the outgoing edges of `node`; empty for nodes that are
    /// not part of the base network.
    #[inline]
    pub fn out_edge_range(&self, node: NodeId) -> Range<usize> {
        if node.index() >= self.node_count() {
            return 0..0;
        }
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        start..end
    }

    /// Iterator over the `EdgeId`s of all outgoing edges from `node`.
    ///
    /// A contiguous index range; nothing is allocated.
    #[inline]
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        self.out_edge_range(node).map(EdgeId::from_index)
    }

    #[inline]
    pub fn out_degree(&self, node: NodeId) -> usize {
        self.out_edge_range(node).len()
    }

    /// The opposite-direction edge of the same line, if that direction exists.
    #[inline]
    pub fn twin(&self, edge: EdgeId) -> Option<EdgeId> {
        let pair = self.line_edges[self.edge_line[edge.index()].index()];
        let other = if self.edge_reversed[edge.index()] { pair[0] } else { pair[1] };
        (other != EdgeId::INVALID).then_some(other)
    }

    /// Edge geometry oriented in travel direction.
    pub fn edge_geometry(&self, edge: EdgeId) -> LineString<f64> {
        let line = &self.line_geometry[self.edge_line[edge.index()].index()];
        if self.edge_reversed[edge.index()] {
            substring(line, 1.0, 0.0)
        } else {
            line.clone()
        }
    }

    /// Share of lines (in percent) that can be travelled in both directions.
    pub fn percent_bidirectional(&self) -> f64 {
        if self.line_edges.is_empty() {
            return 0.0;
        }
        let both = self
            .line_edges
            .iter()
            .filter(|pair| pair[0] != EdgeId::INVALID && pair[1] != EdgeId::INVALID)
            .count();
        both as f64 / self.line_edges.len() as f64 * 100.0
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// The nearest usable line to `p` and its distance.
    ///
    /// Returns `None` only if the network has no lines.
    pub fn nearest_line(&self, p: Coord<f64>) -> Option<(LineId, f64)> {
        self.index.nearest_line(p)
    }

    /// Lines within `radius` of `p`, ascending by id.
    pub fn lines_within(&self, p: Coord<f64>, radius: f64) -> Vec<LineId> {
        self.index.lines_within(p, radius)
    }
}
