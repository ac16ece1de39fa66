//! The graph as one search sees it.
//!
//! A `NetworkView` layers an optional [`Overlay`] (line splits) and an
//! optional exclusion set (edges a search must not use) over the shared
//! [`Network`].  Views are `Copy` and borrow everything, so concurrent
//! searches over the same network never observe each other's splits or
//! exclusions.

use fixedbitset::FixedBitSet;
use geo::{Coord, LineString};

use na_core::geometry::substring;
use na_core::{EdgeId, LineId, NodeId};

use crate::{Network, Overlay};

#[derive(Copy, Clone)]
pub struct NetworkView<'a> {
    pub network: &'a Network,
    overlay:     Option<&'a Overlay>,
    excluded:    Option<&'a FixedBitSet>,
}

impl<'a> NetworkView<'a> {
    pub fn new(network: &'a Network) -> Self {
        Self { network, overlay: None, excluded: None }
    }

    pub fn with_overlay(mut self, overlay: &'a Overlay) -> Self {
        self.overlay = Some(overlay);
        self
    }

    /// Hide every edge whose id is set in `excluded`.
    pub fn with_exclusions(mut self, excluded: &'a FixedBitSet) -> Self {
        self.excluded = Some(excluded);
        self
    }

    pub fn overlay(&self) -> Option<&'a Overlay> {
        self.overlay
    }

    // ── Dimensions ────────────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.network.node_count() + self.overlay.map_or(0, Overlay::node_count)
    }

    pub fn edge_count(&self) -> usize {
        self.network.edge_count() + self.overlay.map_or(0, Overlay::edge_count)
    }

    #[inline]
    fn is_base(&self, edge: EdgeId) -> bool {
        edge.index() < self.network.edge_count()
    }

    /// `true` if a search may traverse `edge`.
    #[inline]
    pub fn is_usable(&self, edge: EdgeId) -> bool {
        if self.excluded.is_some_and(|x| x.contains(edge.index())) {
            return false;
        }
        !(self.is_base(edge) && self.overlay.is_some_and(|o| o.replaces(edge)))
    }

    // ── Traversal ─────────────────────────────────────────────────────────

    /// Usable outgoing edges of `node`: base edges first (CSR order), then
    /// overlay pieces in creation order.
    #[inline]
    pub fn out_edges(self, node: NodeId) -> impl Iterator<Item = EdgeId> + 'a {
        let extra: &'a [EdgeId] = match self.overlay {
            Some(o) => o.out_edges(node),
            None => &[],
        };
        self.network
            .out_edge_range(node)
            .map(EdgeId::from_index)
            .chain(extra.iter().copied())
            .filter(move |&e| self.is_usable(e))
    }

    #[inline]
    pub fn edge_from(&self, edge: EdgeId) -> NodeId {
        match self.overlay {
            Some(o) if !self.is_base(edge) => o.edge(edge).from,
            _ => self.network.edge_from[edge.index()],
        }
    }

    #[inline]
    pub fn edge_to(&self, edge: EdgeId) -> NodeId {
        match self.overlay {
            Some(o) if !self.is_base(edge) => o.edge(edge).to,
            _ => self.network.edge_to[edge.index()],
        }
    }

    #[inline]
    pub fn edge_weight(&self, edge: EdgeId) -> f64 {
        match self.overlay {
            Some(o) if !self.is_base(edge) => o.edge(edge).weight,
            _ => self.network.edge_weight[edge.index()],
        }
    }

    #[inline]
    pub fn edge_line(&self, edge: EdgeId) -> LineId {
        match self.overlay {
            Some(o) if !self.is_base(edge) => o.edge(edge).line,
            _ => self.network.edge_line[edge.index()],
        }
    }

    /// `(from, to)` fractions of the edge along its line's digitised geometry.
    pub fn edge_span(&self, edge: EdgeId) -> (f64, f64) {
        match self.overlay {
            Some(o) if !self.is_base(edge) => o.edge(edge).span,
            _ if self.network.edge_reversed[edge.index()] => (1.0, 0.0),
            _ => (0.0, 1.0),
        }
    }

    /// Edge geometry oriented in travel direction.
    pub fn edge_geometry(&self, edge: EdgeId) -> LineString<f64> {
        if self.is_base(edge) {
            return self.network.edge_geometry(edge);
        }
        let (from, to) = self.edge_span(edge);
        substring(&self.network.line_geometry[self.edge_line(edge).index()], from, to)
    }

    /// The opposite-direction edge covering the same stretch of line.
    pub fn twin(&self, edge: EdgeId) -> Option<EdgeId> {
        match self.overlay {
            Some(o) if !self.is_base(edge) => {
                let twin = o.edge(edge).twin;
                (twin != EdgeId::INVALID).then_some(twin)
            }
            _ => self.network.twin(edge),
        }
    }

    /// Identity of the stretch of line an edge covers.  In an undirected
    /// network both directions share one identity (the lower edge id); in a
    /// directed one every edge is its own.
    pub fn canonical(&self, edge: EdgeId) -> EdgeId {
        if self.network.is_directed() {
            return edge;
        }
        self.twin(edge).map_or(edge, |t| t.min(edge))
    }

    /// The base-network edge an edge belongs to: itself for base edges, the
    /// replaced edge of the same line and direction for overlay pieces.
    pub fn base_edge(&self, edge: EdgeId) -> EdgeId {
        if self.is_base(edge) {
            return edge;
        }
        let (from, to) = self.edge_span(edge);
        self.network.line_edges[self.edge_line(edge).index()][(from > to) as usize]
    }

    /// Length of the stretch of line an edge covers.
    pub fn edge_length(&self, edge: EdgeId) -> f64 {
        let (from, to) = self.edge_span(edge);
        self.network.line_length[self.edge_line(edge).index()] * (to - from).abs()
    }

    pub fn node_pos(&self, node: NodeId) -> Coord<f64> {
        match self.overlay {
            Some(o) if node.index() >= self.network.node_count() => o.node_pos(node),
            _ => self.network.node_pos[node.index()],
        }
    }
}
