//! Paths and the one-shot shortest-path query.

use geo::{LineString, MultiLineString};

use na_core::{EdgeId, NaError, NaResult, NodeId};
use na_network::NetworkView;

use crate::{SearchOptions, SearchSpace};

/// An ordered edge sequence from `source` to `target`.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    pub source: NodeId,
    pub target: NodeId,
    /// Edges to traverse in order, from source to target.
    pub edges:  Vec<EdgeId>,
    /// Sum of the edge weights.
    pub cost:   f64,
}

impl Path {
    /// `true` if source and target are the same node.
    pub fn is_trivial(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Edge geometries in travel order.
    pub fn geometry(&self, view: NetworkView<'_>) -> MultiLineString<f64> {
        MultiLineString::new(
            self.edges
                .iter()
                .map(|&e| view.edge_geometry(e))
                .collect::<Vec<LineString<f64>>>(),
        )
    }

    /// Cost accumulated at the start and end of each edge.
    pub fn cumulative(&self, view: NetworkView<'_>) -> Vec<(f64, f64)> {
        let mut at = 0.0;
        self.edges
            .iter()
            .map(|&e| {
                let start = at;
                at += view.edge_weight(e);
                (start, at)
            })
            .collect()
    }
}

/// Lowest-cost path between two nodes.
///
/// # Errors
///
/// [`NaError::NoPath`] when `to` is unreachable from `from`.
pub fn shortest_path(view: NetworkView<'_>, from: NodeId, to: NodeId) -> NaResult<Path> {
    let mut space = SearchSpace::new();
    let targets = [to];
    space.run(view, from, &SearchOptions::targets(&targets));
    space.path(view, to).ok_or(NaError::NoPath { from, to })
}
