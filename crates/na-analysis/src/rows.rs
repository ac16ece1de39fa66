//! Result rows.
//!
//! Rows refer to points by their caller-supplied [`PointId`] and to the
//! network by base [`LineId`]/[`EdgeId`]s.  Ids of nodes and edges created by
//! line splitting never leave the call that made them.

use geo::{Line, LineString, MultiLineString};

use na_core::{EdgeId, LineId, NodeId, PointId};
use na_network::SnapFailure;

/// Rows of one batch plus everything that kept the batch from being whole.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisOutput<R> {
    pub rows:       Vec<R>,
    /// Points that could not be snapped, origins first.
    pub failures:   Vec<SnapFailure>,
    /// Origins never processed because the run was cancelled.
    pub incomplete: Vec<PointId>,
}

impl<R> AnalysisOutput<R> {
    /// `true` when every supplied point snapped and every origin ran.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.incomplete.is_empty()
    }
}

/// One origin–destination cost.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CostRow {
    pub origin:      PointId,
    pub destination: PointId,
    /// Connector costs plus network cost; `None` when no path exists.
    pub cost:        Option<f64>,
    /// Straight line from origin to destination, when requested.
    pub line:        Option<Line<f64>>,
}

/// One ranked route between an origin and a destination.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteRow {
    pub origin:      PointId,
    pub destination: PointId,
    /// 1 for the cheapest route.
    pub rank:        usize,
    pub cost:        f64,
    /// Traversed edges in travel order.
    pub geometry:    MultiLineString<f64>,
    /// Traversed lines in travel order.
    pub lines:       Vec<LineId>,
}

/// Network reached from one origin within one break.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServiceAreaRow {
    pub origin:      PointId,
    pub break_value: f64,
    pub geometry:    MultiLineString<f64>,
    /// The reached line, for undissolved rows.
    pub line:        Option<LineId>,
}

/// Usage of one network edge across a batch of shortest paths.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrequencyRow {
    /// Base edge; in undirected networks the lower id of the two directions.
    pub edge:      EdgeId,
    pub line:      LineId,
    pub source:    NodeId,
    pub target:    NodeId,
    /// Sum of the weights of the pairs whose path uses the edge.
    pub frequency: f64,
    /// Number of such pairs.
    pub visits:    u64,
    pub geometry:  LineString<f64>,
}
