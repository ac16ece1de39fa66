//! Point-to-network snapping.
//!
//! A point snaps onto the nearest usable line within the search tolerance.
//! If nothing is in range, the tolerance grows by `1 + search_factor` per
//! retry, up to `max_expansions` retries.  Where the point ends up depends on
//! `split_lines`:
//!
//! - off: the closer endpoint of the nearest line;
//! - on:  the orthogonal projection onto the line, which becomes a new node
//!   in the per-call [`Overlay`](crate::Overlay).
//!
//! The residual distance between the point and where it snapped is kept on
//! the [`Snap`] so analyses can add its cost to every path through the point.

use geo::Coord;

use na_core::geometry::{distance, project};
use na_core::{LineId, LinePosition, NaError, NaResult, NodeId, PointId, Rules};

use crate::Network;

/// Where a snapped point attaches to the graph.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SnapTarget {
    /// An existing network node.
    Node(NodeId),
    /// A point inside a line, to be materialised by an overlay split.
    Split { line: LineId, fraction: f64 },
}

/// One successfully snapped point.
#[derive(Clone, Debug, PartialEq)]
pub struct Snap {
    pub point:     PointId,
    pub coord:     Coord<f64>,
    pub line:      LineId,
    /// Projection of `coord` onto `line`.
    pub position:  LinePosition,
    pub target:    SnapTarget,
    /// Off-network distance between `coord` and the attachment point.
    pub residual:  f64,
    /// Tolerance at which the line was found.
    pub tolerance: f64,
}

/// A point that could not be snapped, reported next to the batch results.
#[derive(Clone, Debug, PartialEq)]
pub struct SnapFailure {
    pub point: PointId,
    pub error: NaError,
}

/// Snaps points onto one network under one set of rules.
#[derive(Copy, Clone)]
pub struct Snapper<'a> {
    network: &'a Network,
    rules:   &'a Rules,
}

impl<'a> Snapper<'a> {
    pub fn new(network: &'a Network, rules: &'a Rules) -> Self {
        Self { network, rules }
    }

    /// Snap one point.
    ///
    /// # Errors
    ///
    /// [`NaError::UnreachablePoint`] when no line lies within the largest
    /// expanded tolerance, or the coordinate is not finite.
    pub fn snap(&self, point: PointId, coord: Coord<f64>) -> NaResult<Snap> {
        let fail = |tolerance| NaError::UnreachablePoint { point, tolerance };

        let mut last = self.rules.search_tolerance;
        if !coord.x.is_finite() || !coord.y.is_finite() {
            return Err(fail(last));
        }
        let Some((line, dist)) = self.network.nearest_line(coord) else {
            return Err(fail(last));
        };

        let mut found = None;
        for tol in self.rules.tolerance_steps() {
            last = tol;
            if dist <= tol {
                found = Some(tol);
                break;
            }
        }
        let tolerance = found.ok_or_else(|| fail(last))?;

        let geometry = &self.network.line_geometry[line.index()];
        let position = project(geometry, coord).ok_or_else(|| fail(tolerance))?;
        let [start, end] = self.network.line_ends[line.index()];

        let (target, residual) = if self.rules.split_lines {
            let target = if position.fraction <= 0.0 {
                SnapTarget::Node(start)
            } else if position.fraction >= 1.0 {
                SnapTarget::Node(end)
            } else {
                SnapTarget::Split { line, fraction: position.fraction }
            };
            (target, position.distance)
        } else {
            let d_start = distance(coord, self.network.node_pos[start.index()]);
            let d_end = distance(coord, self.network.node_pos[end.index()]);
            if d_end < d_start {
                (SnapTarget::Node(end), d_end)
            } else {
                (SnapTarget::Node(start), d_start)
            }
        };

        Ok(Snap { point, coord, line, position, target, residual, tolerance })
    }

    /// Snap a batch, keeping input order.  Failures are collected, not fatal.
    pub fn snap_all(&self, points: &[(PointId, Coord<f64>)]) -> (Vec<Snap>, Vec<SnapFailure>) {
        let mut snaps = Vec::with_capacity(points.len());
        let mut failures = Vec::new();
        for &(point, coord) in points {
            match self.snap(point, coord) {
                Ok(s) => snaps.push(s),
                Err(error) => failures.push(SnapFailure { point, error }),
            }
        }
        (snaps, failures)
    }
}
