//! R-tree over line segments.
//!
//! Every segment of every usable line is one entry, so a nearest-neighbour
//! query returns the closest *line* to a point, not merely the closest vertex.

use geo::{Coord, Line, LineString};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use na_core::geometry::segment_distance;
use na_core::LineId;

// ── R-tree segment entry ──────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct SegmentEntry {
    line: LineId,
    seg:  u32,
    geom: Line<f64>,
}

impl RTreeObject for SegmentEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        let Line { start, end } = self.geom;
        AABB::from_corners([start.x, start.y], [end.x, end.y])
    }
}

impl PointDistance for SegmentEntry {
    /// Squared planar distance from the query point to the segment.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let d = segment_distance(&self.geom, Coord { x: point[0], y: point[1] });
        d * d
    }
}

// ── SegmentIndex ──────────────────────────────────────────────────────────────

/// Spatial index answering "which line is nearest to this point".
///
/// Built once per [`Network`](crate::Network) and shared read-only by every
/// analysis.
pub struct SegmentIndex {
    tree: RTree<SegmentEntry>,
}

impl SegmentIndex {
    /// Bulk-load the index; `lines[i]` is indexed under `LineId(i)`.
    pub fn build(lines: &[LineString<f64>]) -> Self {
        let entries: Vec<SegmentEntry> = lines
            .iter()
            .enumerate()
            .flat_map(|(i, line)| {
                line.lines().enumerate().map(move |(s, seg)| SegmentEntry {
                    line: LineId::from_index(i),
                    seg:  s as u32,
                    geom: seg,
                })
            })
            .collect();
        Self { tree: RTree::bulk_load(entries) }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// The nearest line to `p` and the distance to it.
    ///
    /// Among equally distant segments the lowest `(LineId, segment)` wins, so
    /// the answer does not depend on R-tree internals.  A non-finite `p` has
    /// no nearest line.
    pub fn nearest_line(&self, p: Coord<f64>) -> Option<(LineId, f64)> {
        if !p.x.is_finite() || !p.y.is_finite() {
            return None;
        }
        let mut iter = self.tree.nearest_neighbor_iter_with_distance_2(&[p.x, p.y]);
        let (first, best_d2) = iter.next()?;
        let mut best = (first.line, first.seg);
        for (entry, d2) in iter {
            if d2 > best_d2 {
                break;
            }
            best = best.min((entry.line, entry.seg));
        }
        Some((best.0, best_d2.sqrt()))
    }

    /// All lines with at least one segment within `radius` of `p`, sorted and
    /// deduplicated.
    pub fn lines_within(&self, p: Coord<f64>, radius: f64) -> Vec<LineId> {
        if !p.x.is_finite() || !p.y.is_finite() || !radius.is_finite() {
            return Vec::new();
        }
        let mut found: Vec<LineId> = self
            .tree
            .locate_within_distance([p.x, p.y], radius * radius)
            .map(|e| e.line)
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }
}
