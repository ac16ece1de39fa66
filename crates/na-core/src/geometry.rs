//! Planar polyline helpers on top of `geo`'s Euclidean measures.
//!
//! Coordinates are projected (metres or any other planar unit).  Positions
//! along a line are expressed as a *fraction* of its total length in
//! `[0, 1]`, measured from the first vertex.

use geo::{
    Coord, Distance, Euclidean, InterpolateLine, Length, Line, LineLocatePoint, LineString, Point,
};

/// Where a point lands when projected onto a polyline.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LinePosition {
    /// Fraction of the line's length from its first vertex, in `[0, 1]`.
    pub fraction: f64,
    /// Euclidean distance from the query point to `coord`.
    pub distance: f64,
    /// The projected coordinate on the line.
    pub coord: Coord<f64>,
}

#[inline]
pub fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    Euclidean.distance(Point::from(a), Point::from(b))
}

/// Distance from `p` to the closest point of `segment`.
#[inline]
pub fn segment_distance(segment: &Line<f64>, p: Coord<f64>) -> f64 {
    Euclidean.distance(&Point::from(p), segment)
}

pub fn line_length(line: &LineString<f64>) -> f64 {
    Euclidean.length(line)
}

/// Orthogonal projection of `p` onto `line`.
///
/// `None` for a line without vertices or a non-finite `p`.  When several
/// segments are equally close, the one nearest the start of the line wins.
pub fn project(line: &LineString<f64>, p: Coord<f64>) -> Option<LinePosition> {
    let fraction = line.line_locate_point(&Point::from(p))?;
    let coord = interpolate(line, fraction)?;
    Some(LinePosition { fraction, distance: distance(p, coord), coord })
}

/// Coordinate at `fraction` of the way along `line`; fractions outside
/// `[0, 1]` are clamped.
pub fn interpolate(line: &LineString<f64>, fraction: f64) -> Option<Coord<f64>> {
    Euclidean
        .point_at_ratio_from_start(line, fraction.clamp(0.0, 1.0))
        .map(|p| p.0)
}

/// The part of `line` between two fractions.
///
/// When `from > to` the result runs backwards, so a reversed edge's geometry
/// is `substring(line, 1.0, 0.0)`.
pub fn substring(line: &LineString<f64>, from: f64, to: f64) -> LineString<f64> {
    if from > to {
        let mut forward = substring(line, to, from);
        forward.0.reverse();
        return forward;
    }

    let from = from.clamp(0.0, 1.0);
    let to = to.clamp(0.0, 1.0);
    if from <= 0.0 && to >= 1.0 {
        return line.clone();
    }

    let total = line_length(line);
    let (start_at, end_at) = (from * total, to * total);
    let Some(start) = Euclidean.point_at_distance_from_start(line, start_at) else {
        return LineString::new(Vec::new());
    };

    // Interior vertices strictly between the two cut points.
    let mut coords = vec![start.0];
    let mut walked = 0.0;
    for seg in line.lines() {
        walked += Euclidean.length(&seg);
        if walked >= end_at {
            break;
        }
        if walked > start_at {
            coords.push(seg.end);
        }
    }

    let end = Euclidean
        .point_at_distance_from_start(line, end_at)
        .map_or(start.0, |p| p.0);
    coords.push(end);
    LineString::new(coords)
}
