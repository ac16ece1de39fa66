//! Synthetic street grid.
//!
//! `SIZE × SIZE` intersections `SPACING` metres apart.  Horizontal streets
//! are two-way; vertical streets alternate between northbound and
//! southbound one-way, like a downtown grid.  Every line carries `meters`
//! and `minutes` (at `SPEED_KMH`).

use geo::{Coord, LineString};

use na_core::geometry::line_length;
use na_core::travel_minutes;
use na_network::{LineDirection, LineRecord};

pub const SIZE:      usize = 6;
pub const SPACING:   f64   = 100.0;
const SPEED_KMH:     f64   = 30.0;

fn street(a: Coord<f64>, b: Coord<f64>) -> LineRecord {
    let geometry = LineString::new(vec![a, b]);
    let meters = line_length(&geometry);
    LineRecord::new(geometry)
        .with_attr("meters", meters)
        .with_attr("minutes", travel_minutes(meters, SPEED_KMH))
}

fn at(i: usize, j: usize) -> Coord<f64> {
    Coord { x: i as f64 * SPACING, y: j as f64 * SPACING }
}

pub fn build_grid() -> Vec<LineRecord> {
    let mut lines = Vec::new();
    for j in 0..SIZE {
        for i in 0..SIZE - 1 {
            lines.push(street(at(i, j), at(i + 1, j)));
        }
    }
    for i in 0..SIZE {
        let direction = if i % 2 == 0 { LineDirection::Forward } else { LineDirection::Backward };
        for j in 0..SIZE - 1 {
            lines.push(street(at(i, j), at(i, j + 1)).with_direction(direction));
        }
    }
    lines
}
