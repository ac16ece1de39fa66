//! Input line records.

use geo::LineString;
use rustc_hash::FxHashMap;

/// Travel direction allowed on a line, relative to its digitised order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineDirection {
    /// Both ways.
    #[default]
    Both,
    /// First vertex to last vertex only.
    Forward,
    /// Last vertex to first vertex only.
    Backward,
}

/// One input line: a vertex sequence plus numeric attributes addressed by name.
#[derive(Clone, Debug, PartialEq)]
pub struct LineRecord {
    pub geometry:   LineString<f64>,
    pub attributes: FxHashMap<String, f64>,
    pub direction:  LineDirection,
}

impl LineRecord {
    pub fn new(geometry: LineString<f64>) -> Self {
        Self {
            geometry,
            attributes: FxHashMap::default(),
            direction:  LineDirection::Both,
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: f64) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn with_direction(mut self, direction: LineDirection) -> Self {
        self.direction = direction;
        self
    }

    #[inline]
    pub fn attribute(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).copied()
    }
}
