//! Analysis rules.
//!
//! A [`Rules`] value is validated once when a session starts and is then
//! treated as immutable.  Attribute names are resolved against the input
//! lines at build time, never per query.

use crate::{NaError, NaResult};

/// Retries beyond this many cannot find anything the last one did not.
pub const MAX_EXPANSIONS: u32 = 64;

/// Minutes needed to cover `metres` at `kmh`.
#[inline]
pub fn travel_minutes(metres: f64, kmh: f64) -> f64 {
    metres / (kmh * 1000.0 / 60.0)
}

/// What edge costs measure.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CostUnit {
    /// Coordinate units, usually metres.
    Distance,
    /// Travel time in minutes.
    Minutes,
}

impl CostUnit {
    /// Unit implied by a weight attribute name: `"minutes"` is a time, any
    /// other name a distance.
    pub fn for_attribute(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("minutes") {
            CostUnit::Minutes
        } else {
            CostUnit::Distance
        }
    }

    /// Connector cost used when none is set explicitly.
    pub fn default_connector(self) -> ConnectorCost {
        match self {
            CostUnit::Distance => ConnectorCost::Distance,
            CostUnit::Minutes  => ConnectorCost::Free,
        }
    }
}

/// How the residual distance between a point and its snapped node becomes cost.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectorCost {
    /// Residuals are ignored.
    Free,
    /// The residual distance is added as-is.  Only valid for distance costs.
    Distance,
    /// The residual distance times `factor`, e.g. a detour factor on metres
    /// or minutes per metre.
    Multiplier { factor: f64 },
    /// The residual is travelled at `kmh`; cost is in minutes, with
    /// coordinates in metres.
    Speed { kmh: f64 },
}

impl ConnectorCost {
    /// Cost of covering `distance` off-network.
    #[inline]
    pub fn cost(self, distance: f64) -> f64 {
        match self {
            ConnectorCost::Free => 0.0,
            ConnectorCost::Distance => distance,
            ConnectorCost::Multiplier { factor } => distance * factor,
            ConnectorCost::Speed { kmh } => travel_minutes(distance, kmh),
        }
    }
}

/// Edge weights computed as travel minutes from line length and speed,
/// instead of read from the `weight` attribute.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpeedRule {
    /// Every line is travelled at `kmh`.
    Flat { kmh: f64 },
    /// Speed in km/h read from the `name` attribute.  Lines where it is
    /// missing or not positive use `default_kmh`; without a default they are
    /// dropped, and the build fails if that is more than 5 % of the lines.
    Attribute { name: String, default_kmh: Option<f64> },
}

/// Network-analysis configuration.
///
/// | Field              | Default      |
/// |--------------------|--------------|
/// | `weight`           | required     |
/// | `backward_weight`  | `None`       |
/// | `directed`         | `false`      |
/// | `search_tolerance` | `250.0`      |
/// | `search_factor`    | `0.0`        |
/// | `max_expansions`   | `10`         |
/// | `split_lines`      | `false`      |
/// | `drop_negative`    | `false`      |
/// | `speed`            | `None`       |
/// | `cost_unit`        | by `weight`  |
/// | `connector_cost`   | by unit      |
///
/// A weight named `"minutes"` makes the costs [`CostUnit::Minutes`], whose
/// default connector cost is `Free`; every other name defaults to
/// [`CostUnit::Distance`] with the residual added as distance.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rules {
    /// Name of the line attribute used as edge cost.
    pub weight: String,
    /// Attribute for the reverse direction of two-way lines in a directed
    /// network.  Falls back to `weight`.
    pub backward_weight: Option<String>,
    pub directed: bool,
    /// Maximum snapping distance before expansion.
    pub search_tolerance: f64,
    /// Growth rate of the tolerance per retry: `tol *= 1 + search_factor`.
    pub search_factor: f64,
    /// Number of expanded retries before a point is declared unreachable.
    pub max_expansions: u32,
    /// Cut the nearest line at the projected point instead of snapping to
    /// its closer endpoint.
    pub split_lines: bool,
    /// Treat negative weights as "direction not allowed" and drop them.
    pub drop_negative: bool,
    /// Derive minutes from speed instead of reading `weight`.
    pub speed: Option<SpeedRule>,
    pub cost_unit: CostUnit,
    pub connector_cost: ConnectorCost,
}

impl Rules {
    pub fn new(weight: impl Into<String>) -> Self {
        let weight = weight.into();
        let cost_unit = CostUnit::for_attribute(&weight);
        Self {
            weight,
            backward_weight:  None,
            directed:         false,
            search_tolerance: 250.0,
            search_factor:    0.0,
            max_expansions:   10,
            split_lines:      false,
            drop_negative:    false,
            speed:            None,
            cost_unit,
            connector_cost:   cost_unit.default_connector(),
        }
    }

    pub fn directed(mut self, directed: bool) -> Self {
        self.directed = directed;
        self
    }

    pub fn backward_weight(mut self, attr: impl Into<String>) -> Self {
        self.backward_weight = Some(attr.into());
        self
    }

    pub fn search_tolerance(mut self, tolerance: f64) -> Self {
        self.search_tolerance = tolerance;
        self
    }

    pub fn search_factor(mut self, factor: f64) -> Self {
        self.search_factor = factor;
        self
    }

    pub fn max_expansions(mut self, n: u32) -> Self {
        self.max_expansions = n;
        self
    }

    pub fn split_lines(mut self, split: bool) -> Self {
        self.split_lines = split;
        self
    }

    pub fn drop_negative(mut self, drop: bool) -> Self {
        self.drop_negative = drop;
        self
    }

    /// Compute every edge weight as minutes at a flat speed.
    pub fn flat_speed(mut self, kmh: f64) -> Self {
        self.speed = Some(SpeedRule::Flat { kmh });
        self.switch_unit(CostUnit::Minutes);
        self
    }

    /// Compute edge weights as minutes from a per-line speed attribute.
    pub fn speed_attribute(mut self, name: impl Into<String>, default_kmh: Option<f64>) -> Self {
        self.speed = Some(SpeedRule::Attribute { name: name.into(), default_kmh });
        self.switch_unit(CostUnit::Minutes);
        self
    }

    /// Declare what the weights measure.  A connector cost still at the old
    /// unit's default follows the new unit; an explicitly chosen one is kept
    /// and checked by [`validate`](Self::validate).
    pub fn cost_unit(mut self, unit: CostUnit) -> Self {
        self.switch_unit(unit);
        self
    }

    fn switch_unit(&mut self, unit: CostUnit) {
        if self.connector_cost == self.cost_unit.default_connector() {
            self.connector_cost = unit.default_connector();
        }
        self.cost_unit = unit;
    }

    pub fn connector_cost(mut self, cost: ConnectorCost) -> Self {
        self.connector_cost = cost;
        self
    }

    /// Check every rule; the first problem found is returned.
    pub fn validate(&self) -> NaResult<()> {
        if self.weight.trim().is_empty() {
            return Err(NaError::Config("'weight' must name a line attribute".into()));
        }
        if let Some(bw) = &self.backward_weight {
            if bw.trim().is_empty() {
                return Err(NaError::Config("'backward_weight' must not be empty".into()));
            }
        }
        if !self.search_tolerance.is_finite() || self.search_tolerance < 0.0 {
            return Err(NaError::Config(format!(
                "'search_tolerance' must be a non-negative number, got {}",
                self.search_tolerance
            )));
        }
        if !self.search_factor.is_finite() || self.search_factor < 0.0 {
            return Err(NaError::Config(format!(
                "'search_factor' must be a non-negative number, got {}",
                self.search_factor
            )));
        }
        if self.max_expansions > MAX_EXPANSIONS {
            return Err(NaError::Config(format!(
                "'max_expansions' must be at most {MAX_EXPANSIONS}, got {}",
                self.max_expansions
            )));
        }
        self.validate_speed()?;
        self.validate_connector()
    }

    fn validate_speed(&self) -> NaResult<()> {
        let positive = |kmh: f64, what: &str| {
            if kmh.is_finite() && kmh > 0.0 {
                Ok(())
            } else {
                Err(NaError::Config(format!("{what} must be a positive speed, got {kmh} km/h")))
            }
        };
        let Some(speed) = &self.speed else {
            return Ok(());
        };
        if self.backward_weight.is_some() {
            return Err(NaError::Config(
                "'backward_weight' cannot be combined with weights derived from speed".into(),
            ));
        }
        if self.cost_unit != CostUnit::Minutes {
            return Err(NaError::Config("weights derived from speed are minutes".into()));
        }
        match speed {
            SpeedRule::Flat { kmh } => positive(*kmh, "flat speed"),
            SpeedRule::Attribute { name, default_kmh } => {
                if name.trim().is_empty() {
                    return Err(NaError::Config("speed attribute must not be empty".into()));
                }
                default_kmh.map_or(Ok(()), |kmh| positive(kmh, "default speed"))
            }
        }
    }

    fn validate_connector(&self) -> NaResult<()> {
        match self.connector_cost {
            ConnectorCost::Speed { kmh } if !kmh.is_finite() || kmh <= 0.0 => Err(NaError::Config(
                format!("connector speed must be positive, got {kmh} km/h"),
            )),
            ConnectorCost::Multiplier { factor } if !factor.is_finite() || factor < 0.0 => {
                Err(NaError::Config(format!(
                    "connector multiplier must be a non-negative number, got {factor}"
                )))
            }
            ConnectorCost::Distance if self.cost_unit == CostUnit::Minutes => Err(NaError::Config(
                "a distance connector cost cannot be added to costs in minutes; \
                 use a speed, a multiplier or free connectors"
                    .into(),
            )),
            _ => Ok(()),
        }
    }

    /// Tolerances tried in order when snapping: the base tolerance, then one
    /// per expansion.  Without a search factor only the base is tried.
    pub fn tolerance_steps(&self) -> impl Iterator<Item = f64> + '_ {
        let expansions = if self.search_factor > 0.0 { self.max_expansions } else { 0 };
        (0..=expansions).map(move |i| {
            self.search_tolerance * (1.0 + self.search_factor).powi(i as i32)
        })
    }
}
