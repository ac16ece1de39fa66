//! Per-run summaries kept on the session.

use std::fmt;
use std::time::Duration;

/// The analysis that produced a [`RunRecord`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Method {
    OdCostMatrix,
    Route,
    KRoutes,
    ServiceArea,
    RouteFrequencies,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::OdCostMatrix     => "od_cost_matrix",
            Method::Route            => "get_route",
            Method::KRoutes          => "get_k_routes",
            Method::ServiceArea      => "service_area",
            Method::RouteFrequencies => "get_route_frequencies",
        })
    }
}

/// Summary of one analysis run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunRecord {
    pub method:          Method,
    pub elapsed:         Duration,
    /// Origins supplied (before snapping).
    pub origins:         usize,
    /// Destinations supplied; 0 for service areas.
    pub destinations:    usize,
    /// Points that could not be snapped.
    pub failures:        usize,
    /// Origins skipped because the run was cancelled.
    pub incomplete:      usize,
    /// Share of results (pairs, or break regions) without a cost or geometry,
    /// in percent.
    pub percent_missing: f64,
    /// Mean cost over results that have one.
    pub mean_cost:       Option<f64>,
    /// Breaks used by a service area run.
    pub breaks:          Vec<f64>,
    pub rowwise:         bool,
}

impl RunRecord {
    pub(crate) fn new(method: Method, origins: usize, destinations: usize) -> Self {
        Self {
            method,
            elapsed: Duration::ZERO,
            origins,
            destinations,
            failures: 0,
            incomplete: 0,
            percent_missing: 0.0,
            mean_cost: None,
            breaks: Vec::new(),
            rowwise: false,
        }
    }
}

/// Share of `missing` in `total`, in percent; 0 when there is nothing.
pub(crate) fn percent(missing: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        missing as f64 / total as f64 * 100.0
    }
}

/// Mean of the values, `None` if there are none.
pub(crate) fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}
