//! Reachable network within cost breaks.
//!
//! One search per origin with `cutoff = largest break - connector cost`.
//! Every usable edge leaving a settled node gets a reach interval
//! `[cost at its start, cost at its end]`.  An edge belongs to break `b` when
//! its end cost is at most `b`; with `precise`, edges whose interval straddles
//! `b` also contribute the part reached before `b`.  Since costs only grow
//! along a path, the network reached within a smaller break is always part of
//! the network reached within a larger one.
//!
//! Regions are returned as line networks.  Turning them into polygons
//! (buffering, hole filling) is left to the caller's geometry toolkit.

use std::collections::BTreeMap;

use geo::{Coord, LineString, MultiLineString};

use na_core::geometry::substring;
use na_core::{LineId, NaError, NaResult, PointId};
use na_network::NetworkView;
use na_route::{SearchOptions, SearchSpace};

use crate::prepare::{Endpoint, Prepared};
use crate::runlog::percent;
use crate::{AnalysisOutput, Method, NetworkAnalysis, RunRecord, ServiceAreaRow};

/// Options for [`NetworkAnalysis::service_area`].
///
/// | Field      | Default |
/// |------------|---------|
/// | `dissolve` | `true`  |
/// | `precise`  | `false` |
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServiceAreaOptions {
    /// One merged row per origin and break; otherwise one row per reached
    /// line and break.
    pub dissolve: bool,
    /// Cut lines that are only partly reached at the point the break is hit.
    pub precise:  bool,
}

impl Default for ServiceAreaOptions {
    fn default() -> Self {
        Self { dissolve: true, precise: false }
    }
}

impl ServiceAreaOptions {
    pub fn dissolve(mut self, dissolve: bool) -> Self {
        self.dissolve = dissolve;
        self
    }

    pub fn precise(mut self, precise: bool) -> Self {
        self.precise = precise;
        self
    }
}

/// An edge leaving a settled node.
struct Reach {
    line:  LineId,
    /// `(from, to)` fractions along the line in travel direction.
    span:  (f64, f64),
    start: f64,
    end:   f64,
}

/// Identity of a stretch of line regardless of travel direction: the line
/// and the bit patterns of its sorted, non-negative span fractions.
type StretchKey = (LineId, u64, u64);

fn stretch_key(line: LineId, a: f64, b: f64) -> StretchKey {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    (line, lo.to_bits(), hi.to_bits())
}

/// Sorted, deduplicated breaks.
fn sorted_breaks(breaks: &[f64]) -> NaResult<Vec<f64>> {
    if breaks.is_empty() {
        return Err(NaError::Config("service area needs at least one break".into()));
    }
    if let Some(b) = breaks.iter().find(|b| !b.is_finite() || **b < 0.0) {
        return Err(NaError::Config(format!("breaks must be non-negative numbers, got {b}")));
    }
    let mut sorted = breaks.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    Ok(sorted)
}

fn reaches(view: NetworkView<'_>, space: &mut SearchSpace, origin: &Endpoint, max_break: f64) -> Vec<Reach> {
    if origin.connector > max_break {
        return Vec::new();
    }
    space.run(view, origin.node, &SearchOptions::cutoff(max_break - origin.connector));
    let mut out = Vec::new();
    for (node, cost) in space.settled() {
        let start = origin.connector + cost;
        for e in view.out_edges(node) {
            out.push(Reach {
                line: view.edge_line(e),
                span: view.edge_span(e),
                start,
                end: start + view.edge_weight(e),
            });
        }
    }
    out
}

/// Reached stretches within `b`, keyed so that both directions of a stretch
/// collapse into one entry.
fn within(view: NetworkView<'_>, reached: &[Reach], b: f64, precise: bool) -> BTreeMap<StretchKey, (LineId, LineString<f64>)> {
    let geometry = |line: LineId, from: f64, to: f64| {
        let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
        substring(&view.network.line_geometry[line.index()], lo, hi)
    };

    let mut full = BTreeMap::new();
    for r in reached.iter().filter(|r| r.end <= b) {
        full.entry(stretch_key(r.line, r.span.0, r.span.1))
            .or_insert_with(|| (r.line, geometry(r.line, r.span.0, r.span.1)));
    }
    if precise {
        for r in reached.iter().filter(|r| r.start < b && b < r.end) {
            if full.contains_key(&stretch_key(r.line, r.span.0, r.span.1)) {
                continue;
            }
            let t = (b - r.start) / (r.end - r.start);
            let cut = r.span.0 + (r.span.1 - r.span.0) * t;
            full.entry(stretch_key(r.line, r.span.0, cut))
                .or_insert_with(|| (r.line, geometry(r.line, r.span.0, cut)));
        }
    }
    full
}

impl NetworkAnalysis {
    /// Network reachable from each origin within each break.
    ///
    /// Breaks are sorted ascending and deduplicated.  An origin that reaches
    /// nothing still gets one row per break, with empty geometry.
    ///
    /// # Errors
    ///
    /// [`NaError::Config`] when `breaks` is empty or holds negative or
    /// non-finite values.
    pub fn service_area(
        &mut self,
        origins: &[(PointId, Coord<f64>)],
        breaks:  &[f64],
        opts:    &ServiceAreaOptions,
    ) -> NaResult<AnalysisOutput<ServiceAreaRow>> {
        let breaks = sorted_breaks(breaks)?;
        let max_break = breaks[breaks.len() - 1];

        let mut record = RunRecord::new(Method::ServiceArea, origins.len(), 0);
        record.breaks = breaks.clone();
        let started = self.start(&record);

        let network = self.shared_network();
        let prepared = Prepared::new(&network, self.rules(), origins, &[]);
        let view = prepared.view(&network);

        let results = self.run_each(&prepared.origins, |space, origin| {
            let reached = reaches(view, space, origin, max_break);
            let mut rows = Vec::new();
            for &b in &breaks {
                let stretches = within(view, &reached, b, opts.precise);
                if opts.dissolve || stretches.is_empty() {
                    rows.push(ServiceAreaRow {
                        origin:      origin.id,
                        break_value: b,
                        geometry:    MultiLineString::new(stretches.into_values().map(|(_, g)| g).collect()),
                        line:        None,
                    });
                } else {
                    rows.extend(stretches.into_values().map(|(line, g)| ServiceAreaRow {
                        origin:      origin.id,
                        break_value: b,
                        geometry:    MultiLineString::new(vec![g]),
                        line:        Some(line),
                    }));
                }
            }
            rows
        });

        let Prepared { origins: snapped, failures, .. } = prepared;
        let (per_origin, incomplete) = self.collect(&snapped, results);
        let rows: Vec<ServiceAreaRow> = per_origin.into_iter().flatten().collect();

        record.failures = failures.len();
        record.incomplete = incomplete.len();
        record.percent_missing = percent(rows.iter().filter(|r| r.geometry.0.is_empty()).count(), rows.len());
        self.finish(record, started);

        Ok(AnalysisOutput { rows, failures, incomplete })
    }
}
