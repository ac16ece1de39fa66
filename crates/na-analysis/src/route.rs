//! Single routes and k distinct routes per origin–destination pair.
//!
//! # k-routes
//!
//! Repeatedly search for the cheapest path that avoids every excluded edge.
//! A path is kept unless it shares more than `max_overlap` of its edges with
//! a route already kept.  Then the middle `drop_middle_percent` of the path
//! (by length) is excluded, so the next search has to leave the previous
//! corridor.  The median edge is always excluded, so every iteration removes
//! at least one edge and the loop terminates.
//!
//! Exclusions live in a per-pair bit set applied through a
//! [`NetworkView`]; the shared network never changes.

use fixedbitset::FixedBitSet;
use geo::{Coord, MultiLineString};
use rustc_hash::FxHashSet;

use na_core::{EdgeId, LineId, NaError, NaResult, NodeId, PointId};
use na_network::NetworkView;
use na_route::{Path, SearchOptions, SearchSpace};

use crate::prepare::{check_rowwise, Endpoint, Prepared};
use crate::runlog::{mean, percent};
use crate::{AnalysisOutput, Method, NetworkAnalysis, RouteRow, RunRecord};

/// Which edges of a path count as "in the middle" when excluding.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WindowEdges {
    /// Every edge touching the middle window, boundaries included.
    #[default]
    Overlapping,
    /// Only edges lying entirely inside the window.
    Contained,
}

/// Options for [`NetworkAnalysis::k_routes`] and [`k_paths`].
///
/// | Field                 | Default        |
/// |-----------------------|----------------|
/// | `k`                   | required       |
/// | `drop_middle_percent` | required       |
/// | `max_overlap`         | `0.9`          |
/// | `window_edges`        | `Overlapping`  |
/// | `max_attempts`        | `10 * k`       |
/// | `rowwise`             | `false`        |
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KRoutesOptions {
    /// Number of routes wanted per pair.
    pub k:                   usize,
    /// Share of each found path, centred on its midpoint, excluded before
    /// the next search.  0 removes only the median edge; 100 the whole path.
    pub drop_middle_percent: f64,
    /// Largest tolerated share of shared edges between two kept routes,
    /// relative to the shorter route's edge count.
    pub max_overlap:         f64,
    pub window_edges:        WindowEdges,
    /// Upper bound on searches per pair; `None` means `10 * k`.
    pub max_attempts:        Option<usize>,
    pub rowwise:             bool,
}

impl KRoutesOptions {
    pub fn new(k: usize, drop_middle_percent: f64) -> Self {
        Self {
            k,
            drop_middle_percent,
            max_overlap:  0.9,
            window_edges: WindowEdges::default(),
            max_attempts: None,
            rowwise:      false,
        }
    }

    pub fn max_overlap(mut self, share: f64) -> Self {
        self.max_overlap = share;
        self
    }

    pub fn window_edges(mut self, mode: WindowEdges) -> Self {
        self.window_edges = mode;
        self
    }

    pub fn max_attempts(mut self, n: usize) -> Self {
        self.max_attempts = Some(n);
        self
    }

    pub fn rowwise(mut self, rowwise: bool) -> Self {
        self.rowwise = rowwise;
        self
    }

    pub fn validate(&self) -> NaResult<()> {
        if self.k == 0 {
            return Err(NaError::Config("k must be at least 1".into()));
        }
        if !(0.0..=100.0).contains(&self.drop_middle_percent) {
            return Err(NaError::Config(format!(
                "drop_middle_percent must be between 0 and 100, got {}",
                self.drop_middle_percent
            )));
        }
        if !(0.0..=1.0).contains(&self.max_overlap) {
            return Err(NaError::Config(format!(
                "max_overlap must be between 0 and 1, got {}",
                self.max_overlap
            )));
        }
        if self.max_attempts == Some(0) {
            return Err(NaError::Config("max_attempts must be at least 1".into()));
        }
        Ok(())
    }

    fn attempts(&self) -> usize {
        self.max_attempts.unwrap_or(self.k.saturating_mul(10))
    }
}

// ── Path enumeration ──────────────────────────────────────────────────────────

/// Up to `opts.k` distinct paths from `from` to `to`, ascending by cost.
///
/// Fewer paths come back when the network runs out of alternatives; an
/// empty result means `to` is unreachable.  A trivial path (`from == to`) is
/// returned alone.
pub fn k_paths(
    view:  NetworkView<'_>,
    space: &mut SearchSpace,
    from:  NodeId,
    to:    NodeId,
    opts:  &KRoutesOptions,
) -> Vec<Path> {
    let targets = [to];
    let mut excluded = FixedBitSet::with_capacity(view.edge_count());
    let mut kept: Vec<(Path, FxHashSet<EdgeId>)> = Vec::new();

    for _ in 0..opts.attempts() {
        if kept.len() >= opts.k {
            break;
        }
        let constrained = view.with_exclusions(&excluded);
        space.run(constrained, from, &SearchOptions::targets(&targets));
        let Some(path) = space.path(constrained, to) else {
            break;
        };
        if path.is_trivial() {
            kept.push((path, FxHashSet::default()));
            break;
        }

        let identity: FxHashSet<EdgeId> = path.edges.iter().map(|&e| view.canonical(e)).collect();
        let duplicate = kept
            .iter()
            .any(|(_, other)| overlap(&identity, other) > opts.max_overlap);

        for e in middle_edges(view, &path, opts.drop_middle_percent, opts.window_edges) {
            excluded.insert(e.index());
            if !view.network.is_directed() {
                if let Some(t) = view.twin(e) {
                    excluded.insert(t.index());
                }
            }
        }

        if !duplicate {
            kept.push((path, identity));
        }
    }

    let mut paths: Vec<Path> = kept.into_iter().map(|(p, _)| p).collect();
    paths.sort_by(|a, b| a.cost.total_cmp(&b.cost));
    paths
}

/// Shared edges relative to the smaller set.
fn overlap(a: &FxHashSet<EdgeId>, b: &FxHashSet<EdgeId>) -> f64 {
    let smaller = a.len().min(b.len());
    if smaller == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / smaller as f64
}

/// Edges of `path` inside the central `percent` of its length.
fn middle_edges(view: NetworkView<'_>, path: &Path, percent: f64, mode: WindowEdges) -> Vec<EdgeId> {
    let mut lengths: Vec<f64> = path.edges.iter().map(|&e| view.edge_length(e)).collect();
    let mut total: f64 = lengths.iter().sum();
    if total <= 0.0 {
        lengths = vec![1.0; path.edges.len()];
        total = path.edges.len() as f64;
    }

    let half = percent / 200.0;
    let (lo, hi) = (0.5 - half, 0.5 + half);

    let mut out = Vec::new();
    let mut median = None;
    let mut at = 0.0;
    for (&e, &len) in path.edges.iter().zip(&lengths) {
        let start = at / total;
        at += len;
        let end = at / total;
        if median.is_none() && end >= 0.5 {
            median = Some(e);
        }
        let hit = match mode {
            WindowEdges::Overlapping => start <= hi && end >= lo,
            WindowEdges::Contained   => start >= lo && end <= hi,
        };
        if hit {
            out.push(e);
        }
    }
    if let Some(m) = median.or(path.edges.last().copied()) {
        if !out.contains(&m) {
            out.push(m);
        }
    }
    out
}

// ── Batch API ─────────────────────────────────────────────────────────────────

/// Route rows for one origin–destination pair.
fn pair_rows(
    view:   NetworkView<'_>,
    space:  &mut SearchSpace,
    origin: &Endpoint,
    dest:   &Endpoint,
    opts:   &KRoutesOptions,
) -> Vec<RouteRow> {
    if origin.coord == dest.coord {
        return vec![RouteRow {
            origin:      origin.id,
            destination: dest.id,
            rank:        1,
            cost:        0.0,
            geometry:    MultiLineString::new(Vec::new()),
            lines:       Vec::new(),
        }];
    }
    k_paths(view, space, origin.node, dest.node, opts)
        .into_iter()
        .enumerate()
        .map(|(i, path)| {
            let mut lines: Vec<LineId> = path.edges.iter().map(|&e| view.edge_line(e)).collect();
            lines.dedup();
            RouteRow {
                origin:      origin.id,
                destination: dest.id,
                rank:        i + 1,
                cost:        path.cost + origin.connector + dest.connector,
                geometry:    path.geometry(view),
                lines,
            }
        })
        .collect()
}

impl NetworkAnalysis {
    /// The cheapest route for every origin–destination pair (or row-wise
    /// pairs).  Pairs without a path produce no row.
    pub fn route(
        &mut self,
        origins:      &[(PointId, Coord<f64>)],
        destinations: &[(PointId, Coord<f64>)],
        rowwise:      bool,
    ) -> NaResult<AnalysisOutput<RouteRow>> {
        let opts = KRoutesOptions::new(1, 0.0).rowwise(rowwise);
        self.run_routes(Method::Route, origins, destinations, &opts)
    }

    /// Up to `k` distinct routes per pair, ranked 1.. by ascending cost.
    ///
    /// Returning fewer than `k` routes, or none for an unreachable pair, is a
    /// normal outcome.
    ///
    /// # Errors
    ///
    /// [`NaError::Config`] for invalid options or unequal row-wise inputs.
    pub fn k_routes(
        &mut self,
        origins:      &[(PointId, Coord<f64>)],
        destinations: &[(PointId, Coord<f64>)],
        opts:         &KRoutesOptions,
    ) -> NaResult<AnalysisOutput<RouteRow>> {
        self.run_routes(Method::KRoutes, origins, destinations, opts)
    }

    fn run_routes(
        &mut self,
        method:       Method,
        origins:      &[(PointId, Coord<f64>)],
        destinations: &[(PointId, Coord<f64>)],
        opts:         &KRoutesOptions,
    ) -> NaResult<AnalysisOutput<RouteRow>> {
        opts.validate()?;
        check_rowwise(opts.rowwise, origins, destinations)?;

        let mut record = RunRecord::new(method, origins.len(), destinations.len());
        record.rowwise = opts.rowwise;
        let started = self.start(&record);

        let network = self.shared_network();
        let prepared = Prepared::new(&network, self.rules(), origins, destinations);
        let view = prepared.view(&network);

        let results = self.run_each(&prepared.origins, |space, origin| {
            let mut rows = Vec::new();
            let mut pairs = 0usize;
            let mut missing = 0usize;
            for dest in prepared.targets_for(origin, opts.rowwise) {
                pairs += 1;
                let found = pair_rows(view, space, origin, dest, opts);
                if found.is_empty() {
                    missing += 1;
                }
                rows.extend(found);
            }
            (rows, pairs, missing)
        });

        let Prepared { origins: snapped, failures, .. } = prepared;
        let (per_origin, incomplete) = self.collect(&snapped, results);

        let mut rows = Vec::new();
        let (mut pairs, mut missing) = (0, 0);
        for (r, p, m) in per_origin {
            rows.extend(r);
            pairs += p;
            missing += m;
        }

        record.failures = failures.len();
        record.incomplete = incomplete.len();
        record.percent_missing = percent(missing, pairs);
        record.mean_cost = mean(rows.iter().map(|r: &RouteRow| r.cost));
        self.finish(record, started);

        Ok(AnalysisOutput { rows, failures, incomplete })
    }
}
