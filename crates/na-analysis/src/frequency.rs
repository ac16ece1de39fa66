//! Per-edge usage across a batch of shortest paths.
//!
//! Each origin group runs one search; every reachable pair then walks its
//! path and credits each traversed base edge once with the pair's weight.
//! Per-origin contributions are computed independently (in parallel with the
//! `parallel` feature) and merged in origin order, so floating-point sums do
//! not depend on thread scheduling.

use geo::Coord;
use rustc_hash::{FxHashMap, FxHashSet};

use na_core::{EdgeId, NaError, NaResult, NodeId, PointId};
use na_network::NetworkView;
use na_route::SearchOptions;

use crate::prepare::{check_rowwise, Prepared};
use crate::runlog::{mean, percent};
use crate::{AnalysisOutput, FrequencyRow, Method, NetworkAnalysis, RunRecord};

// ── OdWeights ─────────────────────────────────────────────────────────────────

/// Weight per origin–destination pair, with a default for pairs not listed.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OdWeights {
    weights: FxHashMap<(PointId, PointId), f64>,
    default: f64,
}

impl Default for OdWeights {
    /// Every pair weighs 1.
    fn default() -> Self {
        Self { weights: FxHashMap::default(), default: 1.0 }
    }
}

impl OdWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Weight of pairs that are not listed.
    pub fn with_default(mut self, weight: f64) -> Self {
        self.default = weight;
        self
    }

    pub fn insert(&mut self, origin: PointId, destination: PointId, weight: f64) {
        self.weights.insert((origin, destination), weight);
    }

    #[inline]
    pub fn get(&self, origin: PointId, destination: PointId) -> f64 {
        self.weights.get(&(origin, destination)).copied().unwrap_or(self.default)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    fn validate(
        &self,
        origins:      &[(PointId, Coord<f64>)],
        destinations: &[(PointId, Coord<f64>)],
    ) -> NaResult<()> {
        let bad = |w: f64| !w.is_finite() || w < 0.0;
        if bad(self.default) {
            return Err(NaError::Config(format!(
                "default pair weight must be a non-negative number, got {}",
                self.default
            )));
        }
        if let Some(((o, d), w)) = self.weights.iter().find(|(_, w)| bad(**w)) {
            return Err(NaError::Config(format!(
                "weight of pair ({o}, {d}) must be a non-negative number, got {w}"
            )));
        }
        if self.weights.is_empty() {
            return Ok(());
        }
        let o_ids: FxHashSet<PointId> = origins.iter().map(|(id, _)| *id).collect();
        let d_ids: FxHashSet<PointId> = destinations.iter().map(|(id, _)| *id).collect();
        if !self.weights.keys().any(|(o, d)| o_ids.contains(o) && d_ids.contains(d)) {
            return Err(NaError::Config(
                "no pair in the weight table matches the supplied origins and destinations".into(),
            ));
        }
        Ok(())
    }
}

impl FromIterator<((PointId, PointId), f64)> for OdWeights {
    fn from_iter<T: IntoIterator<Item = ((PointId, PointId), f64)>>(iter: T) -> Self {
        Self { weights: iter.into_iter().collect(), default: 1.0 }
    }
}

/// Options for [`NetworkAnalysis::route_frequencies`].
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrequencyOptions {
    pub rowwise: bool,
    pub weights: OdWeights,
}

impl FrequencyOptions {
    pub fn rowwise(mut self, rowwise: bool) -> Self {
        self.rowwise = rowwise;
        self
    }

    pub fn weights(mut self, weights: OdWeights) -> Self {
        self.weights = weights;
        self
    }
}

// ── Accumulation ──────────────────────────────────────────────────────────────

/// What one origin adds: `(edge, weight)` credits plus pair counts and path costs.
#[derive(Default)]
struct Contribution {
    credits: Vec<(EdgeId, f64)>,
    pairs:   usize,
    missing: usize,
    costs:   Vec<f64>,
}

/// The row key of an edge: its base edge, folded onto the lower id of the
/// two directions when the network is undirected.
fn row_key(view: NetworkView<'_>, edge: EdgeId) -> EdgeId {
    let base = view.base_edge(edge);
    if view.network.is_directed() {
        return base;
    }
    view.network.twin(base).map_or(base, |t| t.min(base))
}

impl NetworkAnalysis {
    /// How often each edge is used by the shortest paths between all
    /// origin–destination pairs (or row-wise pairs).
    ///
    /// Rows cover only visited edges and are sorted by ascending frequency,
    /// ties by edge id.
    ///
    /// # Errors
    ///
    /// [`NaError::Config`] for unequal row-wise inputs, negative or
    /// non-finite weights, or a weight table that matches none of the pairs.
    pub fn route_frequencies(
        &mut self,
        origins:      &[(PointId, Coord<f64>)],
        destinations: &[(PointId, Coord<f64>)],
        opts:         &FrequencyOptions,
    ) -> NaResult<AnalysisOutput<FrequencyRow>> {
        check_rowwise(opts.rowwise, origins, destinations)?;
        opts.weights.validate(origins, destinations)?;

        let mut record = RunRecord::new(Method::RouteFrequencies, origins.len(), destinations.len());
        record.rowwise = opts.rowwise;
        let started = self.start(&record);

        let network = self.shared_network();
        let prepared = Prepared::new(&network, self.rules(), origins, destinations);
        let view = prepared.view(&network);
        let groups = prepared.origin_groups();

        let results = self.run_grouped(&groups, prepared.origins.len(), |space, members| {
            let mut targets: Vec<NodeId> = members
                .iter()
                .flat_map(|&m| prepared.targets_for(&prepared.origins[m], opts.rowwise))
                .map(|d| d.node)
                .collect();
            targets.sort_unstable();
            targets.dedup();
            space.run(view, prepared.origins[members[0]].node, &SearchOptions::targets(&targets));

            members
                .iter()
                .map(|&m| {
                    let origin = &prepared.origins[m];
                    let mut c = Contribution::default();
                    for dest in prepared.targets_for(origin, opts.rowwise) {
                        c.pairs += 1;
                        let Some(path) = space.path(view, dest.node) else {
                            c.missing += 1;
                            continue;
                        };
                        c.costs.push(path.cost + origin.connector + dest.connector);
                        let weight = opts.weights.get(origin.id, dest.id);
                        let mut keys: Vec<EdgeId> = path.edges.iter().map(|&e| row_key(view, e)).collect();
                        keys.sort_unstable();
                        keys.dedup();
                        c.credits.extend(keys.into_iter().map(|k| (k, weight)));
                    }
                    c
                })
                .collect()
        });

        let Prepared { origins: snapped, failures, .. } = prepared;
        let (per_origin, incomplete) = self.collect(&snapped, results);

        let mut totals: FxHashMap<EdgeId, (f64, u64)> = FxHashMap::default();
        let (mut pairs, mut missing) = (0, 0);
        let mut costs = Vec::new();
        for c in per_origin {
            for (edge, weight) in c.credits {
                let slot = totals.entry(edge).or_insert((0.0, 0));
                slot.0 += weight;
                slot.1 += 1;
            }
            pairs += c.pairs;
            missing += c.missing;
            costs.extend(c.costs);
        }

        let net = self.network();
        let mut rows: Vec<FrequencyRow> = totals
            .into_iter()
            .map(|(edge, (frequency, visits))| FrequencyRow {
                edge,
                line: net.edge_line[edge.index()],
                source: net.edge_from[edge.index()],
                target: net.edge_to[edge.index()],
                frequency,
                visits,
                geometry: net.edge_geometry(edge),
            })
            .collect();
        rows.sort_by(|a, b| a.frequency.total_cmp(&b.frequency).then(a.edge.cmp(&b.edge)));

        record.failures = failures.len();
        record.incomplete = incomplete.len();
        record.percent_missing = percent(missing, pairs);
        record.mean_cost = mean(costs.into_iter());
        self.finish(record, started);

        Ok(AnalysisOutput { rows, failures, incomplete })
    }
}
