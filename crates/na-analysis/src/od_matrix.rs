//! Many-to-many shortest-path costs.
//!
//! One search runs per distinct origin node, stopping once every requested
//! destination node is settled (or the cutoff is passed).  Origins that snap
//! to the same node share that search.

use geo::{Coord, Line};

use na_core::{NaError, NaResult, NodeId, PointId};
use na_route::SearchOptions;

use crate::prepare::{check_rowwise, Prepared};
use crate::runlog::{mean, percent};
use crate::{AnalysisOutput, CostRow, Method, NetworkAnalysis, RunRecord};

/// Options for [`NetworkAnalysis::od_cost_matrix`].
///
/// | Field               | Default |
/// |---------------------|---------|
/// | `rowwise`           | `false` |
/// | `lines`             | `false` |
/// | `cutoff`            | `None`  |
/// | `destination_count` | `None`  |
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CostMatrixOptions {
    /// Pair origin `i` with destination `i` only.
    pub rowwise:           bool,
    /// Attach a straight origin–destination line to every row.
    pub lines:             bool,
    /// Drop rows whose cost is at or above this value, and rows without a path.
    pub cutoff:            Option<f64>,
    /// Keep only the `n` cheapest reachable destinations per origin.
    pub destination_count: Option<usize>,
}

impl CostMatrixOptions {
    pub fn rowwise(mut self, rowwise: bool) -> Self {
        self.rowwise = rowwise;
        self
    }

    pub fn lines(mut self, lines: bool) -> Self {
        self.lines = lines;
        self
    }

    pub fn cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = Some(cutoff);
        self
    }

    pub fn destination_count(mut self, n: usize) -> Self {
        self.destination_count = Some(n);
        self
    }

    fn validate(&self) -> NaResult<()> {
        if let Some(c) = self.cutoff {
            if !c.is_finite() || c < 0.0 {
                return Err(NaError::Config(format!("cutoff must be a non-negative number, got {c}")));
            }
        }
        if self.destination_count == Some(0) {
            return Err(NaError::Config("destination_count must be at least 1".into()));
        }
        Ok(())
    }
}

impl NetworkAnalysis {
    /// Cost from every origin to every destination (or row-wise pairs).
    ///
    /// Rows come grouped by origin in input order, destinations in input
    /// order, except that `destination_count` orders each origin's rows by
    /// ascending cost.  Pairs without a path get `cost: None` unless
    /// `cutoff` or `destination_count` filters them out.  Origin and
    /// destination at identical coordinates cost exactly 0.
    ///
    /// # Errors
    ///
    /// [`NaError::Config`] for invalid options, or unequal input lengths when
    /// `rowwise`.  Unsnappable points are reported in
    /// [`AnalysisOutput::failures`], not as an error.
    pub fn od_cost_matrix(
        &mut self,
        origins:      &[(PointId, Coord<f64>)],
        destinations: &[(PointId, Coord<f64>)],
        opts:         &CostMatrixOptions,
    ) -> NaResult<AnalysisOutput<CostRow>> {
        opts.validate()?;
        check_rowwise(opts.rowwise, origins, destinations)?;

        let mut record = RunRecord::new(Method::OdCostMatrix, origins.len(), destinations.len());
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

            let source = prepared.origins[members[0]].node;
            space.run(view, source, &SearchOptions { targets: Some(&targets), cutoff: opts.cutoff });

            members
                .iter()
                .map(|&m| {
                    let origin = &prepared.origins[m];
                    let mut rows: Vec<CostRow> = prepared
                        .targets_for(origin, opts.rowwise)
                        .into_iter()
                        .map(|dest| CostRow {
                            origin:      origin.id,
                            destination: dest.id,
                            cost:        if origin.coord == dest.coord {
                                Some(0.0)
                            } else {
                                space.cost(dest.node).map(|c| c + origin.connector + dest.connector)
                            },
                            line:        opts.lines.then(|| Line::new(origin.coord, dest.coord)),
                        })
                        .collect();

                    if let Some(cutoff) = opts.cutoff {
                        rows.retain(|r| r.cost.is_some_and(|c| c < cutoff));
                    }
                    if let Some(n) = opts.destination_count {
                        rows.retain(|r| r.cost.is_some());
                        rows.sort_by(|a, b| cost_of(a).total_cmp(&cost_of(b)));
                        rows.truncate(n);
                    }
                    rows
                })
                .collect()
        });

        let Prepared { origins: snapped, failures, .. } = prepared;
        let (per_origin, incomplete) = self.collect(&snapped, results);
        let rows: Vec<CostRow> = per_origin.into_iter().flatten().collect();

        record.failures = failures.len();
        record.incomplete = incomplete.len();
        record.percent_missing = percent(rows.iter().filter(|r| r.cost.is_none()).count(), rows.len());
        record.mean_cost = mean(rows.iter().filter_map(|r| r.cost));
        self.finish(record, started);

        Ok(AnalysisOutput { rows, failures, incomplete })
    }
}

#[inline]
fn cost_of(row: &CostRow) -> f64 {
    row.cost.unwrap_or(f64::INFINITY)
}
