//! `square`: runs every analysis once on a synthetic downtown grid and
//! prints the results as CSV on stdout.
//!
//! Set `RUST_LOG=info` (or `debug`) to see build summaries and run timings.

mod network;

use std::io;
use std::sync::Arc;

use anyhow::Result;
use geo::Coord;
use log::info;

use na_analysis::{
    CostMatrixOptions, FrequencyOptions, KRoutesOptions, NetworkAnalysis, OdWeights,
    ServiceAreaOptions,
};
use na_core::{ConnectorCost, PointId, Rules};
use na_network::NetworkBuilder;

use network::{build_grid, SIZE, SPACING};

// ── Constants ─────────────────────────────────────────────────────────────────

const K:                   usize = 3;
const DROP_MIDDLE_PERCENT: f64   = 50.0;
const BREAKS:              [f64; 3] = [0.5, 1.0, 2.0]; // minutes
const WALK_KMH:            f64   = 5.0;

fn point(id: u64, x: f64, y: f64) -> (PointId, Coord<f64>) {
    (PointId(id), Coord { x, y })
}

fn main() -> Result<()> {
    env_logger::init();

    // ── Network ───────────────────────────────────────────────────────────
    // Points are reached on foot from the nearest street.
    let rules = Rules::new("minutes")
        .connector_cost(ConnectorCost::Speed { kmh: WALK_KMH })
        .directed(true)
        .search_tolerance(30.0)
        .search_factor(0.5)
        .split_lines(true);

    let mut builder = NetworkBuilder::new(&rules).remove_isolated(true);
    builder.extend(build_grid());
    let network = Arc::new(builder.build()?);
    info!(
        "grid: {} nodes, {} edges, {:.0}% two-way",
        network.node_count(),
        network.edge_count(),
        network.percent_bidirectional()
    );

    let mut nwa = NetworkAnalysis::new(Arc::clone(&network), rules)?;

    // Points sit a little off the streets, as addresses do.
    let far = (SIZE - 1) as f64 * SPACING;
    let origins = [point(1, 12.0, 8.0), point(2, 240.0, 106.0)];
    let destinations = [point(10, far - 9.0, far - 14.0), point(11, 355.0, 6.0), point(12, 1e6, 1e6)];

    let mut out = csv::Writer::from_writer(io::stdout());

    // ── Cost matrix ───────────────────────────────────────────────────────
    let matrix = nwa.od_cost_matrix(&origins, &destinations, &CostMatrixOptions::default())?;
    out.write_record(["analysis", "origin", "destination", "value", "detail"])?;
    for row in &matrix.rows {
        out.write_record([
            "cost".to_string(),
            row.origin.0.to_string(),
            row.destination.0.to_string(),
            row.cost.map_or_else(|| "unreachable".to_string(), |c| format!("{c:.3}")),
            String::new(),
        ])?;
    }
    for failure in &matrix.failures {
        out.write_record([
            "snap_failure".to_string(),
            failure.point.0.to_string(),
            String::new(),
            String::new(),
            failure.error.to_string(),
        ])?;
    }

    // ── k-routes ──────────────────────────────────────────────────────────
    let routes = nwa.k_routes(
        &origins[..1],
        &destinations[..1],
        &KRoutesOptions::new(K, DROP_MIDDLE_PERCENT),
    )?;
    for row in &routes.rows {
        out.write_record([
            format!("route_{}", row.rank),
            row.origin.0.to_string(),
            row.destination.0.to_string(),
            format!("{:.3}", row.cost),
            format!("{} lines", row.lines.len()),
        ])?;
    }

    // ── Service area ──────────────────────────────────────────────────────
    let areas = nwa.service_area(&origins, &BREAKS, &ServiceAreaOptions::default().precise(true))?;
    for row in &areas.rows {
        out.write_record([
            "service_area".to_string(),
            row.origin.0.to_string(),
            String::new(),
            row.break_value.to_string(),
            format!("{} pieces", row.geometry.0.len()),
        ])?;
    }

    // ── Route frequencies ─────────────────────────────────────────────────
    let mut weights = OdWeights::new();
    weights.insert(PointId(1), PointId(10), 5.0);
    let freq = nwa.route_frequencies(
        &origins,
        &destinations[..2],
        &FrequencyOptions::default().weights(weights),
    )?;
    for row in freq.rows.iter().rev().take(5) {
        out.write_record([
            "frequency".to_string(),
            row.source.0.to_string(),
            row.target.0.to_string(),
            row.frequency.to_string(),
            format!("{} visits", row.visits),
        ])?;
    }
    out.flush()?;

    // ── Run log ───────────────────────────────────────────────────────────
    for record in nwa.log() {
        info!(
            "{}: {:.2?}, {:.1}% missing, mean cost {:?}",
            record.method, record.elapsed, record.percent_missing, record.mean_cost
        );
    }

    Ok(())
}
