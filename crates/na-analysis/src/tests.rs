//! Unit tests for na-analysis.
//!
//! Networks are hand-built squares, grids and stars so every expected cost
//! can be worked out on paper.

#[cfg(test)]
mod helpers {
    use geo::{Coord, LineString};

    use na_core::{NaResult, PointId, Rules};
    use na_network::{LineDirection, LineRecord};

    use crate::NetworkAnalysis;

    pub fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    pub fn line(a: (f64, f64), b: (f64, f64), weight: f64) -> LineRecord {
        LineRecord::new(LineString::new(vec![c(a.0, a.1), c(b.0, b.1)])).with_attr("cost", weight)
    }

    pub fn rules() -> Rules {
        Rules::new("cost").search_tolerance(5.0)
    }

    pub const A: (f64, f64) = (0.0, 0.0);
    pub const B: (f64, f64) = (10.0, 0.0);
    pub const C: (f64, f64) = (10.0, 10.0);
    pub const D: (f64, f64) = (0.0, 10.0);

    /// Unit square A–B–C–D with unit weights; lines 0..4 in that order.
    pub fn square_lines() -> Vec<LineRecord> {
        vec![line(A, B, 1.0), line(B, C, 1.0), line(C, D, 1.0), line(D, A, 1.0)]
    }

    pub fn square(rules: Rules) -> NetworkAnalysis {
        NetworkAnalysis::from_lines(square_lines(), rules).unwrap()
    }

    /// The same square with one minute per side under a `minutes` attribute.
    pub fn minutes_square(rules: Rules) -> NaResult<NetworkAnalysis> {
        let lines = [(A, B), (B, C), (C, D), (D, A)].map(|(a, b)| {
            LineRecord::new(LineString::new(vec![c(a.0, a.1), c(b.0, b.1)])).with_attr("minutes", 1.0)
        });
        NetworkAnalysis::from_lines(lines, rules)
    }

    /// 3 × 3 grid of nodes 10 apart, unit weights.
    pub fn grid() -> NetworkAnalysis {
        let mut lines = Vec::new();
        for i in 0..3 {
            for j in 0..2 {
                let (x, y0, y1) = (i as f64 * 10.0, j as f64 * 10.0, (j + 1) as f64 * 10.0);
                lines.push(line((x, y0), (x, y1), 1.0));
                lines.push(line((y0, x), (y1, x), 1.0));
            }
        }
        NetworkAnalysis::from_lines(lines, rules()).unwrap()
    }

    /// Hub at the origin with spokes to (10,0), (0,10) and (-10,0).
    pub fn star() -> NetworkAnalysis {
        let hub = (0.0, 0.0);
        NetworkAnalysis::from_lines(
            vec![
                line(hub, (10.0, 0.0), 1.0),
                line(hub, (0.0, 10.0), 1.0),
                line(hub, (-10.0, 0.0), 1.0),
            ],
            rules(),
        )
        .unwrap()
    }

    /// Two lines in a row; the first may only be travelled from A to B.
    pub fn one_way() -> NetworkAnalysis {
        NetworkAnalysis::from_lines(
            vec![
                line(A, B, 1.0).with_direction(LineDirection::Forward),
                line(B, (20.0, 0.0), 1.0),
            ],
            rules().directed(true),
        )
        .unwrap()
    }

    pub fn pt(id: u64, p: (f64, f64)) -> (PointId, Coord<f64>) {
        (PointId(id), c(p.0, p.1))
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod session {
    use std::sync::Arc;

    use na_core::{NaError, Rules};
    use na_network::NetworkBuilder;

    use super::helpers::{rules, square_lines};
    use crate::NetworkAnalysis;

    #[test]
    fn rejects_invalid_rules() {
        let result = NetworkAnalysis::from_lines(square_lines(), Rules::new(""));
        assert!(matches!(result, Err(NaError::Config(_))));
    }

    #[test]
    fn rejects_directedness_mismatch() {
        let r = rules();
        let mut b = NetworkBuilder::new(&r);
        b.extend(square_lines());
        let net = Arc::new(b.build().unwrap());
        let result = NetworkAnalysis::new(net, rules().directed(true));
        assert!(matches!(result, Err(NaError::Config(_))));
    }

    #[test]
    fn invalid_network_is_fatal() {
        let result = NetworkAnalysis::from_lines(square_lines(), Rules::new("minutes"));
        let err = result.err().unwrap();
        assert!(matches!(err, NaError::InvalidNetwork(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn sessions_share_one_network() {
        let first = super::helpers::square(rules());
        let second = NetworkAnalysis::new(first.shared_network(), rules()).unwrap();
        assert_eq!(second.network().edge_count(), 8);
    }
}

// ── Cost matrix ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod od_matrix {
    use na_core::{ConnectorCost, NaError, PointId, Rules};

    use super::helpers::{c, minutes_square, one_way, pt, rules, square, A, B, C, D};
    use crate::{CostMatrixOptions, Method};

    #[test]
    fn square_corner_to_corner() {
        let mut nwa = square(rules());
        let out = nwa
            .od_cost_matrix(&[pt(1, A)], &[pt(2, C)], &CostMatrixOptions::default())
            .unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].cost, Some(2.0));
        assert!(out.is_complete());
    }

    #[test]
    fn all_pairs_in_input_order_with_zero_diagonal() {
        let mut nwa = square(rules());
        let points = [pt(1, A), pt(2, (3.0, 1.0)), pt(3, C)];
        let out = nwa.od_cost_matrix(&points, &points, &CostMatrixOptions::default()).unwrap();
        assert_eq!(out.rows.len(), 9);
        let order: Vec<(u64, u64)> = out.rows.iter().map(|r| (r.origin.0, r.destination.0)).collect();
        assert_eq!(order[..3], [(1, 1), (1, 2), (1, 3)]);
        for r in &out.rows {
            if r.origin == r.destination {
                assert_eq!(r.cost, Some(0.0));
            } else {
                assert!(r.cost.unwrap() > 0.0);
            }
        }
    }

    #[test]
    fn split_point_adds_connector() {
        let mut nwa = square(rules().split_lines(true));
        let out = nwa
            .od_cost_matrix(&[pt(1, (5.0, -1.0))], &[pt(2, C)], &CostMatrixOptions::default())
            .unwrap();
        let cost = out.rows[0].cost.unwrap();
        assert!((cost - 2.5).abs() < 1e-9, "cost = {cost}");
    }

    #[test]
    fn free_connectors_cost_nothing() {
        let mut nwa = square(rules().split_lines(true).connector_cost(ConnectorCost::Free));
        let out = nwa
            .od_cost_matrix(&[pt(1, (5.0, -1.0))], &[pt(2, C)], &CostMatrixOptions::default())
            .unwrap();
        assert!((out.rows[0].cost.unwrap() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn splits_do_not_leak_between_calls() {
        let mut nwa = square(rules().split_lines(true));
        let edges = nwa.network().edge_count();
        nwa.od_cost_matrix(&[pt(1, (5.0, -1.0))], &[pt(2, (10.0, 4.0))], &CostMatrixOptions::default())
            .unwrap();
        assert_eq!(nwa.network().edge_count(), edges);
        let out = nwa
            .od_cost_matrix(&[pt(1, A)], &[pt(2, B)], &CostMatrixOptions::default())
            .unwrap();
        assert_eq!(out.rows[0].cost, Some(1.0));
    }

    #[test]
    fn unreachable_pairs_have_no_cost() {
        let mut nwa = one_way();
        let out = nwa
            .od_cost_matrix(&[pt(1, B)], &[pt(2, A), pt(3, (20.0, 0.0))], &CostMatrixOptions::default())
            .unwrap();
        assert_eq!(out.rows[0].cost, None);
        assert_eq!(out.rows[1].cost, Some(1.0));
        assert_eq!(nwa.log()[0].percent_missing, 50.0);
    }

    #[test]
    fn directed_costs_differ_by_direction() {
        let mut nwa = one_way();
        let there = nwa
            .od_cost_matrix(&[pt(1, A)], &[pt(2, B)], &CostMatrixOptions::default())
            .unwrap();
        let back = nwa
            .od_cost_matrix(&[pt(2, B)], &[pt(1, A)], &CostMatrixOptions::default())
            .unwrap();
        assert_eq!(there.rows[0].cost, Some(1.0));
        assert_eq!(back.rows[0].cost, None);
    }

    #[test]
    fn undirected_costs_match_both_ways() {
        let mut nwa = square(rules());
        let pts = [pt(1, A), pt(2, B), pt(3, C), pt(4, (7.0, 10.5))];
        let out = nwa.od_cost_matrix(&pts, &pts, &CostMatrixOptions::default()).unwrap();
        for r in &out.rows {
            let mirror = out
                .rows
                .iter()
                .find(|m| m.origin == r.destination && m.destination == r.origin)
                .unwrap();
            assert_eq!(r.cost, mirror.cost);
        }
    }

    #[test]
    fn cutoff_drops_expensive_and_missing_rows() {
        let mut nwa = square(rules());
        let opts = CostMatrixOptions::default().cutoff(2.0);
        let out = nwa.od_cost_matrix(&[pt(1, A)], &[pt(2, B), pt(3, C), pt(4, D)], &opts).unwrap();
        let kept: Vec<PointId> = out.rows.iter().map(|r| r.destination).collect();
        assert_eq!(kept, vec![PointId(2), PointId(4)]);
    }

    #[test]
    fn destination_count_keeps_nearest() {
        let mut nwa = square(rules());
        let opts = CostMatrixOptions::default().destination_count(1);
        let out = nwa.od_cost_matrix(&[pt(1, A)], &[pt(3, C), pt(2, B)], &opts).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].destination, PointId(2));
    }

    #[test]
    fn straight_lines_on_request() {
        let mut nwa = square(rules());
        let opts = CostMatrixOptions::default().lines(true);
        let out = nwa.od_cost_matrix(&[pt(1, A)], &[pt(2, C)], &opts).unwrap();
        let line = out.rows[0].line.unwrap();
        assert_eq!((line.start, line.end), (c(0.0, 0.0), c(10.0, 10.0)));
    }

    #[test]
    fn rowwise_pairs_by_position() {
        let mut nwa = square(rules());
        let opts = CostMatrixOptions::default().rowwise(true);
        let out = nwa
            .od_cost_matrix(&[pt(1, A), pt(2, B)], &[pt(3, C), pt(4, D)], &opts)
            .unwrap();
        let pairs: Vec<(u64, u64)> = out.rows.iter().map(|r| (r.origin.0, r.destination.0)).collect();
        assert_eq!(pairs, vec![(1, 3), (2, 4)]);
        assert!(out.rows.iter().all(|r| r.cost == Some(2.0)));
    }

    #[test]
    fn rowwise_needs_equal_lengths() {
        let mut nwa = square(rules());
        let opts = CostMatrixOptions::default().rowwise(true);
        let err = nwa.od_cost_matrix(&[pt(1, A)], &[pt(2, B), pt(3, C)], &opts).unwrap_err();
        assert!(matches!(err, NaError::Config(_)));
    }

    #[test]
    fn unsnappable_points_are_reported_not_fatal() {
        let mut nwa = square(rules());
        let out = nwa
            .od_cost_matrix(&[pt(1, A), pt(9, (100.0, 100.0))], &[pt(2, C)], &CostMatrixOptions::default())
            .unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].point, PointId(9));
        assert!(matches!(out.failures[0].error, NaError::UnreachablePoint { .. }));
    }

    #[test]
    fn non_finite_points_are_reported_not_fatal() {
        let mut nwa = square(rules());
        let origins = [(PointId(1), c(f64::NAN, 0.0)), pt(2, A), (PointId(3), c(0.0, f64::INFINITY))];
        let out = nwa
            .od_cost_matrix(&origins, &[pt(4, C)], &CostMatrixOptions::default())
            .unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].cost, Some(2.0));
        let failed: Vec<PointId> = out.failures.iter().map(|f| f.point).collect();
        assert_eq!(failed, vec![PointId(1), PointId(3)]);
        assert!(out
            .failures
            .iter()
            .all(|f| matches!(f.error, NaError::UnreachablePoint { .. })));
    }

    #[test]
    fn minute_costs_get_free_connectors_by_default() {
        let minutes = || Rules::new("minutes").search_tolerance(5.0).split_lines(true);
        let from = [pt(1, (5.0, -1.0))];

        let mut nwa = minutes_square(minutes()).unwrap();
        let out = nwa.od_cost_matrix(&from, &[pt(2, C)], &CostMatrixOptions::default()).unwrap();
        let cost = out.rows[0].cost.unwrap();
        assert!((cost - 1.5).abs() < 1e-9, "cost = {cost}");

        // 0.6 km/h is 10 m a minute, so the 1 m connector takes 0.1 min.
        let mut walking = minutes_square(minutes().connector_cost(ConnectorCost::Speed { kmh: 0.6 })).unwrap();
        let out = walking.od_cost_matrix(&from, &[pt(2, C)], &CostMatrixOptions::default()).unwrap();
        let cost = out.rows[0].cost.unwrap();
        assert!((cost - 1.6).abs() < 1e-9, "cost = {cost}");
    }

    #[test]
    fn minute_costs_refuse_distance_connectors() {
        let rules = Rules::new("minutes").search_tolerance(5.0).connector_cost(ConnectorCost::Distance);
        let err = minutes_square(rules).err().unwrap();
        assert!(matches!(err, NaError::Config(_)));
    }

    #[test]
    fn tolerance_expansion_rescues_far_points() {
        let far = pt(1, (5.0, -6.0)); // 6 from line A–B, tolerance 5
        let mut strict = square(rules().split_lines(true));
        let out = strict.od_cost_matrix(&[far], &[pt(2, B)], &CostMatrixOptions::default()).unwrap();
        assert_eq!(out.failures.len(), 1);

        let mut expanding = square(rules().split_lines(true).search_factor(0.5));
        let out = expanding.od_cost_matrix(&[far], &[pt(2, B)], &CostMatrixOptions::default()).unwrap();
        assert!(out.failures.is_empty());
        assert!((out.rows[0].cost.unwrap() - 6.5).abs() < 1e-9);
    }

    #[test]
    fn run_is_logged() {
        let mut nwa = square(rules());
        nwa.od_cost_matrix(&[pt(1, A)], &[pt(2, B), pt(3, C)], &CostMatrixOptions::default())
            .unwrap();
        let rec = &nwa.log()[0];
        assert_eq!(rec.method, Method::OdCostMatrix);
        assert_eq!((rec.origins, rec.destinations), (1, 2));
        assert_eq!(rec.mean_cost, Some(1.5));
        assert_eq!(rec.percent_missing, 0.0);
        nwa.clear_log();
        assert!(nwa.log().is_empty());
    }

    #[test]
    fn repeated_runs_are_identical() {
        let mut nwa = square(rules().split_lines(true));
        let pts = [pt(1, A), pt(2, (3.0, 1.0)), pt(3, (9.0, 6.0)), pt(4, D)];
        let first = nwa.od_cost_matrix(&pts, &pts, &CostMatrixOptions::default()).unwrap();
        let second = nwa.od_cost_matrix(&pts, &pts, &CostMatrixOptions::default()).unwrap();
        assert_eq!(first, second);
    }
}

// ── Routes ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod routes {
    use na_core::{LineId, NaError};

    use super::helpers::{grid, one_way, pt, rules, square, A, B, C};
    use crate::{k_paths, KRoutesOptions, Method, WindowEdges};

    #[test]
    fn single_route_with_geometry() {
        let mut nwa = square(rules());
        let out = nwa.route(&[pt(1, A)], &[pt(2, C)], false).unwrap();
        assert_eq!(out.rows.len(), 1);
        let row = &out.rows[0];
        assert_eq!((row.rank, row.cost), (1, 2.0));
        assert_eq!(row.geometry.0.len(), 2);
        assert_eq!(row.lines, vec![LineId(0), LineId(1)]);
        assert_eq!(nwa.log()[0].method, Method::Route);
    }

    #[test]
    fn square_has_two_equal_routes() {
        let mut nwa = square(rules());
        let out = nwa.k_routes(&[pt(1, A)], &[pt(2, C)], &KRoutesOptions::new(2, 0.0)).unwrap();
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows.iter().map(|r| r.rank).collect::<Vec<_>>(), vec![1, 2]);
        assert!(out.rows.iter().all(|r| r.cost == 2.0));
        assert_eq!(out.rows[0].lines, vec![LineId(0), LineId(1)]);
        assert_eq!(out.rows[1].lines, vec![LineId(3), LineId(2)]);
    }

    #[test]
    fn fewer_routes_when_alternatives_run_out() {
        let mut nwa = square(rules());
        let out = nwa.k_routes(&[pt(1, A)], &[pt(2, C)], &KRoutesOptions::new(5, 0.0)).unwrap();
        assert_eq!(out.rows.len(), 2);
    }

    #[test]
    fn contained_window_still_progresses() {
        let mut nwa = square(rules());
        let opts = KRoutesOptions::new(2, 0.0).window_edges(WindowEdges::Contained);
        let out = nwa.k_routes(&[pt(1, A)], &[pt(2, C)], &opts).unwrap();
        assert_eq!(out.rows.len(), 2);
    }

    #[test]
    fn grid_routes_are_ranked_and_distinct() {
        let mut nwa = grid();
        let opts = KRoutesOptions::new(4, 10.0);
        let out = nwa.k_routes(&[pt(1, (0.0, 0.0))], &[pt(2, (20.0, 20.0))], &opts).unwrap();
        assert!(!out.rows.is_empty() && out.rows.len() <= 4);
        for w in out.rows.windows(2) {
            assert!(w[0].cost <= w[1].cost);
            assert_eq!(w[1].rank, w[0].rank + 1);
        }
        for (i, a) in out.rows.iter().enumerate() {
            for b in &out.rows[i + 1..] {
                let shared = a.lines.iter().filter(|l| b.lines.contains(l)).count();
                let share = shared as f64 / a.lines.len().min(b.lines.len()) as f64;
                assert!(share <= opts.max_overlap);
            }
        }
    }

    #[test]
    fn dropping_whole_route_leaves_fewer_alternatives() {
        let mut nwa = grid();
        let few = nwa
            .k_routes(&[pt(1, (0.0, 0.0))], &[pt(2, (20.0, 20.0))], &KRoutesOptions::new(10, 100.0))
            .unwrap();
        let many = nwa
            .k_routes(&[pt(1, (0.0, 0.0))], &[pt(2, (20.0, 20.0))], &KRoutesOptions::new(10, 0.0))
            .unwrap();
        assert!(few.rows.len() <= many.rows.len());
        assert!(few.rows.len() >= 1);
    }

    #[test]
    fn identical_points_give_one_free_route() {
        let mut nwa = square(rules());
        let p = pt(1, (4.0, 1.0));
        let out = nwa.k_routes(&[p], &[p], &KRoutesOptions::new(3, 10.0)).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].cost, 0.0);
    }

    #[test]
    fn unreachable_pair_has_no_rows() {
        let mut nwa = one_way();
        let out = nwa.route(&[pt(1, B)], &[pt(2, A)], false).unwrap();
        assert!(out.rows.is_empty());
        assert_eq!(nwa.log()[0].percent_missing, 100.0);
    }

    #[test]
    fn options_are_validated() {
        let mut nwa = square(rules());
        for opts in [
            KRoutesOptions::new(0, 10.0),
            KRoutesOptions::new(2, 150.0),
            KRoutesOptions::new(2, 10.0).max_overlap(1.5),
            KRoutesOptions::new(2, 10.0).max_attempts(0),
        ] {
            let err = nwa.k_routes(&[pt(1, A)], &[pt(2, C)], &opts).unwrap_err();
            assert!(matches!(err, NaError::Config(_)));
        }
    }

    #[test]
    fn k_paths_on_a_plain_view() {
        let nwa = square(rules());
        let view = na_network::NetworkView::new(nwa.network());
        let mut space = na_route::SearchSpace::new();
        let paths = k_paths(view, &mut space, na_core::NodeId(0), na_core::NodeId(2), &KRoutesOptions::new(2, 0.0));
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.cost == 2.0));
    }
}

// ── Service area ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod service_area {
    use na_core::geometry::line_length;
    use na_core::{LineId, NaError};

    use super::helpers::{grid, pt, rules, square, A};
    use crate::ServiceAreaOptions;

    fn lines_per_break(rows: &[crate::ServiceAreaRow], b: f64) -> Vec<LineId> {
        rows.iter().filter(|r| r.break_value == b).filter_map(|r| r.line).collect()
    }

    #[test]
    fn square_bands() {
        let mut nwa = square(rules());
        let opts = ServiceAreaOptions::default().dissolve(false);
        let out = nwa.service_area(&[pt(1, A)], &[1.0, 2.0], &opts).unwrap();
        assert_eq!(lines_per_break(&out.rows, 1.0), vec![LineId(0), LineId(3)]);
        assert_eq!(
            lines_per_break(&out.rows, 2.0),
            vec![LineId(0), LineId(1), LineId(2), LineId(3)]
        );
    }

    #[test]
    fn dissolved_rows_one_per_break() {
        let mut nwa = square(rules());
        let out = nwa
            .service_area(&[pt(1, A)], &[2.0, 1.0], &ServiceAreaOptions::default())
            .unwrap();
        let breaks: Vec<f64> = out.rows.iter().map(|r| r.break_value).collect();
        assert_eq!(breaks, vec![1.0, 2.0]);
        assert_eq!(out.rows[0].geometry.0.len(), 2);
        assert_eq!(out.rows[1].geometry.0.len(), 4);
        assert_eq!(nwa.log()[0].breaks, vec![1.0, 2.0]);
    }

    #[test]
    fn bands_are_nested() {
        let mut nwa = grid();
        let breaks = [0.5, 1.0, 2.0, 3.0];
        let opts = ServiceAreaOptions::default().dissolve(false);
        let out = nwa.service_area(&[pt(1, (10.0, 0.0))], &breaks, &opts).unwrap();
        for w in breaks.windows(2) {
            let inner = lines_per_break(&out.rows, w[0]);
            let outer = lines_per_break(&out.rows, w[1]);
            assert!(inner.iter().all(|l| outer.contains(l)));
        }
    }

    #[test]
    fn nothing_reached_still_reports_each_break() {
        let mut nwa = square(rules());
        let opts = ServiceAreaOptions::default().dissolve(false);
        let out = nwa.service_area(&[pt(1, A)], &[0.5], &opts).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert!(out.rows[0].geometry.0.is_empty());
        assert_eq!(out.rows[0].line, None);
        assert_eq!(nwa.log()[0].percent_missing, 100.0);
    }

    #[test]
    fn precise_cuts_partial_lines() {
        let mut nwa = square(rules());
        let opts = ServiceAreaOptions::default().dissolve(false).precise(true);
        let out = nwa.service_area(&[pt(1, A)], &[0.5], &opts).unwrap();
        assert_eq!(out.rows.len(), 2);
        for row in &out.rows {
            assert!((line_length(&row.geometry.0[0]) - 5.0).abs() < 1e-9);
        }
    }

    #[test]
    fn split_origin_reaches_both_ways() {
        let mut nwa = square(rules().split_lines(true));
        let out = nwa
            .service_area(&[pt(1, (5.0, 0.0))], &[0.5], &ServiceAreaOptions::default())
            .unwrap();
        let total: f64 = out.rows[0].geometry.0.iter().map(line_length).sum();
        assert!((total - 10.0).abs() < 1e-9);
    }

    #[test]
    fn breaks_are_validated() {
        let mut nwa = square(rules());
        for breaks in [&[][..], &[-1.0][..], &[f64::NAN][..]] {
            let err = nwa
                .service_area(&[pt(1, A)], breaks, &ServiceAreaOptions::default())
                .unwrap_err();
            assert!(matches!(err, NaError::Config(_)));
        }
    }
}

// ── Route frequencies ─────────────────────────────────────────────────────────

#[cfg(test)]
mod frequency {
    use rustc_hash::FxHashMap;

    use na_core::{LineId, NaError, PointId};

    use super::helpers::{grid, one_way, pt, rules, square, star, A, B};
    use crate::{FrequencyOptions, OdWeights};

    #[test]
    fn weighted_totals_match_pair_weights() {
        let mut nwa = star();
        let origins = [pt(1, (10.0, 0.0)), pt(2, (0.0, 10.0)), pt(3, (-10.0, 0.0))];
        let hub = [pt(10, (0.0, 0.0))];
        let mut weights = OdWeights::new();
        weights.insert(PointId(1), PointId(10), 2.0);
        weights.insert(PointId(2), PointId(10), 3.0);
        let opts = FrequencyOptions::default().weights(weights);

        let out = nwa.route_frequencies(&origins, &hub, &opts).unwrap();
        let freqs: Vec<f64> = out.rows.iter().map(|r| r.frequency).collect();
        assert_eq!(freqs, vec![1.0, 2.0, 3.0]);
        assert_eq!(freqs.iter().sum::<f64>(), 6.0);
        assert!(out.rows.iter().all(|r| r.visits == 1));
    }

    #[test]
    fn grid_frequencies_follow_the_routes() {
        let mut nwa = grid();
        // Straight runs along the grid, so every shortest path is unique.
        let origins = [pt(1, (0.0, 0.0)), pt(2, (10.0, 0.0)), pt(3, (0.0, 10.0)), pt(4, (20.0, 0.0))];
        let dests = [pt(11, (20.0, 0.0)), pt(12, (10.0, 20.0)), pt(13, (20.0, 10.0)), pt(14, (0.0, 0.0))];
        let weights: OdWeights = [
            ((PointId(1), PointId(11)), 2.0),
            ((PointId(2), PointId(12)), 3.0),
            ((PointId(3), PointId(13)), 5.0),
            ((PointId(4), PointId(14)), 7.0),
        ]
        .into_iter()
        .collect();

        let routes = nwa.route(&origins, &dests, true).unwrap();
        assert_eq!(routes.rows.len(), 4);
        let mut expected: FxHashMap<LineId, (f64, u64)> = FxHashMap::default();
        for r in &routes.rows {
            assert_eq!(r.lines.len(), 2);
            for &line in &r.lines {
                let slot = expected.entry(line).or_insert((0.0, 0));
                slot.0 += weights.get(r.origin, r.destination);
                slot.1 += 1;
            }
        }

        let out = nwa
            .route_frequencies(&origins, &dests, &FrequencyOptions::default().rowwise(true).weights(weights))
            .unwrap();
        let path_edges: usize = routes.rows.iter().map(|r| r.lines.len()).sum();
        assert_eq!(out.rows.iter().map(|r| r.visits).sum::<u64>(), path_edges as u64);
        assert_eq!(out.rows.len(), expected.len());
        for row in &out.rows {
            assert_eq!(Some(&(row.frequency, row.visits)), expected.get(&row.line), "line {}", row.line.0);
        }

        // The bottom row is driven both ways: 2 + 7.
        let bottom = out.rows.last().unwrap();
        assert_eq!((bottom.frequency, bottom.visits), (9.0, 2));
        assert_eq!(bottom.geometry.0.iter().map(|p| p.y).sum::<f64>(), 0.0);
    }

    #[test]
    fn shared_edges_accumulate() {
        let mut nwa = star();
        let origins = [pt(1, (10.0, 0.0))];
        let dests = [pt(2, (0.0, 10.0)), pt(3, (-10.0, 0.0))];
        let out = nwa.route_frequencies(&origins, &dests, &FrequencyOptions::default()).unwrap();
        assert_eq!(out.rows.len(), 3);
        let last = out.rows.last().unwrap();
        assert_eq!((last.frequency, last.visits), (2.0, 2));
    }

    #[test]
    fn undirected_directions_share_a_row() {
        let mut nwa = square(rules());
        let out = nwa
            .route_frequencies(&[pt(1, A), pt(2, B)], &[pt(2, B), pt(1, A)], &FrequencyOptions::default().rowwise(true))
            .unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].visits, 2);
    }

    #[test]
    fn directed_directions_are_separate() {
        let mut nwa = one_way();
        let right = (20.0, 0.0);
        let out = nwa
            .route_frequencies(&[pt(1, B), pt(2, right)], &[pt(2, right), pt(1, B)], &FrequencyOptions::default().rowwise(true))
            .unwrap();
        assert_eq!(out.rows.len(), 2);
        assert_ne!(out.rows[0].source, out.rows[1].source);
    }

    #[test]
    fn split_paths_credit_base_edges() {
        let mut nwa = square(rules().split_lines(true));
        let out = nwa
            .route_frequencies(&[pt(1, (2.0, 1.0))], &[pt(2, (8.0, 1.0))], &FrequencyOptions::default())
            .unwrap();
        assert_eq!(out.rows.len(), 1);
        let row = &out.rows[0];
        assert!(row.edge.index() < nwa.network().edge_count());
        assert_eq!(row.line.0, 0);
    }

    #[test]
    fn weights_are_validated() {
        let mut nwa = star();
        let origins = [pt(1, (10.0, 0.0))];
        let hub = [pt(10, (0.0, 0.0))];

        let mut negative = OdWeights::new();
        negative.insert(PointId(1), PointId(10), -1.0);
        let err = nwa
            .route_frequencies(&origins, &hub, &FrequencyOptions::default().weights(negative))
            .unwrap_err();
        assert!(matches!(err, NaError::Config(_)));

        let unrelated: OdWeights = [((PointId(7), PointId(8)), 1.0)].into_iter().collect();
        let err = nwa
            .route_frequencies(&origins, &hub, &FrequencyOptions::default().weights(unrelated))
            .unwrap_err();
        assert!(matches!(err, NaError::Config(_)));

        let err = nwa
            .route_frequencies(&origins, &hub, &FrequencyOptions::default().weights(OdWeights::new().with_default(f64::NAN)))
            .unwrap_err();
        assert!(matches!(err, NaError::Config(_)));
    }
}

// ── Observer & cancellation ───────────────────────────────────────────────────

#[cfg(test)]
mod control {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use na_core::PointId;

    use super::helpers::{pt, rules, square, A, B, C, D};
    use crate::{AnalysisObserver, CostMatrixOptions, RunRecord, ServiceAreaOptions};

    struct Counter {
        origins: Arc<AtomicUsize>,
        runs:    Arc<AtomicUsize>,
    }

    impl AnalysisObserver for Counter {
        fn on_origin_done(&mut self, _origin: PointId, _done: usize, _total: usize) {
            self.origins.fetch_add(1, Ordering::Relaxed);
        }

        fn on_run_end(&mut self, _record: &RunRecord) {
            self.runs.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn observer_sees_every_origin() {
        let origins = Arc::new(AtomicUsize::new(0));
        let runs = Arc::new(AtomicUsize::new(0));
        let mut nwa = square(rules()).with_observer(Box::new(Counter {
            origins: Arc::clone(&origins),
            runs:    Arc::clone(&runs),
        }));
        nwa.od_cost_matrix(&[pt(1, A), pt(2, B), pt(3, A)], &[pt(4, C)], &CostMatrixOptions::default())
            .unwrap();
        assert_eq!(origins.load(Ordering::Relaxed), 3);
        assert_eq!(runs.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn cancelled_runs_report_incomplete_origins() {
        let mut nwa = square(rules());
        let token = nwa.cancel_token();
        token.cancel();

        let out = nwa
            .service_area(&[pt(1, A), pt(2, C)], &[1.0], &ServiceAreaOptions::default())
            .unwrap();
        assert!(out.rows.is_empty());
        assert_eq!(out.incomplete, vec![PointId(1), PointId(2)]);
        assert_eq!(nwa.log()[0].incomplete, 2);

        token.reset();
        let out = nwa
            .od_cost_matrix(&[pt(1, A)], &[pt(2, D)], &CostMatrixOptions::default())
            .unwrap();
        assert!(out.incomplete.is_empty());
        assert_eq!(out.rows[0].cost, Some(1.0));
    }
}

// ── Thread count ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod threads {
    use super::helpers::{grid, pt};
    use crate::{
        AnalysisOutput, CostMatrixOptions, CostRow, FrequencyOptions, FrequencyRow, KRoutesOptions,
        NetworkAnalysis, RouteRow, ServiceAreaOptions, ServiceAreaRow,
    };

    type Everything = (
        AnalysisOutput<CostRow>,
        AnalysisOutput<RouteRow>,
        AnalysisOutput<ServiceAreaRow>,
        AnalysisOutput<FrequencyRow>,
    );

    fn points() -> Vec<(na_core::PointId, geo::Coord<f64>)> {
        [(0.0, 0.0), (20.0, 0.0), (10.0, 10.0), (0.0, 20.0), (20.0, 20.0), (5.0, 10.0)]
            .into_iter()
            .enumerate()
            .map(|(i, p)| pt(i as u64 + 1, p))
            .collect()
    }

    /// Every analysis on the grid, in one go.
    fn run_all(nwa: &mut NetworkAnalysis) -> Everything {
        let points = points();
        let matrix = nwa.od_cost_matrix(&points, &points, &CostMatrixOptions::default()).unwrap();
        let routes = nwa.k_routes(&points, &points, &KRoutesOptions::new(2, 20.0)).unwrap();
        let areas = nwa.service_area(&points, &[1.0, 2.5], &ServiceAreaOptions::default()).unwrap();
        let freqs = nwa.route_frequencies(&points, &points, &FrequencyOptions::default()).unwrap();
        assert!(!matrix.rows.is_empty() && !routes.rows.is_empty());
        assert!(!areas.rows.is_empty() && !freqs.rows.is_empty());
        (matrix, routes, areas, freqs)
    }

    #[test]
    fn one_thread_matches_the_pool() {
        let mut sequential = grid().with_num_threads(Some(1));
        let mut pooled = grid();
        let mut three = grid().with_num_threads(Some(3));
        let expected = run_all(&mut sequential);
        assert_eq!(run_all(&mut pooled), expected);
        assert_eq!(run_all(&mut three), expected);
    }

    #[test]
    fn one_thread_runs_are_repeatable() {
        let mut nwa = grid().with_num_threads(Some(1));
        assert_eq!(nwa.num_threads(), Some(1));
        let first = run_all(&mut nwa);
        assert_eq!(run_all(&mut nwa), first);
    }
}
