//! Snapping and line splitting shared by every analysis.

use geo::Coord;
use log::warn;
use rustc_hash::FxHashMap;

use na_core::{NaError, NaResult, NodeId, PointId, Rules};
use na_network::{Network, NetworkView, Overlay, Snap, SnapFailure, SnapTarget, Snapper};

/// A snapped point as the searches see it.
#[derive(Clone, Debug)]
pub(crate) struct Endpoint {
    pub id:        PointId,
    pub coord:     Coord<f64>,
    pub node:      NodeId,
    /// Cost of the off-network leg between the point and `node`.
    pub connector: f64,
    /// Position in the caller's input.
    pub input:     usize,
}

/// Origins, destinations and splits for one analysis call.
pub(crate) struct Prepared {
    pub overlay:      Overlay,
    pub origins:      Vec<Endpoint>,
    pub destinations: Vec<Endpoint>,
    pub failures:     Vec<SnapFailure>,
    /// Destination index by input position, for row-wise pairing.
    dest_by_input:    Vec<Option<usize>>,
}

impl Prepared {
    /// Snap both point sets and split the lines they land on.
    pub fn new(
        network:      &Network,
        rules:        &Rules,
        origins:      &[(PointId, Coord<f64>)],
        destinations: &[(PointId, Coord<f64>)],
    ) -> Self {
        let snapper = Snapper::new(network, rules);
        let mut failures = Vec::new();
        let mut snap_side = |points: &[(PointId, Coord<f64>)]| {
            let mut snaps = Vec::with_capacity(points.len());
            for (input, &(point, coord)) in points.iter().enumerate() {
                match snapper.snap(point, coord) {
                    Ok(snap) => snaps.push((input, snap)),
                    Err(error) => failures.push(SnapFailure { point, error }),
                }
            }
            snaps
        };
        let o_snaps = snap_side(origins);
        let d_snaps = snap_side(destinations);
        if !failures.is_empty() {
            warn!(
                "{} of {} points could not be snapped to the network",
                failures.len(),
                origins.len() + destinations.len()
            );
        }

        let cuts: Vec<_> = o_snaps
            .iter()
            .chain(&d_snaps)
            .filter_map(|(_, s)| match s.target {
                SnapTarget::Split { line, fraction } => Some((line, fraction)),
                SnapTarget::Node(_) => None,
            })
            .collect();
        let (overlay, split_nodes) = if cuts.is_empty() {
            (Overlay::empty(network), Vec::new())
        } else {
            Overlay::split(network, &cuts)
        };

        // Split nodes come back in cut order: origins first, then destinations.
        let mut split_nodes = split_nodes.into_iter();
        let mut endpoints = |snaps: Vec<(usize, Snap)>| {
            snaps
                .into_iter()
                .map(|(input, s)| Endpoint {
                    id: s.point,
                    coord: s.coord,
                    node: match s.target {
                        SnapTarget::Node(n) => n,
                        SnapTarget::Split { .. } => split_nodes.next().unwrap_or(NodeId::INVALID),
                    },
                    connector: rules.connector_cost.cost(s.residual),
                    input,
                })
                .collect::<Vec<_>>()
        };
        let origins_ep = endpoints(o_snaps);
        let destinations_ep = endpoints(d_snaps);

        let mut dest_by_input = vec![None; destinations.len()];
        for (i, d) in destinations_ep.iter().enumerate() {
            if let Some(slot) = dest_by_input.get_mut(d.input) {
                *slot = Some(i);
            }
        }

        Self {
            overlay,
            origins: origins_ep,
            destinations: destinations_ep,
            failures,
            dest_by_input,
        }
    }

    pub fn view<'a>(&'a self, network: &'a Network) -> NetworkView<'a> {
        NetworkView::new(network).with_overlay(&self.overlay)
    }

    /// Destinations paired with `origin`: all of them, or only the one at the
    /// same input position when `rowwise`.
    pub fn targets_for(&self, origin: &Endpoint, rowwise: bool) -> Vec<&Endpoint> {
        if !rowwise {
            return self.destinations.iter().collect();
        }
        self.dest_by_input
            .get(origin.input)
            .copied()
            .flatten()
            .map(|i| &self.destinations[i])
            .into_iter()
            .collect()
    }

    /// Origins grouped by snapped node, in order of first appearance.  Each
    /// group needs one search.
    pub fn origin_groups(&self) -> Vec<Vec<usize>> {
        let mut slot: FxHashMap<NodeId, usize> = FxHashMap::default();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for (i, o) in self.origins.iter().enumerate() {
            let g = *slot.entry(o.node).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[g].push(i);
        }
        groups
    }
}

/// Row-wise batches pair origin `i` with destination `i`.
pub(crate) fn check_rowwise(
    rowwise:      bool,
    origins:      &[(PointId, Coord<f64>)],
    destinations: &[(PointId, Coord<f64>)],
) -> NaResult<()> {
    if rowwise && origins.len() != destinations.len() {
        return Err(NaError::Config(format!(
            "row-wise analysis needs as many origins as destinations, got {} and {}",
            origins.len(),
            destinations.len()
        )));
    }
    Ok(())
}
