//! Construct a [`Network`] from line records and [`Rules`].

use log::{info, warn};
use rustc_hash::FxHashMap;

use na_core::geometry::line_length;
use na_core::{travel_minutes, EdgeId, LineId, NaError, NaResult, NodeId, Rules, SpeedRule};

use crate::{LineDirection, LineRecord, Network, SegmentIndex};

/// Directed networks with at most this share of two-way lines were most
/// likely never made directed.
const UNDIRECTED_WARNING_PERCENT: f64 = 5.0;

/// Largest share of lines without a usable speed when no default speed is set.
const MAX_MISSING_SPEED_FRACTION: f64 = 0.05;

/// Collect [`LineRecord`]s, then call [`build`](Self::build).
///
/// `build()` resolves the weight attributes named by the rules (or derives
/// minutes from speed, see [`SpeedRule`]), merges line
/// endpoints that fall in the same quantisation cell into one node, sorts
/// edges by source node, constructs the CSR arrays and bulk-loads the
/// segment R-tree.
///
/// # Example
///
/// ```
/// use geo::{coord, LineString};
/// use na_core::Rules;
/// use na_network::{LineRecord, NetworkBuilder};
///
/// let rules = Rules::new("meters");
/// let mut b = NetworkBuilder::new(&rules);
/// b.add_line(
///     LineRecord::new(LineString::new(vec![coord! { x: 0.0, y: 0.0 }, coord! { x: 100.0, y: 0.0 }]))
///         .with_attr("meters", 100.0),
/// );
/// let net = b.build().unwrap();
/// assert_eq!(net.node_count(), 2);
/// assert_eq!(net.edge_count(), 2); // undirected → both directions
/// ```
pub struct NetworkBuilder<'r> {
    rules:                &'r Rules,
    lines:                Vec<LineRecord>,
    endpoint_precision:   f64,
    max_invalid_fraction: f64,
    remove_isolated:      bool,
}

struct RawEdge {
    record:   usize,
    reversed: bool,
    weight:   f64,
}

impl<'r> NetworkBuilder<'r> {
    pub fn new(rules: &'r Rules) -> Self {
        Self {
            rules,
            lines:                Vec::new(),
            endpoint_precision:   1e-6,
            max_invalid_fraction: 0.05,
            remove_isolated:      false,
        }
    }

    /// Grid size used to merge near-identical endpoints into one node.
    pub fn endpoint_precision(mut self, precision: f64) -> Self {
        self.endpoint_precision = precision;
        self
    }

    /// Largest tolerated share of invalid (non-finite, missing or negative)
    /// weights before the build fails.
    pub fn max_invalid_fraction(mut self, fraction: f64) -> Self {
        self.max_invalid_fraction = fraction;
        self
    }

    /// Keep only the largest weakly connected component.
    pub fn remove_isolated(mut self, remove: bool) -> Self {
        self.remove_isolated = remove;
        self
    }

    /// Add a line and return its input position (reported back as
    /// [`Network::line_source`]).
    pub fn add_line(&mut self, line: LineRecord) -> usize {
        self.lines.push(line);
        self.lines.len() - 1
    }

    pub fn extend(&mut self, lines: impl IntoIterator<Item = LineRecord>) {
        self.lines.extend(lines);
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Travel speed of a line under the speed rule, if it has a usable one.
    fn speed_kmh(speed: &SpeedRule, line: &LineRecord) -> Option<f64> {
        match speed {
            SpeedRule::Flat { kmh } => Some(*kmh),
            SpeedRule::Attribute { name, default_kmh } => line
                .attribute(name)
                .filter(|v| v.is_finite() && *v > 0.0)
                .or(*default_kmh),
        }
    }

    /// Weight candidates for one line: `(reversed, weight)` per allowed direction.
    fn directions(&self, line: &LineRecord) -> Vec<(bool, Option<f64>)> {
        let fw = match &self.rules.speed {
            Some(speed) => Self::speed_kmh(speed, line)
                .map(|kmh| travel_minutes(line_length(&line.geometry), kmh)),
            None => line.attribute(&self.rules.weight),
        };
        if !self.rules.directed {
            return vec![(false, fw), (true, fw)];
        }
        let bw = match &self.rules.backward_weight {
            Some(attr) => line.attribute(attr),
            None => fw,
        };
        match line.direction {
            LineDirection::Both     => vec![(false, fw), (true, bw)],
            LineDirection::Forward  => vec![(false, fw)],
            LineDirection::Backward => vec![(true, bw)],
        }
    }

    #[inline]
    fn cell(&self, x: f64, y: f64) -> (i64, i64) {
        (
            (x / self.endpoint_precision).round() as i64,
            (y / self.endpoint_precision).round() as i64,
        )
    }

    /// Consume the builder and produce a [`Network`].
    ///
    /// # Errors
    ///
    /// - [`NaError::Config`] for invalid rules or builder options.
    /// - [`NaError::InvalidNetwork`] when no edge survives, when more than
    ///   `max_invalid_fraction` of the weights are unusable, or when too many
    ///   lines lack a speed and no default speed is set.
    pub fn build(self) -> NaResult<Network> {
        self.rules.validate()?;
        if !(self.endpoint_precision.is_finite() && self.endpoint_precision > 0.0) {
            return Err(NaError::Config(format!(
                "endpoint precision must be positive, got {}",
                self.endpoint_precision
            )));
        }

        // ── Resolve weights ───────────────────────────────────────────────
        let no_speed = match &self.rules.speed {
            Some(speed) => self.lines.iter().filter(|l| Self::speed_kmh(speed, l).is_none()).count(),
            None => 0,
        };
        if no_speed as f64 > self.lines.len() as f64 * MAX_MISSING_SPEED_FRACTION {
            return Err(NaError::InvalidNetwork(format!(
                "{no_speed} of {} lines have a missing or zero speed; set a default speed",
                self.lines.len()
            )));
        }
        if no_speed > 0 {
            warn!("dropped {no_speed} lines without a speed");
        }

        let mut raw: Vec<RawEdge> = Vec::with_capacity(self.lines.len() * 2);
        let mut considered = 0usize;
        let mut invalid = 0usize;
        let mut disallowed = 0usize;

        for (record, line) in self.lines.iter().enumerate() {
            if let Some(speed) = &self.rules.speed {
                if Self::speed_kmh(speed, line).is_none() {
                    continue;
                }
            }
            let dirs = self.directions(line);
            considered += dirs.len();
            if line.geometry.0.len() < 2 {
                invalid += dirs.len();
                continue;
            }
            for (reversed, weight) in dirs {
                match weight {
                    Some(w) if w.is_finite() && w >= 0.0 => {
                        raw.push(RawEdge { record, reversed, weight: w })
                    }
                    Some(w) if w < 0.0 && self.rules.drop_negative => disallowed += 1,
                    _ => invalid += 1,
                }
            }
        }

        if considered > 0 && invalid as f64 / considered as f64 > self.max_invalid_fraction {
            return Err(NaError::InvalidNetwork(format!(
                "{invalid} of {considered} edge weights from '{}' are missing, non-finite or negative",
                self.rules.weight
            )));
        }
        if invalid > 0 {
            warn!("dropped {invalid} edges with missing, non-finite or negative weights");
        }
        if disallowed > 0 {
            info!("dropped {disallowed} edges marked as disallowed by a negative weight");
        }

        // ── Merge endpoints into raw nodes ────────────────────────────────
        let mut cells: FxHashMap<(i64, i64), u32> = FxHashMap::default();
        let mut raw_pos = Vec::new();
        let mut raw_ends: Vec<[u32; 2]> = vec![[u32::MAX; 2]; self.lines.len()];
        for e in &raw {
            if raw_ends[e.record][0] != u32::MAX {
                continue;
            }
            let coords = &self.lines[e.record].geometry.0;
            let mut ends = [0u32; 2];
            for (slot, c) in [coords[0], coords[coords.len() - 1]].into_iter().enumerate() {
                let next = raw_pos.len() as u32;
                let id = *cells.entry(self.cell(c.x, c.y)).or_insert(next);
                if id == next {
                    raw_pos.push(c);
                }
                ends[slot] = id;
            }
            raw_ends[e.record] = ends;
        }

        let endpoints = |e: &RawEdge| {
            let [s, t] = raw_ends[e.record];
            if e.reversed { (t, s) } else { (s, t) }
        };

        // ── Optionally keep only the largest component ────────────────────
        if self.remove_isolated && !raw.is_empty() {
            let mut uf = UnionFind::new(raw_pos.len());
            for e in &raw {
                let (s, t) = endpoints(e);
                uf.union(s, t);
            }
            let mut sizes = vec![0u32; raw_pos.len()];
            for n in 0..raw_pos.len() as u32 {
                sizes[uf.find(n) as usize] += 1;
            }
            // Largest component; lowest root on ties.
            let keep = (0..raw_pos.len() as u32)
                .max_by_key(|&r| (sizes[r as usize], std::cmp::Reverse(r)))
                .unwrap_or(0);
            let before = raw.len();
            raw.retain(|e| uf.find(endpoints(e).0) == keep);
            if raw.len() < before {
                info!("removed {} edges outside the largest connected component", before - raw.len());
            }
        }

        if raw.is_empty() {
            return Err(NaError::InvalidNetwork("no valid edges remain".into()));
        }

        // ── Compact line and node ids ─────────────────────────────────────
        let mut line_of_record = vec![LineId::INVALID; self.lines.len()];
        let mut node_of_raw = vec![NodeId::INVALID; raw_pos.len()];
        let mut line_geometry = Vec::new();
        let mut line_length_v = Vec::new();
        let mut line_source = Vec::new();
        let mut line_ends = Vec::new();
        let mut node_pos = Vec::new();

        let mut node_for = |raw_id: u32, node_pos: &mut Vec<_>| {
            let slot = &mut node_of_raw[raw_id as usize];
            if *slot == NodeId::INVALID {
                *slot = NodeId::from_index(node_pos.len());
                node_pos.push(raw_pos[raw_id as usize]);
            }
            *slot
        };

        for e in &raw {
            if line_of_record[e.record] != LineId::INVALID {
                continue;
            }
            line_of_record[e.record] = LineId::from_index(line_geometry.len());
            let geometry = self.lines[e.record].geometry.clone();
            line_length_v.push(line_length(&geometry));
            line_geometry.push(geometry);
            line_source.push(e.record);
            let [s, t] = raw_ends[e.record];
            let start = node_for(s, &mut node_pos);
            let end = node_for(t, &mut node_pos);
            line_ends.push([start, end]);
        }

        // ── Sort edges by source node for CSR construction ────────────────
        struct Edge {
            from:     NodeId,
            to:       NodeId,
            weight:   f64,
            line:     LineId,
            reversed: bool,
        }
        let mut edges: Vec<Edge> = raw
            .iter()
            .map(|e| {
                let line = line_of_record[e.record];
                let [s, t] = line_ends[line.index()];
                let (from, to) = if e.reversed { (t, s) } else { (s, t) };
                Edge { from, to, weight: e.weight, line, reversed: e.reversed }
            })
            .collect();
        // Stable: equal sources keep input order, which fixes tie-breaking.
        edges.sort_by_key(|e| e.from.0);

        let node_count = node_pos.len();
        let edge_count = edges.len();

        let edge_from:     Vec<NodeId> = edges.iter().map(|e| e.from).collect();
        let edge_to:       Vec<NodeId> = edges.iter().map(|e| e.to).collect();
        let edge_weight:   Vec<f64>    = edges.iter().map(|e| e.weight).collect();
        let edge_line:     Vec<LineId> = edges.iter().map(|e| e.line).collect();
        let edge_reversed: Vec<bool>   = edges.iter().map(|e| e.reversed).collect();

        let mut line_edges = vec![[EdgeId::INVALID; 2]; line_geometry.len()];
        for (i, e) in edges.iter().enumerate() {
            line_edges[e.line.index()][e.reversed as usize] = EdgeId::from_index(i);
        }

        // Build CSR row pointer (node_out_start).
        let mut node_out_start = vec![0u32; node_count + 1];
        for e in &edges {
            node_out_start[e.from.index() + 1] += 1;
        }
        for i in 1..=node_count {
            node_out_start[i] += node_out_start[i - 1];
        }
        debug_assert_eq!(node_out_start[node_count] as usize, edge_count);

        let index = SegmentIndex::build(&line_geometry);

        let network = Network {
            node_pos,
            node_out_start,
            edge_from,
            edge_to,
            edge_weight,
            edge_line,
            edge_reversed,
            line_geometry,
            line_length: line_length_v,
            line_source,
            line_ends,
            line_edges,
            directed: self.rules.directed,
            index,
        };

        info!(
            "built network: {} nodes, {} edges, {} of {} lines kept",
            network.node_count(),
            network.edge_count(),
            network.line_count(),
            self.lines.len()
        );

        if self.rules.directed {
            let pct = network.percent_bidirectional();
            if pct <= UNDIRECTED_WARNING_PERCENT {
                warn!(
                    "network is likely not directed: only {pct:.1} percent of the lines go both ways"
                );
            }
        }

        Ok(network)
    }
}

// ── Union-find for component detection ────────────────────────────────────────

struct UnionFind {
    parent: Vec<u32>,
    rank:   Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n as u32).collect(), rank: vec![0; n] }
    }

    fn find(&mut self, mut x: u32) -> u32 {
        while self.parent[x as usize] != x {
            let grand = self.parent[self.parent[x as usize] as usize];
            self.parent[x as usize] = grand;
            x = grand;
        }
        x
    }

    fn union(&mut self, a: u32, b: u32) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra as usize].cmp(&self.rank[rb as usize]) {
            std::cmp::Ordering::Less    => self.parent[ra as usize] = rb,
            std::cmp::Ordering::Greater => self.parent[rb as usize] = ra,
            std::cmp::Ordering::Equal   => {
                self.parent[rb as usize] = ra;
                self.rank[ra as usize] += 1;
            }
        }
    }
}
