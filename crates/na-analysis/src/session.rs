//! The analysis session.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};

use na_core::{NaError, NaResult, PointId, Rules};
use na_network::{LineRecord, Network, NetworkBuilder};
use na_route::SearchSpace;

use crate::prepare::Endpoint;
use crate::{AnalysisObserver, CancelToken, NoopObserver, RunRecord};

/// A network, the rules to analyse it by, and the log of past runs.
///
/// The network is shared read-only (`Arc`), so several sessions, possibly
/// with different observers or cancellation tokens, can run over it at once.
/// Analysis methods take `&mut self` only to append to the log and drive the
/// observer.
///
/// # Example
///
/// ```rust,ignore
/// let mut nwa = NetworkAnalysis::from_lines(lines, Rules::new("minutes").directed(true))?
///     .with_observer(Box::new(Progress));
/// let token = nwa.cancel_token();
/// let areas = nwa.service_area(&origins, &[5.0, 10.0, 15.0], &ServiceAreaOptions::default())?;
/// println!("{}", nwa.log().last().unwrap().mean_cost.unwrap_or_default());
/// ```
pub struct NetworkAnalysis {
    network:     Arc<Network>,
    rules:       Rules,
    log:         Vec<RunRecord>,
    cancel:      CancelToken,
    observer:    Box<dyn AnalysisObserver + Send>,
    /// Worker threads per batch; `None` uses Rayon's global pool and
    /// `Some(1)` runs on the calling thread.
    num_threads: Option<usize>,
}

impl NetworkAnalysis {
    /// Start a session over an already built network.
    ///
    /// # Errors
    ///
    /// [`NaError::Config`] when the rules are invalid or disagree with how
    /// the network was built.
    pub fn new(network: Arc<Network>, rules: Rules) -> NaResult<Self> {
        rules.validate()?;
        if rules.directed != network.is_directed() {
            return Err(NaError::Config(format!(
                "rules say directed = {} but the network was built with directed = {}",
                rules.directed,
                network.is_directed()
            )));
        }
        Ok(Self {
            network,
            rules,
            log:         Vec::new(),
            cancel:      CancelToken::new(),
            observer:    Box::new(NoopObserver),
            num_threads: None,
        })
    }

    /// Build the network from `lines` with default builder options, then
    /// start a session over it.
    pub fn from_lines(lines: impl IntoIterator<Item = LineRecord>, rules: Rules) -> NaResult<Self> {
        let mut builder = NetworkBuilder::new(&rules);
        builder.extend(lines);
        let network = builder.build()?;
        Self::new(Arc::new(network), rules)
    }

    pub fn with_observer(mut self, observer: Box<dyn AnalysisObserver + Send>) -> Self {
        self.observer = observer;
        self
    }

    /// Bound the worker threads of each batch.  Without the `parallel`
    /// feature every batch runs on the calling thread regardless.
    pub fn with_num_threads(mut self, num_threads: Option<usize>) -> Self {
        self.num_threads = num_threads;
        self
    }

    pub fn num_threads(&self) -> Option<usize> {
        self.num_threads
    }

    /// Use an existing token, e.g. one shared by several sessions.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// A handle that cancels this session's running and future batches.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn shared_network(&self) -> Arc<Network> {
        Arc::clone(&self.network)
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// One record per completed run, oldest first.
    pub fn log(&self) -> &[RunRecord] {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    // ── Shared run plumbing ───────────────────────────────────────────────

    pub(crate) fn start(&mut self, record: &RunRecord) -> Instant {
        self.observer.on_run_start(record.method, record.origins);
        Instant::now()
    }

    /// Run `work` once per item with a per-thread [`SearchSpace`].
    ///
    /// The cancellation flag is checked before each item; skipped items
    /// yield `None`.  Output order matches `items` whether the batch runs
    /// on one thread or many.
    pub(crate) fn run_each<I, T, F>(&self, items: &[I], work: F) -> Vec<Option<T>>
    where
        I: Sync,
        T: Send,
        F: Fn(&mut SearchSpace, &I) -> T + Sync + Send,
    {
        let cancel = &self.cancel;
        let step = |space: &mut SearchSpace, item: &I| {
            if cancel.is_cancelled() {
                None
            } else {
                Some(work(space, item))
            }
        };

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;

            let run = || -> Vec<Option<T>> { items.par_iter().map_init(SearchSpace::new, &step).collect() };
            match self.num_threads {
                Some(1) => {}
                Some(n) => match rayon::ThreadPoolBuilder::new().num_threads(n).build() {
                    Ok(pool) => return pool.install(run),
                    Err(e) => {
                        warn!("could not start a pool of {n} threads ({e}); using the global pool");
                        return run();
                    }
                },
                None => return run(),
            }
        }

        let mut space = SearchSpace::new();
        items.iter().map(|item| step(&mut space, item)).collect()
    }

    /// Run `work` once per group of origins sharing a snapped node, then
    /// scatter its per-member outputs back to origin order.
    pub(crate) fn run_grouped<T, F>(&self, groups: &[Vec<usize>], origins: usize, work: F) -> Vec<Option<T>>
    where
        T: Send,
        F: Fn(&mut SearchSpace, &[usize]) -> Vec<T> + Sync + Send,
    {
        let per_group = self.run_each(groups, |space, members: &Vec<usize>| work(space, members));
        let mut out: Vec<Option<T>> = (0..origins).map(|_| None).collect();
        for (members, result) in groups.iter().zip(per_group) {
            if let Some(values) = result {
                for (&m, v) in members.iter().zip(values) {
                    out[m] = Some(v);
                }
            }
        }
        out
    }

    /// Merge per-origin results in input order, notifying the observer.
    ///
    /// Returns the processed results and the ids of skipped origins.
    pub(crate) fn collect<T>(&mut self, origins: &[Endpoint], results: Vec<Option<T>>) -> (Vec<T>, Vec<PointId>) {
        let total = origins.len();
        let mut done = Vec::with_capacity(total);
        let mut incomplete = Vec::new();
        for (origin, result) in origins.iter().zip(results) {
            match result {
                Some(r) => {
                    done.push(r);
                    self.observer.on_origin_done(origin.id, done.len(), total);
                }
                None => incomplete.push(origin.id),
            }
        }
        if !incomplete.is_empty() {
            warn!("run cancelled: {} of {} origins not processed", incomplete.len(), total);
        }
        (done, incomplete)
    }

    pub(crate) fn finish(&mut self, mut record: RunRecord, started: Instant) {
        record.elapsed = started.elapsed();
        info!(
            "{}: {} origins, {} destinations, {:.1}% missing in {:.2?}",
            record.method, record.origins, record.destinations, record.percent_missing, record.elapsed
        );
        debug!("{record:?}");
        self.log.push(record);
        if let Some(record) = self.log.last() {
            self.observer.on_run_end(record);
        }
    }
}
