//! Progress callbacks and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use na_core::PointId;

use crate::{Method, RunRecord};

/// Callbacks invoked by every [`NetworkAnalysis`](crate::NetworkAnalysis)
/// method.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.  Per-origin callbacks arrive in input
/// order once an origin's results are merged, also when origins were
/// processed in parallel.
///
/// # Example: progress printer
///
/// ```rust,ignore
/// struct Progress;
///
/// impl AnalysisObserver for Progress {
///     fn on_origin_done(&mut self, _origin: PointId, done: usize, total: usize) {
///         if done % 1_000 == 0 {
///             eprintln!("{done}/{total} origins");
///         }
///     }
/// }
/// ```
pub trait AnalysisObserver {
    /// Called before any point is snapped.
    fn on_run_start(&mut self, _method: Method, _origins: usize) {}

    /// Called once per processed origin.  `done` counts processed origins so
    /// far; `total` is the number of snapped origins.
    fn on_origin_done(&mut self, _origin: PointId, _done: usize, _total: usize) {}

    /// Called after the run's record has been written to the session log.
    fn on_run_end(&mut self, _record: &RunRecord) {}
}

/// An [`AnalysisObserver`] that does nothing.
pub struct NoopObserver;

impl AnalysisObserver for NoopObserver {}

/// Shared cancellation flag.
///
/// Analyses check it between origins, never inside a search.  Origins not
/// started once the flag is set are listed in
/// [`AnalysisOutput::incomplete`](crate::AnalysisOutput::incomplete).  The
/// flag stays set until [`reset`](Self::reset) is called.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
