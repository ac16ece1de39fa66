//! Error taxonomy shared by every `na-*` crate.
//!
//! Construction and configuration errors are fatal and surface immediately.
//! Snapping and path failures are per point / per pair: batch analyses
//! collect them alongside their results instead of aborting.

use thiserror::Error;

use crate::{NodeId, PointId};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NaError {
    /// A missing or out-of-range rule, raised before any graph work begins.
    #[error("configuration error: {0}")]
    Config(String),

    /// The network cannot be built from the supplied lines.
    #[error("invalid network: {0}")]
    InvalidNetwork(String),

    /// No usable line lies within the (expanded) search tolerance.
    #[error("point {point} has no network line within {tolerance}")]
    UnreachablePoint { point: PointId, tolerance: f64 },

    #[error("no path from {from} to {to}")]
    NoPath { from: NodeId, to: NodeId },
}

impl NaError {
    /// `true` for errors that abort a whole session rather than one point or pair.
    pub fn is_fatal(&self) -> bool {
        matches!(self, NaError::Config(_) | NaError::InvalidNetwork(_))
    }
}

/// Shorthand result type for all `na-*` crates.
pub type NaResult<T> = Result<T, NaError>;
