//! Error types for the simulation harness.

use thiserror::Error;
use trail_core::TrailError;

/// Errors that can stop a simulated run.
#[derive(Debug, Error)]
pub enum SimError {
    /// The trail runtime failed (detached source, rejected upload)
    #[error(transparent)]
    Trail(#[from] TrailError),

    /// A per-tick or end-of-run check did not hold
    #[error("Invariant violated at t={time:.3}s: {reason}")]
    Invariant { time: f64, reason: String },

    /// Export serialization failed
    #[error("Export failed: {0}")]
    Export(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    /// Creates an invariant violation at virtual time `time`.
    pub fn invariant(time: f64, reason: impl Into<String>) -> Self {
        Self::Invariant { time, reason: reason.into() }
    }
}
