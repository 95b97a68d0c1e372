//! Error types for trail configuration and host glue.
//!
//! The ribbon algorithm itself never fails: degenerate input is clamped
//! and always yields `Hide`, `UpdateAlpha`, `Finalize` or a valid `Rebuild`.
//! Errors only arise at the edges, when loading configuration or talking
//! to the host.

use thiserror::Error;
use trail_env::EnvError;

#[derive(Debug, Error)]
pub enum TrailError {
    /// Configuration text could not be parsed
    #[error("Invalid trail config: {0}")]
    ConfigParse(String),

    /// Configuration file could not be read
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Host boundary failure (pose source or mesh sink)
    #[error(transparent)]
    Env(#[from] EnvError),
}
