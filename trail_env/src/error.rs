//! Error types for the trail environment abstraction.

use thiserror::Error;

/// Errors that can occur at the host boundary.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The tracked transform is gone (object destroyed, handle dropped)
    #[error("Pose source detached: {0}")]
    SourceDetached(String),

    /// The host refused the mesh (buffer limits, renderer torn down)
    #[error("Mesh sink rejected upload: {0}")]
    SinkRejected(String),
}

impl EnvError {
    /// Creates a detached-source error.
    pub fn detached(msg: impl Into<String>) -> Self {
        Self::SourceDetached(msg.into())
    }

    /// Creates a rejected-upload error.
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::SinkRejected(msg.into())
    }
}
