//! Production implementation of TrailContext using the system clock.

use crate::TrailContext;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Production context backed by the monotonic system clock.
///
/// This is the "real" implementation used when a host drives trails
/// from its frame loop.
pub struct SystemContext {
    /// Start time for monotonic duration calculations
    start: Instant,
}

impl SystemContext {
    /// Creates a new SystemContext.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Creates an Arc-wrapped context for sharing across trails.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for SystemContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TrailContext for SystemContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn seed(&self) -> u64 {
        // Production is not seeded
        0
    }
}
