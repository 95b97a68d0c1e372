//! Core environment context trait for trail instances.

use std::time::Duration;

/// The clock a trail is driven by.
///
/// # Implementations
///
/// - **Production**: `SystemContext` - wraps `std::time::Instant`
/// - **Simulation**: `SimContext` - virtual clock advanced by the harness
///
/// # Determinism
///
/// Point timestamps, ages and fade-out timing all derive from `now()`,
/// so a virtual clock makes every trail run reproducible.
pub trait TrailContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    /// In simulation, returns the master seed.
    fn seed(&self) -> u64;

    /// Returns `now()` as seconds, the unit point timestamps are kept in.
    fn now_secs(&self) -> f64 {
        self.now().as_secs_f64()
    }
}
