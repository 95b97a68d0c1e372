//! SimulatedTrail - runs a `TrailRuntime` on the simulation clock.
//!
//! Bridges `trail_core::TrailRuntime` with the simulation infrastructure:
//! the oracle stands in for the host transform, the recording sink for the
//! renderer, and the shared `SimContext` for the frame clock.

use std::sync::Arc;
use trail_core::{TickOutcome, Trail, TrailConfig, TrailRuntime};
use trail_env::{TrailContext, TrailId};

use crate::context::SimContext;
use crate::error::SimError;
use crate::oracle::MotionOracle;
use crate::sink::RecordingSink;

/// A trail running in the deterministic environment.
pub struct SimulatedTrail {
    inner: TrailRuntime<SimContext, MotionOracle, RecordingSink>,
}

impl SimulatedTrail {
    /// Creates a new simulated trail.
    ///
    /// # Arguments
    /// * `trail_id` - Identifier used in logs and exports
    /// * `context` - Simulation context shared with the oracle
    /// * `oracle` - Scripted motion of the tracked object
    /// * `sink` - Recording renderer; its alpha fixes the fade rate
    /// * `config` - Trail configuration
    pub fn new(
        trail_id: TrailId,
        context: Arc<SimContext>,
        oracle: MotionOracle,
        sink: RecordingSink,
        config: TrailConfig,
    ) -> Self {
        Self {
            inner: TrailRuntime::new(trail_id, context, oracle, sink, config),
        }
    }

    pub fn trail_id(&self) -> TrailId {
        self.inner.trail_id
    }

    /// Processes a single frame at the current virtual time.
    pub fn step(&mut self) -> Result<TickOutcome, SimError> {
        Ok(self.inner.step()?)
    }

    pub fn set_emitting(&mut self, emitting: bool) {
        self.inner.set_emitting(emitting);
    }

    pub fn set_config(&mut self, config: TrailConfig) {
        self.inner.set_config(config);
    }

    pub fn trail(&self) -> &Trail {
        self.inner.trail()
    }

    pub fn oracle(&self) -> &MotionOracle {
        self.inner.source()
    }

    pub fn oracle_mut(&mut self) -> &mut MotionOracle {
        self.inner.source_mut()
    }

    pub fn sink(&self) -> &RecordingSink {
        self.inner.sink()
    }

    /// Returns the current simulation time in seconds.
    pub fn time_secs(&self) -> f64 {
        self.inner.context().now_secs()
    }

    pub fn tick_count(&self) -> u64 {
        self.inner.tick_count()
    }

    /// Live point positions, oldest first.
    pub fn point_positions(&self) -> Vec<[f32; 3]> {
        self.trail()
            .points()
            .iter()
            .map(|p| [p.position.x, p.position.y, p.position.z])
            .collect()
    }
}
