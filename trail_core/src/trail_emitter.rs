//! Trail instance - owns one ribbon's history, ramps, geometry and fade state.
//!
//! Each tick runs the history first, then the builder:
//!
//! ```text
//!   pose ──► PointHistory::tick ──► RibbonBuilder::build ──► RenderAction
//!               (expire, sample)       (hide / fade / rebuild)
//! ```
//!
//! Once a fade-out completes the trail is finalized: every further tick
//! reports `Finalize` without sampling or building, while stale points keep
//! expiring, until emission is switched back on.

use tracing::{debug, info, warn};
use trail_env::Pose;

use crate::trail_config::TrailConfig;
use crate::trail_history::{HistoryStats, Point, PointHistory, SampleDecision};
use crate::trail_mesh::{FadeState, FrameInput, RenderAction, RibbonBuilder};
use crate::trail_ramp::{ColorRamp, WidthRamp};

/// A single self-contained trail.
#[derive(Debug, Clone)]
pub struct Trail {
    config: TrailConfig,
    history: PointHistory,
    colors: ColorRamp,
    widths: WidthRamp,
    builder: RibbonBuilder,
    fade: FadeState,
    emitting: bool,
    finalized: bool,
    last_decision: SampleDecision,
}

impl Trail {
    /// Creates an emitting trail.
    ///
    /// # Arguments
    /// * `config` - Sanitized before use
    /// * `initial_alpha` - The material's alpha, fixes the fade-out rate
    pub fn new(config: TrailConfig, initial_alpha: f32) -> Self {
        let config = config.sanitized();

        Self {
            history: PointHistory::with_capacity(config.maximum_points),
            colors: ColorRamp::new(config.colors.clone()),
            widths: WidthRamp::new(config.widths.clone()),
            builder: RibbonBuilder::new(),
            fade: FadeState::new(initial_alpha),
            emitting: true,
            finalized: false,
            last_decision: SampleDecision::Idle,
            config,
        }
    }

    /// Replaces the configuration; takes effect on the next tick.
    pub fn set_config(&mut self, config: TrailConfig) {
        let config = config.sanitized();
        self.colors = ColorRamp::new(config.colors.clone());
        self.widths = WidthRamp::new(config.widths.clone());
        self.config = config;
    }

    /// Starts or stops sampling new points.
    ///
    /// Stopping begins the fade-out on the next tick. Starting again restores
    /// the initial alpha, and revives a finalized trail.
    pub fn set_emitting(&mut self, emitting: bool) {
        if emitting == self.emitting {
            return;
        }

        if emitting {
            if self.finalized {
                info!("Reviving finalized trail");
            }
            self.finalized = false;
            self.fade.reset();
        } else {
            debug!(points = self.history.len(), "Emission stopped, fading out");
        }

        self.emitting = emitting;
    }

    /// Advances the trail by one frame.
    ///
    /// # Arguments
    /// * `now` - Current timestamp in seconds
    /// * `pose` - The source's world pose this frame
    /// * `delta_time` - Seconds since the previous frame (negative clamps to 0)
    pub fn tick(&mut self, now: f64, pose: Pose, delta_time: f64) -> RenderAction<'_> {
        let pose = self.finite_pose(pose);

        if self.finalized {
            self.last_decision = self.history.tick(now, pose, false, &self.config);
            return RenderAction::Finalize;
        }

        self.last_decision = self.history.tick(now, pose, self.emitting, &self.config);

        let frame = FrameInput {
            now,
            delta_time: if delta_time > 0.0 { delta_time } else { 0.0 },
            emitting: self.emitting,
            lifetime_ratio: self.config.lifetime_ratio().unwrap_or(0.0),
        };

        let action = self.builder.build(&self.history, &frame, &mut self.fade, &self.colors, &self.widths);
        if matches!(action, RenderAction::Finalize) {
            info!(points = self.history.len(), "Trail faded out");
            self.finalized = true;
        }

        action
    }

    /// A non-finite pose is replaced by the newest retained one.
    fn finite_pose(&self, pose: Pose) -> Pose {
        let finite = pose.position.iter().all(|c| c.is_finite())
            && pose.rotation.coords.iter().all(|c| c.is_finite());
        if finite {
            return pose;
        }

        warn!("Non-finite source pose, holding last sample");
        self.history.newest().map(Point::pose).unwrap_or_default()
    }

    pub fn config(&self) -> &TrailConfig {
        &self.config
    }

    pub fn points(&self) -> &PointHistory {
        &self.history
    }

    pub fn point_count(&self) -> usize {
        self.history.len()
    }

    pub fn stats(&self) -> HistoryStats {
        self.history.stats()
    }

    pub fn last_decision(&self) -> SampleDecision {
        self.last_decision
    }

    /// Geometry from the most recent rebuild.
    pub fn mesh(&self) -> &trail_env::MeshBuffers {
        self.builder.mesh()
    }

    pub fn global_alpha(&self) -> f32 {
        self.fade.global_alpha
    }

    pub fn initial_alpha(&self) -> f32 {
        self.fade.initial_alpha
    }

    pub fn is_emitting(&self) -> bool {
        self.emitting
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}
