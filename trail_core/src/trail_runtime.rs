//! Trail Runtime - Binds a `Trail` to its environment context.
//!
//! This module is the integration layer between the pure ribbon algorithm
//! and the environment abstraction (`TrailContext`, `PoseSource`, `MeshSink`).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TrailRuntime                           │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │              Context: TrailContext                    │   │
//! │  │  • now() → point timestamps and frame delta          │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │        │                    │                    │          │
//! │  ┌───────────┐       ┌─────────────┐      ┌────────────┐    │
//! │  │PoseSource │ ────► │    Trail    │ ───► │  MeshSink  │    │
//! │  │ (sample)  │       │(history+mesh)│      │ (render)   │    │
//! │  └───────────┘       └─────────────┘      └────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use trail_core::{TrailRuntime, TrailConfig};
//! use trail_env::{SystemContext, TrailId};
//!
//! let ctx = SystemContext::shared();
//! let mut runtime = TrailRuntime::new(TrailId::new(), ctx, source, sink, TrailConfig::default());
//!
//! // Once per frame
//! runtime.step()?;
//! ```

use std::sync::Arc;
use tracing::{debug, info};
use trail_env::{MeshSink, PoseSource, TrailContext, TrailId};

use crate::error::TrailError;
use crate::trail_config::TrailConfig;
use crate::trail_emitter::Trail;
use crate::trail_mesh::RenderAction;

/// Owned summary of what a step did to the sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Renderer disabled
    Hidden,

    /// Alpha written, geometry unchanged
    Fading { alpha: f32 },

    /// Trail complete
    Finalized,

    /// New geometry uploaded
    Rebuilt { cross_sections: usize, triangles: usize },
}

impl TickOutcome {
    pub fn visible(&self) -> bool {
        matches!(self, TickOutcome::Fading { .. } | TickOutcome::Rebuilt { .. })
    }
}

/// A trail driven by a clock, fed by a pose source and rendered into a sink.
///
/// Generic over the context, source and sink, allowing the same trail
/// code to run inside a host renderer or the simulator.
pub struct TrailRuntime<Ctx, Src, Sink>
where
    Ctx: TrailContext,
    Src: PoseSource,
    Sink: MeshSink,
{
    /// Trail identifier (for logging)
    pub trail_id: TrailId,

    context: Arc<Ctx>,
    source: Src,
    sink: Sink,
    trail: Trail,

    /// Timestamp of the previous successful sample, for delta time
    last_step: Option<f64>,

    /// Whether `MeshSink::finalize` has been called for the current fade-out
    finalize_sent: bool,

    tick_count: u64,
}

impl<Ctx, Src, Sink> TrailRuntime<Ctx, Src, Sink>
where
    Ctx: TrailContext,
    Src: PoseSource,
    Sink: MeshSink,
{
    /// Attaches a new emitting trail.
    ///
    /// Reads the sink's alpha once to fix the fade-out rate.
    pub fn new(trail_id: TrailId, context: Arc<Ctx>, source: Src, sink: Sink, config: TrailConfig) -> Self {
        let initial_alpha = sink.global_alpha();
        debug!(%trail_id, initial_alpha, "Attaching trail");

        Self {
            trail_id,
            context,
            source,
            sink,
            trail: Trail::new(config, initial_alpha),
            last_step: None,
            finalize_sent: false,
            tick_count: 0,
        }
    }

    /// Runs one frame: sample, tick, apply to the sink.
    ///
    /// Delta time is measured from the previous successful sample (0 on the
    /// first), so time spent in failed steps still counts toward the fade.
    pub fn step(&mut self) -> Result<TickOutcome, TrailError> {
        let now = self.context.now_secs();
        let pose = self.source.sample_pose()?;

        let delta_time = self.last_step.map_or(0.0, |last| (now - last).max(0.0));
        self.last_step = Some(now);
        self.tick_count += 1;

        let outcome = match self.trail.tick(now, pose, delta_time) {
            RenderAction::Hide => {
                self.sink.set_visible(false);
                TickOutcome::Hidden
            }
            RenderAction::UpdateAlpha(alpha) => {
                self.sink.set_visible(true);
                self.sink.set_global_alpha(alpha);
                TickOutcome::Fading { alpha }
            }
            RenderAction::Rebuild(mesh) => {
                self.sink.upload(mesh)?;
                self.sink.set_visible(true);
                TickOutcome::Rebuilt {
                    cross_sections: mesh.cross_sections(),
                    triangles: mesh.triangle_count(),
                }
            }
            RenderAction::Finalize => {
                if !self.finalize_sent {
                    self.sink.set_global_alpha(0.0);
                    self.sink.set_visible(false);
                    self.sink.finalize();
                    self.finalize_sent = true;
                    info!(trail_id = %self.trail_id, ticks = self.tick_count, "Trail finalized");
                }
                TickOutcome::Finalized
            }
        };

        Ok(outcome)
    }

    /// Starts or stops emission; resuming writes the restored alpha back.
    pub fn set_emitting(&mut self, emitting: bool) {
        let was_emitting = self.trail.is_emitting();
        self.trail.set_emitting(emitting);

        if emitting && !was_emitting {
            self.sink.set_global_alpha(self.trail.global_alpha());
            self.finalize_sent = false;
        }
    }

    /// Replaces the configuration; takes effect on the next step.
    pub fn set_config(&mut self, config: TrailConfig) {
        self.trail.set_config(config);
    }

    pub fn trail(&self) -> &Trail {
        &self.trail
    }

    pub fn source(&self) -> &Src {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut Src {
        &mut self.source
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut Sink {
        &mut self.sink
    }

    pub fn context(&self) -> &Arc<Ctx> {
        &self.context
    }

    /// Returns the number of completed steps.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// True once the trail has faded out; the owner may drop the runtime.
    pub fn is_finished(&self) -> bool {
        self.trail.is_finalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use std::sync::Mutex;
    use std::time::Duration;
    use trail_env::{EnvError, MeshBuffers, Pose};

    /// Clock advanced by hand.
    struct ManualClock(Mutex<Duration>);

    impl ManualClock {
        fn advance(&self, secs: f64) {
            *self.0.lock().unwrap() += Duration::from_secs_f64(secs);
        }
    }

    impl TrailContext for ManualClock {
        fn now(&self) -> Duration {
            *self.0.lock().unwrap()
        }

        fn seed(&self) -> u64 {
            0
        }
    }

    /// Source that moves along +X by a fixed step per sample.
    struct Marching {
        x: f32,
        step: f32,
        detached: bool,
    }

    impl PoseSource for Marching {
        fn sample_pose(&mut self) -> Result<Pose, EnvError> {
            if self.detached {
                return Err(EnvError::detached("marching source removed"));
            }
            self.x += self.step;
            Ok(Pose::at(Vector3::new(self.x, 0.0, 0.0)))
        }
    }

    #[derive(Default)]
    struct Capture {
        alpha: f32,
        visible: bool,
        uploads: usize,
        finalized: usize,
        last: MeshBuffers,
        reject: bool,
    }

    impl MeshSink for Capture {
        fn global_alpha(&self) -> f32 {
            self.alpha
        }

        fn set_global_alpha(&mut self, alpha: f32) {
            self.alpha = alpha;
        }

        fn set_visible(&mut self, visible: bool) {
            self.visible = visible;
        }

        fn upload(&mut self, mesh: &MeshBuffers) -> Result<(), EnvError> {
            if self.reject {
                return Err(EnvError::rejected("capture closed"));
            }
            self.uploads += 1;
            self.last = mesh.clone();
            Ok(())
        }

        fn finalize(&mut self) {
            self.finalized += 1;
        }
    }

    fn runtime(step: f32, alpha: f32) -> TrailRuntime<ManualClock, Marching, Capture> {
        TrailRuntime::new(
            TrailId::from_seed(1),
            Arc::new(ManualClock(Mutex::new(Duration::ZERO))),
            Marching { x: 0.0, step, detached: false },
            Capture { alpha, ..Default::default() },
            TrailConfig::default(),
        )
    }

    #[test]
    fn test_step_uploads_geometry() {
        let mut rt = runtime(2.0, 1.0);

        assert_eq!(rt.step().unwrap(), TickOutcome::Rebuilt { cross_sections: 2, triangles: 2 });
        rt.context().advance(0.016);
        assert_eq!(rt.step().unwrap(), TickOutcome::Rebuilt { cross_sections: 3, triangles: 4 });

        assert!(rt.sink().visible);
        assert_eq!(rt.sink().uploads, 2);
        assert_eq!(rt.sink().last.vertices.len(), 6);
        assert_eq!(rt.tick_count(), 2);
    }

    #[test]
    fn test_fade_out_writes_alpha_then_finalizes_once() {
        let mut rt = runtime(2.0, 0.5);
        for _ in 0..5 {
            rt.step().unwrap();
            rt.context().advance(0.05);
        }

        rt.set_emitting(false);
        let mut outcomes = Vec::new();
        for _ in 0..10 {
            rt.context().advance(0.05);
            outcomes.push(rt.step().unwrap());
        }

        assert!(matches!(outcomes[0], TickOutcome::Fading { .. }));
        assert!(outcomes.contains(&TickOutcome::Finalized));
        assert_eq!(*outcomes.last().unwrap(), TickOutcome::Finalized);
        assert_eq!(rt.sink().alpha, 0.0);
        assert!(!rt.sink().visible);
        assert_eq!(rt.sink().finalized, 1);
        assert!(rt.is_finished());

        rt.set_emitting(true);
        assert_eq!(rt.sink().alpha, 0.5);
        rt.context().advance(0.05);
        assert!(matches!(rt.step().unwrap(), TickOutcome::Rebuilt { .. }));
    }

    #[test]
    fn test_detached_source_propagates() {
        let mut rt = runtime(1.0, 1.0);
        rt.source_mut().detached = true;

        let err = rt.step().unwrap_err();
        assert!(matches!(err, TrailError::Env(EnvError::SourceDetached(_))));
        assert_eq!(rt.tick_count(), 0);
    }

    #[test]
    fn test_failed_step_time_counts_toward_fade() {
        let mut rt = runtime(2.0, 1.0);
        rt.step().unwrap();
        rt.context().advance(0.05);
        rt.step().unwrap();

        rt.set_emitting(false);
        rt.context().advance(0.1);
        let TickOutcome::Fading { alpha } = rt.step().unwrap() else {
            panic!("expected fading");
        };
        assert_relative_eq!(alpha, 0.9, epsilon = 1e-5);

        rt.source_mut().detached = true;
        rt.context().advance(0.1);
        assert!(rt.step().is_err());

        rt.source_mut().detached = false;
        rt.context().advance(0.1);
        let TickOutcome::Fading { alpha } = rt.step().unwrap() else {
            panic!("expected fading");
        };
        assert_relative_eq!(alpha, 0.7, epsilon = 1e-5);
        assert_eq!(rt.tick_count(), 4);
    }

    #[test]
    fn test_rejected_upload_stays_invisible() {
        let mut rt = runtime(2.0, 1.0);
        rt.sink_mut().reject = true;

        let err = rt.step().unwrap_err();
        assert!(matches!(err, TrailError::Env(EnvError::SinkRejected(_))));
        assert!(!rt.sink().visible);
        assert_eq!(rt.sink().uploads, 0);

        rt.sink_mut().reject = false;
        rt.context().advance(0.016);
        assert!(matches!(rt.step().unwrap(), TickOutcome::Rebuilt { .. }));
        assert!(rt.sink().visible);
    }

    #[test]
    fn test_full_alpha_fade_finalizes() {
        let mut rt = runtime(1.5, 1.0);
        for _ in 0..30 {
            rt.step().unwrap();
            rt.context().advance(1.0 / 30.0);
        }

        rt.set_emitting(false);
        let mut finalized_after = None;
        for k in 1..=120 {
            rt.context().advance(1.0 / 30.0);
            if rt.step().unwrap() == TickOutcome::Finalized && finalized_after.is_none() {
                finalized_after = Some(k);
            }
        }

        let ticks = finalized_after.expect("full-alpha trail must finalize");
        assert!(ticks <= 32, "finalized after {} ticks", ticks);
        assert_eq!(rt.sink().finalized, 1);
        assert_eq!(rt.sink().alpha, 0.0);
        assert!(!rt.sink().visible);
        assert_eq!(rt.trail().point_count(), 0);
    }
}
