//! The "RIBBON" Engine - Per-Frame Mesh Synthesis
//!
//! Walks the live point history once per tick and either:
//! 1. Decays the global alpha (emission stopped), hiding the renderer if
//!    fewer than two points are left and finalizing once alpha hits 0
//! 2. Hides the renderer (fewer than two points)
//! 3. Rebuilds the triangle strip (two vertices per point, one quad per pair)
//!
//! Buffers are owned by the builder and reused across frames.

use nalgebra::{Vector2, Vector3};
use tracing::warn;
use trail_env::MeshBuffers;

use crate::trail_history::PointHistory;
use crate::trail_ramp::{ColorRamp, WidthRamp};

/// What the host should do this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderAction<'a> {
    /// Fewer than two live points: disable the renderer
    Hide,

    /// Fading out: write this alpha to the material, keep the old geometry
    UpdateAlpha(f32),

    /// Fade-out complete; the owner may tear the trail down
    Finalize,

    /// Fresh geometry for this frame
    Rebuild(&'a MeshBuffers),
}

impl RenderAction<'_> {
    /// Whether the renderer should be enabled after this action.
    pub fn visible(&self) -> bool {
        matches!(self, RenderAction::UpdateAlpha(_) | RenderAction::Rebuild(_))
    }
}

/// Material alpha and its decay rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeState {
    /// Alpha read from the material when the trail was attached
    pub initial_alpha: f32,

    /// Current alpha, decays only while not emitting
    pub global_alpha: f32,

    /// `1 / initial_alpha`, or 0 when the initial alpha is not positive
    pub fade_rate: f32,
}

impl FadeState {
    pub fn new(initial_alpha: f32) -> Self {
        let initial_alpha = if initial_alpha.is_finite() { initial_alpha } else { 0.0 };
        let fade_rate = if initial_alpha > 0.0 { 1.0 / initial_alpha } else { 0.0 };

        Self {
            initial_alpha,
            global_alpha: initial_alpha,
            fade_rate,
        }
    }

    /// Restores the alpha read at attach time.
    pub fn reset(&mut self) {
        self.global_alpha = self.initial_alpha;
    }

    /// Applies one tick of decay and returns the new alpha (never below 0).
    ///
    /// The rate is scaled by `lifetime_ratio`, so a full fade from alpha 1
    /// takes one segment lifetime.
    pub fn decay(&mut self, lifetime_ratio: f64, delta_time: f64) -> f32 {
        self.global_alpha -= self.fade_rate * lifetime_ratio as f32 * delta_time as f32;
        if self.global_alpha.is_nan() || self.global_alpha < 0.0 {
            self.global_alpha = 0.0;
        }
        self.global_alpha
    }
}

/// Per-tick inputs to the builder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    /// Current timestamp in seconds
    pub now: f64,

    /// Seconds since the previous tick (non-negative)
    pub delta_time: f64,

    pub emitting: bool,

    /// `1 / segment_lifetime`
    pub lifetime_ratio: f64,
}

/// Builds ribbon geometry from a point history.
#[derive(Debug, Clone, Default)]
pub struct RibbonBuilder {
    mesh: MeshBuffers,
}

impl RibbonBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The geometry produced by the last `Rebuild`.
    pub fn mesh(&self) -> &MeshBuffers {
        &self.mesh
    }

    /// Decides this frame's action, rebuilding geometry if emitting.
    ///
    /// # Arguments
    /// * `points` - Live history, oldest first
    /// * `frame` - Clock, emission flag and lifetime ratio for this tick
    /// * `fade` - Alpha state, decayed in place while not emitting
    /// * `colors` / `widths` - Appearance ramps sampled by age ratio
    pub fn build(
        &mut self,
        points: &PointHistory,
        frame: &FrameInput,
        fade: &mut FadeState,
        colors: &ColorRamp,
        widths: &WidthRamp,
    ) -> RenderAction<'_> {
        // The fade clock runs whether or not there is geometry left to fade
        if !frame.emitting {
            let alpha = fade.decay(frame.lifetime_ratio, frame.delta_time);
            return if alpha <= 0.0 {
                RenderAction::Finalize
            } else if points.len() < 2 {
                RenderAction::Hide
            } else {
                RenderAction::UpdateAlpha(alpha)
            };
        }

        if points.len() < 2 {
            return RenderAction::Hide;
        }

        self.rebuild(points, frame, colors, widths);
        RenderAction::Rebuild(&self.mesh)
    }

    fn rebuild(&mut self, points: &PointHistory, frame: &FrameInput, colors: &ColorRamp, widths: &WidthRamp) {
        self.mesh.clear();

        let count = points.len();
        let (Some(oldest), Some(newest)) = (points.oldest(), points.newest()) else {
            return;
        };
        // Capacity is capped well below this
        let Ok(vertex_count) = u32::try_from(2 * count) else {
            warn!(count, "Too many points for 32-bit indices, skipping rebuild");
            return;
        };
        let newest_age = newest.age(frame.now);
        let age_span = oldest.age(frame.now) - newest_age;

        let cross_sections = points.iter().enumerate().zip((0..vertex_count).step_by(2));
        for ((i, point), v) in cross_sections {
            let age = point.age(frame.now);
            let ratio = (age * frame.lifetime_ratio) as f32;
            let color = colors.sample(ratio);
            let width = widths.sample(ratio);

            // Cross-section spans the point's own local up axis
            let pose = point.pose();
            let half = Vector3::new(0.0, width * 0.5, 0.0);
            self.mesh.vertices.push(pose.transform_point(&half));
            self.mesh.vertices.push(pose.transform_point(&-half));
            self.mesh.colors.push(color);
            self.mesh.colors.push(color);

            // u runs 0 at the newest end to 1 at the oldest, by elapsed time.
            // Equal timestamps at both ends fall back to spacing by index.
            let u = if age_span > 0.0 {
                ((age - newest_age) / age_span) as f32
            } else {
                (count - 1 - i) as f32 / (count - 1) as f32
            };
            self.mesh.uvs.push(Vector2::new(u, 0.0));
            self.mesh.uvs.push(Vector2::new(u, 1.0));

            if v > 0 {
                self.mesh.triangles.extend_from_slice(&[v - 2, v - 1, v, v + 1, v, v - 1]);
            }
        }
    }
}
