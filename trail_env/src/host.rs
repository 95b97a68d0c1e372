//! Host renderer abstraction: where poses come from and where meshes go.

use crate::error::EnvError;
use crate::types::{MeshBuffers, Pose};

/// The transform a trail follows, read once per tick.
///
/// # Implementations
///
/// - **Production**: wraps a scene-graph node's world transform
/// - **Simulation**: `MotionOracle` evaluating a scripted path on the virtual clock
pub trait PoseSource {
    /// Samples the world-space pose of the tracked object.
    ///
    /// # Returns
    /// * `Ok(pose)` - The pose at the current instant
    /// * `Err(EnvError::SourceDetached)` - The tracked object no longer exists
    fn sample_pose(&mut self) -> Result<Pose, EnvError>;
}

/// The consumer of ribbon geometry and of the material's tint alpha.
///
/// # Frame Flow
///
/// ```text
/// TrailRuntime                         MeshSink
///   |-- Hide ------------------------->| set_visible(false)
///   |-- Rebuild(mesh) ---------------->| set_visible(true), upload(mesh)
///   |-- UpdateAlpha(a) --------------->| set_visible(true), set_global_alpha(a)
///   |-- Finalize --------------------->| set_global_alpha(0), set_visible(false), finalize()
/// ```
pub trait MeshSink {
    /// Returns the material's current tint alpha.
    ///
    /// Read once when a trail is attached, to derive its fade-out rate.
    fn global_alpha(&self) -> f32;

    /// Writes the material's tint alpha (fade-out only).
    fn set_global_alpha(&mut self, alpha: f32);

    /// Enables or disables the renderer.
    fn set_visible(&mut self, visible: bool);

    /// Replaces the rendered geometry.
    ///
    /// The buffers are borrowed; hosts copy what they need.
    fn upload(&mut self, mesh: &MeshBuffers) -> Result<(), EnvError>;

    /// Called once when the trail has fully faded out.
    ///
    /// Hosts that tear down the rendered object on completion do it here.
    fn finalize(&mut self) {}
}
