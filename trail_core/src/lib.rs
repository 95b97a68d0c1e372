//! Trail Core - Adaptive Point History and Ribbon Mesh Synthesis
//!
//! This library turns the motion of a single tracked transform into a
//! fading, tapering ribbon:
//! 1. **History**: a bounded ring of pose samples, expired by age and grown
//!    only where motion or turning warrants it
//! 2. **Ramps**: piecewise-linear color and width over each sample's age
//! 3. **Ribbon**: a triangle strip rebuilt every frame, or an alpha fade
//!    once emission stops

pub mod error;
pub mod trail_config;
pub mod trail_history;
pub mod trail_ramp;
pub mod trail_mesh;
pub mod trail_emitter;
pub mod trail_runtime;

// Re-export key types for convenience
pub use error::TrailError;
pub use trail_config::TrailConfig;
pub use trail_history::{HistoryStats, Point, PointHistory, SampleDecision};
pub use trail_ramp::{ColorRamp, WidthRamp};
pub use trail_mesh::{FadeState, FrameInput, RenderAction, RibbonBuilder};
pub use trail_emitter::Trail;
pub use trail_runtime::{TickOutcome, TrailRuntime};
