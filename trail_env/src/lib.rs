//! Trail Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" boundary that lets the trail core run
//! inside a real rendering host or inside the deterministic simulator.
//!
//! # Core Concept: Sample, Build, Sink
//!
//! Everything the core needs from the outside world goes through three seams:
//! - Time (`TrailContext::now()`)
//! - The tracked transform (`PoseSource::sample_pose()`)
//! - The mesh consumer and material alpha (`MeshSink`)
//!
//! Swapping these implementations swaps the host without touching the
//! ribbon algorithm.
//!
//! # Example
//!
//! ```ignore
//! use trail_env::{TrailContext, PoseSource, MeshSink};
//!
//! fn frame<Ctx: TrailContext, Src: PoseSource, Sink: MeshSink>(
//!     runtime: &mut TrailRuntime<Ctx, Src, Sink>,
//! ) -> Result<(), TrailError> {
//!     runtime.step()?;
//!     Ok(())
//! }
//! ```

mod context;
mod host;
mod types;
mod error;
mod system_impl;

pub use context::TrailContext;
pub use host::{PoseSource, MeshSink};
pub use types::{TrailId, Pose, Rgba, MeshBuffers};
pub use error::EnvError;
pub use system_impl::SystemContext;
