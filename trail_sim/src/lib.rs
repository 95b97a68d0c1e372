//! Trail Deterministic Simulation Harness
//!
//! Runs a single trail against scripted motion on a virtual clock, so that
//! every run is reproducible from a seed and a tick rate.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ScenarioRunner                          │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │ SimContext (virtual clock, advanced once per tick)   │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │       │                                                     │
//! │  ┌────▼─────────┐    ┌───────────────┐    ┌─────────────┐   │
//! │  │ MotionOracle │──► │ SimulatedTrail│──► │RecordingSink│   │
//! │  │ (PoseSource) │    │ (TrailRuntime)│    │ (MeshSink)  │   │
//! │  └──────────────┘    └───────┬───────┘    └─────────────┘   │
//! │                              ▼                              │
//! │                 invariants + scenario verdict               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use trail_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).with_duration(5.0).run(ScenarioId::FadeOut);
//! assert!(result.passed);
//! ```

mod context;
mod error;
mod exporter;
mod invariants;
mod oracle;
mod runner;
mod simulated;
mod sink;
pub mod scenarios;

pub use context::SimContext;
pub use error::SimError;
pub use exporter::{PointSample, SimExport, SimFrame};
pub use invariants::check_tick;
pub use oracle::{MotionOracle, MotionProfile};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use simulated::SimulatedTrail;
pub use sink::RecordingSink;
