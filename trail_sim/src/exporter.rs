//! JSON exporter for offline inspection of a run.
//!
//! Each frame carries the live points and what the sink was told, enough
//! to replay the ribbon in an external viewer.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use trail_core::TickOutcome;

use crate::error::SimError;
use crate::runner::ScenarioResult;
use crate::simulated::SimulatedTrail;

/// A single frame of simulation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Simulation time in seconds
    pub time_sec: f64,

    /// `rebuilt`, `fading`, `hidden` or `finalized`
    pub outcome: String,

    pub emitting: bool,

    /// Alpha as last written to the sink
    pub alpha: f32,

    /// Live points, oldest first
    pub points: Vec<PointSample>,

    pub vertex_count: usize,
    pub triangle_count: usize,
}

/// Position and age of a live point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub age: f64,
}

impl SimFrame {
    /// Snapshots the trail after a step.
    pub fn capture(sim: &SimulatedTrail, outcome: &TickOutcome) -> Self {
        let now = sim.time_secs();
        let trail = sim.trail();
        let mesh = sim.sink().last_mesh();

        let outcome = match outcome {
            TickOutcome::Hidden => "hidden",
            TickOutcome::Fading { .. } => "fading",
            TickOutcome::Finalized => "finalized",
            TickOutcome::Rebuilt { .. } => "rebuilt",
        };

        Self {
            time_sec: now,
            outcome: outcome.to_string(),
            emitting: trail.is_emitting(),
            alpha: sim.sink().alpha(),
            points: trail
                .points()
                .iter()
                .map(|p| PointSample {
                    x: p.position.x,
                    y: p.position.y,
                    z: p.position.z,
                    age: p.age(now),
                })
                .collect(),
            vertex_count: mesh.vertices.len(),
            triangle_count: mesh.triangle_count(),
        }
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    pub tick_rate_hz: u32,

    /// Duration in seconds
    pub duration_sec: f64,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64, tick_rate_hz: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            tick_rate_hz,
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Records the verdict of the run.
    pub fn finalize(&mut self, result: &ScenarioResult) {
        self.passed = result.passed;
        self.failure_reason = result.failure_reason.clone();
        self.duration_sec = result.final_time_secs;
    }

    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes to a JSON file.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SimError> {
        let json = self.to_json()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_json_shape() {
        let mut export = SimExport::new("dash", 42, 30);
        export.add_frame(SimFrame {
            time_sec: 0.5,
            outcome: "rebuilt".to_string(),
            emitting: true,
            alpha: 1.0,
            points: vec![PointSample { x: 1.0, y: 0.0, z: 0.0, age: 0.0 }],
            vertex_count: 4,
            triangle_count: 2,
        });

        let value: serde_json::Value = serde_json::from_str(&export.to_json().unwrap()).unwrap();
        assert_eq!(value["scenario"], "dash");
        assert_eq!(value["duration_sec"], 0.5);
        assert_eq!(value["frames"][0]["points"][0]["x"], 1.0);
        assert!(value.get("failure_reason").is_none());
    }
}
