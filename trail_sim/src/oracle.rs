//! Ground truth motion for simulation.
//!
//! The oracle is the simulated tracked object: a scripted pose as a
//! function of virtual time, optionally perturbed by seeded noise. It
//! implements `PoseSource`, so the runtime samples it exactly the way a
//! host would sample a scene-graph transform.

use nalgebra::{UnitQuaternion, Vector3};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use trail_env::{EnvError, Pose, PoseSource, TrailContext};

use crate::context::SimContext;

/// Scripted motion of the tracked object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MotionProfile {
    /// Parked at the origin
    Stationary,

    /// Constant velocity from the origin, no rotation
    Linear { velocity: Vector3<f32> },

    /// Circle in the XZ plane, yawed to face along the path
    Orbit { radius: f32, angular_speed: f32 },

    /// Slow advance along +X while rolling about the direction of travel
    Corkscrew { speed: f32, spin_rate: f32 },

    /// Bounded noise around the origin; each axis is clamped to ±amplitude
    Jitter { amplitude: f32 },
}

impl MotionProfile {
    /// Noise-free pose at time `t` seconds.
    pub fn pose_at(&self, t: f32) -> Pose {
        match *self {
            MotionProfile::Stationary | MotionProfile::Jitter { .. } => Pose::default(),
            MotionProfile::Linear { velocity } => Pose::at(velocity * t),
            MotionProfile::Orbit { radius, angular_speed } => {
                let theta = angular_speed * t;
                Pose::new(
                    Vector3::new(radius * theta.cos(), 0.0, radius * theta.sin()),
                    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -theta),
                )
            }
            MotionProfile::Corkscrew { speed, spin_rate } => Pose::new(
                Vector3::new(speed * t, 0.0, 0.0),
                UnitQuaternion::from_axis_angle(&Vector3::x_axis(), spin_rate * t),
            ),
        }
    }
}

/// Pose source driven by the simulation clock.
pub struct MotionOracle {
    context: Arc<SimContext>,
    profile: MotionProfile,

    /// Deterministic RNG for jitter
    motion_rng: ChaCha8Rng,

    /// Per-axis noise, `None` for noise-free profiles
    noise: Option<Normal<f32>>,

    /// Once set, sampling fails as if the host object was destroyed
    detached: bool,

    samples: u64,
}

impl MotionOracle {
    /// Creates an oracle reading time from `context`.
    pub fn new(context: Arc<SimContext>, profile: MotionProfile, motion_seed: u64) -> Self {
        let noise = match profile {
            MotionProfile::Jitter { amplitude } if amplitude > 0.0 => {
                Normal::new(0.0, amplitude * 0.5).ok()
            }
            _ => None,
        };

        Self {
            context,
            profile,
            motion_rng: ChaCha8Rng::seed_from_u64(motion_seed),
            noise,
            detached: false,
            samples: 0,
        }
    }

    pub fn profile(&self) -> &MotionProfile {
        &self.profile
    }

    /// Number of successful samples taken.
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Simulates the host object being removed.
    pub fn detach(&mut self) {
        self.detached = true;
    }

    /// Ground truth pose at the current virtual time, without noise.
    pub fn ground_truth(&self) -> Pose {
        self.profile.pose_at(self.context.now_secs() as f32)
    }
}

impl PoseSource for MotionOracle {
    fn sample_pose(&mut self) -> Result<Pose, EnvError> {
        if self.detached {
            return Err(EnvError::detached("simulated object removed"));
        }

        let mut pose = self.ground_truth();

        if let (Some(noise), MotionProfile::Jitter { amplitude }) = (&self.noise, self.profile) {
            let rng = &mut self.motion_rng;
            let offset = Vector3::from_fn(|_, _| noise.sample(rng).clamp(-amplitude, amplitude));
            pose.position += offset;
        }

        self.samples += 1;
        Ok(pose)
    }
}
