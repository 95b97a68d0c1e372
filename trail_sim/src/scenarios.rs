//! Scripted motion and emission schedules for the simulator.

use nalgebra::Vector3;
use trail_core::TrailConfig;

use crate::oracle::MotionProfile;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Straight line faster than the max vertex distance per tick
    Dash,

    /// Sub-threshold jitter around a fixed point
    Hover,

    /// Steady circle, turning and moving at once
    Orbit,

    /// Slow advance while rolling, insertion driven by angle
    Corkscrew,

    /// Fast motion at full alpha, then emission stops and the ribbon fades out
    FadeOut,

    /// Same as `FadeOut` on a half-transparent material
    DimFade,

    /// Parked object stops emitting and its points expire
    Starve,

    /// Fast motion into a tiny ring
    Overflow,

    /// Zero segment lifetime
    Degenerate,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Dash,
            ScenarioId::Hover,
            ScenarioId::Orbit,
            ScenarioId::Corkscrew,
            ScenarioId::FadeOut,
            ScenarioId::DimFade,
            ScenarioId::Starve,
            ScenarioId::Overflow,
            ScenarioId::Degenerate,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Dash => "dash",
            ScenarioId::Hover => "hover",
            ScenarioId::Orbit => "orbit",
            ScenarioId::Corkscrew => "corkscrew",
            ScenarioId::FadeOut => "fade_out",
            ScenarioId::DimFade => "dim_fade",
            ScenarioId::Starve => "starve",
            ScenarioId::Overflow => "overflow",
            ScenarioId::Degenerate => "degenerate",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Dash => "1.5x max vertex distance per tick, a point inserted every tick",
            ScenarioId::Hover => "Jitter under the min vertex distance, point count pinned at 2",
            ScenarioId::Orbit => "Circle at 1.5 rad/s, ribbon rebuilt every tick",
            ScenarioId::Corkscrew => "Creeping roll, points inserted by angle only",
            ScenarioId::FadeOut => "Emission stops halfway, alpha 1 decays to 0 as points expire, then finalizes",
            ScenarioId::DimFade => "Alpha 0.5 fades out in a quarter lifetime with geometry intact",
            ScenarioId::Starve => "Parked and not emitting, hidden once points expire, finalized when alpha hits 0",
            ScenarioId::Overflow => "Ring capped at 8 points, oldest dropped on overflow",
            ScenarioId::Degenerate => "Zero lifetime, nothing is ever rendered",
        }
    }

    /// Trail configuration for this scenario, derived from `base`.
    pub fn config(&self, base: &TrailConfig) -> TrailConfig {
        let base = base.clone().sanitized();
        match self {
            ScenarioId::Overflow => base.with_maximum_points(8),
            ScenarioId::Degenerate => base.with_lifetime(0.0),
            _ => base,
        }
    }

    /// Motion of the tracked object given the effective config and tick rate.
    pub fn motion(&self, config: &TrailConfig, tick_rate_hz: u32) -> MotionProfile {
        let hz = tick_rate_hz.max(1) as f32;
        let min = config.min_vertex_distance;
        let max = config.max_vertex_distance;

        match self {
            ScenarioId::Dash
            | ScenarioId::FadeOut
            | ScenarioId::DimFade
            | ScenarioId::Overflow
            | ScenarioId::Degenerate => {
                let per_tick = (max * 1.5).max(0.5);
                MotionProfile::Linear { velocity: Vector3::new(per_tick * hz, 0.0, 0.0) }
            }
            // Any two samples differ by at most 2·√3·amplitude < min
            ScenarioId::Hover => MotionProfile::Jitter { amplitude: min * 0.25 },
            ScenarioId::Orbit => MotionProfile::Orbit { radius: 3.0, angular_speed: 1.5 },
            ScenarioId::Corkscrew => MotionProfile::Corkscrew {
                speed: (min * 0.45).max(max * 0.04) * hz,
                spin_rate: (config.max_angle + 5.0).to_radians() * hz,
            },
            ScenarioId::Starve => MotionProfile::Stationary,
        }
    }

    /// Material alpha the sink starts with.
    pub fn initial_alpha(&self) -> f32 {
        match self {
            ScenarioId::DimFade => 0.5,
            _ => 1.0,
        }
    }

    /// Virtual time at which emission is switched off, if ever.
    pub fn stop_time(&self, lifetime: f64, duration: f64) -> Option<f64> {
        match self {
            ScenarioId::FadeOut | ScenarioId::DimFade => Some(duration * 0.5),
            ScenarioId::Starve => Some(lifetime * 0.5),
            _ => None,
        }
    }

    /// Shortest run that lets the scenario reach its end state.
    pub fn min_duration(&self, lifetime: f64) -> f64 {
        match self {
            ScenarioId::FadeOut | ScenarioId::DimFade => lifetime * 4.0,
            ScenarioId::Starve => lifetime * 3.0,
            ScenarioId::Hover => lifetime * 2.5,
            _ => 1.0,
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dash" => Ok(ScenarioId::Dash),
            "hover" => Ok(ScenarioId::Hover),
            "orbit" => Ok(ScenarioId::Orbit),
            "corkscrew" => Ok(ScenarioId::Corkscrew),
            "fade_out" | "fadeout" => Ok(ScenarioId::FadeOut),
            "dim_fade" | "dimfade" => Ok(ScenarioId::DimFade),
            "starve" => Ok(ScenarioId::Starve),
            "overflow" => Ok(ScenarioId::Overflow),
            "degenerate" => Ok(ScenarioId::Degenerate),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
            assert_eq!(scenario.to_string(), scenario.name());
        }
        assert!("split_brain".parse::<ScenarioId>().is_err());
        assert_eq!("FadeOut".parse::<ScenarioId>(), Ok(ScenarioId::FadeOut));
    }

    #[test]
    fn test_scenario_configs() {
        let base = TrailConfig::default();
        assert_eq!(ScenarioId::Overflow.config(&base).maximum_points, 8);
        assert!(ScenarioId::Degenerate.config(&base).is_degenerate());
        assert_eq!(ScenarioId::Dash.config(&base), base.clone().sanitized());
    }

    #[test]
    fn test_dash_outruns_max_distance() {
        let config = TrailConfig::default();
        let MotionProfile::Linear { velocity } = ScenarioId::Dash.motion(&config, 30) else {
            panic!("dash should be linear");
        };
        assert!(velocity.x / 30.0 > config.max_vertex_distance);
    }

    #[test]
    fn test_fade_scenarios_alpha() {
        assert_eq!(ScenarioId::FadeOut.initial_alpha(), 1.0);
        assert_eq!(ScenarioId::DimFade.initial_alpha(), 0.5);
        assert_eq!(ScenarioId::DimFade.stop_time(1.0, 4.0), Some(2.0));
    }
}
