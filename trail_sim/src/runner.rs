//! Scenario runner - drives one trail through a scripted scenario.
//!
//! Every tick is checked against the invariants in [`crate::invariants`];
//! the scenario's own end-state assertions run once the clock stops.

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use trail_core::{HistoryStats, SampleDecision, TickOutcome, TrailConfig};
use trail_env::TrailId;

use crate::context::SimContext;
use crate::error::SimError;
use crate::exporter::{SimExport, SimFrame};
use crate::invariants;
use crate::oracle::MotionOracle;
use crate::scenarios::ScenarioId;
use crate::simulated::SimulatedTrail;
use crate::sink::RecordingSink;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Live points at the end of the run
    pub final_point_count: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioMetrics {
    /// Ticks taken while emission was on
    pub emitting_ticks: u64,

    pub rebuilds: u64,
    pub fading_ticks: u64,
    pub hidden_ticks: u64,
    pub finalized_ticks: u64,

    /// Per-tick sampling decisions
    pub inserted_distance: u64,
    pub inserted_angle: u64,
    pub resampled: u64,

    /// Largest live point count observed
    pub max_points: usize,

    /// Fading ticks whose alpha did not drop below the previous one
    pub alpha_stalls: u64,

    /// Non-`Finalized` outcomes seen after the first `Finalized`
    pub post_finalize_updates: u64,

    /// Virtual time when emission was switched off
    pub stopped_at: Option<f64>,

    /// Virtual time of the first `Finalized` outcome
    pub finalized_at: Option<f64>,

    /// Counters from the point history
    pub history: HistoryStats,
}

/// Folds tick outcomes into metrics.
#[derive(Default)]
struct Observer {
    metrics: ScenarioMetrics,
    last_fade_alpha: Option<f32>,
    last_outcome: Option<TickOutcome>,
}

impl Observer {
    fn record(&mut self, now: f64, sim: &SimulatedTrail, emitting: bool, outcome: TickOutcome) {
        let m = &mut self.metrics;
        if emitting {
            m.emitting_ticks += 1;
        }

        if m.finalized_at.is_some() && outcome != TickOutcome::Finalized {
            m.post_finalize_updates += 1;
        }

        match outcome {
            TickOutcome::Hidden => m.hidden_ticks += 1,
            TickOutcome::Fading { alpha } => {
                m.fading_ticks += 1;
                if self.last_fade_alpha.is_some_and(|last| alpha >= last) {
                    m.alpha_stalls += 1;
                }
            }
            TickOutcome::Finalized => {
                m.finalized_ticks += 1;
                m.finalized_at.get_or_insert(now);
            }
            TickOutcome::Rebuilt { .. } => m.rebuilds += 1,
        }
        self.last_fade_alpha = match outcome {
            TickOutcome::Fading { alpha } => Some(alpha),
            _ => None,
        };

        // A finalized trail does not sample, so its last decision is stale
        if !sim.trail().is_finalized() {
            match sim.trail().last_decision() {
                SampleDecision::InsertedDistance => m.inserted_distance += 1,
                SampleDecision::InsertedAngle => m.inserted_angle += 1,
                SampleDecision::Resampled => m.resampled += 1,
                SampleDecision::Idle => {}
            }
        }

        m.max_points = m.max_points.max(sim.trail().point_count());
        self.last_outcome = Some(outcome);
    }
}

/// Runs trail scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Tick rate in Hz
    tick_rate_hz: u32,

    /// Requested duration in seconds; scenarios may extend it
    max_duration_secs: f64,

    /// Configuration each scenario derives its own from
    base_config: TrailConfig,

    /// Export every Nth tick
    export_interval: u64,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            tick_rate_hz: 30,
            max_duration_secs: 10.0,
            base_config: TrailConfig::default(),
            export_interval: 1,
        }
    }

    /// Sets the tick rate.
    pub fn with_tick_rate(mut self, hz: u32) -> Self {
        self.tick_rate_hz = hz.max(1);
        self
    }

    /// Sets the maximum duration.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.max_duration_secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
        self
    }

    /// Sets the base trail configuration.
    pub fn with_config(mut self, config: TrailConfig) -> Self {
        self.base_config = config;
        self
    }

    /// Sets how often frames are exported.
    pub fn with_export_interval(mut self, ticks: u64) -> Self {
        self.export_interval = ticks.max(1);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.execute(scenario, None)
    }

    /// Runs a scenario, recording frames into `export`.
    pub fn run_with_export(&self, scenario: ScenarioId, export: &mut SimExport) -> ScenarioResult {
        let result = self.execute(scenario, Some(&mut *export));
        export.finalize(&result);
        result
    }

    fn execute(&self, scenario: ScenarioId, mut export: Option<&mut SimExport>) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);
        debug!("  {}", scenario.description());

        let config = scenario.config(&self.base_config);
        let lifetime = config.segment_lifetime;
        let tick_rate = self.tick_rate_hz;
        let dt = 1.0 / tick_rate as f64;

        let duration = self.max_duration_secs.max(scenario.min_duration(lifetime));
        if duration > self.max_duration_secs {
            debug!("  extending run to {:.2}s", duration);
        }
        let target_ticks = (duration * tick_rate as f64).ceil() as u64;
        let stop_tick = scenario
            .stop_time(lifetime, duration)
            .map(|t| (t * tick_rate as f64).round() as u64);

        let context = SimContext::shared(self.seed);
        let motion_seed = self.seed.wrapping_mul(0x9e3779b97f4a7c15);
        let oracle = MotionOracle::new(context.clone(), scenario.motion(&config, tick_rate), motion_seed);
        let sink = RecordingSink::new(scenario.initial_alpha());
        let mut sim = SimulatedTrail::new(TrailId::from_seed(self.seed), context.clone(), oracle, sink, config);

        let mut observer = Observer::default();
        let mut failure: Option<SimError> = None;
        let mut ticks_run = 0;

        for tick in 0..target_ticks {
            if stop_tick == Some(tick) {
                debug!("  t={:.2}s | emission off", sim.time_secs());
                sim.set_emitting(false);
                observer.metrics.stopped_at = Some(sim.time_secs());
            }

            let emitting = sim.trail().is_emitting();
            let outcome = match sim.step() {
                Ok(outcome) => outcome,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            };
            ticks_run += 1;

            let now = sim.time_secs();
            if let Err(reason) = invariants::check_tick(sim.trail(), now, &outcome) {
                failure = Some(SimError::invariant(now, reason));
                break;
            }
            observer.record(now, &sim, emitting, outcome);

            if let Some(export) = export.as_deref_mut() {
                if tick % self.export_interval == 0 {
                    export.add_frame(SimFrame::capture(&sim, &outcome));
                }
            }

            if tick % tick_rate as u64 == 0 {
                debug!(
                    "  t={:.1}s | points={} | alpha={:.3} | {:?}",
                    now,
                    sim.trail().point_count(),
                    sim.trail().global_alpha(),
                    outcome
                );
            }

            context.advance_time(Duration::from_secs_f64(dt));
        }

        observer.metrics.history = sim.trail().stats();

        if failure.is_none() {
            failure = verdict(scenario, &observer, &sim, lifetime, dt).err();
        }

        let passed = failure.is_none();
        if passed {
            info!(
                "✓ {} complete: {} ticks, {} inserted, {} expired",
                scenario.name(),
                ticks_run,
                observer.metrics.history.inserted,
                observer.metrics.history.expired
            );
        } else {
            warn!("✗ {} failed after {} ticks", scenario.name(), ticks_run);
        }

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed,
            total_ticks: ticks_run,
            final_time_secs: sim.time_secs(),
            final_point_count: sim.trail().point_count(),
            failure_reason: failure.map(|e| e.to_string()),
            metrics: observer.metrics,
        }
    }
}

fn ensure(ok: bool, time: f64, reason: impl FnOnce() -> String) -> Result<(), SimError> {
    if ok {
        Ok(())
    } else {
        Err(SimError::invariant(time, reason()))
    }
}

/// End-of-run assertions specific to each scenario.
fn verdict(
    scenario: ScenarioId,
    observer: &Observer,
    sim: &SimulatedTrail,
    lifetime: f64,
    dt: f64,
) -> Result<(), SimError> {
    let m = &observer.metrics;
    let now = sim.time_secs();

    match scenario {
        ScenarioId::Dash => ensure(m.inserted_distance + 1 == m.emitting_ticks, now, || {
            format!(
                "{} distance insertions over {} ticks, expected one per tick after the first",
                m.inserted_distance, m.emitting_ticks
            )
        }),
        ScenarioId::Hover => {
            ensure(m.inserted_distance + m.inserted_angle == 0, now, || {
                format!("jitter inserted {} points", m.inserted_distance + m.inserted_angle)
            })?;
            ensure(m.max_points == 2, now, || format!("point count reached {}", m.max_points))
        }
        ScenarioId::Orbit => {
            ensure(m.rebuilds == m.emitting_ticks, now, || {
                format!("{} rebuilds over {} emitting ticks", m.rebuilds, m.emitting_ticks)
            })?;
            ensure(m.inserted_distance + m.inserted_angle > 0, now, || {
                "orbit never inserted a point".to_string()
            })
        }
        ScenarioId::Corkscrew => ensure(m.inserted_angle > 0 && m.inserted_distance == 0, now, || {
            format!(
                "{} angle / {} distance insertions, expected angle only",
                m.inserted_angle, m.inserted_distance
            )
        }),
        ScenarioId::FadeOut => fade_verdict(observer, sim, lifetime, dt),
        ScenarioId::DimFade => {
            // A quarter-lifetime fade ends while the geometry is still intact
            ensure(m.hidden_ticks == 0, now, || format!("hidden on {} ticks", m.hidden_ticks))?;
            fade_verdict(observer, sim, lifetime, dt)
        }
        ScenarioId::Starve => {
            ensure(m.hidden_ticks > 0, now, || "never hidden after points expired".to_string())?;
            ensure(observer.last_outcome == Some(TickOutcome::Finalized), now, || {
                format!("last outcome {:?}", observer.last_outcome)
            })?;
            fade_verdict(observer, sim, lifetime, dt)
        }
        ScenarioId::Overflow => {
            let capacity = sim.trail().points().capacity();
            ensure(m.history.overflow_dropped > 0 && m.max_points <= capacity, now, || {
                format!(
                    "{} overflow drops, max {} points for capacity {}",
                    m.history.overflow_dropped, m.max_points, capacity
                )
            })
        }
        ScenarioId::Degenerate => ensure(m.rebuilds == 0 && m.max_points == 0, now, || {
            format!("{} rebuilds, max {} points", m.rebuilds, m.max_points)
        }),
    }
}

/// Shared end state of every fade-out: finalized within one lifetime of the
/// stop, alpha strictly falling, the sink closed once and no points left.
fn fade_verdict(observer: &Observer, sim: &SimulatedTrail, lifetime: f64, dt: f64) -> Result<(), SimError> {
    let m = &observer.metrics;
    let now = sim.time_secs();

    let faded_in_time = match (m.stopped_at, m.finalized_at) {
        (Some(stop), Some(done)) => done - stop <= lifetime + dt + 1e-9,
        _ => false,
    };
    ensure(faded_in_time, now, || {
        format!("stopped at {:?}, finalized at {:?}", m.stopped_at, m.finalized_at)
    })?;
    ensure(m.alpha_stalls == 0, now, || format!("alpha stalled on {} ticks", m.alpha_stalls))?;
    ensure(m.post_finalize_updates == 0, now, || {
        format!("{} updates after finalize", m.post_finalize_updates)
    })?;
    ensure(sim.trail().point_count() == 0, now, || {
        format!("{} points survived the fade", sim.trail().point_count())
    })?;

    let sink = sim.sink();
    ensure(sink.finalize_count() == 1 && sink.alpha() == 0.0 && !sink.is_visible(), now, || {
        format!(
            "sink left with finalize_count={} alpha={} visible={}",
            sink.finalize_count(),
            sink.alpha(),
            sink.is_visible()
        )
    })
}
