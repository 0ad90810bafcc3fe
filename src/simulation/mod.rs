//! Street light simulator
//!
//! Drives the inference engine with synthetic sensor readings: a clock that
//! advances one hour per tick, weather that occasionally changes at random
//! and an ambient light level derived from both. Each tick picks the winning
//! rule by priority, or keeps the current state when nothing fires.

use std::fmt;
use std::ops::ControlFlow;
use std::thread;
use std::time::Duration;

use serde::Serialize;

use crate::config::SimulationConfig;
use crate::engine::{InferenceEngine, SensorSample};
use crate::error::LightResult;
use crate::rules::{select_action, Rule};

/// Label used when no rule fires
pub const KEEP_CURRENT_STATE: &str = "keep current state";

/// Ambient light for an hour and weather, with `jitter` in `[-1, 1]`
/// scaling the random spread around the base level.
///
/// Daytime (06:00 to 18:00 inclusive) is 0.7 ± 0.2, night is 0.2 ± 0.1.
/// Rain takes 0.3 off and clouds 0.2, never below 0.1.
pub fn ambient_light(hour: u32, weather: &str, jitter: f64) -> f64 {
    let jitter = jitter.clamp(-1.0, 1.0);
    let base = if (6..=18).contains(&hour) {
        0.7 + 0.2 * jitter
    } else {
        0.2 + 0.1 * jitter
    };

    let level = match weather {
        "rainy" => (base - 0.3).max(0.1),
        "cloudy" => (base - 0.2).max(0.1),
        _ => base,
    };

    level.clamp(0.0, 1.0)
}

/// Outcome of one simulated hour
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    /// Hour of day after advancing the clock
    pub hour: u32,
    pub weather: String,
    pub light: f64,
    pub weather_changed: bool,
    /// All activated rules in priority order
    pub activated: Vec<Rule>,
    /// The winning rule, if any fired
    pub selected: Option<Rule>,
}

impl TickReport {
    /// Action to apply for this tick
    pub fn action(&self) -> &str {
        self.selected
            .as_ref()
            .map(|rule| rule.action_name.as_str())
            .unwrap_or(KEEP_CURRENT_STATE)
    }
}

impl fmt::Display for TickReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:00 | weather: {} | light: {:.2} | ",
            self.hour, self.weather, self.light
        )?;
        match &self.selected {
            Some(rule) => write!(f, "action: {} (rule: {})", rule.action_name, rule.name),
            None => write!(f, "action: {}", KEEP_CURRENT_STATE),
        }
    }
}

/// Hour-by-hour street light simulation
pub struct StreetLightSimulator {
    engine: InferenceEngine,
    settings: SimulationConfig,
    weather_states: Vec<String>,
    hour: u32,
    current_weather: String,
    rng: fastrand::Rng,
}

impl StreetLightSimulator {
    pub fn new(engine: InferenceEngine, settings: SimulationConfig) -> Self {
        let weather_states = engine.fuzzifier().weather_categories().to_vec();
        let current_weather = weather_states
            .first()
            .cloned()
            .unwrap_or_else(|| "clear".to_string());
        let rng = match settings.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };

        StreetLightSimulator {
            engine,
            hour: settings.start_hour % 24,
            settings,
            weather_states,
            current_weather,
            rng,
        }
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn current_weather(&self) -> &str {
        &self.current_weather
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    /// Advance one hour and run inference on the new readings
    pub fn simulate_hour(&mut self) -> LightResult<TickReport> {
        self.hour = (self.hour + 1) % 24;

        let mut weather_changed = false;
        if !self.weather_states.is_empty() && self.rng.f64() < self.settings.weather_change_chance {
            let next = self.weather_states[self.rng.usize(..self.weather_states.len())].clone();
            weather_changed = next != self.current_weather;
            self.current_weather = next;
        }

        let jitter = self.rng.f64() * 2.0 - 1.0;
        let light = ambient_light(self.hour, &self.current_weather, jitter);

        let sample = SensorSample::new(self.hour as f64, light, self.current_weather.clone());
        let outcome = self.engine.evaluate_sample(&sample)?;
        let selected = select_action(&outcome.activated).cloned();

        let report = TickReport {
            hour: self.hour,
            weather: self.current_weather.clone(),
            light,
            weather_changed,
            activated: outcome.activated,
            selected,
        };

        tracing::info!(
            hour = report.hour,
            weather = %report.weather,
            light = report.light,
            activated = report.activated.len(),
            action = %report.action(),
            "tick"
        );

        Ok(report)
    }

    /// Run for `hours` ticks, sleeping `tick_ms` between them
    pub fn run(&mut self, hours: u32) -> LightResult<Vec<TickReport>> {
        let mut reports = Vec::new();
        self.run_with(hours, |report| {
            reports.push(report.clone());
            ControlFlow::Continue(())
        })?;
        Ok(reports)
    }

    /// Stream up to `hours` ticks to `on_tick` without keeping them.
    ///
    /// Stops early when `on_tick` breaks. Returns the number of ticks run.
    pub fn run_with<F>(&mut self, hours: u32, mut on_tick: F) -> LightResult<u32>
    where
        F: FnMut(&TickReport) -> ControlFlow<()>,
    {
        tracing::info!(
            hours,
            start_hour = self.hour,
            rules = %self.engine.rule_source().describe(),
            "starting street light simulation"
        );

        let delay = Duration::from_millis(self.settings.tick_ms);
        let mut ticks = 0;

        while ticks < hours {
            let report = self.simulate_hour()?;
            ticks += 1;
            if on_tick(&report).is_break() {
                break;
            }

            if !delay.is_zero() && ticks < hours {
                thread::sleep(delay);
            }
        }

        tracing::info!(ticks, "simulation finished");
        Ok(ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LightError;
    use crate::fuzzy::Fuzzifier;
    use crate::rules::{MemoryRuleSource, RuleSource};
    use std::sync::Arc;

    fn settings(seed: u64) -> SimulationConfig {
        SimulationConfig {
            tick_ms: 0,
            seed: Some(seed),
            ..SimulationConfig::default()
        }
    }

    fn simulator(seed: u64) -> StreetLightSimulator {
        let rules = MemoryRuleSource::new(vec![
            Rule::new("night", "time BETWEEN 19 AND 23 OR time BETWEEN 0 AND 5", 1, "full"),
            Rule::new("dim", "light < 0.3", 2, "dim"),
        ]);
        let engine = InferenceEngine::new(Fuzzifier::default(), Arc::new(rules));
        StreetLightSimulator::new(engine, settings(seed))
    }

    #[test]
    fn test_ambient_light_day_and_night() {
        assert!((ambient_light(12, "clear", 0.0) - 0.7).abs() < 1e-9);
        assert!((ambient_light(18, "clear", 1.0) - 0.9).abs() < 1e-9);
        assert!((ambient_light(2, "clear", -1.0) - 0.1).abs() < 1e-9);
        assert!((ambient_light(19, "clear", 0.0) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_ambient_light_weather_floor() {
        assert!((ambient_light(12, "rainy", 0.0) - 0.4).abs() < 1e-9);
        assert!((ambient_light(12, "cloudy", 0.0) - 0.5).abs() < 1e-9);
        assert_eq!(ambient_light(2, "rainy", -1.0), 0.1);
        assert_eq!(ambient_light(22, "cloudy", 0.0), 0.1);
    }

    #[test]
    fn test_ambient_light_bounds() {
        for hour in 0..24 {
            for weather in ["clear", "cloudy", "rainy", "fog"] {
                for jitter in [-5.0, -1.0, 0.0, 0.5, 1.0, 5.0] {
                    let level = ambient_light(hour, weather, jitter);
                    assert!((0.0..=1.0).contains(&level));
                }
            }
        }
    }

    #[test]
    fn test_clock_wraps() {
        let mut sim = simulator(1);
        assert_eq!(sim.hour(), 18);
        let reports = sim.run(8).unwrap();
        let hours: Vec<u32> = reports.iter().map(|r| r.hour).collect();
        assert_eq!(hours, vec![19, 20, 21, 22, 23, 0, 1, 2]);
    }

    #[test]
    fn test_night_ticks_select_full() {
        let mut sim = simulator(3);
        let reports = sim.run(5).unwrap();
        for report in reports {
            assert_eq!(report.action(), "full");
            assert_eq!(report.selected.as_ref().unwrap().name, "night");
        }
    }

    #[test]
    fn test_keep_state_when_nothing_fires() {
        let engine = InferenceEngine::new(
            Fuzzifier::default(),
            Arc::new(MemoryRuleSource::new(vec![Rule::new("never", "light > 5", 1, "x")])),
        );
        let mut sim = StreetLightSimulator::new(engine, settings(5));
        let report = sim.simulate_hour().unwrap();
        assert!(report.selected.is_none());
        assert_eq!(report.action(), KEEP_CURRENT_STATE);
        assert!(report.to_string().ends_with(KEEP_CURRENT_STATE));
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let first = simulator(42).run(24).unwrap();
        let second = simulator(42).run(24).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_weather_stays_within_categories() {
        let mut sim = simulator(9);
        for report in sim.run(48).unwrap() {
            assert!(["clear", "cloudy", "rainy"].contains(&report.weather.as_str()));
        }
    }

    #[test]
    fn test_weather_fixed_without_change_chance() {
        let rules = MemoryRuleSource::new(vec![]);
        let engine = InferenceEngine::new(Fuzzifier::default(), Arc::new(rules));
        let mut sim = StreetLightSimulator::new(
            engine,
            SimulationConfig {
                weather_change_chance: 0.0,
                ..settings(4)
            },
        );
        for report in sim.run(24).unwrap() {
            assert_eq!(report.weather, "clear");
            assert!(!report.weather_changed);
        }
    }

    struct Unreachable;

    impl RuleSource for Unreachable {
        fn fetch_rules(&self) -> LightResult<Vec<Rule>> {
            Err(LightError::rule_source_unavailable("offline"))
        }
    }

    #[test]
    fn test_rule_source_failure_stops_run() {
        let engine = InferenceEngine::new(Fuzzifier::default(), Arc::new(Unreachable));
        let mut sim = StreetLightSimulator::new(engine, settings(2));
        assert!(sim.run(3).unwrap_err().is_rule_source());
    }

    #[test]
    fn test_run_with_streams_and_stops_early() {
        let mut sim = simulator(8);
        let mut seen = Vec::new();
        let ticks = sim
            .run_with(u32::MAX, |report| {
                seen.push(report.hour);
                if seen.len() == 3 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();
        assert_eq!(ticks, 3);
        assert_eq!(seen, vec![19, 20, 21]);
        assert_eq!(sim.hour(), 21);
    }
}
