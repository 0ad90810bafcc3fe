//! Diagnostics sinks
//!
//! The engine reports what it sees through [`DiagnosticsSink`]: fuzzification
//! summaries, rule activations and malformed conditions. Sinks are one-way;
//! nothing they do can change an inference result.

use std::sync::Mutex;

use crate::condition::ConditionError;
use crate::fuzzy::{DegreeMap, FuzzySnapshot};
use crate::rules::Rule;

use super::SensorSample;

/// Observer for inference events
///
/// All methods default to no-ops so implementations pick what they need.
pub trait DiagnosticsSink: Send + Sync {
    /// Called once per sample after fuzzification
    fn on_fuzzified(&self, _sample: &SensorSample, _snapshot: &FuzzySnapshot) {}

    /// Called for each rule whose condition held
    fn on_rule_activated(&self, _rule: &Rule) {}

    /// Called when a rule's condition could not be parsed
    fn on_condition_error(&self, _rule: &Rule, _error: &ConditionError) {}
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticsSink for NullSink {}

/// Emits events through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn on_fuzzified(&self, sample: &SensorSample, snapshot: &FuzzySnapshot) {
        tracing::info!(
            time = sample.time,
            light = sample.light,
            weather = %sample.weather,
            "sensor sample"
        );
        tracing::debug!(
            light = %snapshot.light,
            time = %snapshot.time,
            weather = %snapshot.weather,
            dominant_light = dominant_label(&snapshot.light),
            dominant_time = dominant_label(&snapshot.time),
            dominant_weather = dominant_label(&snapshot.weather),
            "fuzzified"
        );
    }

    fn on_rule_activated(&self, rule: &Rule) {
        tracing::info!(
            rule = %rule.name,
            priority = rule.priority,
            action = %rule.action_name,
            "rule activated"
        );
    }

    fn on_condition_error(&self, rule: &Rule, error: &ConditionError) {
        tracing::warn!(
            rule = %rule.name,
            condition = %rule.condition,
            error = %error,
            "malformed condition, rule skipped"
        );
    }
}

/// Name of the strongest category, or "none" when every degree is zero
fn dominant_label(degrees: &DegreeMap) -> &str {
    degrees.dominant().map(|(name, _)| name).unwrap_or("none")
}

/// A recorded diagnostic event
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    Fuzzified {
        sample: SensorSample,
        snapshot: FuzzySnapshot,
    },
    RuleActivated {
        rule: String,
    },
    ConditionError {
        rule: String,
        condition: String,
        error: ConditionError,
    },
}

/// Records events in memory, mostly for tests
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<Diagnostic> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Only the condition failures
    pub fn condition_errors(&self) -> Vec<Diagnostic> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, Diagnostic::ConditionError { .. }))
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }

    fn record(&self, event: Diagnostic) {
        // a poisoned sink just stops recording
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl DiagnosticsSink for CollectingSink {
    fn on_fuzzified(&self, sample: &SensorSample, snapshot: &FuzzySnapshot) {
        self.record(Diagnostic::Fuzzified {
            sample: sample.clone(),
            snapshot: snapshot.clone(),
        });
    }

    fn on_rule_activated(&self, rule: &Rule) {
        self.record(Diagnostic::RuleActivated {
            rule: rule.name.clone(),
        });
    }

    fn on_condition_error(&self, rule: &Rule, error: &ConditionError) {
        self.record(Diagnostic::ConditionError {
            rule: rule.name.clone(),
            condition: rule.condition.clone(),
            error: error.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuzzy::Fuzzifier;

    #[test]
    fn test_collecting_sink_records_in_order() {
        let sink = CollectingSink::new();
        let sample = SensorSample::new(7.5, 0.4, "cloudy");
        let snapshot = Fuzzifier::default().fuzzify(&sample);
        let rule = Rule::new("dawn", "time < 8", 1, "dim");

        sink.on_fuzzified(&sample, &snapshot);
        sink.on_rule_activated(&rule);
        sink.on_condition_error(&rule, &ConditionError::UnexpectedEof);

        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], Diagnostic::Fuzzified { .. }));
        assert_eq!(events[1], Diagnostic::RuleActivated { rule: "dawn".to_string() });
        assert_eq!(sink.condition_errors().len(), 1);

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_dominant_labels() {
        let fuzzifier = Fuzzifier::default();
        let snapshot = fuzzifier.fuzzify(&SensorSample::new(12.0, 0.9, "clear"));
        assert_eq!(dominant_label(&snapshot.light), "light");
        assert_eq!(dominant_label(&snapshot.time), "day");
        assert_eq!(dominant_label(&snapshot.weather), "clear");

        let snapshot = fuzzifier.fuzzify(&SensorSample::new(12.0, 5.0, "hail"));
        assert_eq!(dominant_label(&snapshot.light), "none");
        assert_eq!(dominant_label(&snapshot.weather), "none");
    }

    #[test]
    fn test_null_and_tracing_sinks_accept_events() {
        let sample = SensorSample::new(12.0, 0.9, "clear");
        let snapshot = Fuzzifier::default().fuzzify(&sample);
        let rule = Rule::new("noon", "time = 12", 1, "off");

        for sink in [&NullSink as &dyn DiagnosticsSink, &TracingSink] {
            sink.on_fuzzified(&sample, &snapshot);
            sink.on_rule_activated(&rule);
            sink.on_condition_error(&rule, &ConditionError::UnexpectedEof);
        }
    }
}
