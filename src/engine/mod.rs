//! Inference engine
//!
//! One call per sensor sample:
//! 1. Fuzzify light, time and weather (reported to diagnostics only)
//! 2. Fetch the priority-ordered rules from the rule source
//! 3. Evaluate each rule's condition against the raw readings
//! 4. Return the activated rules in input order
//!
//! Malformed conditions count as "not activated" and are reported to the
//! diagnostics sink. Rule source failures are returned to the caller.

pub mod diagnostics;

pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticsSink, NullSink, TracingSink};

use std::sync::Arc;

use serde::Serialize;

use crate::condition::parse_condition;
use crate::error::LightResult;
use crate::fuzzy::{Fuzzifier, FuzzySnapshot};
use crate::rules::{select_action, Rule, RuleSource};

/// Raw readings for one evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorSample {
    /// Hour of day
    pub time: f64,
    /// Ambient light level
    pub light: f64,
    /// Weather category
    pub weather: String,
}

impl SensorSample {
    pub fn new(time: f64, light: f64, weather: impl Into<String>) -> Self {
        SensorSample {
            time,
            light,
            weather: weather.into(),
        }
    }
}

/// Activated rules together with the fuzzy view of the sample
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceOutcome {
    pub sample: SensorSample,
    pub fuzzy: FuzzySnapshot,
    pub activated: Vec<Rule>,
}

impl InferenceOutcome {
    /// Highest-priority activated rule
    pub fn selected(&self) -> Option<&Rule> {
        select_action(&self.activated)
    }
}

/// Fuzzy inference engine over an injected rule source
pub struct InferenceEngine {
    fuzzifier: Fuzzifier,
    rules: Arc<dyn RuleSource>,
    sink: Arc<dyn DiagnosticsSink>,
}

impl InferenceEngine {
    /// Engine with diagnostics discarded
    pub fn new(fuzzifier: Fuzzifier, rules: Arc<dyn RuleSource>) -> Self {
        Self::with_sink(fuzzifier, rules, Arc::new(NullSink))
    }

    pub fn with_sink(
        fuzzifier: Fuzzifier,
        rules: Arc<dyn RuleSource>,
        sink: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        InferenceEngine {
            fuzzifier,
            rules,
            sink,
        }
    }

    pub fn fuzzifier(&self) -> &Fuzzifier {
        &self.fuzzifier
    }

    pub fn rule_source(&self) -> &dyn RuleSource {
        self.rules.as_ref()
    }

    /// Rules whose condition holds for the readings, in rule source order
    pub fn process_sensors(&self, time: f64, light: f64, weather: &str) -> LightResult<Vec<Rule>> {
        let sample = SensorSample::new(time, light, weather);
        Ok(self.evaluate_sample(&sample)?.activated)
    }

    /// Full inference for one sample
    pub fn evaluate_sample(&self, sample: &SensorSample) -> LightResult<InferenceOutcome> {
        let fuzzy = self.fuzzifier.fuzzify(sample);
        self.sink.on_fuzzified(sample, &fuzzy);

        let rules = self.rules.fetch_rules()?;
        let activated = self.activate(rules, sample);

        Ok(InferenceOutcome {
            sample: sample.clone(),
            fuzzy,
            activated,
        })
    }

    fn activate(&self, rules: Vec<Rule>, sample: &SensorSample) -> Vec<Rule> {
        rules
            .into_iter()
            .filter(|rule| match parse_condition(&rule.condition) {
                Ok(condition) => {
                    let fired = condition.evaluate(sample);
                    if fired {
                        self.sink.on_rule_activated(rule);
                    }
                    fired
                }
                Err(error) => {
                    self.sink.on_condition_error(rule, &error);
                    false
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("fuzzifier", &self.fuzzifier)
            .field("rules", &self.rules.describe())
            .finish()
    }
}
