//! fuzzylight - fuzzy inference for street lighting
//!
//! Decides which lighting actions apply for a sensor sample (hour of day,
//! ambient light level, weather) by evaluating stored rule conditions.
//!
//! # Architecture
//!
//! - [`fuzzy`] - Triangular membership functions and the sensor [`Fuzzifier`]
//! - [`condition`] - Closed parser and evaluator for the rule condition language
//! - [`rules`] - Rule records and the [`RuleSource`] seam (memory, file)
//! - [`engine`] - [`InferenceEngine`] and the [`DiagnosticsSink`] observer
//! - [`simulation`] - Hour-by-hour street light simulator
//! - [`config`] - TOML configuration with environment overrides
//! - [`error`] - Structured error codes
//!
//! Rule conditions are never executed as code. They are parsed into a small
//! expression tree over exactly three bindings (`time`, `light`, `weather`);
//! anything else is rejected and the rule is treated as not activated.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use fuzzylight::{Fuzzifier, InferenceEngine, MemoryRuleSource, Rule};
//!
//! let rules = MemoryRuleSource::new(vec![
//!     Rule::new("night", "time BETWEEN 18 AND 23", 1, "full_brightness"),
//!     Rule::new("dark", "light < 0.3 AND weather = \"clear\"", 2, "dim"),
//! ]);
//! let engine = InferenceEngine::new(Fuzzifier::default(), Arc::new(rules));
//!
//! let activated = engine.process_sensors(22.0, 0.1, "clear").unwrap();
//! assert_eq!(activated.len(), 2);
//! assert_eq!(activated[0].action_name, "full_brightness");
//! ```

pub mod config;
pub mod error;
pub mod fuzzy;
pub mod condition;
pub mod rules;
pub mod engine;
pub mod simulation;

pub use config::{ConfigError, LightConfig, LogLevel, SimulationConfig};
pub use error::{ErrorCode, ErrorContext, LightError, LightResult};
pub use fuzzy::{triangular_degree, CategoryRange, DegreeMap, FuzzyCategories, Fuzzifier, FuzzySnapshot};
pub use condition::{evaluate_condition, parse_condition, Comparator, Condition, ConditionError, Field, Literal};
pub use rules::{
    bundled_rules, check_rules, select_action, FileRuleSource, MemoryRuleSource, Rule, RuleCheck,
    RuleFormat, RuleSource,
};
pub use engine::{
    CollectingSink, Diagnostic, DiagnosticsSink, InferenceEngine, InferenceOutcome, NullSink,
    SensorSample, TracingSink,
};
pub use simulation::{ambient_light, StreetLightSimulator, TickReport};
