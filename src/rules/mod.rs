//! Lighting rules and rule sources
//!
//! A [`Rule`] pairs a stored condition with the lighting action it triggers.
//! The engine reads rules through the [`RuleSource`] trait, which must
//! deliver them ordered by ascending priority. Two sources are provided:
//!
//! - [`MemoryRuleSource`]: a fixed in-memory list
//! - [`FileRuleSource`]: TOML (`[[rule]]` tables) or JSON (array) file,
//!   re-read on every fetch
//!
//! [`bundled_rules`] returns the street lighting rule set shipped with the crate.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::condition::{parse_condition, ConditionError};
use crate::error::{ErrorCode, LightError, LightResult};

/// A lighting rule record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule identifier
    #[serde(alias = "rule_name")]
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Condition source text
    pub condition: String,
    /// Lower value = higher priority
    pub priority: i64,
    /// Action triggered when the rule fires
    pub action_name: String,
    /// Action intensity, carried through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<serde_json::Value>,
}

impl Rule {
    pub fn new(
        name: impl Into<String>,
        condition: impl Into<String>,
        priority: i64,
        action_name: impl Into<String>,
    ) -> Self {
        Rule {
            name: name.into(),
            description: String::new(),
            condition: condition.into(),
            priority,
            action_name: action_name.into(),
            intensity: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_intensity(mut self, intensity: impl Into<serde_json::Value>) -> Self {
        self.intensity = Some(intensity.into());
        self
    }
}

/// Supplier of rule records
///
/// Implementations must return rules ordered by ascending priority and must
/// report failures as errors rather than an empty list.
pub trait RuleSource: Send + Sync {
    /// Fetch the current rule set
    fn fetch_rules(&self) -> LightResult<Vec<Rule>>;

    /// Human-readable description of where rules come from
    fn describe(&self) -> String {
        "rule source".to_string()
    }
}

/// Stable sort by ascending priority
pub fn sort_by_priority(rules: &mut [Rule]) {
    rules.sort_by_key(|rule| rule.priority);
}

/// Pick the winning rule: minimum priority, first occurrence on ties
pub fn select_action(activated: &[Rule]) -> Option<&Rule> {
    activated.iter().reduce(|best, rule| {
        if rule.priority < best.priority {
            rule
        } else {
            best
        }
    })
}

// ============================================================================
// In-memory source
// ============================================================================

/// Fixed list of rules held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryRuleSource {
    rules: Vec<Rule>,
}

impl MemoryRuleSource {
    /// Create a source; rules are sorted by priority, keeping input order on ties
    pub fn new(mut rules: Vec<Rule>) -> Self {
        sort_by_priority(&mut rules);
        MemoryRuleSource { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl RuleSource for MemoryRuleSource {
    fn fetch_rules(&self) -> LightResult<Vec<Rule>> {
        Ok(self.rules.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory ({} rules)", self.rules.len())
    }
}

// ============================================================================
// File source
// ============================================================================

/// Rule file encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFormat {
    Toml,
    Json,
}

impl RuleFormat {
    /// Guess from the file extension; anything but `.json` is TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => RuleFormat::Json,
            _ => RuleFormat::Toml,
        }
    }
}

#[derive(Deserialize)]
struct RuleDocument {
    #[serde(default)]
    rule: Vec<Rule>,
}

/// Decode rule records from text
pub fn parse_rules(content: &str, format: RuleFormat) -> LightResult<Vec<Rule>> {
    let mut rules = match format {
        RuleFormat::Toml => toml::from_str::<RuleDocument>(content)?.rule,
        RuleFormat::Json => serde_json::from_str::<Vec<Rule>>(content)?,
    };
    for (index, rule) in rules.iter().enumerate() {
        crate::light_ensure!(
            !rule.name.trim().is_empty(),
            ErrorCode::InvalidRuleRecord,
            "rule #{} has an empty name",
            index + 1
        );
        crate::light_ensure!(
            !rule.action_name.trim().is_empty(),
            ErrorCode::InvalidRuleRecord,
            "rule '{}' has no action",
            rule.name
        );
    }
    sort_by_priority(&mut rules);
    Ok(rules)
}

const BUNDLED_RULES: &str = include_str!("../../rules/street_lighting.toml");

/// The street lighting rule set shipped with the crate
pub fn bundled_rules() -> LightResult<MemoryRuleSource> {
    Ok(MemoryRuleSource::new(parse_rules(BUNDLED_RULES, RuleFormat::Toml)?))
}

/// Rules loaded from a file on every fetch
#[derive(Debug, Clone)]
pub struct FileRuleSource {
    path: PathBuf,
    format: RuleFormat,
}

impl FileRuleSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = RuleFormat::from_path(&path);
        FileRuleSource { path, format }
    }

    pub fn with_format(mut self, format: RuleFormat) -> Self {
        self.format = format;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RuleSource for FileRuleSource {
    fn fetch_rules(&self) -> LightResult<Vec<Rule>> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            LightError::from(e)
                .with_code(ErrorCode::RuleSourceUnavailable)
                .with_context("path", self.path.display().to_string())
        })?;

        parse_rules(&content, self.format)
            .map_err(|e| e.with_context("path", self.path.display().to_string()))
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

// ============================================================================
// Up-front validation
// ============================================================================

/// Result of checking one rule's condition
#[derive(Debug, Clone, PartialEq)]
pub struct RuleCheck {
    pub name: String,
    pub condition: String,
    pub error: Option<ConditionError>,
}

impl RuleCheck {
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

/// Parse every rule's condition without evaluating it
pub fn check_rules(rules: &[Rule]) -> Vec<RuleCheck> {
    rules
        .iter()
        .map(|rule| RuleCheck {
            name: rule.name.clone(),
            condition: rule.condition.clone(),
            error: parse_condition(&rule.condition).err(),
        })
        .collect()
}
