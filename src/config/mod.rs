//! Configuration System for fuzzylight
//!
//! Provides:
//! - TOML configuration files
//! - Environment variable overrides
//! - Injectable fuzzy category ranges
//! - Multiple config file locations
//!
//! # Configuration File Locations
//!
//! Configuration files are searched in order (first found wins):
//! 1. `./fuzzylight.toml` - Project-local configuration
//! 2. `~/.config/fuzzylight/config.toml` - User configuration (XDG)
//! 3. `~/.fuzzylight/config.toml` - User configuration (legacy)
//! 4. `/etc/fuzzylight/config.toml` - System-wide configuration
//!
//! # Environment Variables
//!
//! - `FUZZYLIGHT_LOG_LEVEL` - Logging verbosity (quiet, normal, verbose, debug)
//! - `FUZZYLIGHT_RULES` - Rule file path
//! - `FUZZYLIGHT_SIM_HOURS` - Simulated hours per run
//! - `FUZZYLIGHT_SIM_SEED` - Simulator random seed
//! - `FUZZYLIGHT_TICK_MS` - Real delay between simulated hours
//!
//! # Example Configuration
//!
//! ```toml
//! [general]
//! log_level = "verbose"
//!
//! [fuzzy.light]
//! dark = [-0.3, 0.0, 0.3]
//! twilight = [0.2, 0.4, 0.6]
//! light = [0.5, 1.0, 1.5]
//!
//! [rules]
//! path = "rules/street_lighting.toml"
//!
//! [simulation]
//! hours = 24
//! seed = 42
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::fuzzy::FuzzyCategories;

// ============================================================================
// Configuration Schema
// ============================================================================

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LightConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Category ranges for the fuzzifier
    pub fuzzy: FuzzyCategories,
    /// Rule source settings
    pub rules: RulesConfig,
    /// Simulator settings
    pub simulation: SimulationConfig,
}

/// General configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Logging level
    pub log_level: LogLevel,
}

/// Rule source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RulesConfig {
    /// Rule file (TOML or JSON); the bundled rule set is used when unset
    pub path: Option<PathBuf>,
}

/// Street light simulator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Hour the simulated clock starts at
    pub start_hour: u32,
    /// Number of simulated hours per run
    pub hours: u32,
    /// Real delay between ticks (milliseconds)
    pub tick_ms: u64,
    /// Per-tick probability of a weather change
    pub weather_change_chance: f64,
    /// Random seed; unset means a fresh seed per run
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_hour: 18,
            hours: 24,
            tick_ms: 1000,
            weather_change_chance: 0.2,
            seed: None,
        }
    }
}

/// Log level options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Quiet,
    #[default]
    Normal,
    Verbose,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Verbose => "verbose",
            LogLevel::Debug => "debug",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "quiet" | "q" | "0" => Some(LogLevel::Quiet),
            "normal" | "n" | "1" => Some(LogLevel::Normal),
            "verbose" | "v" | "2" => Some(LogLevel::Verbose),
            "debug" | "d" | "3" => Some(LogLevel::Debug),
            _ => None,
        }
    }

    /// Matching `tracing` level filter
    pub fn tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Quiet => tracing::Level::ERROR,
            LogLevel::Normal => tracing::Level::WARN,
            LogLevel::Verbose => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
        }
    }

    /// Step up by `verbose` and down by `quiet` flag counts
    pub fn adjust(self, verbose: u8, quiet: u8) -> Self {
        let rank = match self {
            LogLevel::Quiet => 0i32,
            LogLevel::Normal => 1,
            LogLevel::Verbose => 2,
            LogLevel::Debug => 3,
        };
        match (rank + verbose as i32 - quiet as i32).clamp(0, 3) {
            0 => LogLevel::Quiet,
            1 => LogLevel::Normal,
            2 => LogLevel::Verbose,
            _ => LogLevel::Debug,
        }
    }
}

// ============================================================================
// Configuration Loading
// ============================================================================

impl LightConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from default locations
    ///
    /// Takes the first file found in [`LightConfig::config_paths`], then
    /// applies environment variable overrides and validates the result.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for path in Self::config_paths() {
            if path.exists() {
                config = Self::load_from_file(&path)?;
                break;
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e.to_string()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))
    }

    /// Load configuration from a TOML string
    pub fn load_from_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content)
            .map_err(|e| ConfigError::ParseError(PathBuf::from("<string>"), e.to_string()))
    }

    /// Get the list of config file search paths
    pub fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./fuzzylight.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("fuzzylight").join("config.toml"));
        }

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".fuzzylight").join("config.toml"));
        }

        #[cfg(unix)]
        paths.push(PathBuf::from("/etc/fuzzylight/config.toml"));

        paths
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from any key lookup; unparsable values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("FUZZYLIGHT_LOG_LEVEL").and_then(|v| LogLevel::from_str(&v)) {
            self.general.log_level = level;
        }

        if let Some(path) = lookup("FUZZYLIGHT_RULES") {
            if !path.is_empty() {
                self.rules.path = Some(PathBuf::from(path));
            }
        }

        if let Some(hours) = lookup("FUZZYLIGHT_SIM_HOURS").and_then(|v| v.parse::<u32>().ok()) {
            self.simulation.hours = hours;
        }

        if let Some(seed) = lookup("FUZZYLIGHT_SIM_SEED").and_then(|v| v.parse::<u64>().ok()) {
            self.simulation.seed = Some(seed);
        }

        if let Some(tick) = lookup("FUZZYLIGHT_TICK_MS").and_then(|v| v.parse::<u64>().ok()) {
            self.simulation.tick_ms = tick;
        }
    }

    /// Reject configurations the engine or simulator cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.fuzzy.validate()?;

        if self.simulation.start_hour > 23 {
            return Err(ConfigError::InvalidValue(format!(
                "simulation.start_hour must be 0-23, got {}",
                self.simulation.start_hour
            )));
        }

        let chance = self.simulation.weather_change_chance;
        if !(0.0..=1.0).contains(&chance) {
            return Err(ConfigError::InvalidValue(format!(
                "simulation.weather_change_chance must be within [0, 1], got {}",
                chance
            )));
        }

        Ok(())
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    /// Write configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml()?;
        fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e.to_string()))
    }

    /// Generate a default configuration file content
    pub fn default_config_content() -> &'static str {
        r#"# fuzzylight configuration file

[general]
# Logging level: quiet, normal, verbose, debug
log_level = "normal"

# Triangular category ranges as [left foot, peak, right foot].
# Readings outside every range get degree 0 in all categories.
[fuzzy]
weather = ["clear", "cloudy", "rainy"]

[fuzzy.light]
dark = [-0.3, 0.0, 0.3]
twilight = [0.2, 0.4, 0.6]
light = [0.5, 1.0, 1.5]

[fuzzy.time]
night = [-3.0, 1.0, 6.0]
morning = [5.0, 8.0, 11.0]
day = [10.0, 14.0, 18.0]
evening = [17.0, 21.0, 25.0]

[rules]
# Rule file, TOML ([[rule]] tables) or JSON (array of records)
# path = "rules/street_lighting.toml"

[simulation]
# Hour the simulated clock starts at
start_hour = 18
# Simulated hours per run
hours = 24
# Real delay between ticks (milliseconds)
tick_ms = 1000
# Per-tick probability of a weather change
weather_change_chance = 0.2
# Fixed random seed (optional)
# seed = 42
"#
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// IO error reading/writing config file
    IoError(PathBuf, String),
    /// Parse error in config file
    ParseError(PathBuf, String),
    /// Value out of range or inconsistent
    InvalidValue(String),
    /// Serialization error
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, msg) => {
                write!(f, "IO error reading {}: {}", path.display(), msg)
            }
            ConfigError::ParseError(path, msg) => {
                write!(f, "Parse error in {}: {}", path.display(), msg)
            }
            ConfigError::InvalidValue(msg) => {
                write!(f, "Invalid value: {}", msg)
            }
            ConfigError::SerializeError(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuzzy::CategoryRange;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = LightConfig::new();
        assert_eq!(config.general.log_level, LogLevel::Normal);
        assert_eq!(config.simulation.start_hour, 18);
        assert_eq!(config.simulation.hours, 24);
        assert_eq!(config.rules.path, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [general]
            log_level = "verbose"

            [fuzzy.light]
            dim = [0.0, 0.5, 1.0]

            [rules]
            path = "rules.json"

            [simulation]
            hours = 6
            seed = 7
        "#;

        let config = LightConfig::load_from_str(toml).unwrap();
        assert_eq!(config.general.log_level, LogLevel::Verbose);
        assert_eq!(config.fuzzy.light.len(), 1);
        assert_eq!(config.fuzzy.light["dim"], CategoryRange::from([0.0, 0.5, 1.0]));
        // unspecified channels keep their defaults
        assert_eq!(config.fuzzy.time.len(), 4);
        assert_eq!(config.rules.path, Some(PathBuf::from("rules.json")));
        assert_eq!(config.simulation.hours, 6);
        assert_eq!(config.simulation.seed, Some(7));
        assert_eq!(config.simulation.tick_ms, 1000);
    }

    #[test]
    fn test_default_content_matches_defaults() {
        let parsed = LightConfig::load_from_str(LightConfig::default_config_content()).unwrap();
        assert_eq!(parsed, LightConfig::default());
    }

    #[test]
    fn test_parse_error() {
        let result = LightConfig::load_from_str("[simulation]\nhours = \"many\"");
        assert!(matches!(result, Err(ConfigError::ParseError(_, _))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = LightConfig::new();
        config.fuzzy.time.insert("noon".to_string(), CategoryRange::from([14.0, 12.0, 13.0]));
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));

        let mut config = LightConfig::new();
        config.simulation.weather_change_chance = 1.5;
        assert!(config.validate().is_err());

        let mut config = LightConfig::new();
        config.simulation.start_hour = 24;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("FUZZYLIGHT_LOG_LEVEL", "debug"),
            ("FUZZYLIGHT_RULES", "/tmp/rules.toml"),
            ("FUZZYLIGHT_SIM_HOURS", "3"),
            ("FUZZYLIGHT_SIM_SEED", "99"),
            ("FUZZYLIGHT_TICK_MS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = LightConfig::new();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.general.log_level, LogLevel::Debug);
        assert_eq!(config.rules.path, Some(PathBuf::from("/tmp/rules.toml")));
        assert_eq!(config.simulation.hours, 3);
        assert_eq!(config.simulation.seed, Some(99));
        assert_eq!(config.simulation.tick_ms, 1000);
    }

    #[test]
    fn test_log_level_from_str() {
        assert_eq!(LogLevel::from_str("quiet"), Some(LogLevel::Quiet));
        assert_eq!(LogLevel::from_str("VERBOSE"), Some(LogLevel::Verbose));
        assert_eq!(LogLevel::from_str("3"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str("loud"), None);
    }

    #[test]
    fn test_log_level_adjust() {
        assert_eq!(LogLevel::Normal.adjust(1, 0), LogLevel::Verbose);
        assert_eq!(LogLevel::Normal.adjust(5, 0), LogLevel::Debug);
        assert_eq!(LogLevel::Normal.adjust(0, 1), LogLevel::Quiet);
        assert_eq!(LogLevel::Quiet.adjust(0, 3), LogLevel::Quiet);
        assert_eq!(LogLevel::Verbose.tracing_level(), tracing::Level::INFO);
    }

    #[test]
    fn test_serialize_config() {
        let toml = LightConfig::new().to_toml().unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[simulation]"));
        assert!(toml.contains("[fuzzy.light]"));
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("fuzzylight-config-{}.toml", std::process::id()));
        let mut config = LightConfig::new();
        config.simulation.seed = Some(11);
        config.save_to_file(&path).unwrap();

        let loaded = LightConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file() {
        let result = LightConfig::load_from_file(Path::new("/nonexistent/fuzzylight.toml"));
        assert!(matches!(result, Err(ConfigError::IoError(_, _))));
    }

    #[test]
    fn test_config_paths() {
        let paths = LightConfig::config_paths();
        assert!(!paths.is_empty());
        assert!(paths[0].ends_with("fuzzylight.toml"));
    }
}
