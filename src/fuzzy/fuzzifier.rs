//! Sensor channel fuzzification
//!
//! Maps the three raw readings to degree maps using injected category
//! definitions. Light and time use triangular ranges; weather is a crisp
//! classification over a fixed set of categories.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{CategoryRange, DegreeMap, LinguisticVariable};
use crate::config::ConfigError;
use crate::engine::SensorSample;

/// Category definitions for every sensor channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzyCategories {
    /// Known weather categories
    pub weather: Vec<String>,
    /// Light level categories over `[0, 1]`
    pub light: IndexMap<String, CategoryRange>,
    /// Time of day categories over hours `[0, 24)`
    pub time: IndexMap<String, CategoryRange>,
}

impl Default for FuzzyCategories {
    fn default() -> Self {
        let mut light = IndexMap::new();
        light.insert("dark".to_string(), CategoryRange::from([-0.3, 0.0, 0.3]));
        light.insert("twilight".to_string(), CategoryRange::from([0.2, 0.4, 0.6]));
        light.insert("light".to_string(), CategoryRange::from([0.5, 1.0, 1.5]));

        let mut time = IndexMap::new();
        time.insert("night".to_string(), CategoryRange::from([-3.0, 1.0, 6.0]));
        time.insert("morning".to_string(), CategoryRange::from([5.0, 8.0, 11.0]));
        time.insert("day".to_string(), CategoryRange::from([10.0, 14.0, 18.0]));
        time.insert("evening".to_string(), CategoryRange::from([17.0, 21.0, 25.0]));

        Self {
            light,
            time,
            weather: vec!["clear".to_string(), "cloudy".to_string(), "rainy".to_string()],
        }
    }
}

impl FuzzyCategories {
    /// Check every range and the weather list
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (channel, ranges) in [("light", &self.light), ("time", &self.time)] {
            if ranges.is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "no {} categories configured",
                    channel
                )));
            }
            for (name, range) in ranges {
                range.validate().map_err(|e| {
                    ConfigError::InvalidValue(format!("{}.{}: {}", channel, name, e))
                })?;
            }
        }

        if self.weather.is_empty() {
            return Err(ConfigError::InvalidValue(
                "no weather categories configured".to_string(),
            ));
        }
        for (i, name) in self.weather.iter().enumerate() {
            if name.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "weather category names cannot be empty".to_string(),
                ));
            }
            if self.weather[..i].contains(name) {
                return Err(ConfigError::InvalidValue(format!(
                    "duplicate weather category '{}'",
                    name
                )));
            }
        }

        Ok(())
    }
}

/// Degree maps for one sensor sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuzzySnapshot {
    pub light: DegreeMap,
    pub time: DegreeMap,
    pub weather: DegreeMap,
}

/// Converts crisp sensor readings into degree maps
#[derive(Debug, Clone)]
pub struct Fuzzifier {
    light: LinguisticVariable,
    time: LinguisticVariable,
    weather: Vec<String>,
}

impl Fuzzifier {
    pub fn new(categories: FuzzyCategories) -> Self {
        Self {
            light: LinguisticVariable::new("light", categories.light),
            time: LinguisticVariable::new("time", categories.time),
            weather: categories.weather,
        }
    }

    pub fn fuzzify_light(&self, value: f64) -> DegreeMap {
        self.light.fuzzify(value)
    }

    pub fn fuzzify_time(&self, value: f64) -> DegreeMap {
        self.time.fuzzify(value)
    }

    /// Crisp classification: 1.0 for the matching category, 0.0 elsewhere.
    /// Unknown categories give an all-zero map.
    pub fn fuzzify_weather(&self, value: &str) -> DegreeMap {
        let mut map = DegreeMap::new();
        for category in &self.weather {
            let degree = if category == value { 1.0 } else { 0.0 };
            map.insert(category.clone(), degree);
        }
        map
    }

    /// All three channels at once
    pub fn fuzzify(&self, sample: &SensorSample) -> FuzzySnapshot {
        FuzzySnapshot {
            light: self.fuzzify_light(sample.light),
            time: self.fuzzify_time(sample.time),
            weather: self.fuzzify_weather(&sample.weather),
        }
    }

    /// Known weather categories in configured order
    pub fn weather_categories(&self) -> &[String] {
        &self.weather
    }
}

impl Default for Fuzzifier {
    fn default() -> Self {
        Self::new(FuzzyCategories::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_light_keys_always_present() {
        let fuzzifier = Fuzzifier::default();
        for value in [-5.0, 0.0, 0.1, 0.45, 0.9, 1.0, 42.0, f64::NAN] {
            let map = fuzzifier.fuzzify_light(value);
            assert_eq!(map.keys().collect::<Vec<_>>(), vec!["dark", "twilight", "light"]);
        }
    }

    #[test]
    fn test_time_keys_always_present() {
        let fuzzifier = Fuzzifier::default();
        for value in [-1.0, 0.0, 7.5, 14.0, 22.0, 24.0, 100.0] {
            let map = fuzzifier.fuzzify_time(value);
            assert_eq!(
                map.keys().collect::<Vec<_>>(),
                vec!["night", "morning", "day", "evening"]
            );
        }
    }

    #[test]
    fn test_light_degrees() {
        let fuzzifier = Fuzzifier::default();
        let map = fuzzifier.fuzzify_light(0.1);
        assert!(approx(map.get("dark").unwrap(), 2.0 / 3.0));
        assert_eq!(map.get("twilight"), Some(0.0));
        assert_eq!(map.get("light"), Some(0.0));

        let map = fuzzifier.fuzzify_light(0.4);
        assert!(approx(map.get("twilight").unwrap(), 1.0));
    }

    #[test]
    fn test_time_degrees() {
        let fuzzifier = Fuzzifier::default();
        let map = fuzzifier.fuzzify_time(14.0);
        assert!(approx(map.get("day").unwrap(), 1.0));
        assert_eq!(map.get("night"), Some(0.0));
        assert_eq!(map.dominant().map(|(name, _)| name), Some("day"));
    }

    #[test]
    fn test_out_of_domain_is_all_zero() {
        let fuzzifier = Fuzzifier::default();
        let map = fuzzifier.fuzzify_time(100.0);
        assert!(map.iter().all(|(_, d)| d == 0.0));
        let map = fuzzifier.fuzzify_light(-2.0);
        assert!(map.iter().all(|(_, d)| d == 0.0));
    }

    #[test]
    fn test_weather_crisp() {
        let fuzzifier = Fuzzifier::default();
        let map = fuzzifier.fuzzify_weather("clear");
        assert_eq!(map.get("clear"), Some(1.0));
        assert_eq!(map.get("cloudy"), Some(0.0));
        assert_eq!(map.get("rainy"), Some(0.0));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_weather_unknown_is_all_zero() {
        let fuzzifier = Fuzzifier::default();
        let map = fuzzifier.fuzzify_weather("unknown");
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["clear", "cloudy", "rainy"]);
        assert!(map.iter().all(|(_, d)| d == 0.0));
    }

    #[test]
    fn test_custom_categories() {
        let mut light = IndexMap::new();
        light.insert("dim".to_string(), CategoryRange::from([0.0, 0.5, 1.0]));
        let categories = FuzzyCategories {
            light,
            time: FuzzyCategories::default().time,
            weather: vec!["snow".to_string()],
        };
        let fuzzifier = Fuzzifier::new(categories);

        let map = fuzzifier.fuzzify_light(0.25);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["dim"]);
        assert!(approx(map.get("dim").unwrap(), 0.5));
        assert_eq!(fuzzifier.fuzzify_weather("snow").get("snow"), Some(1.0));
        assert_eq!(fuzzifier.fuzzify_weather("clear").get("clear"), None);
    }

    #[test]
    fn test_snapshot() {
        let fuzzifier = Fuzzifier::default();
        let sample = SensorSample::new(22.0, 0.1, "clear");
        let snapshot = fuzzifier.fuzzify(&sample);
        assert!(approx(snapshot.time.get("evening").unwrap(), 0.75));
        assert_eq!(snapshot.weather.get("clear"), Some(1.0));
    }

    #[test]
    fn test_validate_categories() {
        assert!(FuzzyCategories::default().validate().is_ok());

        let mut bad = FuzzyCategories::default();
        bad.time.insert("noon".to_string(), CategoryRange::from([13.0, 12.0, 14.0]));
        assert!(bad.validate().is_err());

        let mut dup = FuzzyCategories::default();
        dup.weather.push("clear".to_string());
        assert!(dup.validate().is_err());

        let mut empty = FuzzyCategories::default();
        empty.light.clear();
        assert!(empty.validate().is_err());
    }
}
