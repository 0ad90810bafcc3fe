//! Fuzzy membership library
//!
//! This module provides the numeric side of the engine:
//! - Triangular membership functions with guarded degenerate shapes
//! - Category ranges as injectable configuration data
//! - Linguistic variables mapping crisp readings to degree maps
//!
//! The [`fuzzifier`] submodule binds these to the three sensor channels.

pub mod fuzzifier;

pub use fuzzifier::{FuzzyCategories, Fuzzifier, FuzzySnapshot};

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Degree of membership of `x` in the triangle `(a, b, c)`.
///
/// Zero outside the open interval `(a, c)`, rising linearly to 1 at the peak
/// `b` and falling back to 0 at `c`. Flat sides (`a == b` or `b == c`) never
/// divide by zero; NaN input yields 0.
pub fn triangular_degree(x: f64, a: f64, b: f64, c: f64) -> f64 {
    if x.is_nan() || x <= a || x >= c {
        return 0.0;
    }

    let degree = if x <= b {
        let rise = b - a;
        if rise > 0.0 {
            (x - a) / rise
        } else {
            0.0
        }
    } else if x < c {
        let fall = c - b;
        if fall > 0.0 {
            (c - x) / fall
        } else {
            0.0
        }
    } else {
        0.0
    };

    degree.clamp(0.0, 1.0)
}

/// Triangular fuzzy set shape: left foot, peak, right foot
///
/// Serialized as a three element array `[a, b, c]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct CategoryRange {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl CategoryRange {
    /// Build a range, rejecting non-finite or unordered control points
    pub fn new(a: f64, b: f64, c: f64) -> Result<Self, ConfigError> {
        let range = Self { a, b, c };
        range.validate()?;
        Ok(range)
    }

    /// Check `a <= b <= c` with all points finite
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.a.is_finite() && self.b.is_finite() && self.c.is_finite()) {
            return Err(ConfigError::InvalidValue(format!(
                "category range {} has non-finite control points",
                self
            )));
        }
        if self.a > self.b || self.b > self.c {
            return Err(ConfigError::InvalidValue(format!(
                "category range {} must satisfy a <= b <= c",
                self
            )));
        }
        Ok(())
    }

    /// Membership degree of `x` in this range
    pub fn degree(&self, x: f64) -> f64 {
        triangular_degree(x, self.a, self.b, self.c)
    }

    /// Support interval (where membership can be > 0)
    pub fn support(&self) -> (f64, f64) {
        (self.a, self.c)
    }
}

impl From<[f64; 3]> for CategoryRange {
    fn from([a, b, c]: [f64; 3]) -> Self {
        Self { a, b, c }
    }
}

impl From<CategoryRange> for [f64; 3] {
    fn from(range: CategoryRange) -> Self {
        [range.a, range.b, range.c]
    }
}

impl fmt::Display for CategoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.a, self.b, self.c)
    }
}

/// Mapping from category name to membership degree
///
/// Keys keep the configured category order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DegreeMap(IndexMap<String, f64>);

impl DegreeMap {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub(crate) fn insert(&mut self, category: impl Into<String>, degree: f64) {
        self.0.insert(category.into(), degree.clamp(0.0, 1.0));
    }

    /// Degree for a category, `None` when the category is not configured
    pub fn get(&self, category: &str) -> Option<f64> {
        self.0.get(category).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Category with the highest non-zero degree; first wins on ties
    pub fn dominant(&self) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for (name, degree) in self.iter() {
            if degree <= 0.0 {
                continue;
            }
            match best {
                Some((_, current)) if current >= degree => {}
                _ => best = Some((name, degree)),
            }
        }
        best
    }
}

impl fmt::Display for DegreeMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, degree)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {:.2}", name, degree)?;
        }
        write!(f, "}}")
    }
}

/// A named channel with its triangular categories
#[derive(Debug, Clone)]
pub struct LinguisticVariable {
    /// Variable name (e.g., "light")
    pub name: String,
    /// Categories in evaluation order
    pub terms: IndexMap<String, CategoryRange>,
}

impl LinguisticVariable {
    pub fn new(name: impl Into<String>, terms: IndexMap<String, CategoryRange>) -> Self {
        Self {
            name: name.into(),
            terms,
        }
    }

    /// Membership degree of `value` in every configured category
    pub fn fuzzify(&self, value: f64) -> DegreeMap {
        let mut map = DegreeMap::new();
        for (term, range) in &self.terms {
            map.insert(term.clone(), range.degree(value));
        }
        map
    }
}
