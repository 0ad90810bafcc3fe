//! Rule condition language
//!
//! Each rule stores its activation criterion as a small SQL-like boolean
//! expression over the three sensor readings:
//!
//! ```text
//! time BETWEEN 6 AND 18 OR weather = "rainy"
//! light < 0.3 AND weather = "clear"
//! ```
//!
//! Conditions are tokenized ([`lexer`]), parsed into a typed [`Condition`]
//! tree ([`parser`]) and evaluated by structural recursion. Nothing outside
//! the grammar can be expressed: only `time`, `light` and `weather` are
//! bindable, and only comparisons, `BETWEEN`, `AND`, `OR` and parentheses
//! are recognised.

pub mod lexer;
pub mod parser;

pub use parser::parse_condition;

use std::fmt;
use std::str::FromStr;

use crate::engine::SensorSample;

/// Condition parse errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConditionError {
    #[error("Syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("Unbound identifier '{name}' (expected time, light or weather)")]
    UnboundIdentifier { name: String },

    #[error("Operator '{operator}' is not supported for {field}")]
    UnsupportedOperator { field: String, operator: String },

    #[error("Type mismatch: {field} cannot be compared with {found}")]
    TypeMismatch { field: String, found: String },

    #[error("Unexpected end of condition")]
    UnexpectedEof,
}

/// A bindable sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Hour of day, raw numeric value
    Time,
    /// Ambient light level, raw numeric value
    Light,
    /// Weather category string
    Weather,
}

impl Field {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "time" => Some(Field::Time),
            "light" => Some(Field::Light),
            "weather" => Some(Field::Weather),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Time => "time",
            Field::Light => "light",
            Field::Weather => "weather",
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Field::Weather)
    }

    fn bind<'s>(&self, sample: &'s SensorSample) -> Value<'s> {
        match self {
            Field::Time => Value::Number(sample.time),
            Field::Light => Value::Number(sample.light),
            Field::Weather => Value::Text(&sample.weather),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum Value<'s> {
    Number(f64),
    Text(&'s str),
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// `=` or `==`
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
        }
    }

    fn holds(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparator::Eq => lhs == rhs,
            Comparator::Lt => lhs < rhs,
            Comparator::Le => lhs <= rhs,
            Comparator::Gt => lhs > rhs,
            Comparator::Ge => lhs >= rhs,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Text(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", n),
            Literal::Text(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '\\' => f.write_str("\\\\")?,
                        '"' => f.write_str("\\\"")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        other => write!(f, "{}", other)?,
                    }
                }
                f.write_str("\"")
            }
        }
    }
}

/// Parsed condition expression
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `field op literal`
    Comparison {
        field: Field,
        op: Comparator,
        value: Literal,
    },
    /// `field BETWEEN low AND high`, bounds inclusive
    Between { field: Field, low: f64, high: f64 },
    /// All children hold
    And(Vec<Condition>),
    /// Any child holds
    Or(Vec<Condition>),
}

impl Condition {
    /// Parse condition source text
    pub fn parse(source: &str) -> Result<Self, ConditionError> {
        parse_condition(source)
    }

    /// Evaluate against the raw sensor readings
    pub fn evaluate(&self, sample: &SensorSample) -> bool {
        match self {
            Condition::Comparison { field, op, value } => match (field.bind(sample), value) {
                (Value::Number(lhs), Literal::Number(rhs)) => op.holds(lhs, *rhs),
                (Value::Text(lhs), Literal::Text(rhs)) => *op == Comparator::Eq && lhs == rhs,
                // rejected by the parser
                _ => false,
            },
            Condition::Between { field, low, high } => match field.bind(sample) {
                Value::Number(v) => v >= *low && v <= *high,
                Value::Text(_) => false,
            },
            Condition::And(children) => children.iter().all(|c| c.evaluate(sample)),
            Condition::Or(children) => children.iter().any(|c| c.evaluate(sample)),
        }
    }

    /// Fields referenced anywhere in the expression, in first-seen order
    pub fn fields(&self) -> Vec<Field> {
        fn collect(cond: &Condition, out: &mut Vec<Field>) {
            match cond {
                Condition::Comparison { field, .. } | Condition::Between { field, .. } => {
                    if !out.contains(field) {
                        out.push(*field);
                    }
                }
                Condition::And(children) | Condition::Or(children) => {
                    for child in children {
                        collect(child, out);
                    }
                }
            }
        }

        let mut fields = Vec::new();
        collect(self, &mut fields);
        fields
    }
}

impl FromStr for Condition {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_condition(s)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Comparison { field, op, value } => write!(f, "{} {} {}", field, op, value),
            Condition::Between { field, low, high } => {
                write!(f, "{} BETWEEN {} AND {}", field, low, high)
            }
            Condition::And(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" AND ")?;
                    }
                    if matches!(child, Condition::Or(_)) {
                        write!(f, "({})", child)?;
                    } else {
                        write!(f, "{}", child)?;
                    }
                }
                Ok(())
            }
            Condition::Or(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" OR ")?;
                    }
                    write!(f, "{}", child)?;
                }
                Ok(())
            }
        }
    }
}

/// Parse and evaluate in one step
pub fn evaluate_condition(source: &str, sample: &SensorSample) -> Result<bool, ConditionError> {
    Ok(parse_condition(source)?.evaluate(sample))
}
