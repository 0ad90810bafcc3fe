//! Structured error handling for fuzzylight
//!
//! Provides a unified error type with:
//! - Error codes for programmatic handling
//! - Context fields and source locations
//!
//! Malformed rule conditions are not errors at this level: the engine
//! recovers from them and reports them to the diagnostics sink. What reaches
//! callers is a rule source that could not be read or decoded.
//!
//! # Example
//!
//! ```rust,ignore
//! use fuzzylight::error::{LightError, ErrorCode};
//!
//! fn fetch(path: &str) -> Result<(), LightError> {
//!     Err(LightError::rule_source_unavailable("rule file missing")
//!         .with_context("path", path))
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Error Codes
// ============================================================================

/// Unique error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Rule source errors (3xxx)
    /// Generic rule source error
    RuleSourceError = 3000,
    /// Rule source could not be reached or opened
    RuleSourceUnavailable = 3001,
    /// Rule records could not be decoded
    InvalidRuleRecord = 3002,

    // Internal errors (9xxx)
    /// Internal error
    InternalError = 9000,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get a short description of the error code
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::RuleSourceError => "Rule source error",
            ErrorCode::RuleSourceUnavailable => "Rule source unavailable",
            ErrorCode::InvalidRuleRecord => "Invalid rule record",
            ErrorCode::InternalError => "Internal error",
        }
    }

    /// Whether the code belongs to the rule source family (3xxx)
    pub fn is_rule_source(&self) -> bool {
        (3000..4000).contains(&self.code())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

// ============================================================================
// Error Context
// ============================================================================

/// Additional context information for an error
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorContext {
    /// Key-value pairs of context information
    pub fields: BTreeMap<String, String>,
    /// Source location (file:line)
    pub location: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// Main Error Type
// ============================================================================

/// The main error type for fuzzylight
#[derive(Debug, Clone, PartialEq)]
pub struct LightError {
    /// Error code for programmatic handling
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional context
    pub context: Option<ErrorContext>,
}

impl LightError {
    /// Create a new error with a code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
        }
    }

    /// Create a rule source error
    pub fn rule_source(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::RuleSourceError, message)
    }

    /// Create an error for an unreachable rule source
    pub fn rule_source_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::RuleSourceUnavailable, message)
    }

    /// Set the error code
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = code;
        self
    }

    /// Add context to the error
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::new);
        ctx.fields.insert(key.into(), value.into());
        self
    }

    /// Add source location
    pub fn at(mut self, location: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::new);
        ctx.location = Some(location.into());
        self
    }

    /// True when the rule source failed, as opposed to the engine itself
    pub fn is_rule_source(&self) -> bool {
        self.code.is_rule_source()
    }
}

impl fmt::Display for LightError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)?;

        if let Some(ref ctx) = self.context {
            for (key, value) in &ctx.fields {
                write!(f, " ({}: {})", key, value)?;
            }
            if let Some(ref loc) = ctx.location {
                write!(f, " at {}", loc)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for LightError {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<std::io::Error> for LightError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        let code = match err.kind() {
            ErrorKind::NotFound
            | ErrorKind::PermissionDenied
            | ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::TimedOut => ErrorCode::RuleSourceUnavailable,
            _ => ErrorCode::InternalError,
        };
        LightError::new(code, err.to_string())
    }
}

impl From<serde_json::Error> for LightError {
    fn from(err: serde_json::Error) -> Self {
        LightError::new(ErrorCode::InvalidRuleRecord, err.to_string()).with_context("format", "JSON")
    }
}

impl From<toml::de::Error> for LightError {
    fn from(err: toml::de::Error) -> Self {
        LightError::new(ErrorCode::InvalidRuleRecord, err.to_string()).with_context("format", "TOML")
    }
}

// ============================================================================
// Result type alias
// ============================================================================

/// A Result type using LightError
pub type LightResult<T> = Result<T, LightError>;

// ============================================================================
// Macros for convenient error creation
// ============================================================================

/// Create a LightError with context from the current location
#[macro_export]
macro_rules! light_error {
    ($code:expr, $msg:expr) => {
        $crate::error::LightError::new($code, $msg)
            .at(format!("{}:{}", file!(), line!()))
    };
    ($code:expr, $fmt:expr, $($arg:tt)*) => {
        $crate::error::LightError::new($code, format!($fmt, $($arg)*))
            .at(format!("{}:{}", file!(), line!()))
    };
}

/// Bail out early with an error
#[macro_export]
macro_rules! light_bail {
    ($code:expr, $msg:expr) => {
        return Err($crate::light_error!($code, $msg))
    };
    ($code:expr, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::light_error!($code, $fmt, $($arg)*))
    };
}

/// Ensure a condition holds, or return an error
#[macro_export]
macro_rules! light_ensure {
    ($cond:expr, $code:expr, $msg:expr) => {
        if !$cond {
            $crate::light_bail!($code, $msg);
        }
    };
    ($cond:expr, $code:expr, $fmt:expr, $($arg:tt)*) => {
        if !$cond {
            $crate::light_bail!($code, $fmt, $($arg)*);
        }
    };
}

// ============================================================================
// Tests
// ============================================================================
