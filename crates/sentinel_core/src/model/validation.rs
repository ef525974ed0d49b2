//! Structural validation shared by model constructors and store writes.
//!
//! # Invariants
//! - Validation runs before any SQL mutation.
//! - Errors carry the rejected value so callers can report it.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

// `YYYY-MM-DDTHH:MM[:SS[.fff]][Z|+HH:MM]`; minute precision is what the
// datetime picker produces. The store converts accepted values to UTC.
static ISO_TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])T([01]\d|2[0-3]):[0-5]\d(:[0-5]\d(\.\d{1,3})?)?(Z|[+-]([01]\d|2[0-3]):[0-5]\d)?$")
        .expect("valid timestamp regex")
});

/// Caller supplied a structurally invalid value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Case name is empty after trimming.
    EmptyName,
    UnknownCategory(String),
    UnknownStatus(String),
    UnknownConcernLevel(String),
    UnknownSignType(String),
    UnknownSeverity(String),
    /// Timestamp is not an accepted ISO-8601 shape.
    InvalidTimestamp {
        field: &'static str,
        value: String,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "case name must not be empty"),
            Self::UnknownCategory(value) => write!(f, "unknown category `{value}`"),
            Self::UnknownStatus(value) => write!(f, "unknown case status `{value}`"),
            Self::UnknownConcernLevel(value) => write!(f, "unknown concern level `{value}`"),
            Self::UnknownSignType(value) => write!(f, "unknown sign type `{value}`"),
            Self::UnknownSeverity(value) => write!(f, "unknown severity `{value}`"),
            Self::InvalidTimestamp { field, value } => {
                write!(f, "{field} must be an ISO-8601 timestamp, got `{value}`")
            }
        }
    }
}

impl Error for ValidationError {}

/// Trims a case name and rejects it when nothing is left.
pub fn normalize_case_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(trimmed.to_string())
}

/// Checks that `value` is an ISO-8601 timestamp accepted by the store.
pub fn validate_timestamp(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if ISO_TIMESTAMP_RE.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidTimestamp {
            field,
            value: value.to_string(),
        })
    }
}
