//! Case domain model.
//!
//! # Responsibility
//! - Define the monitored-situation record and its closed enumerations.
//!
//! # Invariants
//! - `id` and `created_at` never change after creation.
//! - `updated_at >= created_at` and never moves backwards.

use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier of a case, assigned by the store.
pub type CaseId = Uuid;

/// Abuse category a case is filed under.
///
/// `Unsure` exists only at case level; signs always carry a concrete category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseCategory {
    Physical,
    Emotional,
    Sexual,
    Neglect,
    Unsure,
}

impl CaseCategory {
    pub const ALL: [CaseCategory; 5] = [
        Self::Physical,
        Self::Emotional,
        Self::Sexual,
        Self::Neglect,
        Self::Unsure,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Physical => "physical",
            Self::Emotional => "emotional",
            Self::Sexual => "sexual",
            Self::Neglect => "neglect",
            Self::Unsure => "unsure",
        }
    }
}

impl FromStr for CaseCategory {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
            .ok_or_else(|| ValidationError::UnknownCategory(value.to_string()))
    }
}

impl Display for CaseCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Follow-up state of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    /// Default for new cases.
    Monitoring,
    /// Reported to the authorities.
    Reported,
    Closed,
}

impl CaseStatus {
    pub const ALL: [CaseStatus; 3] = [Self::Monitoring, Self::Reported, Self::Closed];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monitoring => "monitoring",
            Self::Reported => "reported",
            Self::Closed => "closed",
        }
    }
}

impl FromStr for CaseStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| ValidationError::UnknownStatus(value.to_string()))
    }
}

impl Display for CaseStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A monitored situation grouping dated observations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: CaseId,
    /// Trimmed, never empty.
    pub name: String,
    pub category: CaseCategory,
    pub status: CaseStatus,
    /// ISO-8601 UTC, set once by the store.
    pub created_at: String,
    /// ISO-8601 UTC, advanced by case and observation writes.
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::{CaseCategory, CaseStatus};
    use crate::model::validation::ValidationError;

    #[test]
    fn category_text_roundtrips_for_every_variant() {
        for category in CaseCategory::ALL {
            assert_eq!(category.as_str().parse::<CaseCategory>(), Ok(category));
        }
    }

    #[test]
    fn unknown_status_is_a_validation_error() {
        assert_eq!(
            "archived".parse::<CaseStatus>(),
            Err(ValidationError::UnknownStatus("archived".to_string()))
        );
    }

    #[test]
    fn category_parse_is_case_sensitive() {
        assert!("Physical".parse::<CaseCategory>().is_err());
    }
}
