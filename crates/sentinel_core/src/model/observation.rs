//! Observation domain model.
//!
//! # Responsibility
//! - Define the dated note recorded inside a case.
//! - Define creation drafts and partial-update patches for write paths.
//!
//! # Invariants
//! - `case_id` always resolves to a live case.
//! - `signs_checked` is a set: ordered, no duplicates.
//! - `date` is an accepted ISO-8601 timestamp.

use crate::model::case::CaseId;
use crate::model::validation::{validate_timestamp, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier of an observation, assigned by the store.
pub type ObservationId = Uuid;

/// Triage tier attached to an observation.
///
/// Variants are declared from least to most urgent, so `Ord` follows urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcernLevel {
    Low,
    Medium,
    High,
    Emergency,
}

impl ConcernLevel {
    pub const ALL: [ConcernLevel; 4] = [Self::Low, Self::Medium, Self::High, Self::Emergency];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Emergency => "emergency",
        }
    }
}

impl FromStr for ConcernLevel {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == value)
            .ok_or_else(|| ValidationError::UnknownConcernLevel(value.to_string()))
    }
}

impl Display for ConcernLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single dated note within a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub id: ObservationId,
    pub case_id: CaseId,
    /// When the observed event happened; user supplied.
    pub date: String,
    pub description: String,
    pub child_info: String,
    pub signs_checked: BTreeSet<String>,
    pub concern_level: ConcernLevel,
    /// ISO-8601 UTC, set once by the store.
    pub created_at: String,
}

/// Caller-supplied fields for a new observation.
///
/// Store-assigned fields (`id`, `case_id`, `created_at`) are not part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationDraft {
    pub date: String,
    pub description: String,
    pub child_info: String,
    pub signs_checked: BTreeSet<String>,
    pub concern_level: ConcernLevel,
}

impl ObservationDraft {
    /// Creates a draft with empty text fields and no signs.
    pub fn new(date: impl Into<String>, concern_level: ConcernLevel) -> Self {
        Self {
            date: date.into(),
            description: String::new(),
            child_info: String::new(),
            signs_checked: BTreeSet::new(),
            concern_level,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_child_info(mut self, child_info: impl Into<String>) -> Self {
        self.child_info = child_info.into();
        self
    }

    pub fn with_signs<I, S>(mut self, signs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.signs_checked = signs.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_timestamp("date", &self.date)
    }
}

/// Partial update for an existing observation; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationPatch {
    pub date: Option<String>,
    pub description: Option<String>,
    pub child_info: Option<String>,
    pub signs_checked: Option<BTreeSet<String>>,
    pub concern_level: Option<ConcernLevel>,
}

impl ObservationPatch {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.description.is_none()
            && self.child_info.is_none()
            && self.signs_checked.is_none()
            && self.concern_level.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.date.as_deref() {
            Some(date) => validate_timestamp("date", date),
            None => Ok(()),
        }
    }

    /// Applies present fields onto `observation`.
    pub fn apply_to(&self, observation: &mut Observation) {
        if let Some(date) = &self.date {
            observation.date = date.clone();
        }
        if let Some(description) = &self.description {
            observation.description = description.clone();
        }
        if let Some(child_info) = &self.child_info {
            observation.child_info = child_info.clone();
        }
        if let Some(signs) = &self.signs_checked {
            observation.signs_checked = signs.clone();
        }
        if let Some(level) = self.concern_level {
            observation.concern_level = level;
        }
    }
}
