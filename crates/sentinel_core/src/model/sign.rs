//! Checklist sign reference model.
//!
//! Signs come from a static catalog shipped with the UI; core code reads them
//! but never writes them.

use crate::model::case::CaseCategory;
use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a sign manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignType {
    /// Visible on the body.
    Physical,
    Behavioral,
}

impl SignType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Physical => "physical",
            Self::Behavioral => "behavioral",
        }
    }
}

impl FromStr for SignType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "physical" => Ok(Self::Physical),
            "behavioral" => Ok(Self::Behavioral),
            other => Err(ValidationError::UnknownSignType(other.to_string())),
        }
    }
}

/// Clinical weight of a sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
        }
    }
}

impl FromStr for Severity {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "mild" => Ok(Self::Mild),
            "moderate" => Ok(Self::Moderate),
            "severe" => Ok(Self::Severe),
            other => Err(ValidationError::UnknownSeverity(other.to_string())),
        }
    }
}

/// Abuse category a sign belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignCategory {
    Physical,
    Emotional,
    Sexual,
    Neglect,
}

impl SignCategory {
    pub const ALL: [SignCategory; 4] = [
        Self::Physical,
        Self::Emotional,
        Self::Sexual,
        Self::Neglect,
    ];

    pub fn as_str(self) -> &'static str {
        CaseCategory::from(self).as_str()
    }
}

impl FromStr for SignCategory {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
            .ok_or_else(|| ValidationError::UnknownCategory(value.to_string()))
    }
}

impl From<SignCategory> for CaseCategory {
    fn from(value: SignCategory) -> Self {
        match value {
            SignCategory::Physical => Self::Physical,
            SignCategory::Emotional => Self::Emotional,
            SignCategory::Sexual => Self::Sexual,
            SignCategory::Neglect => Self::Neglect,
        }
    }
}

/// One checklist indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sign {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SignType,
    pub severity: Severity,
    pub category: SignCategory,
    /// Display text key, resolved by the caller.
    pub text: String,
}

impl Sign {
    /// Translation key used by exported documents: `identify.signs.<id>`
    /// with dashes removed from the id.
    pub fn label_key(id: &str) -> String {
        format!("identify.signs.{}", id.replace('-', ""))
    }
}
