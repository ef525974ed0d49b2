//! Sign catalog loading and lookup.
//!
//! # Responsibility
//! - Parse the checklist catalog shipped with the UI.
//! - Answer id lookups for triage and for export rendering.
//!
//! # Invariants
//! - Sign ids are unique across all categories.
//! - The catalog is immutable once built.
//!
//! The source document groups signs by category:
//! `{ "physical": [ { "id": "...", "type": "physical", "text": "...", "severity": "mild" } ] }`.

use crate::model::sign::{Severity, Sign, SignCategory, SignType};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error raised while building a sign catalog.
#[derive(Debug)]
pub enum CatalogError {
    /// Document is not valid catalog JSON.
    Parse(serde_json::Error),
    /// Same id listed twice.
    DuplicateSign(String),
    /// Sign id is empty after trimming.
    EmptySignId { category: SignCategory },
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid sign catalog: {err}"),
            Self::DuplicateSign(id) => write!(f, "duplicate sign id `{id}` in catalog"),
            Self::EmptySignId { category } => {
                write!(f, "empty sign id in category `{}`", category.as_str())
            }
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Triage-relevant metadata of one sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignProfile {
    pub severity: Severity,
    pub category: SignCategory,
}

/// Lookup from sign id to triage metadata.
pub trait SignLookup {
    fn profile(&self, id: &str) -> Option<SignProfile>;
}

impl SignLookup for HashMap<String, SignProfile> {
    fn profile(&self, id: &str) -> Option<SignProfile> {
        self.get(id).copied()
    }
}

impl SignLookup for BTreeMap<String, SignProfile> {
    fn profile(&self, id: &str) -> Option<SignProfile> {
        self.get(id).copied()
    }
}

#[derive(Debug, Deserialize)]
struct RawSign {
    id: String,
    #[serde(rename = "type")]
    kind: SignType,
    text: String,
    severity: Severity,
}

/// Read-only catalog of checklist signs keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignCatalog {
    signs: BTreeMap<String, Sign>,
}

impl SignCatalog {
    /// Parses a category-grouped catalog document.
    ///
    /// # Errors
    /// - `CatalogError::Parse` for malformed JSON or unknown enum text.
    /// - `CatalogError::DuplicateSign` when an id appears twice.
    pub fn from_json(source: &str) -> Result<Self, CatalogError> {
        let grouped: BTreeMap<SignCategory, Vec<RawSign>> = serde_json::from_str(source)?;
        let signs = grouped.into_iter().flat_map(|(category, raw_signs)| {
            raw_signs.into_iter().map(move |raw| Sign {
                id: raw.id,
                kind: raw.kind,
                severity: raw.severity,
                category,
                text: raw.text,
            })
        });
        Self::from_signs(signs)
    }

    /// Builds a catalog from already-typed signs.
    pub fn from_signs(signs: impl IntoIterator<Item = Sign>) -> Result<Self, CatalogError> {
        let mut by_id = BTreeMap::new();
        for mut sign in signs {
            sign.id = sign.id.trim().to_string();
            if sign.id.is_empty() {
                return Err(CatalogError::EmptySignId {
                    category: sign.category,
                });
            }
            if by_id.contains_key(&sign.id) {
                return Err(CatalogError::DuplicateSign(sign.id));
            }
            by_id.insert(sign.id.clone(), sign);
        }
        Ok(Self { signs: by_id })
    }

    pub fn get(&self, id: &str) -> Option<&Sign> {
        self.signs.get(id)
    }

    pub fn len(&self) -> usize {
        self.signs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signs.is_empty()
    }

    /// Iterates all signs ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &Sign> {
        self.signs.values()
    }

    /// Iterates the signs of one category ordered by id.
    pub fn in_category(&self, category: SignCategory) -> impl Iterator<Item = &Sign> {
        self.signs
            .values()
            .filter(move |sign| sign.category == category)
    }
}

impl SignLookup for SignCatalog {
    fn profile(&self, id: &str) -> Option<SignProfile> {
        self.signs.get(id).map(|sign| SignProfile {
            severity: sign.severity,
            category: sign.category,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{CatalogError, SignCatalog, SignLookup};
    use crate::model::sign::{Severity, SignCategory, SignType};

    const CATALOG: &str = r#"{
        "physical": [
            { "id": "p-bruise", "type": "physical", "text": "bruises", "severity": "moderate" },
            { "id": "p-burn", "type": "physical", "text": "burns", "severity": "severe" }
        ],
        "sexual": [
            { "id": "s-knowledge", "type": "behavioral", "text": "knowledge", "severity": "severe" }
        ]
    }"#;

    #[test]
    fn parses_grouped_document_and_assigns_categories() {
        let catalog = SignCatalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.len(), 3);

        let sign = catalog.get("s-knowledge").unwrap();
        assert_eq!(sign.category, SignCategory::Sexual);
        assert_eq!(sign.kind, SignType::Behavioral);
        assert_eq!(sign.severity, Severity::Severe);
        assert_eq!(catalog.in_category(SignCategory::Physical).count(), 2);
    }

    #[test]
    fn profile_lookup_ignores_unknown_ids() {
        let catalog = SignCatalog::from_json(CATALOG).unwrap();
        assert!(catalog.profile("missing").is_none());
        assert_eq!(
            catalog.profile("p-burn").map(|profile| profile.severity),
            Some(Severity::Severe)
        );
    }

    #[test]
    fn duplicate_ids_across_categories_are_rejected() {
        let source = r#"{
            "physical": [{ "id": "dup", "type": "physical", "text": "a", "severity": "mild" }],
            "neglect": [{ "id": "dup", "type": "behavioral", "text": "b", "severity": "mild" }]
        }"#;
        let err = SignCatalog::from_json(source).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateSign(id) if id == "dup"));
    }

    #[test]
    fn unknown_severity_is_a_parse_error() {
        let source = r#"{ "physical": [{ "id": "x", "type": "physical", "text": "a", "severity": "extreme" }] }"#;
        assert!(matches!(
            SignCatalog::from_json(source),
            Err(CatalogError::Parse(_))
        ));
    }
}
