//! Case export contracts.
//!
//! # Responsibility
//! - Define what an exporter receives: one case, its observations in
//!   chronological order, and a text lookup for display labels.
//!
//! # Invariants
//! - Exporters are read-only; a failed export never touches store state.
//! - Text lookup is the caller's concern; exporters only pass keys.

use crate::model::case::Case;
use crate::model::observation::Observation;
use crate::repo::case_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod text_report;

pub use text_report::PlainTextReport;

/// Resolves a display-text key to localized text.
pub trait TextLookup {
    fn text(&self, key: &str) -> String;
}

impl<F> TextLookup for F
where
    F: Fn(&str) -> String,
{
    fn text(&self, key: &str) -> String {
        self(key)
    }
}

/// Input handed to an exporter.
pub struct ExportRequest<'a> {
    pub case: &'a Case,
    /// Oldest first.
    pub observations: &'a [Observation],
    pub text: &'a dyn TextLookup,
}

/// Error raised while exporting a case.
#[derive(Debug)]
pub enum ExportError {
    /// Reading the case snapshot failed (including a missing case).
    Repo(RepoError),
    /// The exporter could not produce its artifact.
    Render(String),
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Render(message) => write!(f, "export failed: {message}"),
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Render(_) => None,
        }
    }
}

impl From<RepoError> for ExportError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Produces a document from one case.
pub trait CaseExporter {
    type Output;

    fn export(&self, request: &ExportRequest<'_>) -> Result<Self::Output, ExportError>;
}
