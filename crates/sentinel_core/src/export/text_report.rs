//! Plain-text case report.
//!
//! Same section layout as the printable report: header, case facts, then one
//! numbered block per observation, then the footer disclaimer.

use crate::catalog::SignCatalog;
use crate::export::{CaseExporter, ExportError, ExportRequest, TextLookup};
use crate::model::observation::Observation;
use crate::model::sign::Sign;
use std::fmt::Write;

const REPORT_TITLE: &str = "SENTINEL";
const RULE_WIDTH: usize = 60;

/// Renders a case as a plain-text document.
#[derive(Debug, Clone, Default)]
pub struct PlainTextReport<'a> {
    catalog: Option<&'a SignCatalog>,
    generated_on: Option<String>,
}

impl<'a> PlainTextReport<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops sign ids the catalog cannot resolve instead of printing them.
    pub fn with_catalog(mut self, catalog: &'a SignCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Adds a "generated on" line with the given date text.
    pub fn generated_on(mut self, date: impl Into<String>) -> Self {
        self.generated_on = Some(date.into());
        self
    }

    fn sign_labels(&self, observation: &Observation, text: &dyn TextLookup) -> Vec<String> {
        observation
            .signs_checked
            .iter()
            .filter(|id| {
                self.catalog
                    .map_or(true, |catalog| catalog.get(id.as_str()).is_some())
            })
            .map(|id| text.text(&Sign::label_key(id)))
            .collect()
    }
}

impl CaseExporter for PlainTextReport<'_> {
    type Output = String;

    fn export(&self, request: &ExportRequest<'_>) -> Result<String, ExportError> {
        let text = request.text;
        let case = request.case;
        let mut out = String::new();

        render(&mut out, |out| {
            writeln!(out, "{REPORT_TITLE}")?;
            writeln!(out, "{}", text.text("document.pdf.subtitle"))?;
            if let Some(date) = &self.generated_on {
                writeln!(out, "{}: {date}", text.text("document.pdf.generated"))?;
            }
            writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;

            field(out, &text.text("document.pdf.caseName"), &case.name)?;
            field(
                out,
                &text.text("document.pdf.category"),
                &text.text(&format!("document.form.categoryOptions.{}", case.category)),
            )?;
            field(
                out,
                &text.text("document.pdf.status"),
                &text.text(&format!("document.cases.statuses.{}", case.status)),
            )?;
            field(
                out,
                &text.text("document.pdf.created"),
                date_part(&case.created_at),
            )?;
            if let Some(observation) = request
                .observations
                .iter()
                .find(|observation| !observation.child_info.is_empty())
            {
                field(out, &text.text("document.pdf.childInfo"), &observation.child_info)?;
            }

            for (index, observation) in request.observations.iter().enumerate() {
                writeln!(out)?;
                writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
                writeln!(
                    out,
                    "{} {} - {}",
                    text.text("document.pdf.observationLabel"),
                    index + 1,
                    display_datetime(&observation.date)
                )?;
                field(
                    out,
                    &text.text("document.pdf.concernLevel"),
                    &text.text(&format!(
                        "document.form.concernLevels.{}",
                        observation.concern_level
                    )),
                )?;
                field(
                    out,
                    &text.text("document.pdf.description"),
                    &observation.description,
                )?;
                let labels = self.sign_labels(observation, text);
                if !labels.is_empty() {
                    field(out, &text.text("document.pdf.signs"), &labels.join("; "))?;
                }
            }

            writeln!(out)?;
            writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
            writeln!(out, "{}", text.text("document.pdf.footer"))
        })?;

        Ok(out)
    }
}

fn render(
    out: &mut String,
    body: impl FnOnce(&mut String) -> std::fmt::Result,
) -> Result<(), ExportError> {
    body(out).map_err(|err| ExportError::Render(err.to_string()))
}

/// Writes `label: value`, skipping empty values.
fn field(out: &mut String, label: &str, value: &str) -> std::fmt::Result {
    if value.is_empty() {
        return Ok(());
    }
    writeln!(out, "{label}: {value}")
}

fn date_part(timestamp: &str) -> &str {
    timestamp.get(..10).unwrap_or(timestamp)
}

/// `2024-03-05T14:30:15.000Z` -> `2024-03-05 14:30`.
fn display_datetime(timestamp: &str) -> String {
    timestamp.get(..16).unwrap_or(timestamp).replacen('T', " ", 1)
}
