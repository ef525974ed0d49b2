//! Core domain logic for Sentinel.
//! This crate is the single source of truth for case, observation and
//! triage invariants.

pub mod catalog;
pub mod db;
pub mod export;
pub mod live;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod triage;

pub use catalog::{CatalogError, SignCatalog, SignLookup, SignProfile};
pub use export::{CaseExporter, ExportError, ExportRequest, PlainTextReport, TextLookup};
pub use live::{
    CaseDetailView, CaseListView, LiveHandle, LiveHub, LiveQuery, Loadable, SubscriptionId,
    TimelineView,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::case::{Case, CaseCategory, CaseId, CaseStatus};
pub use model::observation::{
    ConcernLevel, Observation, ObservationDraft, ObservationId, ObservationPatch,
};
pub use model::sign::{Severity, Sign, SignCategory, SignType};
pub use model::validation::ValidationError;
pub use repo::case_repo::{
    CaseReader, CaseRepository, CaseSnapshot, RecordRef, RepoError, RepoResult,
    SqliteCaseRepository, TimelineOrder,
};
pub use repo::change_set::{ChangeSet, Committed, Table};
pub use repo::preferences_repo::{PreferencesStore, SqlitePreferences};
pub use service::case_service::CaseService;
pub use triage::{assess, classify, TriageAssessment, TriageRule};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
