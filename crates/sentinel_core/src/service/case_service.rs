//! Case/observation use-case service.
//!
//! # Responsibility
//! - Expose the command API the UI drives (create, add, update, delete).
//! - Fan each committed change set out to live views before returning.
//! - Provide read-only snapshot export.
//!
//! # Invariants
//! - Live views are refreshed only after the repository committed.
//! - No-op commands (missing observation, missing case on delete) publish
//!   nothing.
//! - Log events carry ids and outcomes only, never user-entered text.

use crate::export::{CaseExporter, ExportError, ExportRequest, TextLookup};
use crate::live::{
    CaseDetailView, CaseListView, LiveHandle, LiveHub, LiveQuery, Loadable, SubscriptionId,
    TimelineView,
};
use crate::model::case::{Case, CaseCategory, CaseId, CaseStatus};
use crate::model::observation::{Observation, ObservationDraft, ObservationId, ObservationPatch};
use crate::repo::case_repo::{CaseRepository, RecordRef, RepoError, RepoResult, TimelineOrder};
use crate::repo::change_set::Committed;
use log::{error, info, warn};
use std::time::Instant;

/// Command/query facade over a case repository plus its live views.
pub struct CaseService<R: CaseRepository> {
    repo: R,
    hub: LiveHub,
}

impl<R: CaseRepository> CaseService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            hub: LiveHub::new(),
        }
    }

    /// Creates a case in `monitoring` status and returns its id.
    pub fn create_case(&mut self, name: &str, category: CaseCategory) -> RepoResult<CaseId> {
        let started_at = Instant::now();
        let result = self.repo.create_case(name, category);
        self.finish("case_create", started_at, result)
            .map(|case| case.id)
    }

    /// Adds an observation to an existing case and returns its id.
    ///
    /// # Errors
    /// - `RepoError::NotFound` when `case_id` does not exist.
    pub fn add_observation(
        &mut self,
        case_id: CaseId,
        draft: &ObservationDraft,
    ) -> RepoResult<ObservationId> {
        let started_at = Instant::now();
        let result = self.repo.add_observation(case_id, draft);
        self.finish("observation_add", started_at, result)
            .map(|observation| observation.id)
    }

    /// Applies a partial update; silently does nothing for unknown ids.
    pub fn update_observation(
        &mut self,
        observation_id: ObservationId,
        patch: &ObservationPatch,
    ) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = self.repo.update_observation(observation_id, patch);
        self.finish("observation_update", started_at, result)
            .map(|_| ())
    }

    pub fn update_case_status(&mut self, case_id: CaseId, status: CaseStatus) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = self.repo.update_case_status(case_id, status);
        self.finish("case_status_update", started_at, result)
            .map(|_| ())
    }

    /// Deletes one observation; silently does nothing for unknown ids.
    pub fn delete_observation(&mut self, observation_id: ObservationId) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = self.repo.delete_observation(observation_id);
        self.finish("observation_delete", started_at, result)
            .map(|_| ())
    }

    /// Deletes a case together with all of its observations.
    pub fn delete_case(&mut self, case_id: CaseId) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = self.repo.delete_case(case_id);
        self.finish("case_delete", started_at, result).map(|_| ())
    }

    pub fn get_case(&self, case_id: CaseId) -> RepoResult<Option<Case>> {
        self.repo.get_case(case_id)
    }

    pub fn list_cases(&self) -> RepoResult<Vec<Case>> {
        self.repo.list_cases()
    }

    pub fn get_observation(&self, observation_id: ObservationId) -> RepoResult<Option<Observation>> {
        self.repo.get_observation(observation_id)
    }

    pub fn list_observations(
        &self,
        case_id: CaseId,
        order: TimelineOrder,
    ) -> RepoResult<Vec<Observation>> {
        self.repo.list_observations(case_id, order)
    }

    /// Registers a live view and loads its first value.
    ///
    /// `sink` receives `NotLoaded` right away, then every changed value. A
    /// failed first load is logged and retried on the next commit.
    pub fn subscribe<Q, F>(&mut self, query: Q, sink: F) -> SubscriptionId
    where
        Q: LiveQuery,
        F: FnMut(&Loadable<Q::Output>) + Send + 'static,
    {
        let name = query.name();
        let id = self.hub.subscribe(query, sink);
        self.load_initial(id, name);
        id
    }

    /// Registers a live view behind a polling handle and loads it.
    pub fn watch<Q: LiveQuery>(&mut self, query: Q) -> LiveHandle<Q::Output> {
        let name = query.name();
        let handle = self.hub.watch(query);
        self.load_initial(handle.id(), name);
        handle
    }

    pub fn watch_cases(&mut self) -> LiveHandle<Vec<Case>> {
        self.watch(CaseListView)
    }

    pub fn watch_case(&mut self, case_id: CaseId) -> LiveHandle<Option<Case>> {
        self.watch(CaseDetailView::new(case_id))
    }

    /// Newest-first timeline of one case.
    pub fn watch_timeline(&mut self, case_id: CaseId) -> LiveHandle<Vec<Observation>> {
        self.watch(TimelineView::newest_first(case_id))
    }

    /// Oldest-first observations of one case, as used by export.
    pub fn watch_chronological(&mut self, case_id: CaseId) -> LiveHandle<Vec<Observation>> {
        self.watch(TimelineView::oldest_first(case_id))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.hub.unsubscribe(id)
    }

    /// Exports one case from a consistent read snapshot.
    ///
    /// # Errors
    /// - `ExportError::Repo(RepoError::NotFound)` for a missing case.
    /// - Whatever the exporter reports; store state is never modified.
    pub fn export_case<E: CaseExporter>(
        &self,
        case_id: CaseId,
        exporter: &E,
        text: &dyn TextLookup,
    ) -> Result<E::Output, ExportError> {
        let started_at = Instant::now();
        let snapshot = self
            .repo
            .snapshot(case_id)?
            .ok_or(RepoError::NotFound(RecordRef::Case(case_id)))?;
        let request = ExportRequest {
            case: &snapshot.case,
            observations: &snapshot.observations,
            text,
        };

        match exporter.export(&request) {
            Ok(output) => {
                info!(
                    "event=case_export module=export status=ok observations={} duration_ms={}",
                    snapshot.observations.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(output)
            }
            Err(err) => {
                error!(
                    "event=case_export module=export status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Returns the underlying repository.
    pub fn into_inner(self) -> R {
        self.repo
    }

    fn load_initial(&mut self, id: SubscriptionId, view: &'static str) {
        if let Err(err) = self.hub.refresh(id, &self.repo) {
            warn!(
                "event=live_subscribe module=live status=error view={} error={}",
                view, err
            );
        }
    }

    fn finish<T>(
        &mut self,
        event: &'static str,
        started_at: Instant,
        result: RepoResult<Committed<T>>,
    ) -> RepoResult<T> {
        match result {
            Ok(committed) => {
                let report = self.hub.publish(&self.repo, &committed.changes);
                info!(
                    "event={} module=store status=ok noop={} views_delivered={} views_failed={} duration_ms={}",
                    event,
                    committed.changes.is_empty(),
                    report.delivered,
                    report.failed,
                    started_at.elapsed().as_millis()
                );
                Ok(committed.value)
            }
            Err(err) => {
                match &err {
                    RepoError::Storage(_) | RepoError::InvalidData(_) | RepoError::MissingRequiredTable(_) => {
                        error!(
                            "event={} module=store status=error error_code={} duration_ms={} error={}",
                            event,
                            error_code(&err),
                            started_at.elapsed().as_millis(),
                            err
                        );
                    }
                    RepoError::Validation(_) | RepoError::NotFound(_) => {
                        warn!(
                            "event={} module=store status=rejected error_code={} duration_ms={}",
                            event,
                            error_code(&err),
                            started_at.elapsed().as_millis()
                        );
                    }
                }
                Err(err)
            }
        }
    }
}

fn error_code(err: &RepoError) -> &'static str {
    match err {
        RepoError::Validation(_) => "validation_failed",
        RepoError::Storage(_) => "storage_failed",
        RepoError::NotFound(_) => "not_found",
        RepoError::InvalidData(_) => "invalid_data",
        RepoError::MissingRequiredTable(_) => "schema_missing",
    }
}
