//! Subscription registry and commit fan-out.
//!
//! # Responsibility
//! - Hold live view subscriptions and their memoized results.
//! - Refresh dependent views synchronously after each commit.
//!
//! # Invariants
//! - Sinks see `NotLoaded` once at registration, then only `Loaded` values.
//! - A sink is never called twice in a row with equal values.
//! - A failed refresh keeps the previous value; a subscription still
//!   `NotLoaded` is retried on every later commit.

use crate::live::{Loadable, LiveQuery};
use crate::repo::case_repo::{CaseReader, RepoResult};
use crate::repo::change_set::ChangeSet;
use log::warn;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Identifier of one registered subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Outcome of fanning one commit out to subscriptions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Views whose query was re-run.
    pub recomputed: usize,
    /// Views whose sink received a new value.
    pub delivered: usize,
    pub failed: usize,
}

type Sink<T> = Box<dyn FnMut(&Loadable<T>) + Send>;

trait ErasedSubscription: Send {
    fn view_name(&self) -> &'static str;
    fn needs_refresh(&self, changes: &ChangeSet) -> bool;
    /// Recomputes and delivers when the value changed; returns whether it
    /// delivered.
    fn refresh(&mut self, reader: &dyn CaseReader) -> RepoResult<bool>;
}

struct Subscription<Q: LiveQuery> {
    query: Q,
    state: Loadable<Q::Output>,
    sink: Sink<Q::Output>,
}

impl<Q: LiveQuery> ErasedSubscription for Subscription<Q> {
    fn view_name(&self) -> &'static str {
        self.query.name()
    }

    fn needs_refresh(&self, changes: &ChangeSet) -> bool {
        !self.state.is_loaded() || self.query.depends_on(changes)
    }

    fn refresh(&mut self, reader: &dyn CaseReader) -> RepoResult<bool> {
        let next = self.query.load(reader)?;
        if matches!(&self.state, Loadable::Loaded(current) if *current == next) {
            return Ok(false);
        }
        self.state = Loadable::Loaded(next);
        (self.sink)(&self.state);
        Ok(true)
    }
}

/// Registry of live view subscriptions.
#[derive(Default)]
pub struct LiveHub {
    next_id: u64,
    subscriptions: BTreeMap<SubscriptionId, Box<dyn ErasedSubscription>>,
}

impl LiveHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `query` and immediately hands `NotLoaded` to `sink`.
    ///
    /// The first real value arrives on [`LiveHub::refresh`] or on the next
    /// commit, whichever comes first.
    pub fn subscribe<Q, F>(&mut self, query: Q, mut sink: F) -> SubscriptionId
    where
        Q: LiveQuery,
        F: FnMut(&Loadable<Q::Output>) + Send + 'static,
    {
        let state = Loadable::NotLoaded;
        sink(&state);

        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.insert(
            id,
            Box::new(Subscription {
                query,
                state,
                sink: Box::new(sink),
            }),
        );
        id
    }

    /// Registers `query` with a handle that keeps the latest value.
    pub fn watch<Q: LiveQuery>(&mut self, query: Q) -> LiveHandle<Q::Output> {
        let latest = Arc::new(Mutex::new(Loadable::NotLoaded));
        let revision = Arc::new(AtomicU64::new(0));
        let sink_latest = Arc::clone(&latest);
        let sink_revision = Arc::clone(&revision);

        let id = self.subscribe(query, move |value: &Loadable<Q::Output>| {
            let mut slot = sink_latest.lock().unwrap_or_else(PoisonError::into_inner);
            *slot = value.clone();
            if value.is_loaded() {
                sink_revision.fetch_add(1, Ordering::SeqCst);
            }
        });

        LiveHandle {
            id,
            latest,
            revision,
        }
    }

    /// Removes a subscription; returns whether it existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Recomputes one subscription regardless of change sets.
    ///
    /// Returns `Ok(false)` for unknown ids and for unchanged values.
    pub fn refresh(&mut self, id: SubscriptionId, reader: &dyn CaseReader) -> RepoResult<bool> {
        match self.subscriptions.get_mut(&id) {
            Some(subscription) => subscription.refresh(reader),
            None => Ok(false),
        }
    }

    /// Refreshes every subscription affected by a committed change set.
    ///
    /// Refresh failures are logged and counted; they never undo the commit.
    pub fn publish(&mut self, reader: &dyn CaseReader, changes: &ChangeSet) -> PublishReport {
        let mut report = PublishReport::default();
        if changes.is_empty() {
            return report;
        }

        for subscription in self.subscriptions.values_mut() {
            if !subscription.needs_refresh(changes) {
                continue;
            }
            report.recomputed += 1;
            match subscription.refresh(reader) {
                Ok(true) => report.delivered += 1,
                Ok(false) => {}
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        "event=live_refresh module=live status=error view={} error={}",
                        subscription.view_name(),
                        err
                    );
                }
            }
        }
        report
    }
}

/// Polling handle over a watched view.
///
/// Cloning the handle shares the same underlying value.
#[derive(Debug, Clone)]
pub struct LiveHandle<T> {
    id: SubscriptionId,
    latest: Arc<Mutex<Loadable<T>>>,
    revision: Arc<AtomicU64>,
}

impl<T: Clone> LiveHandle<T> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns the most recently delivered value.
    pub fn get(&self) -> Loadable<T> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of loaded values delivered so far.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::LiveHub;
    use crate::db::DbError;
    use crate::live::{CaseListView, Loadable};
    use crate::model::case::{Case, CaseCategory, CaseId, CaseStatus};
    use crate::model::observation::{Observation, ObservationId};
    use crate::repo::case_repo::{
        CaseReader, CaseSnapshot, RepoError, RepoResult, TimelineOrder,
    };
    use crate::repo::change_set::{ChangeSet, Table};
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    #[derive(Default)]
    struct FakeReader {
        cases: Vec<Case>,
        fail: bool,
    }

    impl CaseReader for FakeReader {
        fn get_case(&self, case_id: CaseId) -> RepoResult<Option<Case>> {
            Ok(self.cases.iter().find(|case| case.id == case_id).cloned())
        }

        fn list_cases(&self) -> RepoResult<Vec<Case>> {
            if self.fail {
                return Err(RepoError::Storage(DbError::Sqlite(
                    rusqlite::Error::QueryReturnedNoRows,
                )));
            }
            Ok(self.cases.clone())
        }

        fn get_observation(&self, _: ObservationId) -> RepoResult<Option<Observation>> {
            Ok(None)
        }

        fn list_observations(&self, _: CaseId, _: TimelineOrder) -> RepoResult<Vec<Observation>> {
            Ok(Vec::new())
        }

        fn snapshot(&self, _: CaseId) -> RepoResult<Option<CaseSnapshot>> {
            Ok(None)
        }
    }

    fn case(name: &str) -> Case {
        Case {
            id: Uuid::new_v4(),
            name: name.to_string(),
            category: CaseCategory::Unsure,
            status: CaseStatus::Monitoring,
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
            updated_at: "2024-01-01T00:00:00.000Z".to_string(),
        }
    }

    fn case_change() -> ChangeSet {
        ChangeSet::empty().touch(Table::Cases, Uuid::new_v4())
    }

    #[test]
    fn subscriber_sees_not_loaded_before_first_value() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let mut hub = LiveHub::new();
        let id = hub.subscribe(CaseListView, move |value: &Loadable<Vec<Case>>| {
            sink_seen.lock().unwrap().push(value.clone());
        });

        let reader = FakeReader::default();
        assert!(hub.refresh(id, &reader).unwrap());

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![Loadable::NotLoaded, Loadable::Loaded(Vec::new())]);
    }

    #[test]
    fn unchanged_result_is_not_redelivered() {
        let mut hub = LiveHub::new();
        let handle = hub.watch(CaseListView);
        let reader = FakeReader {
            cases: vec![case("a")],
            fail: false,
        };

        hub.publish(&reader, &case_change());
        let report = hub.publish(&reader, &case_change());

        assert_eq!(report.recomputed, 1);
        assert_eq!(report.delivered, 0);
        assert_eq!(handle.revision(), 1);
    }

    #[test]
    fn empty_change_set_touches_no_view() {
        let mut hub = LiveHub::new();
        let handle = hub.watch(CaseListView);
        let report = hub.publish(&FakeReader::default(), &ChangeSet::empty());

        assert_eq!(report.recomputed, 0);
        assert_eq!(handle.get(), Loadable::NotLoaded);
    }

    #[test]
    fn failed_refresh_keeps_previous_value() {
        let mut hub = LiveHub::new();
        let handle = hub.watch(CaseListView);
        let first = case("kept");
        let mut reader = FakeReader {
            cases: vec![first.clone()],
            fail: false,
        };
        hub.publish(&reader, &case_change());

        reader.fail = true;
        reader.cases.clear();
        let report = hub.publish(&reader, &case_change());

        assert_eq!(report.failed, 1);
        assert_eq!(handle.get(), Loadable::Loaded(vec![first]));
    }

    #[test]
    fn unsubscribed_view_is_not_refreshed() {
        let mut hub = LiveHub::new();
        let handle = hub.watch(CaseListView);
        assert!(hub.unsubscribe(handle.id()));
        assert!(!hub.unsubscribe(handle.id()));

        hub.publish(&FakeReader::default(), &case_change());
        assert_eq!(handle.get(), Loadable::NotLoaded);
        assert!(hub.is_empty());
    }
}
