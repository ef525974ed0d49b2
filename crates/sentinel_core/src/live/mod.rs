//! Reactive live views over the case/observation store.
//!
//! # Responsibility
//! - Keep subscriber-facing query results fresh after each commit.
//!
//! # Invariants
//! - A view starts as `Loadable::NotLoaded`, distinct from loaded-but-empty.
//! - Views are refreshed only after a commit, never mid-transaction.
//! - A view is recomputed only when the commit's change set can affect it,
//!   and re-delivered only when the recomputed value differs.

use crate::repo::case_repo::{CaseReader, RepoResult};
use crate::repo::change_set::ChangeSet;

pub mod hub;
pub mod views;

pub use hub::{LiveHandle, LiveHub, PublishReport, SubscriptionId};
pub use views::{CaseDetailView, CaseListView, TimelineView};

/// Current value of a live view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loadable<T> {
    /// No result has been computed yet.
    NotLoaded,
    Loaded(T),
}

impl<T> Loadable<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    pub fn as_loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            Self::NotLoaded => None,
        }
    }

    pub fn into_loaded(self) -> Option<T> {
        match self {
            Self::Loaded(value) => Some(value),
            Self::NotLoaded => None,
        }
    }
}

/// A query whose result can be kept live.
pub trait LiveQuery: Send + 'static {
    type Output: Clone + PartialEq + Send + 'static;

    /// Short stable name used in log events.
    fn name(&self) -> &'static str;

    /// Whether a commit with `changes` can alter this query's result.
    fn depends_on(&self, changes: &ChangeSet) -> bool;

    fn load(&self, reader: &dyn CaseReader) -> RepoResult<Self::Output>;
}
