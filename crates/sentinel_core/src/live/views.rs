//! Built-in live views consumed by the UI.

use crate::live::LiveQuery;
use crate::model::case::{Case, CaseId};
use crate::model::observation::Observation;
use crate::repo::case_repo::{CaseReader, RepoResult, TimelineOrder};
use crate::repo::change_set::{ChangeSet, Table};

/// All cases, most recently updated first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaseListView;

impl LiveQuery for CaseListView {
    type Output = Vec<Case>;

    fn name(&self) -> &'static str {
        "case_list"
    }

    fn depends_on(&self, changes: &ChangeSet) -> bool {
        changes.touches_table(Table::Cases)
    }

    fn load(&self, reader: &dyn CaseReader) -> RepoResult<Self::Output> {
        reader.list_cases()
    }
}

/// One case, or `None` once it is deleted or if it never existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaseDetailView {
    pub case_id: CaseId,
}

impl CaseDetailView {
    pub fn new(case_id: CaseId) -> Self {
        Self { case_id }
    }
}

impl LiveQuery for CaseDetailView {
    type Output = Option<Case>;

    fn name(&self) -> &'static str {
        "case_detail"
    }

    fn depends_on(&self, changes: &ChangeSet) -> bool {
        changes.touches_table(Table::Cases) && changes.touches_case(self.case_id)
    }

    fn load(&self, reader: &dyn CaseReader) -> RepoResult<Self::Output> {
        reader.get_case(self.case_id)
    }
}

/// Observations of one case ordered by `date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineView {
    pub case_id: CaseId,
    pub order: TimelineOrder,
}

impl TimelineView {
    /// Newest first; the primary timeline.
    pub fn newest_first(case_id: CaseId) -> Self {
        Self {
            case_id,
            order: TimelineOrder::ReverseChronological,
        }
    }

    /// Oldest first; used for sequential export.
    pub fn oldest_first(case_id: CaseId) -> Self {
        Self {
            case_id,
            order: TimelineOrder::Chronological,
        }
    }
}

impl LiveQuery for TimelineView {
    type Output = Vec<Observation>;

    fn name(&self) -> &'static str {
        match self.order {
            TimelineOrder::Chronological => "timeline_chronological",
            TimelineOrder::ReverseChronological => "timeline",
        }
    }

    fn depends_on(&self, changes: &ChangeSet) -> bool {
        changes.touches_table(Table::Observations) && changes.touches_case(self.case_id)
    }

    fn load(&self, reader: &dyn CaseReader) -> RepoResult<Self::Output> {
        reader.list_observations(self.case_id, self.order)
    }
}
