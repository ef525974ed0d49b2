//! Commit change sets.
//!
//! Every successful store mutation reports which tables and which cases it
//! touched, so live views can decide whether they need to recompute.

use crate::model::case::CaseId;
use std::collections::BTreeSet;

/// Store table touched by a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    Cases,
    Observations,
}

/// Tables and case ids touched by one committed transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    tables: BTreeSet<Table>,
    cases: BTreeSet<CaseId>,
}

impl ChangeSet {
    /// Change set of a commit that wrote nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Records that `table` rows owned by `case_id` were written.
    pub fn touch(mut self, table: Table, case_id: CaseId) -> Self {
        self.tables.insert(table);
        self.cases.insert(case_id);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn touches_table(&self, table: Table) -> bool {
        self.tables.contains(&table)
    }

    pub fn touches_case(&self, case_id: CaseId) -> bool {
        self.cases.contains(&case_id)
    }

    pub fn tables(&self) -> impl Iterator<Item = Table> + '_ {
        self.tables.iter().copied()
    }

    pub fn cases(&self) -> impl Iterator<Item = CaseId> + '_ {
        self.cases.iter().copied()
    }
}

/// Result of a store mutation plus what it changed.
///
/// A mutation that turned out to be a no-op carries an empty change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed<T> {
    pub value: T,
    pub changes: ChangeSet,
}

impl<T> Committed<T> {
    pub fn new(value: T, changes: ChangeSet) -> Self {
        Self { value, changes }
    }

    pub fn unchanged(value: T) -> Self {
        Self {
            value,
            changes: ChangeSet::empty(),
        }
    }
}
