//! Case/observation repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide atomic CRUD over `cases` and `observations`.
//! - Report what each commit touched so live views can refresh.
//!
//! # Invariants
//! - Write paths validate input before any SQL mutation.
//! - Multi-row writes run in one `IMMEDIATE` transaction; a failure rolls
//!   back every row of that write.
//! - Observation add/update advances the owning case's `updated_at`;
//!   `updated_at` never moves backwards.
//! - Observation dates are stored as UTC `YYYY-MM-DDTHH:MM:SS.sssZ`, so
//!   string order is time order.
//! - Deleting a case deletes all of its observations in the same transaction.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::case::{Case, CaseCategory, CaseId, CaseStatus};
use crate::model::observation::{ConcernLevel, Observation, ObservationDraft, ObservationId, ObservationPatch};
use crate::model::validation::{normalize_case_name, ValidationError};
use crate::repo::change_set::{ChangeSet, Committed, Table};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const CASE_SELECT_SQL: &str = "SELECT
    id,
    name,
    category,
    status,
    created_at,
    updated_at
FROM cases";

const OBSERVATION_SELECT_SQL: &str = "SELECT
    id,
    case_id,
    date,
    description,
    child_info,
    signs_checked,
    concern_level,
    created_at
FROM observations";

const NOW_SQL: &str = "SELECT strftime('%Y-%m-%dT%H:%M:%fZ', 'now');";
const TO_UTC_SQL: &str = "SELECT strftime('%Y-%m-%dT%H:%M:%fZ', ?1);";

pub type RepoResult<T> = Result<T, RepoError>;

/// Record referenced by a failed lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordRef {
    Case(CaseId),
    Observation(ObservationId),
}

impl Display for RecordRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Case(id) => write!(f, "case {id}"),
            Self::Observation(id) => write!(f, "observation {id}"),
        }
    }
}

/// Repository error for store mutations and queries.
#[derive(Debug)]
pub enum RepoError {
    /// Input rejected before any write.
    Validation(ValidationError),
    /// Storage medium failed; nothing from the operation is visible.
    Storage(DbError),
    NotFound(RecordRef),
    /// Persisted row cannot be decoded.
    InvalidData(String),
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::NotFound(record) => write!(f, "{record} not found"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "store schema is missing table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) | Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Storage(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(DbError::Sqlite(value))
    }
}

/// Observation ordering by `date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimelineOrder {
    /// Oldest first; used for sequential export.
    Chronological,
    /// Newest first; the primary timeline.
    ReverseChronological,
}

/// One case with its observations in chronological order, read from a
/// single consistent snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseSnapshot {
    pub case: Case,
    pub observations: Vec<Observation>,
}

/// Read-only store queries.
pub trait CaseReader {
    fn get_case(&self, case_id: CaseId) -> RepoResult<Option<Case>>;
    /// Lists cases, most recently updated first.
    fn list_cases(&self) -> RepoResult<Vec<Case>>;
    fn get_observation(&self, observation_id: ObservationId) -> RepoResult<Option<Observation>>;
    fn list_observations(
        &self,
        case_id: CaseId,
        order: TimelineOrder,
    ) -> RepoResult<Vec<Observation>>;
    /// Reads a case and its chronological observations in one transaction.
    fn snapshot(&self, case_id: CaseId) -> RepoResult<Option<CaseSnapshot>>;
}

/// Store mutations. Each call is one atomic commit.
pub trait CaseRepository: CaseReader {
    /// Creates a case in `monitoring` status.
    fn create_case(&mut self, name: &str, category: CaseCategory) -> RepoResult<Committed<Case>>;
    /// Adds an observation and touches its case. Fails with `NotFound` when
    /// the case does not exist.
    fn add_observation(
        &mut self,
        case_id: CaseId,
        draft: &ObservationDraft,
    ) -> RepoResult<Committed<Observation>>;
    /// Applies `patch` and touches the owning case. Returns `None` without
    /// writing when the observation does not exist.
    fn update_observation(
        &mut self,
        observation_id: ObservationId,
        patch: &ObservationPatch,
    ) -> RepoResult<Committed<Option<Observation>>>;
    fn update_case_status(
        &mut self,
        case_id: CaseId,
        status: CaseStatus,
    ) -> RepoResult<Committed<Case>>;
    /// Deletes one observation without touching its case. Returns whether a
    /// row was removed.
    fn delete_observation(&mut self, observation_id: ObservationId) -> RepoResult<Committed<bool>>;
    /// Deletes a case and all of its observations. Returns whether the case
    /// existed.
    fn delete_case(&mut self, case_id: CaseId) -> RepoResult<Committed<bool>>;
}

/// SQLite-backed case/observation repository.
pub struct SqliteCaseRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteCaseRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `MissingRequiredTable` when the connection was not opened through
    ///   `open_db`/`open_db_in_memory`.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        for table in ["cases", "observations"] {
            if !table_exists(conn, table)? {
                return Err(RepoError::MissingRequiredTable(table));
            }
        }
        Ok(Self { conn })
    }
}

impl CaseReader for SqliteCaseRepository<'_> {
    fn get_case(&self, case_id: CaseId) -> RepoResult<Option<Case>> {
        load_case(self.conn, case_id)
    }

    fn list_cases(&self) -> RepoResult<Vec<Case>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CASE_SELECT_SQL} ORDER BY updated_at DESC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut cases = Vec::new();
        while let Some(row) = rows.next()? {
            cases.push(parse_case_row(row)?);
        }
        Ok(cases)
    }

    fn get_observation(&self, observation_id: ObservationId) -> RepoResult<Option<Observation>> {
        load_observation(self.conn, observation_id)
    }

    fn list_observations(
        &self,
        case_id: CaseId,
        order: TimelineOrder,
    ) -> RepoResult<Vec<Observation>> {
        load_timeline(self.conn, case_id, order)
    }

    fn snapshot(&self, case_id: CaseId) -> RepoResult<Option<CaseSnapshot>> {
        let tx = self.conn.unchecked_transaction()?;
        let Some(case) = load_case(&tx, case_id)? else {
            return Ok(None);
        };
        let observations = load_timeline(&tx, case_id, TimelineOrder::Chronological)?;
        tx.commit()?;
        Ok(Some(CaseSnapshot { case, observations }))
    }
}

impl CaseRepository for SqliteCaseRepository<'_> {
    fn create_case(&mut self, name: &str, category: CaseCategory) -> RepoResult<Committed<Case>> {
        let name = normalize_case_name(name)?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = commit_timestamp(&tx)?;
        let case = Case {
            id: Uuid::new_v4(),
            name,
            category,
            status: CaseStatus::Monitoring,
            created_at: now.clone(),
            updated_at: now,
        };
        tx.execute(
            "INSERT INTO cases (id, name, category, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                case.id.to_string(),
                case.name.as_str(),
                case.category.as_str(),
                case.status.as_str(),
                case.created_at.as_str(),
                case.updated_at.as_str(),
            ],
        )?;
        tx.commit()?;

        let changes = ChangeSet::empty().touch(Table::Cases, case.id);
        Ok(Committed::new(case, changes))
    }

    fn add_observation(
        &mut self,
        case_id: CaseId,
        draft: &ObservationDraft,
    ) -> RepoResult<Committed<Observation>> {
        draft.validate()?;
        let signs_json = encode_signs(&draft.signs_checked)?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some(case) = load_case(&tx, case_id)? else {
            return Err(RepoError::NotFound(RecordRef::Case(case_id)));
        };
        // Same stamp for the observation and the case touch; never earlier
        // than the case's current `updated_at`.
        let stamp = commit_timestamp(&tx)?.max(case.updated_at);
        let date = utc_timestamp(&tx, "date", &draft.date)?;

        let observation = Observation {
            id: Uuid::new_v4(),
            case_id,
            date,
            description: draft.description.clone(),
            child_info: draft.child_info.clone(),
            signs_checked: draft.signs_checked.clone(),
            concern_level: draft.concern_level,
            created_at: stamp.clone(),
        };
        tx.execute(
            "INSERT INTO observations (
                id,
                case_id,
                date,
                description,
                child_info,
                signs_checked,
                concern_level,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                observation.id.to_string(),
                case_id.to_string(),
                observation.date.as_str(),
                observation.description.as_str(),
                observation.child_info.as_str(),
                signs_json,
                observation.concern_level.as_str(),
                observation.created_at.as_str(),
            ],
        )?;
        tx.execute(
            "UPDATE cases SET updated_at = ?2 WHERE id = ?1;",
            params![case_id.to_string(), stamp],
        )?;
        tx.commit()?;

        let changes = ChangeSet::empty()
            .touch(Table::Observations, case_id)
            .touch(Table::Cases, case_id);
        Ok(Committed::new(observation, changes))
    }

    fn update_observation(
        &mut self,
        observation_id: ObservationId,
        patch: &ObservationPatch,
    ) -> RepoResult<Committed<Option<Observation>>> {
        patch.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some(mut observation) = load_observation(&tx, observation_id)? else {
            return Ok(Committed::unchanged(None));
        };
        if patch.is_empty() {
            return Ok(Committed::unchanged(Some(observation)));
        }

        patch.apply_to(&mut observation);
        if patch.date.is_some() {
            observation.date = utc_timestamp(&tx, "date", &observation.date)?;
        }
        let signs_json = encode_signs(&observation.signs_checked)?;
        tx.execute(
            "UPDATE observations
             SET
                date = ?2,
                description = ?3,
                child_info = ?4,
                signs_checked = ?5,
                concern_level = ?6
             WHERE id = ?1;",
            params![
                observation_id.to_string(),
                observation.date.as_str(),
                observation.description.as_str(),
                observation.child_info.as_str(),
                signs_json,
                observation.concern_level.as_str(),
            ],
        )?;
        let now = commit_timestamp(&tx)?;
        touch_case(&tx, observation.case_id, &now)?;
        tx.commit()?;

        let changes = ChangeSet::empty()
            .touch(Table::Observations, observation.case_id)
            .touch(Table::Cases, observation.case_id);
        Ok(Committed::new(Some(observation), changes))
    }

    fn update_case_status(
        &mut self,
        case_id: CaseId,
        status: CaseStatus,
    ) -> RepoResult<Committed<Case>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = commit_timestamp(&tx)?;
        let changed = tx.execute(
            "UPDATE cases
             SET
                status = ?2,
                updated_at = MAX(updated_at, ?3)
             WHERE id = ?1;",
            params![case_id.to_string(), status.as_str(), now],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(RecordRef::Case(case_id)));
        }
        let case = load_case(&tx, case_id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("case {case_id} vanished during status update"))
        })?;
        tx.commit()?;

        let changes = ChangeSet::empty().touch(Table::Cases, case_id);
        Ok(Committed::new(case, changes))
    }

    fn delete_observation(&mut self, observation_id: ObservationId) -> RepoResult<Committed<bool>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let case_id = tx
            .query_row(
                "SELECT case_id FROM observations WHERE id = ?1;",
                [observation_id.to_string()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        let Some(case_id) = case_id else {
            return Ok(Committed::unchanged(false));
        };
        let case_id = parse_uuid(&case_id, "observations.case_id")?;

        tx.execute(
            "DELETE FROM observations WHERE id = ?1;",
            [observation_id.to_string()],
        )?;
        tx.commit()?;

        let changes = ChangeSet::empty().touch(Table::Observations, case_id);
        Ok(Committed::new(true, changes))
    }

    fn delete_case(&mut self, case_id: CaseId) -> RepoResult<Committed<bool>> {
        let case_id_text = case_id.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !case_exists(&tx, &case_id_text)? {
            return Ok(Committed::unchanged(false));
        }

        tx.execute(
            "DELETE FROM observations WHERE case_id = ?1;",
            [case_id_text.as_str()],
        )?;
        tx.execute("DELETE FROM cases WHERE id = ?1;", [case_id_text.as_str()])?;
        tx.commit()?;

        let changes = ChangeSet::empty()
            .touch(Table::Observations, case_id)
            .touch(Table::Cases, case_id);
        Ok(Committed::new(true, changes))
    }
}

fn commit_timestamp(conn: &Connection) -> RepoResult<String> {
    Ok(conn.query_row(NOW_SQL, [], |row| row.get(0))?)
}

/// Rewrites an accepted ISO-8601 value as canonical UTC; values without an
/// offset are taken as UTC.
fn utc_timestamp(conn: &Connection, field: &'static str, value: &str) -> RepoResult<String> {
    let converted: Option<String> = conn.query_row(TO_UTC_SQL, [value], |row| row.get(0))?;
    converted.ok_or_else(|| {
        RepoError::Validation(ValidationError::InvalidTimestamp {
            field,
            value: value.to_string(),
        })
    })
}

fn touch_case(conn: &Connection, case_id: CaseId, now: &str) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE cases SET updated_at = MAX(updated_at, ?2) WHERE id = ?1;",
        params![case_id.to_string(), now],
    )?;
    if changed == 0 {
        return Err(RepoError::InvalidData(format!(
            "observation references missing case {case_id}"
        )));
    }
    Ok(())
}

fn case_exists(conn: &Connection, case_id: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM cases WHERE id = ?1);",
        [case_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn load_case(conn: &Connection, case_id: CaseId) -> RepoResult<Option<Case>> {
    let mut stmt = conn.prepare(&format!("{CASE_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([case_id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_case_row(row)?)),
        None => Ok(None),
    }
}

fn load_observation(
    conn: &Connection,
    observation_id: ObservationId,
) -> RepoResult<Option<Observation>> {
    let mut stmt = conn.prepare(&format!("{OBSERVATION_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([observation_id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_observation_row(row)?)),
        None => Ok(None),
    }
}

fn load_timeline(
    conn: &Connection,
    case_id: CaseId,
    order: TimelineOrder,
) -> RepoResult<Vec<Observation>> {
    let order_sql = match order {
        TimelineOrder::Chronological => "date ASC, created_at ASC, id ASC",
        TimelineOrder::ReverseChronological => "date DESC, created_at DESC, id DESC",
    };
    let mut stmt = conn.prepare(&format!(
        "{OBSERVATION_SELECT_SQL} WHERE case_id = ?1 ORDER BY {order_sql};"
    ))?;
    let mut rows = stmt.query([case_id.to_string()])?;
    let mut observations = Vec::new();
    while let Some(row) = rows.next()? {
        observations.push(parse_observation_row(row)?);
    }
    Ok(observations)
}

fn parse_case_row(row: &Row<'_>) -> RepoResult<Case> {
    let id_text: String = row.get("id")?;
    let category_text: String = row.get("category")?;
    let status_text: String = row.get("status")?;

    Ok(Case {
        id: parse_uuid(&id_text, "cases.id")?,
        name: row.get("name")?,
        category: category_text.parse().map_err(|_| {
            RepoError::InvalidData(format!("invalid category `{category_text}` in cases.category"))
        })?,
        status: status_text.parse().map_err(|_| {
            RepoError::InvalidData(format!("invalid status `{status_text}` in cases.status"))
        })?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_observation_row(row: &Row<'_>) -> RepoResult<Observation> {
    let id_text: String = row.get("id")?;
    let case_id_text: String = row.get("case_id")?;
    let signs_text: String = row.get("signs_checked")?;
    let level_text: String = row.get("concern_level")?;

    let signs_checked: BTreeSet<String> = serde_json::from_str(&signs_text).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid sign list `{signs_text}` in observations.signs_checked: {err}"
        ))
    })?;
    let concern_level: ConcernLevel = level_text.parse().map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid concern level `{level_text}` in observations.concern_level"
        ))
    })?;

    Ok(Observation {
        id: parse_uuid(&id_text, "observations.id")?,
        case_id: parse_uuid(&case_id_text, "observations.case_id")?,
        date: row.get("date")?,
        description: row.get("description")?,
        child_info: row.get("child_info")?,
        signs_checked,
        concern_level,
        created_at: row.get("created_at")?,
    })
}

fn encode_signs(signs: &BTreeSet<String>) -> RepoResult<String> {
    serde_json::to_string(signs)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode sign list: {err}")))
}

fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
