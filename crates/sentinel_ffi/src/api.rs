//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose case, observation, triage and preference use-cases to Dart via FRB.
//! - Translate core errors into flat response envelopes.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Ids cross the boundary as UUID strings; enums as their stored text.
//! - Store commands run as non-sync FRB calls, so the UI never blocks on
//!   SQLite. Queries return snapshots; hosts re-query after a command.

use log::warn;
use sentinel_core::db::open_db;
use sentinel_core::repo::preferences_repo::PreferencesStore;
use sentinel_core::{
    assess, core_version as core_version_inner, init_logging as init_logging_inner,
    ping as ping_inner, Case, CaseCategory, CaseService, CaseStatus, ConcernLevel,
    Observation, ObservationDraft, ObservationPatch, PlainTextReport, RepoResult, SignCatalog,
    SqliteCaseRepository, SqlitePreferences, TimelineOrder, TriageRule,
};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::OnceLock;
use uuid::Uuid;

const STORE_DB_FILE_NAME: &str = "sentinel.sqlite3";
const STORE_DB_PATH_ENV: &str = "SENTINEL_DB_PATH";
static STORE_DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Case as seen by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseItem {
    pub id: String,
    pub name: String,
    /// `physical|emotional|sexual|neglect|unsure`.
    pub category: String,
    /// `monitoring|reported|closed`.
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Observation as seen by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationItem {
    pub id: String,
    pub case_id: String,
    pub date: String,
    pub description: String,
    pub child_info: String,
    /// Sorted, without duplicates.
    pub signs_checked: Vec<String>,
    /// `low|medium|high|emergency`.
    pub concern_level: String,
    pub created_at: String,
}

/// Generic action response envelope for store commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Created record id, when the command creates one.
    pub id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, id: Option<String>) -> Self {
        Self {
            ok: true,
            id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            message: message.into(),
        }
    }
}

/// Snapshot of the case list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseListResponse {
    pub ok: bool,
    /// Most recently updated first.
    pub items: Vec<CaseItem>,
    pub message: String,
}

/// Snapshot of one case and its timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseDetailResponse {
    pub ok: bool,
    /// `None` when the case does not exist.
    pub case: Option<CaseItem>,
    /// Newest first.
    pub observations: Vec<ObservationItem>,
    pub message: String,
}

/// Result of classifying a sign selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageResponse {
    pub ok: bool,
    /// `None` only for an empty selection.
    pub level: Option<String>,
    pub rule: Option<String>,
    pub message: String,
}

/// Text payload response (exports, preference reads).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextResponse {
    pub ok: bool,
    pub value: Option<String>,
    pub message: String,
}

impl TextResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            value: None,
            message: message.into(),
        }
    }
}

/// Creates a case in `monitoring` status.
///
/// # FFI contract
/// - Async call, DB-backed execution.
/// - Never panics.
/// - Returns the new case id on success.
pub fn case_create(name: String, category: String) -> ActionResponse {
    let result = parse_enum::<CaseCategory>(&category)
        .and_then(|category| with_case_service(|service| service.create_case(&name, category)));
    action_response("case_create", "Case created.", result.map(|id| Some(id.to_string())))
}

/// Changes the status of an existing case.
pub fn case_update_status(case_id: String, status: String) -> ActionResponse {
    let result = parse_id(&case_id).and_then(|case_id| {
        let status = parse_enum::<CaseStatus>(&status)?;
        with_case_service(|service| service.update_case_status(case_id, status))
    });
    action_response("case_update_status", "Case updated.", result.map(|()| None))
}

/// Deletes a case and all of its observations; unknown ids succeed.
pub fn case_delete(case_id: String) -> ActionResponse {
    let result = parse_id(&case_id)
        .and_then(|case_id| with_case_service(|service| service.delete_case(case_id)));
    action_response("case_delete", "Case deleted.", result.map(|()| None))
}

/// Adds an observation to an existing case.
///
/// # FFI contract
/// - Async call, DB-backed execution.
/// - Fails when the case does not exist or `date` is not ISO-8601.
/// - Returns the new observation id on success.
pub fn observation_add(
    case_id: String,
    date: String,
    description: String,
    child_info: String,
    signs_checked: Vec<String>,
    concern_level: String,
) -> ActionResponse {
    let result = parse_id(&case_id).and_then(|case_id| {
        let level = parse_enum::<ConcernLevel>(&concern_level)?;
        let draft = ObservationDraft::new(date, level)
            .with_description(description)
            .with_child_info(child_info)
            .with_signs(signs_checked);
        with_case_service(|service| service.add_observation(case_id, &draft))
    });
    action_response(
        "observation_add",
        "Observation added.",
        result.map(|id| Some(id.to_string())),
    )
}

/// Applies a partial update; `None` fields are left unchanged.
///
/// Unknown observation ids succeed without writing.
pub fn observation_update(
    observation_id: String,
    date: Option<String>,
    description: Option<String>,
    child_info: Option<String>,
    signs_checked: Option<Vec<String>>,
    concern_level: Option<String>,
) -> ActionResponse {
    let result = parse_id(&observation_id).and_then(|observation_id| {
        let concern_level = concern_level
            .as_deref()
            .map(parse_enum::<ConcernLevel>)
            .transpose()?;
        let patch = ObservationPatch {
            date,
            description,
            child_info,
            signs_checked: signs_checked.map(|signs| signs.into_iter().collect::<BTreeSet<_>>()),
            concern_level,
        };
        with_case_service(|service| service.update_observation(observation_id, &patch))
    });
    action_response("observation_update", "Observation updated.", result.map(|()| None))
}

/// Deletes one observation; unknown ids succeed.
pub fn observation_delete(observation_id: String) -> ActionResponse {
    let result = parse_id(&observation_id).and_then(|observation_id| {
        with_case_service(|service| service.delete_observation(observation_id))
    });
    action_response("observation_delete", "Observation deleted.", result.map(|()| None))
}

/// Lists every case, most recently updated first.
pub fn case_list() -> CaseListResponse {
    match with_case_service(|service| service.list_cases()) {
        Ok(cases) => CaseListResponse {
            ok: true,
            message: format!("Found {} case(s).", cases.len()),
            items: cases.into_iter().map(to_case_item).collect(),
        },
        Err(err) => {
            log_failure("case_list");
            CaseListResponse {
                ok: false,
                items: Vec::new(),
                message: format!("case_list failed: {err}"),
            }
        }
    }
}

/// Loads one case with its newest-first timeline.
pub fn case_detail(case_id: String) -> CaseDetailResponse {
    let result = parse_id(&case_id).and_then(|case_id| {
        with_case_service(|service| -> RepoResult<Option<(Case, Vec<Observation>)>> {
            let Some(case) = service.get_case(case_id)? else {
                return Ok(None);
            };
            let observations =
                service.list_observations(case_id, TimelineOrder::ReverseChronological)?;
            Ok(Some((case, observations)))
        })
    });

    match result {
        Ok(Some((case, observations))) => CaseDetailResponse {
            ok: true,
            case: Some(to_case_item(case)),
            message: format!("Found {} observation(s).", observations.len()),
            observations: observations.into_iter().map(to_observation_item).collect(),
        },
        Ok(None) => CaseDetailResponse {
            ok: true,
            case: None,
            observations: Vec::new(),
            message: "Case not found.".to_string(),
        },
        Err(err) => {
            log_failure("case_detail");
            CaseDetailResponse {
                ok: false,
                case: None,
                observations: Vec::new(),
                message: format!("case_detail failed: {err}"),
            }
        }
    }
}

/// Renders a case as a plain-text report.
///
/// Input semantics:
/// - `labels`: display text by key; missing keys render as the key itself.
/// - `catalog_json`: when present, signs it cannot resolve are left out.
pub fn case_export_text(
    case_id: String,
    labels: HashMap<String, String>,
    catalog_json: Option<String>,
    generated_on: Option<String>,
) -> TextResponse {
    let catalog = match catalog_json.as_deref().map(SignCatalog::from_json).transpose() {
        Ok(catalog) => catalog,
        Err(err) => return TextResponse::failure(format!("case_export_text failed: {err}")),
    };
    let mut exporter = PlainTextReport::new();
    if let Some(catalog) = &catalog {
        exporter = exporter.with_catalog(catalog);
    }
    if let Some(date) = generated_on {
        exporter = exporter.generated_on(date);
    }
    let lookup = |key: &str| labels.get(key).cloned().unwrap_or_else(|| key.to_string());

    let result = parse_id(&case_id).and_then(|case_id| {
        with_case_service(|service| service.export_case(case_id, &exporter, &lookup))
    });
    match result {
        Ok(text) => TextResponse {
            ok: true,
            value: Some(text),
            message: "Case exported.".to_string(),
        },
        Err(err) => {
            log_failure("case_export_text");
            TextResponse::failure(format!("case_export_text failed: {err}"))
        }
    }
}

/// Classifies checked signs against a catalog document.
///
/// # FFI contract
/// - Sync call, pure computation.
/// - Unknown ids count toward the selection size but carry no severity.
/// - An empty selection yields no level.
#[flutter_rust_bridge::frb(sync)]
pub fn triage_classify(selected: Vec<String>, catalog_json: String) -> TriageResponse {
    let catalog = match SignCatalog::from_json(&catalog_json) {
        Ok(catalog) => catalog,
        Err(err) => {
            return TriageResponse {
                ok: false,
                level: None,
                rule: None,
                message: format!("triage_classify failed: {err}"),
            }
        }
    };

    match assess(selected.iter().map(String::as_str), &catalog) {
        Some(assessment) => TriageResponse {
            ok: true,
            level: Some(assessment.level.as_str().to_string()),
            rule: Some(triage_rule_label(assessment.rule).to_string()),
            message: format!("Classified {} sign(s).", assessment.total),
        },
        None => TriageResponse {
            ok: true,
            level: None,
            rule: None,
            message: "No signs selected.".to_string(),
        },
    }
}

/// Reads a device-local preference.
pub fn preference_get(key: String) -> TextResponse {
    match with_preferences(|prefs| prefs.get(&key)) {
        Ok(value) => TextResponse {
            ok: true,
            message: if value.is_some() { "Found." } else { "Not set." }.to_string(),
            value,
        },
        Err(err) => TextResponse::failure(format!("preference_get failed: {err}")),
    }
}

/// Writes a device-local preference.
pub fn preference_set(key: String, value: String) -> ActionResponse {
    let result = with_preferences(|prefs| prefs.set(&key, &value));
    action_response("preference_set", "Preference saved.", result.map(|()| None))
}

fn action_response(
    op: &'static str,
    success_message: &str,
    result: Result<Option<String>, String>,
) -> ActionResponse {
    match result {
        Ok(id) => ActionResponse::success(success_message, id),
        Err(err) => {
            log_failure(op);
            ActionResponse::failure(format!("{op} failed: {err}"))
        }
    }
}

/// Error text can echo rejected input, so only the call name is logged.
fn log_failure(op: &str) {
    warn!("event=ffi_call module=ffi status=error op={op}");
}

fn parse_id(value: &str) -> Result<Uuid, String> {
    Uuid::parse_str(value.trim()).map_err(|_| format!("invalid id `{value}`"))
}

fn parse_enum<T>(value: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|err| err.to_string())
}

fn resolve_store_db_path() -> PathBuf {
    STORE_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(STORE_DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(STORE_DB_FILE_NAME)
        })
        .clone()
}

fn with_case_service<T, E: std::fmt::Display>(
    f: impl FnOnce(&mut CaseService<SqliteCaseRepository<'_>>) -> Result<T, E>,
) -> Result<T, String> {
    let db_path = resolve_store_db_path();
    let mut conn = open_db(&db_path).map_err(|err| format!("store open failed: {err}"))?;
    let repo = SqliteCaseRepository::try_new(&mut conn)
        .map_err(|err| format!("store init failed: {err}"))?;
    let mut service = CaseService::new(repo);
    f(&mut service).map_err(|err| err.to_string())
}

fn with_preferences<T>(
    f: impl FnOnce(&SqlitePreferences<'_>) -> RepoResult<T>,
) -> Result<T, String> {
    let db_path = resolve_store_db_path();
    let conn = open_db(&db_path).map_err(|err| format!("store open failed: {err}"))?;
    let prefs =
        SqlitePreferences::try_new(&conn).map_err(|err| format!("store init failed: {err}"))?;
    f(&prefs).map_err(|err| err.to_string())
}

fn to_case_item(case: Case) -> CaseItem {
    CaseItem {
        id: case.id.to_string(),
        name: case.name,
        category: case.category.as_str().to_string(),
        status: case.status.as_str().to_string(),
        created_at: case.created_at,
        updated_at: case.updated_at,
    }
}

fn to_observation_item(observation: Observation) -> ObservationItem {
    ObservationItem {
        id: observation.id.to_string(),
        case_id: observation.case_id.to_string(),
        date: observation.date,
        description: observation.description,
        child_info: observation.child_info,
        signs_checked: observation.signs_checked.into_iter().collect(),
        concern_level: observation.concern_level.as_str().to_string(),
        created_at: observation.created_at,
    }
}

fn triage_rule_label(rule: TriageRule) -> &'static str {
    match rule {
        TriageRule::MultipleSevere => "multiple_severe",
        TriageRule::SevereSexual => "severe_sexual",
        TriageRule::SevereWithModerate => "severe_with_moderate",
        TriageRule::ManyModerate => "many_moderate",
        TriageRule::ManyCategories => "many_categories",
        TriageRule::ManySigns => "many_signs",
        TriageRule::SeveralModerate => "several_moderate",
        TriageRule::Baseline => "baseline",
    }
}
