use rusqlite::Connection;
use sentinel_core::db::open_db_in_memory;
use sentinel_core::{
    CaseCategory, CaseReader, CaseRepository, CaseStatus, ConcernLevel, ObservationDraft,
    ObservationPatch, RecordRef, RepoError, SqliteCaseRepository, Table, TimelineOrder,
    ValidationError,
};
use std::collections::BTreeSet;
use uuid::Uuid;

fn draft(date: &str) -> ObservationDraft {
    ObservationDraft::new(date, ConcernLevel::Low)
}

fn row_count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn create_case_starts_in_monitoring_with_matching_timestamps() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteCaseRepository::try_new(&mut conn).unwrap();

    let committed = repo.create_case("  Kid next door  ", CaseCategory::Neglect).unwrap();
    let case = committed.value;

    assert_eq!(case.name, "Kid next door");
    assert_eq!(case.status, CaseStatus::Monitoring);
    assert_eq!(case.created_at, case.updated_at);
    assert!(committed.changes.touches_table(Table::Cases));
    assert_eq!(repo.get_case(case.id).unwrap(), Some(case));
}

#[test]
fn create_case_rejects_blank_name_without_writing() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let mut repo = SqliteCaseRepository::try_new(&mut conn).unwrap();
        let err = repo.create_case(" \t ", CaseCategory::Unsure).unwrap_err();
        assert!(matches!(err, RepoError::Validation(ValidationError::EmptyName)));
    }
    assert_eq!(row_count(&conn, "cases"), 0);
}

#[test]
fn add_observation_touches_case_with_same_timestamp() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteCaseRepository::try_new(&mut conn).unwrap();
    let case = repo.create_case("A", CaseCategory::Physical).unwrap().value;

    let observation = repo
        .add_observation(
            case.id,
            &draft("2024-03-01T08:00")
                .with_description("bruise on arm")
                .with_signs(["p-bruises", "p-fear"]),
        )
        .unwrap()
        .value;

    let reloaded = repo.get_case(case.id).unwrap().unwrap();
    assert_eq!(reloaded.updated_at, observation.created_at);
    assert!(reloaded.updated_at >= case.updated_at);
    assert!(reloaded.updated_at >= reloaded.created_at);

    let stored = repo.get_observation(observation.id).unwrap().unwrap();
    assert_eq!(stored, observation);
    assert_eq!(
        stored.signs_checked,
        ["p-bruises", "p-fear"]
            .into_iter()
            .map(String::from)
            .collect::<BTreeSet<_>>()
    );
}

#[test]
fn add_observation_to_missing_case_is_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let missing = Uuid::new_v4();
    {
        let mut repo = SqliteCaseRepository::try_new(&mut conn).unwrap();
        let err = repo
            .add_observation(missing, &draft("2024-03-01T08:00"))
            .unwrap_err();
        assert!(matches!(err, RepoError::NotFound(RecordRef::Case(id)) if id == missing));
    }
    assert_eq!(row_count(&conn, "observations"), 0);
}

#[test]
fn add_observation_rejects_malformed_date() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteCaseRepository::try_new(&mut conn).unwrap();
    let case = repo.create_case("A", CaseCategory::Emotional).unwrap().value;

    let err = repo.add_observation(case.id, &draft("yesterday")).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::InvalidTimestamp { field: "date", .. })
    ));
    assert!(repo
        .list_observations(case.id, TimelineOrder::Chronological)
        .unwrap()
        .is_empty());
}

#[test]
fn timeline_orders_by_observation_date_not_insertion() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteCaseRepository::try_new(&mut conn).unwrap();
    let case = repo.create_case("A", CaseCategory::Unsure).unwrap().value;

    for date in ["2024-03-02T08:00", "2024-03-03T08:00", "2024-03-01T08:00"] {
        repo.add_observation(case.id, &draft(date)).unwrap();
    }

    let newest_first: Vec<String> = repo
        .list_observations(case.id, TimelineOrder::ReverseChronological)
        .unwrap()
        .into_iter()
        .map(|observation| observation.date)
        .collect();
    assert_eq!(
        newest_first,
        vec![
            "2024-03-03T08:00:00.000Z",
            "2024-03-02T08:00:00.000Z",
            "2024-03-01T08:00:00.000Z"
        ]
    );

    let snapshot = repo.snapshot(case.id).unwrap().unwrap();
    let oldest_first: Vec<&str> = snapshot
        .observations
        .iter()
        .map(|observation| observation.date.as_str())
        .collect();
    assert_eq!(
        oldest_first,
        vec![
            "2024-03-01T08:00:00.000Z",
            "2024-03-02T08:00:00.000Z",
            "2024-03-03T08:00:00.000Z"
        ]
    );
}

#[test]
fn timeline_orders_mixed_offsets_by_instant() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteCaseRepository::try_new(&mut conn).unwrap();
    let case = repo.create_case("A", CaseCategory::Unsure).unwrap().value;

    let east = repo
        .add_observation(case.id, &draft("2024-03-05T14:30+02:00"))
        .unwrap()
        .value;
    let utc = repo
        .add_observation(case.id, &draft("2024-03-05T13:00Z"))
        .unwrap()
        .value;
    let west = repo
        .add_observation(case.id, &draft("2024-03-05T08:15:30.5-05:00"))
        .unwrap()
        .value;
    assert_eq!(east.date, "2024-03-05T12:30:00.000Z");
    assert_eq!(utc.date, "2024-03-05T13:00:00.000Z");
    assert_eq!(west.date, "2024-03-05T13:15:30.500Z");

    let oldest_first: Vec<_> = repo
        .list_observations(case.id, TimelineOrder::Chronological)
        .unwrap()
        .into_iter()
        .map(|observation| observation.id)
        .collect();
    assert_eq!(oldest_first, vec![east.id, utc.id, west.id]);
}

#[test]
fn updated_date_is_stored_as_utc() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteCaseRepository::try_new(&mut conn).unwrap();
    let case = repo.create_case("A", CaseCategory::Unsure).unwrap().value;
    let observation = repo
        .add_observation(case.id, &draft("2024-03-05T10:00"))
        .unwrap()
        .value;

    let patch = ObservationPatch {
        date: Some("2024-03-06T01:00+03:00".to_string()),
        ..ObservationPatch::default()
    };
    let updated = repo
        .update_observation(observation.id, &patch)
        .unwrap()
        .value
        .unwrap();
    assert_eq!(updated.date, "2024-03-05T22:00:00.000Z");
    assert_eq!(
        repo.get_observation(observation.id).unwrap().unwrap().date,
        "2024-03-05T22:00:00.000Z"
    );
}

#[test]
fn update_observation_changes_only_given_fields() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteCaseRepository::try_new(&mut conn).unwrap();
    let case = repo.create_case("A", CaseCategory::Neglect).unwrap().value;
    let original = repo
        .add_observation(
            case.id,
            &draft("2024-03-01T08:00")
                .with_description("hungry")
                .with_child_info("about 7"),
        )
        .unwrap()
        .value;

    let patch = ObservationPatch {
        concern_level: Some(ConcernLevel::High),
        ..ObservationPatch::default()
    };
    let committed = repo.update_observation(original.id, &patch).unwrap();
    assert!(committed.changes.touches_case(case.id));

    let updated = repo.get_observation(original.id).unwrap().unwrap();
    assert_eq!(updated.concern_level, ConcernLevel::High);
    assert_eq!(updated.description, "hungry");
    assert_eq!(updated.child_info, "about 7");
    assert_eq!(updated.date, original.date);
    assert_eq!(updated.created_at, original.created_at);

    let touched = repo.get_case(case.id).unwrap().unwrap();
    assert!(touched.updated_at >= original.created_at);
}

#[test]
fn update_of_unknown_observation_or_empty_patch_is_a_no_op() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteCaseRepository::try_new(&mut conn).unwrap();
    let case = repo.create_case("A", CaseCategory::Neglect).unwrap().value;
    let observation = repo
        .add_observation(case.id, &draft("2024-03-01T08:00"))
        .unwrap()
        .value;
    let before = repo.get_case(case.id).unwrap().unwrap();

    let patch = ObservationPatch {
        description: Some("ignored".to_string()),
        ..ObservationPatch::default()
    };
    let missing = repo.update_observation(Uuid::new_v4(), &patch).unwrap();
    assert_eq!(missing.value, None);
    assert!(missing.changes.is_empty());

    let empty = repo
        .update_observation(observation.id, &ObservationPatch::default())
        .unwrap();
    assert_eq!(empty.value, Some(observation));
    assert!(empty.changes.is_empty());
    assert_eq!(repo.get_case(case.id).unwrap().unwrap(), before);
}

#[test]
fn update_case_status_on_missing_case_is_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteCaseRepository::try_new(&mut conn).unwrap();
    let case = repo.create_case("A", CaseCategory::Sexual).unwrap().value;

    let reported = repo
        .update_case_status(case.id, CaseStatus::Reported)
        .unwrap()
        .value;
    assert_eq!(reported.status, CaseStatus::Reported);
    assert!(reported.updated_at >= case.updated_at);

    let missing = Uuid::new_v4();
    let err = repo
        .update_case_status(missing, CaseStatus::Closed)
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(RecordRef::Case(id)) if id == missing));
}

#[test]
fn delete_case_removes_its_observations() {
    let mut conn = open_db_in_memory().unwrap();
    let (kept_case, deleted_case) = {
        let mut repo = SqliteCaseRepository::try_new(&mut conn).unwrap();
        let kept = repo.create_case("kept", CaseCategory::Unsure).unwrap().value;
        let deleted = repo.create_case("deleted", CaseCategory::Unsure).unwrap().value;
        repo.add_observation(kept.id, &draft("2024-03-01T08:00")).unwrap();
        for date in ["2024-03-01T08:00", "2024-03-02T08:00"] {
            repo.add_observation(deleted.id, &draft(date)).unwrap();
        }

        let committed = repo.delete_case(deleted.id).unwrap();
        assert!(committed.value);
        assert!(committed.changes.touches_table(Table::Observations));
        assert_eq!(repo.get_case(deleted.id).unwrap(), None);
        (kept.id, deleted.id)
    };

    let orphans: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM observations WHERE case_id = ?1;",
            [deleted_case.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(orphans, 0);
    assert_eq!(row_count(&conn, "observations"), 1);

    let repo = SqliteCaseRepository::try_new(&mut conn).unwrap();
    assert_eq!(
        repo.list_observations(kept_case, TimelineOrder::Chronological)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn delete_of_missing_records_is_a_silent_no_op() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteCaseRepository::try_new(&mut conn).unwrap();

    let case = repo.delete_case(Uuid::new_v4()).unwrap();
    assert!(!case.value);
    assert!(case.changes.is_empty());

    let observation = repo.delete_observation(Uuid::new_v4()).unwrap();
    assert!(!observation.value);
    assert!(observation.changes.is_empty());
}

#[test]
fn delete_observation_leaves_case_timestamp_alone() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteCaseRepository::try_new(&mut conn).unwrap();
    let case = repo.create_case("A", CaseCategory::Physical).unwrap().value;
    let observation = repo
        .add_observation(case.id, &draft("2024-03-01T08:00"))
        .unwrap()
        .value;
    let before = repo.get_case(case.id).unwrap().unwrap();

    let committed = repo.delete_observation(observation.id).unwrap();
    assert!(committed.value);
    assert!(committed.changes.touches_table(Table::Observations));
    assert!(!committed.changes.touches_table(Table::Cases));
    assert_eq!(repo.get_observation(observation.id).unwrap(), None);
    assert_eq!(repo.get_case(case.id).unwrap().unwrap(), before);
}

#[test]
fn failed_case_delete_rolls_back_observation_removal() {
    let mut conn = open_db_in_memory().unwrap();
    let case_id = {
        let mut repo = SqliteCaseRepository::try_new(&mut conn).unwrap();
        let case = repo.create_case("A", CaseCategory::Neglect).unwrap().value;
        for date in ["2024-03-01T08:00", "2024-03-02T08:00"] {
            repo.add_observation(case.id, &draft(date)).unwrap();
        }
        case.id
    };
    conn.execute_batch(
        "CREATE TRIGGER fail_case_delete BEFORE DELETE ON cases
         BEGIN
             SELECT RAISE(ABORT, 'medium unavailable');
         END;",
    )
    .unwrap();

    let mut repo = SqliteCaseRepository::try_new(&mut conn).unwrap();
    let err = repo.delete_case(case_id).unwrap_err();
    assert!(matches!(err, RepoError::Storage(_)));

    assert!(repo.get_case(case_id).unwrap().is_some());
    assert_eq!(
        repo.list_observations(case_id, TimelineOrder::Chronological)
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn list_cases_is_most_recently_updated_first() {
    let mut conn = open_db_in_memory().unwrap();
    let (older, newer) = {
        let mut repo = SqliteCaseRepository::try_new(&mut conn).unwrap();
        let older = repo.create_case("older", CaseCategory::Unsure).unwrap().value;
        let newer = repo.create_case("newer", CaseCategory::Unsure).unwrap().value;
        (older, newer)
    };
    conn.execute(
        "UPDATE cases SET created_at = ?2, updated_at = ?2 WHERE id = ?1;",
        [older.id.to_string(), "2020-01-01T00:00:00.000Z".to_string()],
    )
    .unwrap();
    conn.execute(
        "UPDATE cases SET created_at = ?2, updated_at = ?2 WHERE id = ?1;",
        [newer.id.to_string(), "2021-01-01T00:00:00.000Z".to_string()],
    )
    .unwrap();

    let mut repo = SqliteCaseRepository::try_new(&mut conn).unwrap();
    let names: Vec<String> = repo
        .list_cases()
        .unwrap()
        .into_iter()
        .map(|case| case.name)
        .collect();
    assert_eq!(names, vec!["newer", "older"]);

    repo.add_observation(older.id, &draft("2024-03-01T08:00"))
        .unwrap();
    let names: Vec<String> = repo
        .list_cases()
        .unwrap()
        .into_iter()
        .map(|case| case.name)
        .collect();
    assert_eq!(names, vec!["older", "newer"]);
}

#[test]
fn repository_requires_migrated_connection() {
    let mut conn = Connection::open_in_memory().unwrap();
    let err = SqliteCaseRepository::try_new(&mut conn).err().unwrap();
    assert!(matches!(err, RepoError::MissingRequiredTable("cases")));
}
