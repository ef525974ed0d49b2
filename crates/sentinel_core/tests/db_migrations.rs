use rusqlite::Connection;
use sentinel_core::db::migrations::latest_version;
use sentinel_core::db::{open_db, open_db_in_memory, DbError};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "cases");
    assert_table_exists(&conn, "observations");
    assert_table_exists(&conn, "preferences");
}

#[test]
fn opening_same_database_twice_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sentinel.sqlite3");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute(
            "INSERT INTO cases (id, name, category, status, created_at, updated_at)
             VALUES ('c1', 'kept', 'unsure', 'monitoring',
                     '2024-01-01T00:00:00.000Z', '2024-01-01T00:00:00.000Z');",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let count: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM cases;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn schema_rejects_unknown_enum_values_and_blank_names() {
    let conn = open_db_in_memory().unwrap();

    for (name, category, status) in [
        ("   ", "neglect", "monitoring"),
        ("bad category", "bullying", "monitoring"),
        ("bad status", "neglect", "archived"),
    ] {
        let result = conn.execute(
            "INSERT INTO cases (id, name, category, status, created_at, updated_at)
             VALUES (lower(hex(randomblob(16))), ?1, ?2, ?3,
                     '2024-01-01T00:00:00.000Z', '2024-01-01T00:00:00.000Z');",
            [name, category, status],
        );
        assert!(result.is_err(), "{name}/{category}/{status} should be rejected");
    }
}

#[test]
fn foreign_keys_block_orphan_observations() {
    let conn = open_db_in_memory().unwrap();

    let result = conn.execute(
        "INSERT INTO observations (id, case_id, date, concern_level, created_at)
         VALUES ('o1', 'missing', '2024-01-01T10:00', 'low', '2024-01-01T10:00:00.000Z');",
        [],
    );
    assert!(result.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "expected table `{table_name}` to exist");
}
