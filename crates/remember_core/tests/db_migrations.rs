use remember_core::db::migrations::{latest_version, KV_TABLE};
use remember_core::db::{open_db, open_db_in_memory, DbError};
use remember_core::{KvRepository, RepoError, SqliteKvRepository};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_creates_kv_table() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "kv_entries");
}

#[test]
fn reopening_file_database_keeps_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("remember.db");

    {
        let conn = open_db(&path).unwrap();
        let repo = SqliteKvRepository::try_new(&conn).unwrap();
        repo.set_value("people", "[]").unwrap();
    }

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    let repo = SqliteKvRepository::try_new(&conn).unwrap();
    assert_eq!(repo.get_value("people").unwrap().as_deref(), Some("[]"));
}

#[test]
fn set_value_overwrites_existing_key() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteKvRepository::try_new(&conn).unwrap();

    repo.set_value("people", "first").unwrap();
    repo.set_value("people", "second").unwrap();

    assert_eq!(repo.get_value("people").unwrap().as_deref(), Some("second"));
    assert!(repo.get_value("missing").unwrap().is_none());
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM kv_entries;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn repository_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let err = SqliteKvRepository::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        RepoError::SchemaNotReady {
            db_version: 0,
            expected
        } if expected == latest_version()
    ));
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

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
fn opening_database_in_missing_directory_reports_open_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-such-dir").join("remember.db");

    let err = open_db(&path).unwrap_err();
    match &err {
        DbError::Open { mode, .. } => assert_eq!(*mode, "file"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(std::error::Error::source(&err).is_some());
    assert!(!err.is_schema_mismatch());
    assert!(!path.exists());
}

#[test]
fn opening_database_with_version_but_no_table_returns_missing_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hollow.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match &err {
        DbError::MissingTable { table, db_version } => {
            assert_eq!(*table, KV_TABLE);
            assert_eq!(*db_version, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_schema_mismatch());
    assert!(err.to_string().contains("kv_entries"));
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
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
