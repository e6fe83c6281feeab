//! Key-value repository contracts and backend implementations.
//!
//! # Responsibility
//! - Provide whole-value get/set over string keys.
//! - Hide whether values live in SQLite, in memory, or nowhere at all.
//!
//! # Invariants
//! - `set_value` replaces the full value; there are no partial writes.
//! - An absent key is reported as `Ok(None)`, never as an error.
//! - `RepoError::Unavailable` means "no storage medium", not a transient
//!   failure; callers degrade instead of surfacing it.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for key-value persistence operations.
#[derive(Debug)]
pub enum RepoError {
    /// No persistent storage exists in this execution context.
    Unavailable(String),
    /// Connection schema does not match what this binary expects.
    SchemaNotReady { db_version: u32, expected: u32 },
    Db(DbError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(reason) => write!(f, "storage unavailable: {reason}"),
            Self::SchemaNotReady {
                db_version,
                expected,
            } => write!(
                f,
                "storage schema version {db_version} does not match expected {expected}"
            ),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Unavailable(_) | Self::SchemaNotReady { .. } => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Whole-value storage keyed by string.
pub trait KvRepository {
    /// Reads the value stored under `key`.
    fn get_value(&self, key: &str) -> RepoResult<Option<String>>;
    /// Replaces the value stored under `key`.
    fn set_value(&self, key: &str, value: &str) -> RepoResult<()>;
}

impl<R: KvRepository + ?Sized> KvRepository for &R {
    fn get_value(&self, key: &str) -> RepoResult<Option<String>> {
        (**self).get_value(key)
    }

    fn set_value(&self, key: &str, value: &str) -> RepoResult<()> {
        (**self).set_value(key, value)
    }
}

/// SQLite-backed key-value repository over the `kv_entries` table.
pub struct SqliteKvRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteKvRepository<'conn> {
    /// Wraps a connection opened through [`crate::db::open_db`] or
    /// [`crate::db::open_db_in_memory`].
    ///
    /// # Errors
    /// - `SchemaNotReady` when migrations have not been applied.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let db_version = current_user_version(conn)?;
        let expected = latest_version();
        if db_version != expected {
            return Err(RepoError::SchemaNotReady {
                db_version,
                expected,
            });
        }
        Ok(Self { conn })
    }
}

impl KvRepository for SqliteKvRepository<'_> {
    fn get_value(&self, key: &str) -> RepoResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_value(&self, key: &str, value: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }
}

/// In-process key-value repository for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryKvRepository {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryKvRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds one entry, e.g. a blob written by another front end.
    pub fn with_entry(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.borrow_mut().insert(key.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KvRepository for MemoryKvRepository {
    fn get_value(&self, key: &str) -> RepoResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set_value(&self, key: &str, value: &str) -> RepoResult<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Repository for contexts without any persistent medium.
///
/// Every call reports `RepoError::Unavailable`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedKvRepository;

impl KvRepository for DetachedKvRepository {
    fn get_value(&self, _key: &str) -> RepoResult<Option<String>> {
        Err(RepoError::Unavailable("no persistent medium attached".to_string()))
    }

    fn set_value(&self, _key: &str, _value: &str) -> RepoResult<()> {
        Err(RepoError::Unavailable("no persistent medium attached".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{DetachedKvRepository, KvRepository, MemoryKvRepository, RepoError};

    #[test]
    fn memory_repo_replaces_whole_value() {
        let repo = MemoryKvRepository::new();
        assert!(repo.get_value("k").unwrap().is_none());

        repo.set_value("k", "first").unwrap();
        repo.set_value("k", "second").unwrap();
        assert_eq!(repo.get_value("k").unwrap().as_deref(), Some("second"));
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn detached_repo_reports_unavailable() {
        let repo = DetachedKvRepository;
        assert!(matches!(repo.get_value("k"), Err(RepoError::Unavailable(_))));
        assert!(matches!(
            repo.set_value("k", "v"),
            Err(RepoError::Unavailable(_))
        ));
    }
}
