//! Scoped draft persistence.
//!
//! Drafts are keyed JSON blobs stored verbatim, with no schema versioning.
//! The storage backend is injected, so forms never know whether a draft
//! lives in memory, in SQLite, or behind some future API.

use std::{
    collections::HashMap,
    path::Path,
    sync::{Mutex, PoisonError},
};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::utils;

pub const ISSUE_REPORT_DRAFT: &str = "issueReportDraft";

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("draft storage error: {0}")]
    Storage(String),
    #[error("draft encode failed: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("draft {key} is unreadable: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<rusqlite::Error> for DraftError {
    fn from(err: rusqlite::Error) -> Self {
        DraftError::Storage(err.to_string())
    }
}

impl<T> From<PoisonError<T>> for DraftError {
    fn from(_: PoisonError<T>) -> Self {
        DraftError::Storage("draft storage mutex poisoned".to_string())
    }
}

/// A keyed blob store.
pub trait DraftStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, DraftError>;
    fn set(&self, key: &str, value: &str) -> Result<(), DraftError>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), DraftError>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, DraftError> {
        Ok(self.entries.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DraftError> {
        self.entries.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DraftError> {
        self.entries.lock()?.remove(key);
        Ok(())
    }
}

pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    pub fn open_default() -> Result<Self, DraftError> {
        Self::open(&utils::drafts_database_path())
    }

    pub fn open(path: &Path) -> Result<Self, DraftError> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, DraftError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, DraftError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS drafts(
                key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                saved_at_utc TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl DraftStorage for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>, DraftError> {
        let conn = self.conn.lock()?;
        let payload = conn
            .query_row(
                "SELECT payload FROM drafts WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(payload)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DraftError> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO drafts (key, payload, saved_at_utc)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
               payload = excluded.payload,
               saved_at_utc = excluded.saved_at_utc",
            params![key, value, now],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DraftError> {
        let conn = self.conn.lock()?;
        conn.execute("DELETE FROM drafts WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// Draft access confined to one namespace of a shared store.
pub struct ScopedDrafts<S: DraftStorage> {
    scope: String,
    storage: S,
}

impl<S: DraftStorage> ScopedDrafts<S> {
    pub fn new(scope: impl Into<String>, storage: S) -> Self {
        Self {
            scope: scope.into(),
            storage,
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    fn scoped_key(&self, key: &str) -> String {
        format!("{}:{}", self.scope, key)
    }

    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), DraftError> {
        let payload = serde_json::to_string(value).map_err(DraftError::Encode)?;
        self.storage.set(&self.scoped_key(key), &payload)?;
        tracing::info!(scope = %self.scope, key, "draft saved");
        Ok(())
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DraftError> {
        let Some(payload) = self.storage.get(&self.scoped_key(key))? else {
            return Ok(None);
        };
        serde_json::from_str(&payload)
            .map(Some)
            .map_err(|source| DraftError::Decode {
                key: key.to_string(),
                source,
            })
    }

    /// Loads a draft, treating an unreadable one as absent.
    pub fn load_or_discard<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DraftError> {
        match self.load(key) {
            Err(DraftError::Decode { key, source }) => {
                tracing::warn!(scope = %self.scope, %key, "error loading draft: {source}");
                Ok(None)
            }
            other => other,
        }
    }

    pub fn clear(&self, key: &str) -> Result<(), DraftError> {
        self.storage.remove(&self.scoped_key(key))?;
        tracing::debug!(scope = %self.scope, key, "draft cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::IssueReportDraft;

    fn draft() -> IssueReportDraft {
        IssueReportDraft {
            title: "Pothole".to_string(),
            category: "Roads".to_string(),
            guidelines_accepted: true,
            ..Default::default()
        }
    }

    fn exercise_backend<S: DraftStorage>(storage: S) {
        let drafts = ScopedDrafts::new("test", storage);
        assert_eq!(drafts.load::<IssueReportDraft>(ISSUE_REPORT_DRAFT).unwrap(), None);

        drafts.save(ISSUE_REPORT_DRAFT, &draft()).unwrap();
        assert_eq!(drafts.load(ISSUE_REPORT_DRAFT).unwrap(), Some(draft()));

        let mut updated = draft();
        updated.address = "12 Main Street".to_string();
        drafts.save(ISSUE_REPORT_DRAFT, &updated).unwrap();
        assert_eq!(drafts.load(ISSUE_REPORT_DRAFT).unwrap(), Some(updated));

        drafts.clear(ISSUE_REPORT_DRAFT).unwrap();
        drafts.clear(ISSUE_REPORT_DRAFT).unwrap();
        assert_eq!(drafts.load::<IssueReportDraft>(ISSUE_REPORT_DRAFT).unwrap(), None);
    }

    #[test]
    fn memory_backend_round_trips() {
        exercise_backend(MemoryStorage::new());
    }

    #[test]
    fn sqlite_backend_round_trips() {
        exercise_backend(SqliteStorage::open_in_memory().unwrap());
    }

    #[test]
    fn sqlite_drafts_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drafts.sqlite");

        ScopedDrafts::new("test", SqliteStorage::open(&path).unwrap())
            .save(ISSUE_REPORT_DRAFT, &draft())
            .unwrap();

        let reopened = ScopedDrafts::new("test", SqliteStorage::open(&path).unwrap());
        assert_eq!(reopened.load(ISSUE_REPORT_DRAFT).unwrap(), Some(draft()));
    }

    #[test]
    fn scopes_do_not_see_each_other() {
        let storage = MemoryStorage::new();
        storage.set("a:issueReportDraft", "{\"title\":\"mine\"}").unwrap();

        let other = ScopedDrafts::new("b", storage);
        assert_eq!(other.load::<IssueReportDraft>(ISSUE_REPORT_DRAFT).unwrap(), None);
    }

    #[test]
    fn corrupt_draft_is_a_decode_error() {
        let storage = MemoryStorage::new();
        storage.set("test:issueReportDraft", "{ not json").unwrap();
        let drafts = ScopedDrafts::new("test", storage);

        let err = drafts
            .load::<IssueReportDraft>(ISSUE_REPORT_DRAFT)
            .expect_err("corrupt");
        assert!(matches!(err, DraftError::Decode { .. }));
        assert_eq!(
            drafts
                .load_or_discard::<IssueReportDraft>(ISSUE_REPORT_DRAFT)
                .unwrap(),
            None
        );
    }
}
