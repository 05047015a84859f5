use crate::errors::{AppError, AppResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const SCHEMA_SQL: &str = include_str!("schema.sql");

pub const REPORTS_KEY: &str = "adinsight_reports";
pub const BACKEND_CONFIG_KEY: &str = "adinsight_supabase_config";
pub const SETTINGS_KEY: &str = "app_settings";

/// Local persisted state: opaque JSON documents under fixed keys, with a
/// total-size quota in the spirit of browser storage.
#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    quota_bytes: AtomicUsize,
}

impl Database {
    pub fn new(path: &Path, quota_bytes: usize) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
            quota_bytes: AtomicUsize::new(quota_bytes),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn set_quota(&self, quota_bytes: usize) {
        self.quota_bytes.store(quota_bytes, Ordering::Relaxed);
    }

    pub fn get_document<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                "SELECT value_json FROM documents WHERE key = ?1",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn put_document<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> AppResult<()> {
        let raw = serde_json::to_string(value).map_err(|err| AppError::LocalWrite(err.to_string()))?;
        let conn = self.lock()?;

        let others: i64 = conn
            .query_row(
                "SELECT COALESCE(SUM(LENGTH(CAST(value_json AS BLOB))), 0) FROM documents WHERE key != ?1",
                [key],
                |row| row.get(0),
            )
            .map_err(|err| AppError::LocalWrite(err.to_string()))?;
        let quota = self.quota_bytes.load(Ordering::Relaxed);
        let total = usize::try_from(others).unwrap_or(usize::MAX).saturating_add(raw.len());
        if total > quota {
            return Err(AppError::LocalWrite(format!(
                "storage quota exceeded ({} of {} bytes)",
                total, quota
            )));
        }

        conn.execute(
            "INSERT INTO documents (key, value_json, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
            params![key, raw, Utc::now().to_rfc3339()],
        )
        .map_err(|err| AppError::LocalWrite(err.to_string()))?;
        Ok(())
    }

    pub fn remove_document(&self, key: &str) -> AppResult<bool> {
        let conn = self.lock()?;
        let removed = conn
            .execute("DELETE FROM documents WHERE key = ?1", [key])
            .map_err(|err| AppError::LocalDelete(err.to_string()))?;
        Ok(removed > 0)
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::Database;
    use crate::errors::AppError;

    #[test]
    fn documents_round_trip_and_remove() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("state.sqlite"), 1024).expect("db");

        db.put_document("k", &vec!["a", "b"]).expect("put");
        let stored: Option<Vec<String>> = db.get_document("k").expect("get");
        assert_eq!(stored, Some(vec!["a".to_string(), "b".to_string()]));

        assert!(db.remove_document("k").expect("remove"));
        assert!(!db.remove_document("k").expect("remove again"));
        let stored: Option<Vec<String>> = db.get_document("k").expect("get");
        assert!(stored.is_none());
    }

    #[test]
    fn rejects_writes_over_quota() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("state.sqlite"), 32).expect("db");

        db.put_document("small", "abc").expect("fits");
        let big = "x".repeat(64);
        let error = db.put_document("big", &big).expect_err("over quota");
        assert!(matches!(error, AppError::LocalWrite(_)));

        let kept: Option<String> = db.get_document("small").expect("get");
        assert_eq!(kept.as_deref(), Some("abc"));
    }

    #[test]
    fn overwriting_a_key_does_not_count_its_old_value() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("state.sqlite"), 40).expect("db");

        db.put_document("k", &"y".repeat(30)).expect("first");
        db.put_document("k", &"z".repeat(30)).expect("replace");
    }
}
