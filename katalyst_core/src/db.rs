//! SQLite-backed key/value storage for the quiz result log

use crate::config::{StorageSettings, DEFAULT_RESULTS_KEY};
use crate::error::StoreError;
use crate::progress::{QuizResult, QuizResultStore};
#[cfg(feature = "python")]
use pyo3::prelude::*;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::path::Path;
use tracing::{debug, info};

/// Initialize database with schema
pub fn init_database(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Read a raw value.
pub fn get_value(conn: &Connection, key: &str) -> SqliteResult<Option<String>> {
    conn.query_row(
        "SELECT value FROM kv_store WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

/// Insert or replace a raw value.
pub fn put_value(conn: &Connection, key: &str, value: &str) -> SqliteResult<()> {
    conn.execute(
        "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
        params![key, value],
    )?;
    Ok(())
}

fn decode(key: &str, raw: Option<String>) -> Result<Vec<QuizResult>, StoreError> {
    match raw {
        None => Ok(Vec::new()),
        Some(text) => serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        }),
    }
}

/// Quiz result log stored as one JSON array under a well-known key.
pub struct SqliteResultStore {
    conn: Connection,
    key: String,
}

impl SqliteResultStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = db_path.as_ref();
        let conn = Connection::open(path)?;
        init_database(&conn)?;
        info!(path = %path.display(), "opened quiz result store");
        Ok(Self {
            conn,
            key: DEFAULT_RESULTS_KEY.to_string(),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        init_database(&conn)?;
        Ok(Self {
            conn,
            key: DEFAULT_RESULTS_KEY.to_string(),
        })
    }

    /// Open the store described by configuration; in memory when no path is set.
    pub fn from_settings(settings: &StorageSettings) -> Result<Self, StoreError> {
        let store = match &settings.database_path {
            Some(path) => Self::open(path)?,
            None => Self::open_in_memory()?,
        };
        Ok(store.with_key(settings.results_key.clone()))
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl QuizResultStore for SqliteResultStore {
    fn append(&mut self, result: &QuizResult) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let mut results = decode(&self.key, get_value(&tx, &self.key)?)?;
        results.push(result.clone());
        put_value(&tx, &self.key, &serde_json::to_string(&results)?)?;
        tx.commit()?;
        debug!(key = %self.key, count = results.len(), "appended quiz result");
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<QuizResult>, StoreError> {
        decode(&self.key, get_value(&self.conn, &self.key)?)
    }
}

// ============= Python Bindings =============

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "read_quiz_results")]
pub fn py_read_quiz_results(db_path: &str) -> PyResult<Vec<QuizResult>> {
    SqliteResultStore::open(db_path)
        .and_then(|store| store.read_all())
        .map_err(|e| pyo3::exceptions::PyRuntimeError::new_err(e.to_string()))
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "get_dashboard")]
pub fn py_get_dashboard(db_path: &str) -> PyResult<Option<crate::progress::DashboardMetrics>> {
    SqliteResultStore::open(db_path)
        .and_then(|store| crate::progress::get_dashboard(&store))
        .map_err(|e| pyo3::exceptions::PyRuntimeError::new_err(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Grade;
    use chrono::Utc;

    fn result(percentage: f64) -> QuizResult {
        QuizResult {
            date: Utc::now(),
            score: 1,
            total_questions: 2,
            earned_marks: 1.0,
            total_marks: 2.0,
            percentage,
            grade: Grade::from_percentage(percentage),
        }
    }

    #[test]
    fn missing_key_reads_as_empty_log() {
        let store = SqliteResultStore::open_in_memory().unwrap();
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn append_then_read_in_order() {
        let mut store = SqliteResultStore::open_in_memory().unwrap();
        store.append(&result(50.0)).unwrap();
        store.append(&result(90.0)).unwrap();
        let all = store.read_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].percentage, 50.0);
        assert_eq!(all[1].grade, Grade::APlus);
    }

    #[test]
    fn corrupt_value_is_an_error_not_an_empty_log() {
        let mut store = SqliteResultStore::open_in_memory().unwrap();
        put_value(&store.conn, "quizResults", "not json").unwrap();
        assert!(matches!(store.read_all(), Err(StoreError::Corrupt { .. })));
        assert!(matches!(store.append(&result(10.0)), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn keys_are_independent() {
        let mut store = SqliteResultStore::open_in_memory().unwrap().with_key("practice");
        store.append(&result(70.0)).unwrap();
        assert_eq!(get_value(&store.conn, "quizResults").unwrap(), None);
        assert!(get_value(&store.conn, "practice").unwrap().is_some());
    }
}
