//! Shared application state.
//!
//! `CoreState` is wrapped in `Arc` at startup and shared between the
//! orchestrator and the HTTP surface. Database connections are opened
//! per operation; only the coordination primitives (per-case locks,
//! the in-flight set, the telemetry hub) live in memory.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::{self, DatabaseError};
use crate::telemetry::TelemetryHub;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("internal lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct CoreState {
    pub config: AppConfig,
    db_path: PathBuf,
    documents_dir: PathBuf,
    /// One async mutex per case, created on first touch. Serializes
    /// state transitions for a case without blocking other cases.
    case_locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
    /// Cases currently inside `advance`. Guards against double-submit
    /// of processing work while the case lock is released during
    /// extraction.
    processing: Mutex<HashSet<Uuid>>,
    pub telemetry: TelemetryHub,
}

impl CoreState {
    /// Create state, ensure data directories exist and run migrations.
    pub fn new(config: AppConfig) -> Result<Self, CoreError> {
        let documents_dir = config.documents_dir();
        std::fs::create_dir_all(&documents_dir)?;
        let db_path = config.db_path();
        // Opening once at startup applies pending migrations.
        db::open_database(&db_path)?;

        Ok(Self {
            config,
            db_path,
            documents_dir,
            case_locks: Mutex::new(HashMap::new()),
            processing: Mutex::new(HashSet::new()),
            telemetry: TelemetryHub::default(),
        })
    }

    /// In-memory state over a temporary data directory (tests).
    #[cfg(test)]
    pub fn for_tests(dir: &std::path::Path) -> Self {
        let config = AppConfig {
            data_dir: dir.to_path_buf(),
            ..AppConfig::default()
        };
        Self::new(config).expect("test core state")
    }

    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        Ok(db::open_database(&self.db_path)?)
    }

    pub fn documents_dir(&self) -> &std::path::Path {
        &self.documents_dir
    }

    /// The per-case lock, created lazily.
    pub fn case_lock(&self, case_id: Uuid) -> Result<Arc<tokio::sync::Mutex<()>>, CoreError> {
        let mut locks = self.case_locks.lock().map_err(|_| CoreError::LockPoisoned)?;
        Ok(Arc::clone(
            locks
                .entry(case_id)
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        ))
    }

    /// Mark a case as in-flight. `false` if it already is.
    pub fn try_begin_processing(&self, case_id: Uuid) -> Result<bool, CoreError> {
        let mut processing = self.processing.lock().map_err(|_| CoreError::LockPoisoned)?;
        Ok(processing.insert(case_id))
    }

    pub fn end_processing(&self, case_id: Uuid) {
        if let Ok(mut processing) = self.processing.lock() {
            processing.remove(&case_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_creates_directories_and_database() {
        let dir = tempfile::tempdir().unwrap();
        let core = CoreState::for_tests(dir.path());
        assert!(core.documents_dir().exists());
        assert!(core.config.db_path().exists());
        core.open_db().unwrap();
    }

    #[test]
    fn case_lock_is_shared_per_case() {
        let dir = tempfile::tempdir().unwrap();
        let core = CoreState::for_tests(dir.path());
        let id = Uuid::new_v4();
        let a = core.case_lock(id).unwrap();
        let b = core.case_lock(id).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        let other = core.case_lock(Uuid::new_v4()).unwrap();
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[test]
    fn processing_marker_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let core = CoreState::for_tests(dir.path());
        let id = Uuid::new_v4();
        assert!(core.try_begin_processing(id).unwrap());
        assert!(!core.try_begin_processing(id).unwrap());
        core.end_processing(id);
        assert!(core.try_begin_processing(id).unwrap());
    }
}
