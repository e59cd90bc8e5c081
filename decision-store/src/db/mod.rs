//! SQLite backend for decisions and gate logs
//!
//! ## Tables
//!
//! - `ctg_decisions` - Immutable decisions, `decision_id` unique,
//!   indexed on `(content_hash, policy_version)`
//! - `ctg_logs` - Append-only gate log keyed by surrogate id
//!
//! Both tables reject UPDATE and DELETE through triggers.
//!
//! The repository methods run on Tokio's blocking pool, so a caller's
//! timeout fires even while SQLite waits on a lock held elsewhere.

pub mod decisions;
pub mod logs;
pub mod schema;

use async_trait::async_trait;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};
use verdict::{AuditEntry, ContentFingerprint, Decision, DecisionId, PolicyVersion};

use crate::error::StoreError;
use crate::repository::{AuditRepository, DecisionCounts, DecisionRepository};

/// Database file inside the storage directory.
pub const DB_FILE: &str = "content-trust-gate.db";

/// How long SQLite retries a locked database before failing a statement.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(2000);

/// Map a rusqlite failure, keeping unique-key violations distinguishable.
pub(crate) fn db_err(context: &str, e: rusqlite::Error) -> StoreError {
    if e.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) {
        return StoreError::Conflict(format!("{}: {}", context, e));
    }
    StoreError::Database(format!("{}: {}", context, e))
}

/// SQLite database for decisions and gate logs
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the database inside `storage_dir`
    pub fn open(storage_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(storage_dir)?;
        Self::open_file(&storage_dir.join(DB_FILE))
    }

    /// Open or create the database at an explicit path
    pub fn open_file(db_path: &Path) -> Result<Self, StoreError> {
        info!("Opening SQLite database at {:?}", db_path);

        let conn = Connection::open(db_path).map_err(|e| db_err("Failed to open SQLite", e))?;

        // WAL keeps readers unblocked while a decision is being written
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| db_err("Failed to set PRAGMA", e))?;
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)
            .map_err(|e| db_err("Failed to set busy timeout", e))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        debug!("Opening in-memory SQLite database");

        let conn = Connection::open_in_memory()
            .map_err(|e| db_err("Failed to open in-memory SQLite", e))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Default database path for a storage directory
    pub fn db_path(storage_dir: &Path) -> PathBuf {
        storage_dir.join(DB_FILE)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.with_conn(schema::init_schema)
    }

    /// Bound how long a statement waits for a lock held by another
    /// connection. Keep it at or below the store's operation timeout.
    pub fn set_busy_timeout(&self, timeout: Duration) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.busy_timeout(timeout)
                .map_err(|e| db_err("Failed to set busy timeout", e))
        })
    }

    /// Run a closure against the connection
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Run a closure against the connection on the blocking pool
    async fn run<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| StoreError::Internal(format!("Lock poisoned: {}", e)))?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Internal(format!("SQLite task failed: {}", e)))?
    }
}

#[async_trait]
impl DecisionRepository for SqliteStore {
    async fn find_by_content(
        &self,
        content_hash: &ContentFingerprint,
        policy_version: &PolicyVersion,
    ) -> Result<Option<Decision>, StoreError> {
        let content_hash = content_hash.clone();
        let policy_version = policy_version.clone();
        self.run(move |conn| decisions::get_by_content(conn, &content_hash, &policy_version))
            .await
    }

    async fn find_by_id(&self, decision_id: &DecisionId) -> Result<Option<Decision>, StoreError> {
        let decision_id = decision_id.clone();
        self.run(move |conn| decisions::get_by_id(conn, &decision_id)).await
    }

    async fn insert(&self, decision: &Decision) -> Result<(), StoreError> {
        let decision = decision.clone();
        self.run(move |conn| decisions::insert(conn, &decision)).await
    }

    async fn counts(&self) -> Result<DecisionCounts, StoreError> {
        self.run(decisions::counts).await
    }
}

#[async_trait]
impl AuditRepository for SqliteStore {
    async fn append(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        let entry = entry.clone();
        let entry_id = self.run(move |conn| logs::append(conn, &entry)).await?;
        debug!(entry_id, "Appended gate log");
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, StoreError> {
        self.run(move |conn| logs::recent(conn, limit)).await
    }

    async fn by_decision(&self, decision_id: &DecisionId) -> Result<Vec<AuditEntry>, StoreError> {
        let decision_id = decision_id.clone();
        self.run(move |conn| logs::by_decision(conn, &decision_id)).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.run(logs::count).await
    }
}
