//! Database schema definitions

use rusqlite::Connection;
use tracing::info;

use super::db_err;
use crate::error::StoreError;

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Creating new database schema v{}", SCHEMA_VERSION);
        create_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!("Migrating schema from v{} to v{}", current_version, SCHEMA_VERSION);
        migrate_schema(conn, current_version)?;
    } else {
        info!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get current schema version (0 if not initialized)
pub fn get_schema_version(conn: &Connection) -> Result<i32, StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )
    .map_err(|e| db_err("Failed to create schema_version table", e))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(db_err("Failed to read schema_version", other)),
        })?;

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), StoreError> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| db_err("Failed to clear schema_version", e))?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?)", [version])
        .map_err(|e| db_err("Failed to set schema_version", e))?;
    Ok(())
}

fn create_tables(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(DECISIONS_SCHEMA)
        .map_err(|e| db_err("Failed to create decision tables", e))?;

    conn.execute_batch(LOGS_SCHEMA)
        .map_err(|e| db_err("Failed to create log tables", e))?;

    Ok(())
}

fn migrate_schema(conn: &Connection, from_version: i32) -> Result<(), StoreError> {
    // v1 is the first released layout; later versions add their steps here.
    info!(from_version, "No migration steps registered");
    set_schema_version(conn, SCHEMA_VERSION)
}

/// Decisions table schema
const DECISIONS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ctg_decisions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    decision_id TEXT NOT NULL UNIQUE,
    content_type TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    policy_version TEXT NOT NULL,
    status TEXT NOT NULL,
    score INTEGER NOT NULL,
    reason_code TEXT NOT NULL DEFAULT '',
    risk_level TEXT NOT NULL DEFAULT '',
    responsibility_shift TEXT NOT NULL DEFAULT '',
    potential_outcome TEXT NOT NULL DEFAULT '',
    issued_at TEXT NOT NULL,
    immutable INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_ctg_decisions_content
    ON ctg_decisions(content_hash, policy_version);

CREATE TRIGGER IF NOT EXISTS ctg_decisions_no_update
BEFORE UPDATE ON ctg_decisions
BEGIN
    SELECT RAISE(ABORT, 'decisions are immutable');
END;

CREATE TRIGGER IF NOT EXISTS ctg_decisions_no_delete
BEFORE DELETE ON ctg_decisions
BEGIN
    SELECT RAISE(ABORT, 'decisions are immutable');
END;
"#;

/// Gate log schema
const LOGS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ctg_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    gate_type TEXT NOT NULL,
    subject_id TEXT NOT NULL,
    decision_id TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ctg_logs_decision ON ctg_logs(decision_id);

CREATE TRIGGER IF NOT EXISTS ctg_logs_no_update
BEFORE UPDATE ON ctg_logs
BEGIN
    SELECT RAISE(ABORT, 'gate logs are append-only');
END;

CREATE TRIGGER IF NOT EXISTS ctg_logs_no_delete
BEFORE DELETE ON ctg_logs
BEGIN
    SELECT RAISE(ABORT, 'gate logs are append-only');
END;
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);

        let tables: i32 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name IN ('ctg_decisions', 'ctg_logs')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }

    #[test]
    fn test_fresh_database_reports_version_zero() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 0);
    }
}
