//! Decision rows

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;
use verdict::{ContentFingerprint, Decision, DecisionId, PolicyVersion, Status};

use super::db_err;
use crate::error::StoreError;
use crate::repository::DecisionCounts;

/// Decision row as stored
#[derive(Debug, Clone)]
pub struct DecisionRow {
    pub decision_id: String,
    pub content_type: String,
    pub content_hash: String,
    pub policy_version: String,
    pub status: String,
    pub score: i32,
    pub reason_code: String,
    pub risk_level: String,
    pub responsibility_shift: String,
    pub potential_outcome: String,
    pub issued_at: String,
    pub immutable: bool,
}

impl DecisionRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            decision_id: row.get("decision_id")?,
            content_type: row.get("content_type")?,
            content_hash: row.get("content_hash")?,
            policy_version: row.get("policy_version")?,
            status: row.get("status")?,
            score: row.get("score")?,
            reason_code: row.get("reason_code")?,
            risk_level: row.get("risk_level")?,
            responsibility_shift: row.get("responsibility_shift")?,
            potential_outcome: row.get("potential_outcome")?,
            issued_at: row.get("issued_at")?,
            immutable: row.get("immutable")?,
        })
    }

    fn into_decision(self) -> Result<Decision, StoreError> {
        let issued_at = DateTime::parse_from_rfc3339(&self.issued_at)
            .map_err(|e| StoreError::Corrupt(format!("issued_at {}: {}", self.issued_at, e)))?
            .with_timezone(&Utc);

        Ok(Decision {
            decision_id: DecisionId::parse(&self.decision_id)?,
            content_type: self.content_type.parse()?,
            content_hash: ContentFingerprint::from_stored(self.content_hash),
            policy_version: PolicyVersion::new(self.policy_version)?,
            status: self.status.parse()?,
            score: self.score,
            reason_code: self.reason_code.parse()?,
            risk_level: self.risk_level.parse()?,
            responsibility_shift: self.responsibility_shift.parse()?,
            potential_outcome: self.potential_outcome,
            issued_at,
            immutable: self.immutable,
        })
    }
}

/// Insert a decision. A duplicate `decision_id` surfaces as `Conflict`.
pub fn insert(conn: &Connection, decision: &Decision) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO ctg_decisions (
            decision_id, content_type, content_hash, policy_version, status, score,
            reason_code, risk_level, responsibility_shift, potential_outcome, issued_at, immutable
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            decision.decision_id.as_str(),
            decision.content_type.as_str(),
            decision.content_hash.as_str(),
            decision.policy_version.as_str(),
            decision.status.as_str(),
            decision.score,
            decision.reason_code.as_str(),
            decision.risk_level.as_str(),
            decision.responsibility_shift.as_str(),
            decision.potential_outcome,
            decision.issued_at.to_rfc3339(),
            decision.immutable,
        ],
    )
    .map_err(|e| db_err(&format!("Insert decision {}", decision.decision_id), e))?;

    debug!(decision_id = %decision.decision_id, "Inserted decision");
    Ok(())
}

/// Get a decision by id
pub fn get_by_id(conn: &Connection, decision_id: &DecisionId) -> Result<Option<Decision>, StoreError> {
    conn.query_row(
        "SELECT * FROM ctg_decisions WHERE decision_id = ?",
        params![decision_id.as_str()],
        |row| DecisionRow::from_row(row),
    )
    .optional()
    .map_err(|e| db_err("Query decision by id", e))?
    .map(DecisionRow::into_decision)
    .transpose()
}

/// Get the decision issued for content under a policy version
pub fn get_by_content(
    conn: &Connection,
    content_hash: &ContentFingerprint,
    policy_version: &PolicyVersion,
) -> Result<Option<Decision>, StoreError> {
    conn.query_row(
        "SELECT * FROM ctg_decisions WHERE content_hash = ? AND policy_version = ? LIMIT 1",
        params![content_hash.as_str(), policy_version.as_str()],
        |row| DecisionRow::from_row(row),
    )
    .optional()
    .map_err(|e| db_err("Query decision by content", e))?
    .map(DecisionRow::into_decision)
    .transpose()
}

/// Decision totals per status
pub fn counts(conn: &Connection) -> Result<DecisionCounts, StoreError> {
    let mut stmt = conn
        .prepare("SELECT status, COUNT(*) FROM ctg_decisions GROUP BY status")
        .map_err(|e| db_err("Prepare failed", e))?;

    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
        .map_err(|e| db_err("Query failed", e))?;

    let mut counts = DecisionCounts::default();
    for row in rows {
        let (status, n) = row.map_err(|e| db_err("Row parse failed", e))?;
        let status: Status = status.parse()?;
        counts.add(status, n as u64);
    }
    Ok(counts)
}
