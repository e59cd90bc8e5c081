//! Gate log rows

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use verdict::{AuditEntry, DecisionId};

use super::db_err;
use crate::error::StoreError;

/// Row from the ctg_logs table
struct LogRow {
    id: i64,
    gate_type: String,
    subject_id: String,
    decision_id: String,
    recorded_at: String,
}

impl LogRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            gate_type: row.get("gate_type")?,
            subject_id: row.get("subject_id")?,
            decision_id: row.get("decision_id")?,
            recorded_at: row.get("recorded_at")?,
        })
    }

    fn into_entry(self) -> Result<AuditEntry, StoreError> {
        let recorded_at = DateTime::parse_from_rfc3339(&self.recorded_at)
            .map_err(|e| StoreError::Corrupt(format!("recorded_at {}: {}", self.recorded_at, e)))?
            .with_timezone(&Utc);
        Ok(AuditEntry {
            entry_id: Some(self.id as u64),
            gate_type: self.gate_type.parse()?,
            subject_id: self.subject_id,
            decision_id: DecisionId::parse(&self.decision_id)?,
            recorded_at,
        })
    }
}

fn query_entries(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<AuditEntry>, StoreError> {
    let mut stmt = conn.prepare(sql).map_err(|e| db_err("Prepare failed", e))?;
    let rows = stmt
        .query_map(params, LogRow::from_row)
        .map_err(|e| db_err("Query failed", e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| db_err("Row parse failed", e))?;
    rows.into_iter().map(LogRow::into_entry).collect()
}

/// Returns the assigned entry id.
pub fn append(conn: &Connection, entry: &AuditEntry) -> Result<u64, StoreError> {
    conn.execute(
        "INSERT INTO ctg_logs (gate_type, subject_id, decision_id, recorded_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            entry.gate_type.as_str(),
            entry.subject_id,
            entry.decision_id.as_str(),
            entry.recorded_at.to_rfc3339(),
        ],
    )
    .map_err(|e| db_err("Insert log", e))?;
    Ok(conn.last_insert_rowid() as u64)
}

/// Newest first
pub fn recent(conn: &Connection, limit: usize) -> Result<Vec<AuditEntry>, StoreError> {
    query_entries(
        conn,
        "SELECT * FROM ctg_logs ORDER BY id DESC LIMIT ?",
        &[&(limit as i64)],
    )
}

/// Oldest first
pub fn by_decision(conn: &Connection, decision_id: &DecisionId) -> Result<Vec<AuditEntry>, StoreError> {
    query_entries(
        conn,
        "SELECT * FROM ctg_logs WHERE decision_id = ? ORDER BY id ASC",
        &[&decision_id.as_str()],
    )
}

pub fn count(conn: &Connection) -> Result<u64, StoreError> {
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM ctg_logs", [], |row| row.get(0))
        .map_err(|e| db_err("Query failed", e))?;
    Ok(n as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_schema;
    use verdict::{ContentFingerprint, GateType, PolicyVersion};

    #[test]
    fn test_append_and_query() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let id = DecisionId::derive(
            &ContentFingerprint::compute("a", "b", "c"),
            &PolicyVersion::default(),
        );
        let first = append(&conn, &AuditEntry::new(GateType::PostBlock, "42", id.clone())).unwrap();
        append(&conn, &AuditEntry::new(GateType::Rest, "42", id.clone())).unwrap();
        let last = append(&conn, &AuditEntry::new(GateType::Ad, "0", id.clone())).unwrap();
        assert!(last > first);

        assert_eq!(count(&conn).unwrap(), 3);

        let newest = recent(&conn, 2).unwrap();
        assert_eq!(newest.len(), 2);
        assert_eq!(newest[0].gate_type, GateType::Ad);
        assert_eq!(newest[0].entry_id, Some(last));

        let history = by_decision(&conn, &id).unwrap();
        assert_eq!(history[0].gate_type, GateType::PostBlock);
        assert_eq!(history[0].entry_id, Some(first));
        assert_eq!(history[0].subject_id, "42");

        assert!(conn.execute("DELETE FROM ctg_logs", []).is_err());
    }
}
