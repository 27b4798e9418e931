use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::DatabaseError;

/// One immutable entry in a case's audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub seq: i64,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub message: String,
}

/// Append an entry with the next per-case sequence number.
///
/// The MAX(seq)+1 read and the insert run inside one transaction so
/// concurrent appenders cannot produce duplicate or skipped numbers.
/// Ordering comes from seq, not the timestamp.
pub fn append_entry(
    conn: &mut Connection,
    case_id: Uuid,
    actor: &str,
    message: &str,
) -> Result<i64, DatabaseError> {
    let tx = conn.transaction()?;
    let seq: i64 = tx.query_row(
        "SELECT COALESCE(MAX(seq), 0) + 1 FROM audit_entries WHERE case_id = ?1",
        params![case_id.to_string()],
        |row| row.get(0),
    )?;
    tx.execute(
        "INSERT INTO audit_entries (case_id, seq, timestamp, actor, message)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![case_id.to_string(), seq, Utc::now(), actor, message],
    )?;
    tx.commit()?;
    Ok(seq)
}

/// Full audit history for a case, in append order.
pub fn read_entries(conn: &Connection, case_id: Uuid) -> Result<Vec<AuditEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT seq, timestamp, actor, message FROM audit_entries
         WHERE case_id = ?1 ORDER BY seq ASC",
    )?;
    let rows = stmt.query_map(params![case_id.to_string()], |row| {
        Ok(AuditEntry {
            seq: row.get(0)?,
            timestamp: row.get::<_, DateTime<Utc>>(1)?,
            actor: row.get(2)?,
            message: row.get(3)?,
        })
    })?;
    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::case::insert_case;
    use crate::db::sqlite::open_memory_database;
    use crate::models::{Case, CaseStatus};

    fn case_in(conn: &Connection) -> Uuid {
        let case = Case {
            id: Uuid::new_v4(),
            citizen_contact: "erika@example.org".into(),
            status: CaseStatus::Queued,
            submitted_at: Utc::now(),
            doc_generation: 0,
            confidence: None,
            review_issues: Vec::new(),
            extracted_fields: None,
            last_error: None,
        };
        insert_case(conn, &case).unwrap();
        case.id
    }

    #[test]
    fn seq_is_monotonic_per_case() {
        let mut conn = open_memory_database().unwrap();
        let case_id = case_in(&conn);

        assert_eq!(append_entry(&mut conn, case_id, "orchestrator", "a").unwrap(), 1);
        assert_eq!(append_entry(&mut conn, case_id, "orchestrator", "b").unwrap(), 2);
        assert_eq!(append_entry(&mut conn, case_id, "gate", "c").unwrap(), 3);
    }

    #[test]
    fn sequences_are_independent_across_cases() {
        let mut conn = open_memory_database().unwrap();
        let first = case_in(&conn);
        let second = case_in(&conn);

        append_entry(&mut conn, first, "orchestrator", "a").unwrap();
        append_entry(&mut conn, first, "orchestrator", "b").unwrap();
        assert_eq!(append_entry(&mut conn, second, "orchestrator", "x").unwrap(), 1);
    }

    #[test]
    fn read_returns_full_history_in_order() {
        let mut conn = open_memory_database().unwrap();
        let case_id = case_in(&conn);

        append_entry(&mut conn, case_id, "citizen", "case submitted").unwrap();
        append_entry(&mut conn, case_id, "orchestrator", "auto-processing started").unwrap();
        append_entry(&mut conn, case_id, "orchestrator", "case closed").unwrap();

        let entries = read_entries(&conn, case_id).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].message, "case submitted");
        assert_eq!(entries[0].actor, "citizen");
        assert_eq!(entries[2].message, "case closed");
        let seqs: Vec<i64> = entries.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn read_on_case_without_entries_is_empty() {
        let conn = open_memory_database().unwrap();
        let case_id = case_in(&conn);
        assert!(read_entries(&conn, case_id).unwrap().is_empty());
    }
}
