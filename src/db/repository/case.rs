use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Case, CaseStatus, ExtractedFields};

/// Insert a newly submitted case.
pub fn insert_case(conn: &Connection, case: &Case) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO cases (id, citizen_contact, status, submitted_at, doc_generation)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            case.id.to_string(),
            case.citizen_contact,
            case.status.as_str(),
            case.submitted_at,
            case.doc_generation,
        ],
    )?;
    Ok(())
}

/// Load a case by id.
pub fn get_case(conn: &Connection, case_id: Uuid) -> Result<Case, DatabaseError> {
    conn.query_row(
        "SELECT id, citizen_contact, status, submitted_at, doc_generation,
                confidence, review_issues, extracted_fields, last_error
         FROM cases WHERE id = ?1",
        params![case_id.to_string()],
        row_to_case,
    )
    .optional()?
    .ok_or_else(|| DatabaseError::NotFound {
        entity_type: "case".into(),
        id: case_id.to_string(),
    })
}

/// Debug-build check that every status write follows a legal edge of
/// the case state machine. Same-status rewrites are allowed (outcome
/// updates may refresh fields without moving the case).
#[cfg(debug_assertions)]
fn assert_legal_transition(conn: &Connection, case_id: Uuid, next: CaseStatus) {
    if let Ok(case) = get_case(conn, case_id) {
        assert!(
            case.status == next || case.status.can_transition_to(next),
            "illegal status transition {} -> {next} for case {case_id}",
            case.status
        );
    }
}

/// Update only the status column.
pub fn update_status(
    conn: &Connection,
    case_id: Uuid,
    status: CaseStatus,
) -> Result<(), DatabaseError> {
    #[cfg(debug_assertions)]
    assert_legal_transition(conn, case_id, status);
    let changed = conn.execute(
        "UPDATE cases SET status = ?2 WHERE id = ?1",
        params![case_id.to_string(), status.as_str()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "case".into(),
            id: case_id.to_string(),
        });
    }
    Ok(())
}

/// Persist the outcome of a gate decision: status plus the fields,
/// confidence, and reviewer-facing issues that came with it.
pub fn update_outcome(
    conn: &Connection,
    case_id: Uuid,
    status: CaseStatus,
    fields: &ExtractedFields,
    confidence: Option<f64>,
    issues: &[String],
) -> Result<(), DatabaseError> {
    #[cfg(debug_assertions)]
    assert_legal_transition(conn, case_id, status);
    let fields_json = serde_json::to_string(fields).unwrap_or_default();
    let issues_json = serde_json::to_string(issues).unwrap_or_default();
    conn.execute(
        "UPDATE cases
         SET status = ?2, extracted_fields = ?3, confidence = ?4, review_issues = ?5
         WHERE id = ?1",
        params![
            case_id.to_string(),
            status.as_str(),
            fields_json,
            confidence,
            issues_json,
        ],
    )?;
    Ok(())
}

/// Move a case to ERROR with its error descriptor.
pub fn update_error(conn: &Connection, case_id: Uuid, error: &str) -> Result<(), DatabaseError> {
    #[cfg(debug_assertions)]
    assert_legal_transition(conn, case_id, CaseStatus::Error);
    conn.execute(
        "UPDATE cases SET status = ?2, last_error = ?3 WHERE id = ?1",
        params![case_id.to_string(), CaseStatus::Error.as_str(), error],
    )?;
    Ok(())
}

/// Remove a case row. Documents and audit entries cascade.
pub fn delete_case(conn: &Connection, case_id: Uuid) -> Result<(), DatabaseError> {
    conn.execute(
        "DELETE FROM cases WHERE id = ?1",
        params![case_id.to_string()],
    )?;
    Ok(())
}

/// Bump the document generation counter. Returns the new generation.
pub fn bump_generation(conn: &Connection, case_id: Uuid) -> Result<i64, DatabaseError> {
    conn.execute(
        "UPDATE cases SET doc_generation = doc_generation + 1 WHERE id = ?1",
        params![case_id.to_string()],
    )?;
    let generation = conn.query_row(
        "SELECT doc_generation FROM cases WHERE id = ?1",
        params![case_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(generation)
}

/// List cases in any of the given statuses, newest submission first.
pub fn list_by_statuses(
    conn: &Connection,
    statuses: &[CaseStatus],
) -> Result<Vec<Case>, DatabaseError> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = statuses
        .iter()
        .enumerate()
        .map(|(i, _)| format!("?{}", i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT id, citizen_contact, status, submitted_at, doc_generation,
                confidence, review_issues, extracted_fields, last_error
         FROM cases WHERE status IN ({placeholders})
         ORDER BY submitted_at DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let status_strs: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
    let rows = stmt.query_map(rusqlite::params_from_iter(status_strs), row_to_case)?;
    let mut cases = Vec::new();
    for row in rows {
        cases.push(row?);
    }
    Ok(cases)
}

fn row_to_case(row: &Row<'_>) -> rusqlite::Result<Case> {
    let id_str: String = row.get(0)?;
    let status_str: String = row.get(2)?;
    let issues_json: Option<String> = row.get(6)?;
    let fields_json: Option<String> = row.get(7)?;

    Ok(Case {
        id: Uuid::from_str(&id_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        citizen_contact: row.get(1)?,
        status: CaseStatus::from_str(&status_str).map_err(|_| {
            rusqlite::Error::InvalidColumnType(2, "status".into(), rusqlite::types::Type::Text)
        })?,
        submitted_at: row.get::<_, DateTime<Utc>>(3)?,
        doc_generation: row.get(4)?,
        confidence: row.get(5)?,
        review_issues: issues_json
            .and_then(|j| serde_json::from_str(&j).ok())
            .unwrap_or_default(),
        extracted_fields: fields_json.and_then(|j| serde_json::from_str(&j).ok()),
        last_error: row.get(8)?,
    })
}
