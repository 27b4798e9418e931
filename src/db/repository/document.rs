use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{DocumentKind, DocumentRef};

/// Insert or replace the document of this kind for the case.
///
/// A re-upload of the same kind supersedes the previous file; the
/// orchestrator bumps the case's doc_generation alongside this call.
pub fn upsert_document(conn: &Connection, doc: &DocumentRef) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO documents (id, case_id, kind, filename, sha256, stored_path, uploaded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT (case_id, kind) DO UPDATE SET
             id = excluded.id,
             filename = excluded.filename,
             sha256 = excluded.sha256,
             stored_path = excluded.stored_path,
             uploaded_at = excluded.uploaded_at",
        params![
            doc.id.to_string(),
            doc.case_id.to_string(),
            doc.kind.as_str(),
            doc.filename,
            doc.sha256,
            doc.stored_path,
            doc.uploaded_at,
        ],
    )?;
    Ok(())
}

/// All documents attached to a case.
pub fn list_for_case(conn: &Connection, case_id: Uuid) -> Result<Vec<DocumentRef>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, case_id, kind, filename, sha256, stored_path, uploaded_at
         FROM documents WHERE case_id = ?1 ORDER BY kind",
    )?;
    let rows = stmt.query_map(params![case_id.to_string()], row_to_document)?;
    let mut docs = Vec::new();
    for row in rows {
        docs.push(row?);
    }
    Ok(docs)
}

/// Whether both required document kinds are present.
pub fn has_both_kinds(conn: &Connection, case_id: Uuid) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(DISTINCT kind) FROM documents WHERE case_id = ?1",
        params![case_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count >= 2)
}

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<DocumentRef> {
    let id_str: String = row.get(0)?;
    let case_id_str: String = row.get(1)?;
    let kind_str: String = row.get(2)?;
    Ok(DocumentRef {
        id: Uuid::from_str(&id_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        case_id: Uuid::from_str(&case_id_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?,
        kind: DocumentKind::from_str(&kind_str).map_err(|_| {
            rusqlite::Error::InvalidColumnType(2, "kind".into(), rusqlite::types::Type::Text)
        })?,
        filename: row.get(3)?,
        sha256: row.get(4)?,
        stored_path: row.get(5)?,
        uploaded_at: row.get::<_, DateTime<Utc>>(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::case::insert_case;
    use crate::db::sqlite::open_memory_database;
    use crate::models::{Case, CaseStatus};

    fn insert_test_case(conn: &Connection) -> Uuid {
        let case = Case {
            id: Uuid::new_v4(),
            citizen_contact: "max@example.org".into(),
            status: CaseStatus::Received,
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

    fn doc(case_id: Uuid, kind: DocumentKind, filename: &str) -> DocumentRef {
        DocumentRef {
            id: Uuid::new_v4(),
            case_id,
            kind,
            filename: filename.into(),
            sha256: "abc123".into(),
            stored_path: format!("/tmp/{filename}"),
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn upsert_and_list() {
        let conn = open_memory_database().unwrap();
        let case_id = insert_test_case(&conn);

        upsert_document(
            &conn,
            &doc(case_id, DocumentKind::RegistrationForm, "form.pdf"),
        )
        .unwrap();
        upsert_document(
            &conn,
            &doc(case_id, DocumentKind::LandlordConfirmation, "landlord.pdf"),
        )
        .unwrap();

        let docs = list_for_case(&conn, case_id).unwrap();
        assert_eq!(docs.len(), 2);
        assert!(has_both_kinds(&conn, case_id).unwrap());
    }

    #[test]
    fn reupload_replaces_same_kind() {
        let conn = open_memory_database().unwrap();
        let case_id = insert_test_case(&conn);

        upsert_document(
            &conn,
            &doc(case_id, DocumentKind::RegistrationForm, "form_v1.pdf"),
        )
        .unwrap();
        upsert_document(
            &conn,
            &doc(case_id, DocumentKind::RegistrationForm, "form_v2.pdf"),
        )
        .unwrap();

        let docs = list_for_case(&conn, case_id).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].filename, "form_v2.pdf");
    }

    #[test]
    fn one_kind_is_not_both() {
        let conn = open_memory_database().unwrap();
        let case_id = insert_test_case(&conn);
        upsert_document(
            &conn,
            &doc(case_id, DocumentKind::RegistrationForm, "form.pdf"),
        )
        .unwrap();
        assert!(!has_both_kinds(&conn, case_id).unwrap());
    }
}
