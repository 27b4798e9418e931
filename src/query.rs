//! Read-only query surface over the case store.
//!
//! Cases are grouped into three operator-facing buckets rather than
//! exposed by raw status: pending work, the human review queue, and
//! finished cases (closed or errored).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core_state::CoreState;
use crate::db::repository::{case as case_repo, document as doc_repo};
use crate::db::repository::audit::AuditEntry;
use crate::ledger;
use crate::models::{Case, CaseStatus, DocumentRef, ExtractedFields};
use crate::orchestrator::CaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Pending,
    Review,
    Completed,
}

impl Bucket {
    pub fn parse(s: &str) -> Option<Bucket> {
        match s {
            "pending" => Some(Bucket::Pending),
            "review" => Some(Bucket::Review),
            "completed" => Some(Bucket::Completed),
            _ => None,
        }
    }

    /// The statuses that make up this bucket.
    pub fn statuses(&self) -> &'static [CaseStatus] {
        match self {
            Bucket::Pending => &[
                CaseStatus::Received,
                CaseStatus::Queued,
                CaseStatus::AutoProcessing,
            ],
            Bucket::Review => &[CaseStatus::WaitingForHuman],
            Bucket::Completed => &[CaseStatus::Closed, CaseStatus::Error],
        }
    }
}

/// What a reviewer sees when opening a parked or finished case.
#[derive(Debug, Clone, Serialize)]
pub struct CaseAnalysis {
    pub case_id: Uuid,
    pub status: CaseStatus,
    pub confidence: Option<f64>,
    pub issues: Vec<String>,
    pub fields: Option<ExtractedFields>,
    pub last_error: Option<String>,
}

/// Cases in a bucket, newest submission first.
pub fn list_bucket(core: &CoreState, bucket: Bucket) -> Result<Vec<Case>, CaseError> {
    let conn = core.open_db()?;
    Ok(case_repo::list_by_statuses(&conn, bucket.statuses())?)
}

/// Bucket listing with each case's attached documents.
pub fn list_bucket_detailed(
    core: &CoreState,
    bucket: Bucket,
) -> Result<Vec<(Case, Vec<DocumentRef>)>, CaseError> {
    let conn = core.open_db()?;
    let cases = case_repo::list_by_statuses(&conn, bucket.statuses())?;
    let mut out = Vec::with_capacity(cases.len());
    for case in cases {
        let docs = doc_repo::list_for_case(&conn, case.id)?;
        out.push((case, docs));
    }
    Ok(out)
}

/// A single case with its attached documents.
pub fn case_detail(
    core: &CoreState,
    case_id: Uuid,
) -> Result<(Case, Vec<DocumentRef>), CaseError> {
    let conn = core.open_db()?;
    let case = case_repo::get_case(&conn, case_id)?;
    let docs = doc_repo::list_for_case(&conn, case_id)?;
    Ok((case, docs))
}

/// Extraction outcome for a case: fields, confidence, review issues.
pub fn case_analysis(core: &CoreState, case_id: Uuid) -> Result<CaseAnalysis, CaseError> {
    let conn = core.open_db()?;
    let case = case_repo::get_case(&conn, case_id)?;
    Ok(CaseAnalysis {
        case_id: case.id,
        status: case.status,
        confidence: case.confidence,
        issues: case.review_issues,
        fields: case.extracted_fields,
        last_error: case.last_error,
    })
}

/// Full audit trail for a case, oldest entry first.
pub fn audit_trail(core: &CoreState, case_id: Uuid) -> Result<Vec<AuditEntry>, CaseError> {
    let conn = core.open_db()?;
    // Distinguish "no entries yet" from "no such case".
    case_repo::get_case(&conn, case_id)?;
    Ok(ledger::history(&conn, case_id)?)
}
