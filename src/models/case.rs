use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{CaseStatus, DocumentKind};
use super::fields::ExtractedFields;

/// A registration case: the central entity owned by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub id: Uuid,
    /// Citizen email. Immutable after submission.
    pub citizen_contact: String,
    pub status: CaseStatus,
    pub submitted_at: DateTime<Utc>,
    /// Bumped on every document (re-)upload. An extraction started against
    /// an older generation is stale and its result is discarded.
    pub doc_generation: i64,
    pub confidence: Option<f64>,
    /// Issues flagged by the gate for the human reviewer.
    pub review_issues: Vec<String>,
    pub extracted_fields: Option<ExtractedFields>,
    /// Set only when `status == Error`.
    pub last_error: Option<String>,
}

/// Opaque reference to a staged uploaded document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: Uuid,
    pub case_id: Uuid,
    pub kind: DocumentKind,
    pub filename: String,
    pub sha256: String,
    pub stored_path: String,
    pub uploaded_at: DateTime<Utc>,
}
