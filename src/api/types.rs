//! Shared types for the API layer: request context and response DTOs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::core_state::CoreState;
use crate::models::{Case, CaseStatus, DocumentKind, DocumentRef, ExtractedFields};
use crate::orchestrator::CaseOrchestrator;

/// Shared context for all routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub orchestrator: Arc<CaseOrchestrator>,
}

impl ApiContext {
    pub fn new(orchestrator: Arc<CaseOrchestrator>) -> Self {
        Self {
            core: Arc::clone(orchestrator.core()),
            orchestrator,
        }
    }
}

/// One row in a bucket listing.
#[derive(Debug, Serialize)]
pub struct CaseSummary {
    pub id: Uuid,
    pub status: CaseStatus,
    pub citizen_contact: String,
    pub submitted_at: DateTime<Utc>,
    pub confidence: Option<f64>,
    pub issue_count: usize,
    pub documents: Vec<DocumentSummary>,
}

impl CaseSummary {
    pub fn from_case(case: &Case, documents: &[DocumentRef]) -> Self {
        Self {
            id: case.id,
            status: case.status,
            citizen_contact: case.citizen_contact.clone(),
            submitted_at: case.submitted_at,
            confidence: case.confidence,
            issue_count: case.review_issues.len(),
            documents: documents.iter().map(DocumentSummary::from).collect(),
        }
    }
}

/// A staged document as exposed to clients. Storage paths stay internal.
#[derive(Debug, Serialize)]
pub struct DocumentSummary {
    pub kind: DocumentKind,
    pub filename: String,
    pub sha256: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<&DocumentRef> for DocumentSummary {
    fn from(doc: &DocumentRef) -> Self {
        Self {
            kind: doc.kind,
            filename: doc.filename.clone(),
            sha256: doc.sha256.clone(),
            uploaded_at: doc.uploaded_at,
        }
    }
}

/// Full case view.
#[derive(Debug, Serialize)]
pub struct CaseDetailResponse {
    pub id: Uuid,
    pub status: CaseStatus,
    pub citizen_contact: String,
    pub submitted_at: DateTime<Utc>,
    pub confidence: Option<f64>,
    pub review_issues: Vec<String>,
    pub extracted_fields: Option<ExtractedFields>,
    pub last_error: Option<String>,
    pub documents: Vec<DocumentSummary>,
}

impl CaseDetailResponse {
    pub fn from_case(case: Case, documents: &[DocumentRef]) -> Self {
        Self {
            id: case.id,
            status: case.status,
            citizen_contact: case.citizen_contact,
            submitted_at: case.submitted_at,
            confidence: case.confidence,
            review_issues: case.review_issues,
            extracted_fields: case.extracted_fields,
            last_error: case.last_error,
            documents: documents.iter().map(DocumentSummary::from).collect(),
        }
    }
}

/// Minimal acknowledgement after a transition.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub case_id: Uuid,
    pub status: CaseStatus,
}

impl From<&Case> for StatusResponse {
    fn from(case: &Case) -> Self {
        Self {
            case_id: case.id,
            status: case.status,
        }
    }
}
