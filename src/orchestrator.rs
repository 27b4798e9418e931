//! Case lifecycle orchestration.
//!
//! The orchestrator owns every state transition. Transitions for one
//! case are serialized through a per-case async lock; the lock is
//! released while extraction runs so uploads and queries stay
//! responsive. A document generation counter detects extractions made
//! stale by a concurrent upload: their result is discarded and the
//! case returns to the queue.

use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::core_state::{CoreError, CoreState};
use crate::db::repository::{case as case_repo, document as doc_repo};
use crate::db::DatabaseError;
use crate::documents::{self, StagedUpload};
use crate::gate::{ExtractionError, ExtractionGate, GateDecision};
use crate::ledger;
use crate::models::{Case, CaseStatus, DocumentRef, ExtractedFields};
use crate::telemetry::Severity;

#[derive(Debug, Error)]
pub enum CaseError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("case {0} is already being processed")]
    AlreadyProcessing(Uuid),

    #[error("cannot {action}: case {case_id} is {status}")]
    InvalidState {
        case_id: Uuid,
        status: CaseStatus,
        action: &'static str,
    },

    #[error("case {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("database error: {0}")]
    Database(DatabaseError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DatabaseError> for CaseError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { id, .. } => {
                CaseError::NotFound(Uuid::from_str(&id).unwrap_or(Uuid::nil()))
            }
            other => CaseError::Database(other),
        }
    }
}

impl From<CoreError> for CaseError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::LockPoisoned => CaseError::Internal("lock poisoned".into()),
            CoreError::Database(e) => e.into(),
            CoreError::Io(e) => CaseError::Internal(e.to_string()),
        }
    }
}

/// Removes the in-flight marker when `advance` exits on any path.
struct ProcessingGuard<'a> {
    core: &'a CoreState,
    case_id: Uuid,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.core.end_processing(self.case_id);
    }
}

pub struct CaseOrchestrator {
    core: Arc<CoreState>,
    gate: ExtractionGate,
}

impl CaseOrchestrator {
    pub fn new(core: Arc<CoreState>, gate: ExtractionGate) -> Self {
        Self { core, gate }
    }

    pub fn core(&self) -> &Arc<CoreState> {
        &self.core
    }

    /// Register a new case from a citizen submission.
    ///
    /// At least one well-formed document is required. With both kinds
    /// present the case is queued immediately; with one it stays in
    /// RECEIVED until the second arrives via `attach_document`.
    pub fn submit(
        &self,
        citizen_contact: &str,
        uploads: Vec<StagedUpload>,
    ) -> Result<Case, CaseError> {
        let contact = citizen_contact.trim();
        if contact.is_empty() {
            return Err(CaseError::Validation("citizen contact is required".into()));
        }
        if uploads.is_empty() {
            return Err(CaseError::Validation(
                "at least one document is required".into(),
            ));
        }
        for upload in &uploads {
            if upload.bytes.is_empty() {
                return Err(CaseError::Validation(format!(
                    "document \"{}\" is empty",
                    upload.filename
                )));
            }
            if !documents::accepted_format(&upload.filename) {
                return Err(CaseError::Validation(format!(
                    "unsupported document format: \"{}\"",
                    upload.filename
                )));
            }
        }

        let case = Case {
            id: Uuid::new_v4(),
            citizen_contact: contact.to_string(),
            status: CaseStatus::Received,
            submitted_at: chrono::Utc::now(),
            doc_generation: 0,
            confidence: None,
            review_issues: Vec::new(),
            extracted_fields: None,
            last_error: None,
        };

        // Stage files before any database write: a failed submission
        // must not leave a half-created case behind.
        let mut staged = Vec::with_capacity(uploads.len());
        for upload in &uploads {
            match documents::stage_upload(self.core.documents_dir(), case.id, upload) {
                Ok(doc) => staged.push(doc),
                Err(e) => {
                    self.discard_staging(case.id);
                    return Err(CaseError::Internal(e.to_string()));
                }
            }
        }

        let mut conn = self.core.open_db()?;
        if let Err(err) = self.persist_submission(&mut conn, &case, &staged) {
            let _ = case_repo::delete_case(&conn, case.id);
            self.discard_staging(case.id);
            return Err(err);
        }

        case_repo::get_case(&conn, case.id).map_err(CaseError::from)
    }

    fn persist_submission(
        &self,
        conn: &mut rusqlite::Connection,
        case: &Case,
        staged: &[DocumentRef],
    ) -> Result<(), CaseError> {
        case_repo::insert_case(conn, case)?;
        ledger::record(
            conn,
            &self.core.telemetry,
            case.id,
            "citizen",
            Severity::Info,
            "case submitted",
        )?;

        for doc in staged {
            doc_repo::upsert_document(conn, doc)?;
            ledger::record(
                conn,
                &self.core.telemetry,
                case.id,
                "citizen",
                Severity::Info,
                &format!("document attached: {}", doc.kind),
            )?;
        }

        if doc_repo::has_both_kinds(conn, case.id)? {
            case_repo::update_status(conn, case.id, CaseStatus::Queued)?;
            ledger::record(
                conn,
                &self.core.telemetry,
                case.id,
                "orchestrator",
                Severity::Info,
                "both documents present, queued for processing",
            )?;
        }

        Ok(())
    }

    /// Best-effort removal of a case's staging directory.
    fn discard_staging(&self, case_id: Uuid) {
        let dir = self.core.documents_dir().join(case_id.to_string());
        if let Err(e) = std::fs::remove_dir_all(&dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(case_id = %case_id, error = %e, "failed to remove staged documents");
            }
        }
    }

    /// Attach (or replace) a document on an open case.
    ///
    /// Bumps the document generation so an extraction already running
    /// against the old set is recognized as stale. Not permitted once
    /// a case waits on a human or has reached a terminal state.
    pub async fn attach_document(
        &self,
        case_id: Uuid,
        upload: StagedUpload,
    ) -> Result<Case, CaseError> {
        if upload.bytes.is_empty() {
            return Err(CaseError::Validation(format!(
                "document \"{}\" is empty",
                upload.filename
            )));
        }
        if !documents::accepted_format(&upload.filename) {
            return Err(CaseError::Validation(format!(
                "unsupported document format: \"{}\"",
                upload.filename
            )));
        }

        let lock = self.core.case_lock(case_id)?;
        let _guard = lock.lock().await;

        let mut conn = self.core.open_db()?;
        let case = case_repo::get_case(&conn, case_id)?;
        if case.status.is_terminal() || case.status == CaseStatus::WaitingForHuman {
            return Err(CaseError::InvalidState {
                case_id,
                status: case.status,
                action: "attach document",
            });
        }

        let doc = documents::stage_upload(self.core.documents_dir(), case_id, &upload)
            .map_err(|e| CaseError::Internal(e.to_string()))?;
        doc_repo::upsert_document(&conn, &doc)?;
        let generation = case_repo::bump_generation(&conn, case_id)?;
        ledger::record(
            &mut conn,
            &self.core.telemetry,
            case_id,
            "citizen",
            Severity::Info,
            &format!("document attached: {} (generation {generation})", upload.kind),
        )?;

        if case.status == CaseStatus::Received && doc_repo::has_both_kinds(&conn, case_id)? {
            case_repo::update_status(&conn, case_id, CaseStatus::Queued)?;
            ledger::record(
                &mut conn,
                &self.core.telemetry,
                case_id,
                "orchestrator",
                Severity::Info,
                "both documents present, queued for processing",
            )?;
        }

        case_repo::get_case(&conn, case_id).map_err(CaseError::from)
    }

    /// Take a queued case through the extraction gate.
    ///
    /// The case lock is held only around the transitions, not during
    /// extraction itself. The in-flight marker rejects a second
    /// `advance` for the same case while extraction runs.
    pub async fn advance(&self, case_id: Uuid) -> Result<Case, CaseError> {
        if !self.core.try_begin_processing(case_id)? {
            return Err(CaseError::AlreadyProcessing(case_id));
        }
        let _processing = ProcessingGuard {
            core: &self.core,
            case_id,
        };

        let lock = self.core.case_lock(case_id)?;

        // Phase 1: claim the case.
        let (generation, docs) = {
            let _guard = lock.lock().await;
            let mut conn = self.core.open_db()?;
            let case = case_repo::get_case(&conn, case_id)?;
            if case.status != CaseStatus::Queued {
                return Err(CaseError::InvalidState {
                    case_id,
                    status: case.status,
                    action: "advance",
                });
            }
            case_repo::update_status(&conn, case_id, CaseStatus::AutoProcessing)?;
            ledger::record(
                &mut conn,
                &self.core.telemetry,
                case_id,
                "orchestrator",
                Severity::Info,
                "automatic processing started",
            )?;
            (case.doc_generation, doc_repo::list_for_case(&conn, case_id)?)
        };

        // Phase 2: extraction, without the case lock.
        let outcome = self.gate.run(docs).await;

        // Phase 3: apply the result.
        let _guard = lock.lock().await;
        let mut conn = self.core.open_db()?;

        // Staleness first: a newer document arrived mid-extraction, so
        // whatever the gate produced (result or error) describes the
        // old document set. Discard it and re-queue.
        let current = case_repo::get_case(&conn, case_id)?;
        if current.doc_generation != generation {
            case_repo::update_status(&conn, case_id, CaseStatus::Queued)?;
            ledger::record(
                &mut conn,
                &self.core.telemetry,
                case_id,
                "orchestrator",
                Severity::Warn,
                "stale extraction discarded, case re-queued",
            )?;
            return case_repo::get_case(&conn, case_id).map_err(CaseError::from);
        }

        let decision = match outcome {
            Ok(decision) => decision,
            Err(err) => {
                case_repo::update_error(&conn, case_id, &err.to_string())?;
                ledger::record(
                    &mut conn,
                    &self.core.telemetry,
                    case_id,
                    "orchestrator",
                    Severity::Error,
                    &format!("extraction failed: {err}"),
                )?;
                return Err(err.into());
            }
        };

        self.apply_gate_decision_locked(&mut conn, &current, decision)
    }

    /// Persist a gate decision for a case in AUTO_PROCESSING.
    ///
    /// For callers driving the processing phase themselves (`advance`
    /// applies its own decisions inline). Takes the same in-flight
    /// marker and per-case lock as `advance`, so it cannot interleave
    /// with a running extraction.
    pub async fn apply_gate_decision(
        &self,
        case_id: Uuid,
        decision: GateDecision,
    ) -> Result<Case, CaseError> {
        if !self.core.try_begin_processing(case_id)? {
            return Err(CaseError::AlreadyProcessing(case_id));
        }
        let _processing = ProcessingGuard {
            core: &self.core,
            case_id,
        };

        let lock = self.core.case_lock(case_id)?;
        let _guard = lock.lock().await;

        let mut conn = self.core.open_db()?;
        let case = case_repo::get_case(&conn, case_id)?;
        self.apply_gate_decision_locked(&mut conn, &case, decision)
    }

    fn apply_gate_decision_locked(
        &self,
        conn: &mut rusqlite::Connection,
        case: &Case,
        decision: GateDecision,
    ) -> Result<Case, CaseError> {
        if case.status != CaseStatus::AutoProcessing {
            return Err(CaseError::InvalidState {
                case_id: case.id,
                status: case.status,
                action: "apply gate decision",
            });
        }

        match decision {
            GateDecision::Proceed { extraction } => {
                case_repo::update_outcome(
                    conn,
                    case.id,
                    CaseStatus::Closed,
                    &extraction.fields,
                    Some(extraction.confidence),
                    &[],
                )?;
                ledger::record(
                    conn,
                    &self.core.telemetry,
                    case.id,
                    "orchestrator",
                    Severity::Info,
                    &format!(
                        "case closed automatically (confidence {:.2})",
                        extraction.confidence
                    ),
                )?;
            }
            GateDecision::NeedsReview { extraction, issues } => {
                case_repo::update_outcome(
                    conn,
                    case.id,
                    CaseStatus::WaitingForHuman,
                    &extraction.fields,
                    Some(extraction.confidence),
                    &issues,
                )?;
                ledger::record(
                    conn,
                    &self.core.telemetry,
                    case.id,
                    "orchestrator",
                    Severity::Warn,
                    &format!("routed to human review: {}", issues.join("; ")),
                )?;
            }
        }

        case_repo::get_case(conn, case.id).map_err(CaseError::from)
    }

    /// Close a case under review with a human correction.
    ///
    /// The correction overlays the extracted fields and is treated as
    /// authoritative: the case closes with full confidence and its
    /// review issues cleared.
    pub async fn resume_with_correction(
        &self,
        case_id: Uuid,
        correction: ExtractedFields,
        reviewer_id: &str,
    ) -> Result<Case, CaseError> {
        let reviewer = reviewer_id.trim();
        if reviewer.is_empty() {
            return Err(CaseError::Validation("reviewer id is required".into()));
        }

        let lock = self.core.case_lock(case_id)?;
        let _guard = lock.lock().await;

        let mut conn = self.core.open_db()?;
        let case = case_repo::get_case(&conn, case_id)?;
        if case.status != CaseStatus::WaitingForHuman {
            return Err(CaseError::InvalidState {
                case_id,
                status: case.status,
                action: "resolve review",
            });
        }

        let actor = format!("reviewer:{reviewer}");
        case_repo::update_status(&conn, case_id, CaseStatus::AutoProcessing)?;
        ledger::record(
            &mut conn,
            &self.core.telemetry,
            case_id,
            &actor,
            Severity::Info,
            "review resolved with correction",
        )?;

        let merged = case
            .extracted_fields
            .unwrap_or_default()
            .merged_with(&correction);
        case_repo::update_outcome(&conn, case_id, CaseStatus::Closed, &merged, Some(1.0), &[])?;
        ledger::record(
            &mut conn,
            &self.core.telemetry,
            case_id,
            &actor,
            Severity::Info,
            "case closed after human correction",
        )?;

        case_repo::get_case(&conn, case_id).map_err(CaseError::from)
    }
}
