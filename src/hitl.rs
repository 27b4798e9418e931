//! Human-in-the-loop review resolution.
//!
//! A caseworker resolving a parked case supplies the corrected new
//! address (the field the gate most often trips on) and their reviewer
//! id. The correction is folded into the extracted fields and the case
//! closed through the orchestrator.

use uuid::Uuid;

use crate::models::{Case, ExtractedFields};
use crate::orchestrator::{CaseError, CaseOrchestrator};

pub async fn resolve(
    orchestrator: &CaseOrchestrator,
    case_id: Uuid,
    corrected_address: &str,
    reviewer_id: &str,
) -> Result<Case, CaseError> {
    let address = corrected_address.trim();
    if address.is_empty() {
        return Err(CaseError::Validation(
            "corrected address is required".into(),
        ));
    }

    let correction = ExtractedFields {
        new_address: Some(address.to_string()),
        ..Default::default()
    };
    orchestrator
        .resume_with_correction(case_id, correction, reviewer_id)
        .await
}
