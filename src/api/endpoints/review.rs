//! Caseworker review resolution endpoint.

use axum::extract::{Path, State};
use axum::Form;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StatusResponse};
use crate::hitl;

#[derive(Deserialize)]
pub struct ResolutionForm {
    pub corrected_address: String,
    pub reviewer_id: String,
}

/// `POST /api/cases/:id/resolution` — close a parked case with the
/// reviewer's corrected address.
pub async fn resolve(
    State(ctx): State<ApiContext>,
    Path(case_id): Path<Uuid>,
    Form(form): Form<ResolutionForm>,
) -> Result<Json<StatusResponse>, ApiError> {
    let case = hitl::resolve(
        &ctx.orchestrator,
        case_id,
        &form.corrected_address,
        &form.reviewer_id,
    )
    .await?;
    Ok(Json(StatusResponse::from(&case)))
}
