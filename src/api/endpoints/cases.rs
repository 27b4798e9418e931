//! Case intake and query endpoints.

use std::str::FromStr;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CaseDetailResponse, CaseSummary, StatusResponse};
use crate::db::repository::audit::AuditEntry;
use crate::documents::StagedUpload;
use crate::models::DocumentKind;
use crate::query::{self, Bucket, CaseAnalysis};

/// Pull the citizen contact and document uploads out of a multipart
/// form. File parts are named by document kind; `email` carries the
/// contact address.
async fn read_submission(
    multipart: &mut Multipart,
) -> Result<(Option<String>, Vec<StagedUpload>), ApiError> {
    let mut contact = None;
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "email" {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::BadRequest(format!("unreadable email field: {e}")))?;
            contact = Some(text);
        } else if let Ok(kind) = DocumentKind::from_str(&name) {
            let filename = field
                .file_name()
                .map(str::to_string)
                .ok_or_else(|| ApiError::BadRequest(format!("field {name} needs a filename")))?;
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("unreadable upload {name}: {e}")))?;
            uploads.push(StagedUpload {
                kind,
                filename,
                bytes: bytes.to_vec(),
            });
        } else {
            return Err(ApiError::BadRequest(format!("unexpected field: {name}")));
        }
    }

    Ok((contact, uploads))
}

/// `POST /api/cases` — citizen submission (multipart).
pub async fn submit(
    State(ctx): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<CaseDetailResponse>), ApiError> {
    let (contact, uploads) = read_submission(&mut multipart).await?;
    let contact = contact.ok_or_else(|| ApiError::BadRequest("email field is required".into()))?;

    let case = ctx.orchestrator.submit(&contact, uploads)?;
    let (case, docs) = query::case_detail(&ctx.core, case.id)?;
    Ok((
        StatusCode::CREATED,
        Json(CaseDetailResponse::from_case(case, &docs)),
    ))
}

/// `POST /api/cases/:id/documents` — attach or replace a document.
pub async fn attach(
    State(ctx): State<ApiContext>,
    Path(case_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<StatusResponse>, ApiError> {
    let (_, mut uploads) = read_submission(&mut multipart).await?;
    if uploads.len() != 1 {
        return Err(ApiError::BadRequest(
            "exactly one document field is expected".into(),
        ));
    }
    let upload = uploads.remove(0);

    let case = ctx.orchestrator.attach_document(case_id, upload).await?;
    Ok(Json(StatusResponse::from(&case)))
}

#[derive(Deserialize)]
pub struct ListParams {
    bucket: Option<String>,
}

/// `GET /api/cases?bucket=pending|review|completed` — bucket listing.
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<CaseSummary>>, ApiError> {
    let raw = params
        .bucket
        .ok_or_else(|| ApiError::BadRequest("bucket query parameter is required".into()))?;
    let bucket = Bucket::parse(&raw).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "unknown bucket \"{raw}\" (expected pending, review or completed)"
        ))
    })?;

    let cases = query::list_bucket_detailed(&ctx.core, bucket)?;
    Ok(Json(
        cases
            .iter()
            .map(|(case, docs)| CaseSummary::from_case(case, docs))
            .collect(),
    ))
}

/// `GET /api/cases/:id` — full case view with documents.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(case_id): Path<Uuid>,
) -> Result<Json<CaseDetailResponse>, ApiError> {
    let (case, docs) = query::case_detail(&ctx.core, case_id)?;
    Ok(Json(CaseDetailResponse::from_case(case, &docs)))
}

/// `GET /api/cases/:id/analysis` — extraction outcome and review issues.
pub async fn analysis(
    State(ctx): State<ApiContext>,
    Path(case_id): Path<Uuid>,
) -> Result<Json<CaseAnalysis>, ApiError> {
    Ok(Json(query::case_analysis(&ctx.core, case_id)?))
}

/// `GET /api/cases/:id/audit` — full audit trail, oldest first.
pub async fn audit(
    State(ctx): State<ApiContext>,
    Path(case_id): Path<Uuid>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    Ok(Json(query::audit_trail(&ctx.core, case_id)?))
}

/// `POST /api/cases/:id/advance` — take a queued case through the gate.
pub async fn advance(
    State(ctx): State<ApiContext>,
    Path(case_id): Path<Uuid>,
) -> Result<Json<StatusResponse>, ApiError> {
    let case = ctx.orchestrator.advance(case_id).await?;
    Ok(Json(StatusResponse::from(&case)))
}
