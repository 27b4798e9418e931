//! Request logging middleware.
//!
//! Every request is traced and mirrored to telemetry so operators
//! watching the event stream see API activity alongside orchestrator
//! transitions. The stream endpoint itself is excluded to avoid a
//! feedback loop.

use std::time::Instant;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::ApiContext;
use crate::telemetry::Severity;

pub async fn log_requests(
    State(ctx): State<ApiContext>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    tracing::info!(
        %method,
        %path,
        status = status.as_u16(),
        elapsed_ms = %start.elapsed().as_millis(),
        "request handled"
    );

    if path != "/api/events" {
        let severity = if status.is_server_error() {
            Severity::Error
        } else if status.is_client_error() {
            Severity::Warn
        } else {
            Severity::Info
        };
        ctx.core
            .telemetry
            .publish("api", severity, format!("{method} {path} -> {status}"));
    }

    response
}
