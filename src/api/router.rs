//! API router.
//!
//! Returns a composable `Router` with all routes nested under `/api/`.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::events;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Scans can be multi-megabyte; the axum default of 2 MiB is too low.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn api_router(ctx: ApiContext) -> Router {
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route(
            "/cases",
            post(endpoints::cases::submit).get(endpoints::cases::list),
        )
        .route("/cases/:id", get(endpoints::cases::detail))
        .route("/cases/:id/documents", post(endpoints::cases::attach))
        .route("/cases/:id/advance", post(endpoints::cases::advance))
        .route("/cases/:id/analysis", get(endpoints::cases::analysis))
        .route("/cases/:id/audit", get(endpoints::cases::audit))
        .route("/cases/:id/resolution", post(endpoints::review::resolve))
        .route("/events", get(events::stream))
        .with_state(ctx.clone());

    Router::new()
        .nest("/api", routes)
        .layer(axum::middleware::from_fn_with_state(
            ctx,
            middleware::log_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
