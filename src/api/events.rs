//! Live telemetry stream over Server-Sent Events.
//!
//! Each subscriber gets its own hub subscription: the recent backlog
//! is replayed first, then live events follow. A client that stops
//! reading has events dropped by the hub, never queued unbounded.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream};

use crate::api::types::ApiContext;

/// `GET /api/events` — telemetry event stream.
pub async fn stream(
    State(ctx): State<ApiContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut subscription = ctx.core.telemetry.subscribe();

    let stream = stream::poll_fn(move |cx| {
        subscription.poll_recv(cx).map(|maybe_event| {
            maybe_event.map(|event| {
                let data = serde_json::to_string(&event).unwrap_or_default();
                Ok(Event::default().event("telemetry").data(data))
            })
        })
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
