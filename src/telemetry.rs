//! Telemetry broadcaster: best-effort fan-out of live execution events.
//!
//! The hub keeps a bounded backlog of recent events (replayed to late
//! subscribers on connect) and one bounded queue per subscriber. A slow
//! or dead subscriber gets events dropped (drop-new, via `try_send`)
//! instead of exerting backpressure on publishers. The audit ledger is
//! the authoritative record; losing a telemetry event is acceptable.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::{TELEMETRY_BACKLOG, TELEMETRY_QUEUE_DEPTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// A single ephemeral telemetry event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub timestamp: DateTime<Utc>,
    /// Component that emitted the event ("orchestrator", "gate", ...).
    pub source: String,
    pub severity: Severity,
    pub message: String,
}

struct HubInner {
    next_id: u64,
    backlog: VecDeque<TelemetryEvent>,
    backlog_cap: usize,
    queue_depth: usize,
    subscribers: HashMap<u64, mpsc::Sender<TelemetryEvent>>,
}

/// Fan-out hub. Cloning shares the same underlying hub.
#[derive(Clone)]
pub struct TelemetryHub {
    inner: Arc<Mutex<HubInner>>,
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new(TELEMETRY_BACKLOG, TELEMETRY_QUEUE_DEPTH)
    }
}

impl TelemetryHub {
    pub fn new(backlog_cap: usize, queue_depth: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HubInner {
                next_id: 0,
                backlog: VecDeque::with_capacity(backlog_cap),
                backlog_cap,
                queue_depth,
                subscribers: HashMap::new(),
            })),
        }
    }

    /// Publish an event to all subscribers. Never blocks.
    ///
    /// Full queues drop the event for that subscriber only; closed
    /// queues are pruned. Failures stay inside the hub.
    pub fn publish(&self, source: &str, severity: Severity, message: impl Into<String>) {
        let event = TelemetryEvent {
            timestamp: Utc::now(),
            source: source.to_string(),
            severity,
            message: message.into(),
        };

        // Hub state stays usable even if a holder panicked; events and
        // subscriber queues are independent of whatever went wrong.
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        if inner.backlog_cap > 0 {
            if inner.backlog.len() >= inner.backlog_cap {
                inner.backlog.pop_front();
            }
            inner.backlog.push_back(event.clone());
        }

        let mut dead = Vec::new();
        for (id, tx) in &inner.subscribers {
            match tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::debug!(subscriber = id, "telemetry queue full, dropping event");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => dead.push(*id),
            }
        }
        for id in dead {
            inner.subscribers.remove(&id);
        }
    }

    /// Attach a new subscriber. The bounded backlog is replayed into the
    /// fresh queue so a late observer sees recent history first.
    pub fn subscribe(&self) -> TelemetrySubscription {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let capacity = inner.queue_depth + inner.backlog_cap;
        let (tx, rx) = mpsc::channel(capacity);
        for event in &inner.backlog {
            // Capacity covers the whole backlog; a failure here only
            // means the subscriber closed before we finished.
            let _ = tx.try_send(event.clone());
        }
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.insert(id, tx);

        TelemetrySubscription {
            id,
            hub: Arc::clone(&self.inner),
            rx,
        }
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .len()
    }
}

/// One live subscription. Dropping it detaches the subscriber without
/// affecting anyone else.
pub struct TelemetrySubscription {
    id: u64,
    hub: Arc<Mutex<HubInner>>,
    rx: mpsc::Receiver<TelemetryEvent>,
}

impl TelemetrySubscription {
    /// Await the next event. `None` once the subscription is closed.
    pub async fn recv(&mut self) -> Option<TelemetryEvent> {
        self.rx.recv().await
    }

    /// Poll-based access for adapting the subscription into a `Stream`.
    pub fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<TelemetryEvent>> {
        self.rx.poll_recv(cx)
    }

    /// Drain whatever is immediately available (tests, replay checks).
    pub fn drain_ready(&mut self) -> Vec<TelemetryEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

impl Drop for TelemetrySubscription {
    fn drop(&mut self) {
        let mut inner = self.hub.lock().unwrap_or_else(PoisonError::into_inner);
        inner.subscribers.remove(&self.id);
    }
}
