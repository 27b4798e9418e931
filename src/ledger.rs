//! Audit ledger facade.
//!
//! Every state-changing step of a case goes through `record`, which
//! appends the durable audit entry and mirrors it to telemetry. The
//! database entry is authoritative; the telemetry copy is best-effort.

use rusqlite::Connection;
use uuid::Uuid;

use crate::db::repository::audit::{self, AuditEntry};
use crate::db::DatabaseError;
use crate::telemetry::{Severity, TelemetryHub};

/// Append an audit entry and mirror it to the telemetry stream.
pub fn record(
    conn: &mut Connection,
    telemetry: &TelemetryHub,
    case_id: Uuid,
    actor: &str,
    severity: Severity,
    message: &str,
) -> Result<i64, DatabaseError> {
    let seq = audit::append_entry(conn, case_id, actor, message)?;
    telemetry.publish(actor, severity, format!("case {case_id}: {message}"));
    Ok(seq)
}

/// Full audit history of a case, oldest first.
pub fn history(conn: &Connection, case_id: Uuid) -> Result<Vec<AuditEntry>, DatabaseError> {
    audit::read_entries(conn, case_id)
}
