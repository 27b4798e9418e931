//! Meldekern: case lifecycle orchestrator for municipal address-change
//! registration.
//!
//! A citizen submits a registration form and a landlord confirmation;
//! an extraction gate turns the scans into structured fields and
//! decides, by confidence and plausibility, whether the case closes
//! automatically or waits for a caseworker. Every transition lands in
//! a per-case audit ledger and on the live telemetry stream.

pub mod api;
pub mod config;
pub mod core_state;
pub mod db;
pub mod documents;
pub mod gate;
pub mod hitl;
pub mod ledger;
pub mod models;
pub mod orchestrator;
pub mod query;
pub mod telemetry;
