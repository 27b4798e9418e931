//! HTTP surface: citizen intake, caseworker review, operator queries
//! and the live telemetry stream.

pub mod endpoints;
pub mod error;
pub mod events;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use server::{start_api_server, ApiServer};
