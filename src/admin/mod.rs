//! Admin HTTP API using Axum.
//!
//! Provides endpoints for:
//! - Liveness (/healthz)
//! - Last check result (/status)
//! - Index statistics (/stats)
//! - Queued operator messages (/messages)
//! - Metrics (/metrics)
//! - Core reload (/reload) and forced checks (/check)

mod handlers;
mod server;

pub use handlers::{CheckResponse, HealthResponse, ReloadResponse, StatusResponse};
pub use server::{router, AdminServer, AdminState};
