//! Admin API handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::monitor::{CoreStatusSnapshot, MonitorState};
use crate::stats::StatsSummary;

use super::AdminState;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub core: String,
    pub uptime_seconds: u64,
}

/// GET /healthz
pub async fn health_handler(State(state): State<Arc<AdminState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        core: state.monitor.core().to_string(),
        uptime_seconds: state.uptime().as_secs(),
    })
}

/// Status response.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub core: String,
    pub state: MonitorState,
    pub last_status_check: u64,
    pub last_status_check_at: Option<String>,
    pub snapshot: Option<CoreStatusSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

/// GET /status - last persisted snapshot and monitor state
pub async fn status_handler(State(state): State<Arc<AdminState>>) -> impl IntoResponse {
    match state.monitor.check_state() {
        Ok(check) => {
            let last_status_check_at = i64::try_from(check.last_status_check)
                .ok()
                .filter(|secs| *secs > 0)
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
                .map(|at| at.to_rfc3339());
            Json(StatusResponse {
                core: state.monitor.core().to_string(),
                state: state.monitor.state(),
                last_status_check: check.last_status_check,
                last_status_check_at,
                snapshot: check.snapshot,
            })
            .into_response()
        }
        Err(e) => {
            warn!(error = %e, "failed to read check state");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

/// Reload response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub success: bool,
    pub core: String,
    pub attempts: usize,
    pub errors: Vec<String>,
    pub elapsed_ms: u64,
    pub reload_count: u64,
}

/// POST /reload - 200 when the core reloaded and verified, 502 otherwise
pub async fn reload_handler(State(state): State<Arc<AdminState>>) -> impl IntoResponse {
    let core = state.monitor.core().clone();
    info!(core = %core, "core reload requested via admin API");

    let report = state
        .reloader
        .reload_core_with_report(&core, &Default::default())
        .await;
    let reload_count = state.inc_reload_count();

    let response = ReloadResponse {
        success: report.success(),
        core: core.to_string(),
        attempts: report.attempts.len(),
        errors: report.attempts.iter().filter_map(|a| a.error()).collect(),
        elapsed_ms: report.elapsed.as_millis() as u64,
        reload_count,
    };

    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    (status, Json(response))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckParams {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResponse {
    pub state: MonitorState,
}

/// POST /check?force=true|false
pub async fn check_handler(
    State(state): State<Arc<AdminState>>,
    Query(params): Query<CheckParams>,
) -> impl IntoResponse {
    let outcome = state.monitor.check_core_status(params.force).await;
    Json(CheckResponse { state: outcome })
}

/// GET /stats - index and update handler summary
pub async fn stats_handler(State(state): State<Arc<AdminState>>) -> impl IntoResponse {
    let summary = StatsSummary::collect(state.client.as_ref(), state.notifier.as_ref()).await;
    Json(summary)
}

/// GET /messages - drain queued user-facing messages
pub async fn messages_handler(State(state): State<Arc<AdminState>>) -> impl IntoResponse {
    Json(state.messages.drain())
}

/// GET /metrics (Prometheus format)
pub async fn metrics_handler(State(state): State<Arc<AdminState>>) -> impl IntoResponse {
    let content_type = [("content-type", "text/plain; charset=utf-8")];
    let Some(metrics) = state.metrics.as_ref() else {
        return (
            StatusCode::NOT_FOUND,
            content_type,
            "metrics disabled".to_string(),
        );
    };

    match metrics.render() {
        Ok(output) => (StatusCode::OK, content_type, output),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            content_type,
            format!("Error encoding metrics: {e}"),
        ),
    }
}
