//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use recall_core::bridge::BridgeHealth;
use recall_core::monitor::MonitorStatus;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub bridge: BridgeHealth,
    pub monitor: MonitorStatus,
}

/// Health check endpoint.
/// GET /health
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let bridge = state.bridge().health_check();
    let monitor = state.monitor().get_status();

    Ok(Json(HealthResponse {
        status: bridge.status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        bridge,
        monitor,
    }))
}
