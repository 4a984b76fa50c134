//! Monitoring endpoints.

use axum::{extract::State, Json};
use serde::Deserialize;

use recall_core::monitor::{Dashboard, MonitorStatus};
use recall_core::types::PerformanceMetric;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Request body for recording a metric.
#[derive(Debug, Deserialize)]
pub struct RecordMetricRequest {
    pub name: String,
    pub value: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default = "default_component")]
    pub component: String,
}

fn default_component() -> String {
    "external".to_string()
}

/// Record one metric value.
/// POST /monitor/metrics
pub async fn record_metric(
    State(state): State<AppState>,
    Json(request): Json<RecordMetricRequest>,
) -> ApiResult<Json<PerformanceMetric>> {
    if request.name.trim().is_empty() {
        return Err(ApiError::bad_request("metric name must not be empty"));
    }
    if !request.value.is_finite() {
        return Err(ApiError::bad_request("metric value must be finite"));
    }
    let metric = state
        .monitor()
        .record_metric(&request.name, request.value, &request.unit, &request.component);
    Ok(Json(metric))
}

/// Monitor status.
/// GET /monitor/status
pub async fn monitor_status(State(state): State<AppState>) -> ApiResult<Json<MonitorStatus>> {
    Ok(Json(state.monitor().get_status()))
}

/// Current dashboard snapshot.
/// GET /monitor/dashboard
pub async fn monitor_dashboard(State(state): State<AppState>) -> ApiResult<Json<Dashboard>> {
    Ok(Json(state.monitor().dashboard()))
}
