//! Admission control endpoints.

use axum::{extract::State, Json};
use serde::Deserialize;

use recall_core::crosscheck::{CrosscheckContext, CrosscheckDecision, ExecutionResult, SubmitResult};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Request body for analyze and submit.
#[derive(Debug, Deserialize)]
pub struct CrosscheckRequest {
    pub content: String,
    #[serde(default)]
    pub context: CrosscheckContext,
}

/// Request body for executing a previously returned decision.
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub content: String,
    pub decision: CrosscheckDecision,
    #[serde(default)]
    pub context: CrosscheckContext,
}

fn require_content(content: &str) -> ApiResult<()> {
    if content.trim().is_empty() {
        return Err(ApiError::bad_request("content must not be empty"));
    }
    Ok(())
}

/// Decide whether content should be stored.
/// POST /crosscheck/analyze
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<CrosscheckRequest>,
) -> ApiResult<Json<CrosscheckDecision>> {
    require_content(&request.content)?;
    Ok(Json(state.crosscheck().analyze(&request.content, &request.context).await))
}

/// Apply a decision.
/// POST /crosscheck/execute
pub async fn execute(
    State(state): State<AppState>,
    Json(request): Json<ExecuteRequest>,
) -> ApiResult<Json<ExecutionResult>> {
    require_content(&request.content)?;
    let result = state
        .crosscheck()
        .execute(&request.content, &request.decision, &request.context)
        .await;
    Ok(Json(result))
}

/// Analyze then execute.
/// POST /crosscheck/submit
pub async fn submit(
    State(state): State<AppState>,
    Json(request): Json<CrosscheckRequest>,
) -> ApiResult<Json<SubmitResult>> {
    require_content(&request.content)?;
    Ok(Json(state.crosscheck().submit(&request.content, &request.context).await))
}
