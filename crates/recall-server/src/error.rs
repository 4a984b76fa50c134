//! Error handling for the REST API server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

use recall_core::error::RecallError;

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INT_001", message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.status, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<RecallError> for ApiError {
    fn from(err: RecallError) -> Self {
        let status = match &err {
            RecallError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            RecallError::Configuration(_) | RecallError::UnsupportedOperation { .. } => StatusCode::BAD_REQUEST,
            RecallError::ConfigMissing(_) => StatusCode::NOT_FOUND,
            RecallError::BridgeTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            RecallError::BridgeUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            RecallError::StrategyFailure { .. } | RecallError::AggregateFailure { .. } => StatusCode::BAD_GATEWAY,
            RecallError::Storage { .. }
            | RecallError::Io(_)
            | RecallError::Serialization(_)
            | RecallError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let api = ApiError::new(status, err.code().as_str(), err.to_string());
        match err.suggestion() {
            Some(suggestion) => api.with_details(serde_json::json!({ "suggestion": suggestion })),
            None => api,
        }
    }
}

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
