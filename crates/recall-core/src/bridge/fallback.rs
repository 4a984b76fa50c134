//! Fallback synthesis for degraded bridge calls.

use serde::{Deserialize, Serialize};
use serde_json::json;
use strum::Display;

use super::operation::Component;
use super::transport::TransportError;
use crate::error::RecallError;

/// Why a bridge call produced a fallback instead of a real answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FallbackReason {
    NotConfigured,
    CircuitOpen,
    Timeout,
    ProcessFailed,
    MalformedResponse,
    RemoteError,
    Transport,
    Cancelled,
}

impl FallbackReason {
    pub(crate) fn from_transport(err: &TransportError) -> Self {
        match err {
            TransportError::Spawn(_) | TransportError::Exit { .. } => Self::ProcessFailed,
            TransportError::Malformed(_) => Self::MalformedResponse,
            TransportError::Remote(_) => Self::RemoteError,
            TransportError::Http(_) => Self::Transport,
        }
    }
}

/// Deterministic fallback payload: same inputs, same document.
pub fn fallback_payload(component: Component, method: &str, reason: FallbackReason) -> serde_json::Value {
    json!({
        "fallback": true,
        "reason": reason.to_string(),
        "component": component.to_string(),
        "method": method,
        "results": [],
    })
}

/// Error equivalent of a fallback, for callers that want to log or surface it.
pub fn fallback_error(component: Component, method: &str, reason: FallbackReason, timeout_ms: u64) -> RecallError {
    match reason {
        FallbackReason::Timeout => RecallError::BridgeTimeout {
            component: component.to_string(),
            method: method.to_string(),
            timeout_ms,
        },
        other => RecallError::bridge_unavailable(component.to_string(), other.to_string()),
    }
}
