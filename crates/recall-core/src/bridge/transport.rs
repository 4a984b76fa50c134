//! Transports that carry bridge requests to external components.
//!
//! Two endpoint kinds are supported:
//! - `process`: spawn a command per call, JSON request on stdin, JSON
//!   response on stdout. Children are spawned with `kill_on_drop`, so a
//!   dropped call (timeout, cancellation) kills the process.
//! - `http`: POST the JSON request to a URL.

use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::operation::{BridgeRequest, WireResponse};

/// How an endpoint is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EndpointKind {
    Process,
    Http,
}

/// Endpoint configuration for one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentEndpoint {
    pub kind: EndpointKind,
    /// Command (process) or URL (http).
    pub target: String,
    /// Extra command arguments (process only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Methods this endpoint serves; empty means the component's full interface.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
}

impl ComponentEndpoint {
    /// Process endpoint.
    pub fn process(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            kind: EndpointKind::Process,
            target: command.into(),
            args,
            methods: Vec::new(),
        }
    }

    /// HTTP endpoint.
    pub fn http(url: impl Into<String>) -> Self {
        Self {
            kind: EndpointKind::Http,
            target: url.into(),
            args: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Restrict the endpoint to the given methods.
    pub fn with_methods(mut self, methods: Vec<String>) -> Self {
        self.methods = methods;
        self
    }

    /// Parse a flat value: URLs become http endpoints, anything else is a
    /// whitespace-separated command line.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.starts_with("http://") || value.starts_with("https://") {
            return Some(Self::http(value));
        }
        let mut parts = value.split_whitespace();
        let command = parts.next()?;
        Some(Self::process(command, parts.map(String::from).collect()))
    }

    /// Whether this endpoint serves `method` (given the component supports it).
    pub fn serves(&self, method: &str) -> bool {
        self.methods.is_empty() || self.methods.iter().any(|m| m == method)
    }
}

/// Transport-level failure. Every variant counts as a breaker failure.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("failed to spawn component process: {0}")]
    Spawn(String),
    #[error("component process exited with {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },
    #[error("malformed component response: {0}")]
    Malformed(String),
    #[error("component reported error: {0}")]
    Remote(String),
    #[error("http transport error: {0}")]
    Http(String),
}

impl TransportError {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Spawn(_) | Self::Exit { .. } | Self::Http(_))
    }
}

/// Carries one request to one endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn invoke(
        &self,
        endpoint: &ComponentEndpoint,
        request: &BridgeRequest,
    ) -> Result<serde_json::Value, TransportError>;
}

/// Default transport dispatching on the endpoint kind.
#[derive(Clone, Default)]
pub struct EndpointTransport {
    client: reqwest::Client,
}

impl EndpointTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn invoke_process(
        &self,
        endpoint: &ComponentEndpoint,
        request: &BridgeRequest,
    ) -> Result<serde_json::Value, TransportError> {
        let body = serde_json::to_vec(request).map_err(|e| TransportError::Malformed(e.to_string()))?;

        let mut child = Command::new(&endpoint.target)
            .args(&endpoint.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TransportError::Spawn(format!("{}: {}", endpoint.target, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A component that exits without reading stdin is judged by its exit status.
            if let Err(e) = stdin.write_all(&body).await {
                debug!(target_cmd = %endpoint.target, error = %e, "Could not write request to component stdin");
            }
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| TransportError::Spawn(e.to_string()))?;

        if !output.status.success() {
            return Err(TransportError::Exit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_wire(&output.stdout)
    }

    async fn invoke_http(
        &self,
        endpoint: &ComponentEndpoint,
        request: &BridgeRequest,
    ) -> Result<serde_json::Value, TransportError> {
        let response = self
            .client
            .post(&endpoint.target)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Http(format!("HTTP {}: {}", status, body)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;
        parse_wire(&bytes)
    }
}

#[async_trait]
impl Transport for EndpointTransport {
    async fn invoke(
        &self,
        endpoint: &ComponentEndpoint,
        request: &BridgeRequest,
    ) -> Result<serde_json::Value, TransportError> {
        match endpoint.kind {
            EndpointKind::Process => self.invoke_process(endpoint, request).await,
            EndpointKind::Http => self.invoke_http(endpoint, request).await,
        }
    }
}

/// Parse a `{"success", "result" | "error"}` document.
pub fn parse_wire(bytes: &[u8]) -> Result<serde_json::Value, TransportError> {
    let text = std::str::from_utf8(bytes).map_err(|e| TransportError::Malformed(e.to_string()))?;
    let text = text.trim();
    if text.is_empty() {
        return Err(TransportError::Malformed("empty response".to_string()));
    }

    let wire: WireResponse =
        serde_json::from_str(text).map_err(|e| TransportError::Malformed(e.to_string()))?;

    if wire.success {
        Ok(wire.result.unwrap_or(serde_json::Value::Null))
    } else {
        Err(TransportError::Remote(
            wire.error.unwrap_or_else(|| "unspecified error".to_string()),
        ))
    }
}
