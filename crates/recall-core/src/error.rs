//! Error types for recall operations.
//!
//! Every public operation returns a structured result; these errors are
//! reserved for caller mistakes (bad input, bad configuration, unsupported
//! bridge operations) and for the internal plumbing between components.
//! Expected runtime degradation (timeouts, open breakers, failing
//! strategies) is expressed as fallback-tagged results instead.

use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for recall operations.
pub type RecallResult<T> = Result<T, RecallError>;

/// Main error type for all recall operations.
#[derive(Error, Debug)]
pub enum RecallError {
    /// Input validation failed (empty or malformed query / candidate).
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
        suggestion: Option<String>,
    },

    /// A bridge call exceeded its time budget.
    #[error("Bridge timeout: {component}.{method} after {timeout_ms}ms")]
    BridgeTimeout {
        component: String,
        method: String,
        timeout_ms: u64,
    },

    /// The circuit breaker for a component is open, or the component is not configured.
    #[error("Bridge unavailable: {component} ({message})")]
    BridgeUnavailable { component: String, message: String },

    /// The requested operation is not served by the component.
    #[error("Unsupported operation: {component} does not serve '{method}'")]
    UnsupportedOperation { component: String, method: String },

    /// A single strategy failed.
    #[error("Strategy '{strategy}' failed: {message}")]
    StrategyFailure { strategy: String, message: String },

    /// Every selected strategy failed.
    #[error("All {attempted} selected strategies failed")]
    AggregateFailure { attempted: usize },

    /// No baseline is configured for a metric.
    #[error("No baseline configured for metric '{0}'")]
    ConfigMissing(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Memory store operation failed.
    #[error("Storage error: {message}")]
    Storage { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValInvalidInput,
    ValEmptyQuery,
    ValEmptyContent,

    // Bridge (BRG_xxx)
    BrgTimeout,
    BrgUnavailable,
    BrgUnsupported,

    // Strategy (STR_xxx)
    StrFailed,
    StrAllFailed,

    // Configuration (CFG_xxx)
    CfgInvalid,
    CfgMissingBaseline,

    // Storage (STO_xxx)
    StoReadFailed,
    StoWriteFailed,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValEmptyQuery => "VAL_002",
            ErrorCode::ValEmptyContent => "VAL_003",
            ErrorCode::BrgTimeout => "BRG_001",
            ErrorCode::BrgUnavailable => "BRG_002",
            ErrorCode::BrgUnsupported => "BRG_003",
            ErrorCode::StrFailed => "STR_001",
            ErrorCode::StrAllFailed => "STR_002",
            ErrorCode::CfgInvalid => "CFG_001",
            ErrorCode::CfgMissingBaseline => "CFG_002",
            ErrorCode::StoReadFailed => "STO_001",
            ErrorCode::StoWriteFailed => "STO_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl RecallError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// Create a validation error for an empty query.
    pub fn empty_query() -> Self {
        Self::Validation {
            message: "query must not be empty".to_string(),
            code: ErrorCode::ValEmptyQuery,
            details: HashMap::new(),
            suggestion: Some("Provide a non-blank query string".to_string()),
        }
    }

    /// Create a strategy failure.
    pub fn strategy(strategy: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StrategyFailure {
            strategy: strategy.into(),
            message: message.into(),
        }
    }

    /// Create a bridge-unavailable error.
    pub fn bridge_unavailable(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BridgeUnavailable {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported-operation error.
    pub fn unsupported(component: impl Into<String>, method: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            component: component.into(),
            method: method.into(),
        }
    }

    /// Create a storage read error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            code: ErrorCode::StoReadFailed,
        }
    }

    /// Create a storage write error.
    pub fn storage_write(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            code: ErrorCode::StoWriteFailed,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::Storage { code, .. } => *code,
            Self::BridgeTimeout { .. } => ErrorCode::BrgTimeout,
            Self::BridgeUnavailable { .. } => ErrorCode::BrgUnavailable,
            Self::UnsupportedOperation { .. } => ErrorCode::BrgUnsupported,
            Self::StrategyFailure { .. } => ErrorCode::StrFailed,
            Self::AggregateFailure { .. } => ErrorCode::StrAllFailed,
            Self::ConfigMissing(_) => ErrorCode::CfgMissingBaseline,
            Self::Configuration(_) => ErrorCode::CfgInvalid,
            _ => ErrorCode::Internal,
        }
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::BridgeTimeout { .. } => Some("Increase bridge.timeout_ms or check the external component"),
            Self::BridgeUnavailable { .. } => Some("Check the component endpoint; the breaker closes after its cooldown"),
            Self::UnsupportedOperation { .. } => Some("Declare the method in the component's endpoint configuration"),
            Self::Configuration(_) => Some("Check the configuration file or key/value overrides"),
            _ => None,
        }
    }

    /// Whether this error is expected runtime degradation rather than a caller mistake.
    pub fn is_degradation(&self) -> bool {
        matches!(
            self,
            Self::BridgeTimeout { .. }
                | Self::BridgeUnavailable { .. }
                | Self::StrategyFailure { .. }
                | Self::AggregateFailure { .. }
        )
    }
}
