//! Strategy result envelope types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Identifies a retrieval/enrichment strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StrategyKind {
    MemoryLookup,
    HybridSearch,
    Reranking,
    AgenticExtraction,
    EclPipeline,
    PreferenceLookup,
}

/// Uniform envelope returned by every strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyOutput {
    /// Whether the strategy produced a usable answer.
    pub success: bool,
    /// Strategy payload. List-shaped payloads use an `items` array.
    pub data: serde_json::Value,
    /// Strategy's own confidence in its payload (0.0-1.0).
    pub confidence: f32,
    /// Whether any part of the payload came from a degraded path.
    #[serde(default)]
    pub fallback: bool,
    /// Extra diagnostic fields.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl StrategyOutput {
    /// Successful output.
    pub fn success(data: serde_json::Value, confidence: f32) -> Self {
        Self {
            success: true,
            data,
            confidence: super::memory_entry::clamp_unit(confidence),
            fallback: false,
            metadata: HashMap::new(),
        }
    }

    /// Unsuccessful output with an explanation.
    pub fn failure(message: impl Into<String>) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("error".to_string(), serde_json::Value::String(message.into()));
        Self {
            success: false,
            data: serde_json::Value::Null,
            confidence: 0.0,
            fallback: true,
            metadata,
        }
    }

    /// Mark the output as (partially) degraded.
    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    /// Add a metadata value.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Items of a list-shaped payload; empty for other shapes.
    pub fn items(&self) -> &[serde_json::Value] {
        self.data
            .get("items")
            .and_then(|v| v.as_array())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

/// Outcome of one strategy execution inside a coordination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyResult {
    pub strategy: StrategyKind,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<StrategyOutput>,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StrategyResult {
    /// Whether the strategy answered through a degraded path.
    pub fn used_fallback(&self) -> bool {
        !self.success || self.output.as_ref().map(|o| o.fallback).unwrap_or(true)
    }
}
