//! Query context, analysis and routing types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum::{Display, EnumString};
use tokio_util::sync::CancellationToken;

use super::strategy::StrategyKind;

/// Per-call context for `Coordinator::coordinate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryContext {
    /// Who is asking (tool name, hook, session).
    pub source: String,
    /// Optional user scope for preference lookups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Strategies the caller explicitly wants included.
    pub capabilities: Vec<StrategyKind>,
    /// Optional category hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Free-form metadata; part of the cache fingerprint.
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Cancellation for in-flight strategies and bridge calls.
    #[serde(skip)]
    pub cancel: CancellationToken,
}

impl QueryContext {
    /// Create a context for the given source.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    /// Set the user scope.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Request a strategy in addition to the routed ones.
    pub fn with_capability(mut self, kind: StrategyKind) -> Self {
        if !self.capabilities.contains(&kind) {
            self.capabilities.push(kind);
        }
        self
    }

    /// Set the category hint.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Add a metadata value.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Attach a cancellation token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Stable fingerprint of everything except the cancellation token.
    pub fn fingerprint(&self) -> String {
        let mut capabilities: Vec<String> = self.capabilities.iter().map(|c| c.to_string()).collect();
        capabilities.sort();
        capabilities.dedup();

        let mut hasher = Sha256::new();
        hasher.update(self.source.trim().to_lowercase().as_bytes());
        hasher.update(b"|");
        hasher.update(self.user_id.as_deref().unwrap_or("").as_bytes());
        hasher.update(b"|");
        hasher.update(capabilities.join(",").as_bytes());
        hasher.update(b"|");
        hasher.update(self.category.as_deref().unwrap_or("").as_bytes());
        hasher.update(b"|");
        // BTreeMap serializes with sorted keys
        hasher.update(serde_json::to_string(&self.metadata).unwrap_or_default().as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Coarse query classification used for routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QueryType {
    CodeAnalysis,
    SearchQuery,
    ErrorAnalysis,
    MemoryQuery,
    General,
}

/// Query complexity bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

/// Structural flags observed during analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFlags {
    pub has_code: bool,
    pub has_error: bool,
    pub is_question: bool,
    pub mentions_memory: bool,
    pub multi_part: bool,
}

/// Result of lexical/structural query analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub query_type: QueryType,
    pub complexity: Complexity,
    pub flags: QueryFlags,
    /// Whitespace-separated token count.
    pub token_count: usize,
}

/// A routing decision, retained in the coordinator's decision log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub query_analysis: QueryAnalysis,
    /// Selected strategies, in execution-priority order.
    pub selected_strategies: Vec<StrategyKind>,
    pub timestamp: DateTime<Utc>,
}

/// Normalize a query for cache keys: lowercase, collapsed whitespace.
pub fn normalize_query(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_ignores_capability_order() {
        let a = QueryContext::new("cli")
            .with_capability(StrategyKind::Reranking)
            .with_capability(StrategyKind::HybridSearch);
        let b = QueryContext::new("cli")
            .with_capability(StrategyKind::HybridSearch)
            .with_capability(StrategyKind::Reranking);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_changes_with_user() {
        let a = QueryContext::new("cli");
        let b = QueryContext::new("cli").with_user("alice");
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_ignores_cancel_token() {
        let a = QueryContext::new("cli");
        let b = QueryContext::new("cli").with_cancel(CancellationToken::new());
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  Find   THE bug\n"), "find the bug");
    }

    #[test]
    fn test_query_type_strings() {
        assert_eq!(QueryType::CodeAnalysis.to_string(), "code_analysis");
        assert_eq!("memory_query".parse::<QueryType>().unwrap(), QueryType::MemoryQuery);
    }
}
