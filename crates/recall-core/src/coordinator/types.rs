//! Coordinator configuration and result types.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Complexity, QueryType, RoutingDecision, StrategyKind};

/// Coordinator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Bound on the whole `coordinate` call.
    pub global_timeout_ms: u64,
    /// Default per-strategy bound (capped by the global timeout).
    pub strategy_timeout_ms: u64,
    /// Per-strategy overrides keyed by strategy name.
    pub strategy_timeouts_ms: HashMap<String, u64>,
    /// Maximum strategies per query.
    pub max_strategies: usize,
    pub cache_enabled: bool,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
    /// Routing decisions retained for analytics.
    pub decision_log_size: usize,
    /// Items returned after aggregation.
    pub max_items: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            global_timeout_ms: 10_000,
            strategy_timeout_ms: 5_000,
            strategy_timeouts_ms: HashMap::new(),
            max_strategies: 5,
            cache_enabled: true,
            cache_ttl_secs: 300,
            cache_max_entries: 1_000,
            decision_log_size: 1_000,
            max_items: 20,
        }
    }
}

impl CoordinatorConfig {
    /// Effective timeout for a strategy: its own bound, never above the global one.
    pub fn strategy_timeout_ms(&self, kind: StrategyKind) -> u64 {
        self.strategy_timeouts_ms
            .get(&kind.to_string())
            .copied()
            .unwrap_or(self.strategy_timeout_ms)
            .min(self.global_timeout_ms)
    }
}

/// Aggregated strategy payloads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResults {
    pub confidence_score: f32,
    pub result_count: usize,
    pub successful_strategies: Vec<StrategyKind>,
    pub failed_strategies: Vec<StrategyKind>,
    /// Deduplicated items, each tagged with the strategy that produced it.
    pub items: Vec<serde_json::Value>,
    /// Non-list payloads keyed by strategy name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub payloads: BTreeMap<String, serde_json::Value>,
}

/// Diagnostics attached to every coordination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationMetadata {
    pub request_id: String,
    pub latency_ms: u64,
    pub cache_hit: bool,
    pub query_type: QueryType,
    pub complexity: Complexity,
    /// Errors per failed strategy.
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of `Coordinator::coordinate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationResult {
    pub success: bool,
    pub results: AggregatedResults,
    pub strategies_used: Vec<StrategyKind>,
    pub routing_decision: RoutingDecision,
    pub fallback_activated: bool,
    pub metadata: CoordinationMetadata,
}

/// Counters derived from the decision log and strategy invocations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingAnalytics {
    pub total_decisions: usize,
    pub by_query_type: BTreeMap<String, u64>,
    pub by_complexity: BTreeMap<String, u64>,
    /// How often each strategy was selected.
    pub strategy_selection: BTreeMap<String, u64>,
    /// How often each strategy actually ran (cache hits excluded).
    pub strategy_invocations: BTreeMap<String, u64>,
    pub average_strategies_per_query: f64,
}
