//! The coordinator: analyze, route, execute, aggregate.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info, warn};

use super::aggregate::aggregate;
use super::analysis::QueryAnalyzer;
use super::cache::{cache_key, ResultCache};
use super::routing::Router;
use super::status::{CoordinatorStatus, StatusBus};
use super::types::{
    AggregatedResults, CoordinationMetadata, CoordinationResult, CoordinatorConfig, RoutingAnalytics,
};
use crate::error::{RecallError, RecallResult};
use crate::traits::{noop_sink, MetricSource, MetricsSink, Strategy};
use crate::types::{MetricSample, QueryContext, RoutingDecision, StrategyKind, StrategyResult};

/// Queries answered before the cache hit rate is reported.
const CACHE_RATE_MIN_QUERIES: u64 = 20;

/// Routes queries to strategies and merges their answers.
///
/// # Example
///
/// ```ignore
/// let coordinator = Coordinator::new(CoordinatorConfig::default())
///     .with_strategy(Arc::new(MemoryLookupStrategy::new(store.clone())))
///     .with_metrics(monitor.clone());
///
/// let result = coordinator.coordinate("how does RRF work?", QueryContext::new("cli")).await?;
/// println!("{} items, confidence {}", result.results.result_count, result.results.confidence_score);
/// ```
pub struct Coordinator {
    config: CoordinatorConfig,
    strategies: HashMap<StrategyKind, Arc<dyn Strategy>>,
    analyzer: QueryAnalyzer,
    router: Router,
    cache: ResultCache,
    status: StatusBus,
    metrics: Arc<dyn MetricsSink>,
    invocations: Mutex<HashMap<StrategyKind, u64>>,
    decisions: Mutex<VecDeque<RoutingDecision>>,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            router: Router::new(config.max_strategies),
            cache: ResultCache::new(
                Duration::from_secs(config.cache_ttl_secs),
                config.cache_max_entries,
            ),
            config,
            strategies: HashMap::new(),
            analyzer: QueryAnalyzer::new(),
            status: StatusBus::new(),
            metrics: noop_sink(),
            invocations: Mutex::new(HashMap::new()),
            decisions: Mutex::new(VecDeque::new()),
        }
    }

    /// Register a strategy, replacing any previous one of the same kind.
    pub fn with_strategy(mut self, strategy: Arc<dyn Strategy>) -> Self {
        self.strategies.insert(strategy.kind(), strategy);
        self
    }

    pub fn with_strategies(self, strategies: impl IntoIterator<Item = Arc<dyn Strategy>>) -> Self {
        strategies.into_iter().fold(self, |c, s| c.with_strategy(s))
    }

    /// Publish status on an existing bus.
    pub fn with_status_bus(mut self, status: StatusBus) -> Self {
        self.status = status;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn status_bus(&self) -> &StatusBus {
        &self.status
    }

    pub fn status(&self) -> CoordinatorStatus {
        self.status.current()
    }

    /// Registered strategy kinds, sorted.
    pub fn registered_strategies(&self) -> Vec<StrategyKind> {
        let mut kinds: Vec<_> = self.strategies.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Route without executing.
    pub fn plan(&self, query: &str, context: &QueryContext) -> RoutingDecision {
        let analysis = self.analyzer.analyze(query);
        let registered: HashSet<StrategyKind> = self.strategies.keys().copied().collect();
        let selected = self.router.route(&analysis, context, &registered);
        RoutingDecision {
            query_analysis: analysis,
            selected_strategies: selected,
            timestamp: Utc::now(),
        }
    }

    /// Answer a query with the routed strategies.
    ///
    /// Only an empty query is an error. Strategy failures, timeouts and
    /// cancellation are reported inside the result.
    pub async fn coordinate(&self, query: &str, context: QueryContext) -> RecallResult<CoordinationResult> {
        if query.trim().is_empty() {
            return Err(RecallError::empty_query());
        }

        let start = Instant::now();
        let request_id = uuid::Uuid::new_v4().to_string();
        let decision = self.plan(query, &context);

        let key = self.config.cache_enabled.then(|| cache_key(query, &context));
        if let Some(key) = &key {
            if let Some(mut cached) = self.cache.get(key).await {
                debug!(request_id = %request_id, "Cache hit");
                cached.metadata.request_id = request_id;
                cached.metadata.cache_hit = true;
                cached.metadata.latency_ms = start.elapsed().as_millis() as u64;
                cached.metadata.timestamp = Utc::now();
                self.finish(&cached, true);
                return Ok(cached);
            }
        }

        // Cache hits are not routing decisions.
        self.log_decision(&decision);
        debug!(
            request_id = %request_id,
            query_type = %decision.query_analysis.query_type,
            complexity = %decision.query_analysis.complexity,
            strategies = ?decision.selected_strategies,
            "Routing decision"
        );

        let results = self.run_strategies(query, &context, &decision.selected_strategies).await;

        let priorities: HashMap<StrategyKind, f32> = self
            .strategies
            .iter()
            .map(|(kind, s)| (*kind, s.priority()))
            .collect();
        let aggregated = aggregate(&results, &priorities, self.config.max_items);
        let success = !aggregated.successful_strategies.is_empty();
        let fallback_activated = results.iter().any(|r| r.used_fallback()) || !success;

        let mut errors: BTreeMap<String, String> = results
            .iter()
            .filter_map(|r| r.error.as_ref().map(|e| (r.strategy.to_string(), e.clone())))
            .collect();
        if !success {
            let err = RecallError::AggregateFailure {
                attempted: decision.selected_strategies.len(),
            };
            warn!(request_id = %request_id, "{}", err);
            errors.insert("coordinator".to_string(), err.to_string());
        }

        let result = CoordinationResult {
            success,
            results: if success { aggregated } else { failed_results(aggregated) },
            strategies_used: decision.selected_strategies.clone(),
            metadata: CoordinationMetadata {
                request_id,
                latency_ms: start.elapsed().as_millis() as u64,
                cache_hit: false,
                query_type: decision.query_analysis.query_type,
                complexity: decision.query_analysis.complexity,
                errors,
                timestamp: Utc::now(),
            },
            routing_decision: decision,
            fallback_activated,
        };

        if success {
            if let Some(key) = key {
                self.cache.insert(key, result.clone()).await;
            }
        }
        self.finish(&result, false);

        info!(
            request_id = %result.metadata.request_id,
            success = result.success,
            items = result.results.result_count,
            latency_ms = result.metadata.latency_ms,
            "Coordination complete"
        );
        Ok(result)
    }

    async fn run_strategies(
        &self,
        query: &str,
        context: &QueryContext,
        selected: &[StrategyKind],
    ) -> Vec<StrategyResult> {
        let scope = context.cancel.child_token();
        let scoped = context.clone().with_cancel(scope.clone());
        let scoped = &scoped;

        let runs = selected.iter().filter_map(move |kind| {
            let strategy = self.strategies.get(kind)?.clone();
            let timeout_ms = self.config.strategy_timeout_ms(*kind);
            self.count_invocation(*kind);
            Some(async move {
                let start = Instant::now();
                let outcome = tokio::select! {
                    _ = scoped.cancel.cancelled() => Err(RecallError::strategy(kind.to_string(), "cancelled")),
                    r = tokio::time::timeout(Duration::from_millis(timeout_ms), strategy.execute(query, scoped)) => {
                        r.unwrap_or_else(|_| {
                            Err(RecallError::strategy(kind.to_string(), format!("timed out after {}ms", timeout_ms)))
                        })
                    }
                };
                let latency_ms = start.elapsed().as_millis() as u64;
                match outcome {
                    Ok(output) => StrategyResult {
                        strategy: *kind,
                        success: output.success,
                        error: (!output.success).then(|| {
                            output
                                .metadata
                                .get("error")
                                .and_then(|v| v.as_str())
                                .unwrap_or("strategy reported failure")
                                .to_string()
                        }),
                        output: Some(output),
                        latency_ms,
                    },
                    Err(err) => {
                        warn!(strategy = %kind, error = %err, latency_ms, "Strategy failed");
                        StrategyResult {
                            strategy: *kind,
                            success: false,
                            output: None,
                            latency_ms,
                            error: Some(err.to_string()),
                        }
                    }
                }
            })
        });
        let mut pending: FuturesUnordered<_> = runs.collect();

        // Results are kept as they arrive; the global deadline only fails
        // the strategies still running.
        let mut finished: HashMap<StrategyKind, StrategyResult> = HashMap::new();
        let deadline = tokio::time::sleep(Duration::from_millis(self.config.global_timeout_ms));
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                biased;
                next = pending.next() => match next {
                    Some(result) => {
                        finished.insert(result.strategy, result);
                    }
                    None => break,
                },
                _ = &mut deadline => {
                    warn!(
                        timeout_ms = self.config.global_timeout_ms,
                        completed = finished.len(),
                        pending = pending.len(),
                        "Coordination timed out"
                    );
                    break;
                }
            }
        }
        drop(pending);
        scope.cancel();

        selected
            .iter()
            .filter(|kind| self.strategies.contains_key(kind))
            .map(|kind| {
                finished.remove(kind).unwrap_or_else(|| StrategyResult {
                    strategy: *kind,
                    success: false,
                    output: None,
                    latency_ms: self.config.global_timeout_ms,
                    error: Some(format!(
                        "coordination timed out after {}ms",
                        self.config.global_timeout_ms
                    )),
                })
            })
            .collect()
    }

    fn count_invocation(&self, kind: StrategyKind) {
        let mut invocations = self.invocations.lock().unwrap_or_else(|e| e.into_inner());
        *invocations.entry(kind).or_insert(0) += 1;
    }

    fn log_decision(&self, decision: &RoutingDecision) {
        let mut decisions = self.decisions.lock().unwrap_or_else(|e| e.into_inner());
        if decisions.len() >= self.config.decision_log_size.max(1) {
            decisions.pop_front();
        }
        decisions.push_back(decision.clone());
    }

    fn finish(&self, result: &CoordinationResult, cache_hit: bool) {
        self.status.update(|s| {
            s.total_queries += 1;
            s.last_success = Some(result.success);
            if result.success {
                s.successful_queries += 1;
            } else {
                s.failed_queries += 1;
            }
            if cache_hit {
                s.cache_hits += 1;
            }
            if result.fallback_activated {
                s.fallback_activations += 1;
            }
        });

        let status = self.status.current();
        self.metrics.record(
            "coordination_latency_ms",
            result.metadata.latency_ms as f64,
            "ms",
            "coordinator",
        );
        self.metrics.record(
            "coordination_success_rate",
            status.success_rate(),
            "ratio",
            "coordinator",
        );
    }

    /// How often each strategy actually ran.
    pub fn invocation_counts(&self) -> HashMap<StrategyKind, u64> {
        self.invocations.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// The most recent routing decisions, newest last.
    pub fn recent_decisions(&self, limit: usize) -> Vec<RoutingDecision> {
        let decisions = self.decisions.lock().unwrap_or_else(|e| e.into_inner());
        let skip = decisions.len().saturating_sub(limit);
        decisions.iter().skip(skip).cloned().collect()
    }

    /// Counts per query type, complexity and strategy.
    pub fn routing_analytics(&self) -> RoutingAnalytics {
        let decisions = self.decisions.lock().unwrap_or_else(|e| e.into_inner());
        let mut analytics = RoutingAnalytics {
            total_decisions: decisions.len(),
            ..Default::default()
        };

        let mut selected_total = 0usize;
        for decision in decisions.iter() {
            *analytics
                .by_query_type
                .entry(decision.query_analysis.query_type.to_string())
                .or_insert(0) += 1;
            *analytics
                .by_complexity
                .entry(decision.query_analysis.complexity.to_string())
                .or_insert(0) += 1;
            for kind in &decision.selected_strategies {
                *analytics.strategy_selection.entry(kind.to_string()).or_insert(0) += 1;
            }
            selected_total += decision.selected_strategies.len();
        }
        drop(decisions);

        analytics.strategy_invocations = self
            .invocation_counts()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        analytics.average_strategies_per_query = if analytics.total_decisions == 0 {
            0.0
        } else {
            selected_total as f64 / analytics.total_decisions as f64
        };
        analytics
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    pub async fn cache_len(&self) -> usize {
        self.cache.len().await
    }
}

fn failed_results(aggregated: AggregatedResults) -> AggregatedResults {
    AggregatedResults {
        failed_strategies: aggregated.failed_strategies,
        ..Default::default()
    }
}

impl MetricSource for Coordinator {
    fn source_name(&self) -> &str {
        "coordinator"
    }

    fn collect(&self) -> Vec<MetricSample> {
        let status = self.status.current();
        if status.total_queries == 0 {
            return Vec::new();
        }
        let mut samples = vec![MetricSample::new(
            "coordination_success_rate",
            status.success_rate(),
            "ratio",
            "coordinator",
        )];
        // A hit rate over a handful of queries, or with the cache off, says nothing.
        if self.config.cache_enabled && status.total_queries >= CACHE_RATE_MIN_QUERIES {
            samples.push(MetricSample::new("cache_hit_rate", status.cache_hit_rate(), "ratio", "coordinator"));
        }
        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StrategyOutput;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        kind: StrategyKind,
        confidence: f32,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Strategy for Fixed {
        fn kind(&self) -> StrategyKind {
            self.kind
        }

        async fn execute(&self, query: &str, _context: &QueryContext) -> RecallResult<StrategyOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(StrategyOutput::success(
                json!({"items": [{"id": format!("{}-{}", self.kind, query.len()), "content": query}]}),
                self.confidence,
            ))
        }
    }

    struct Failing(StrategyKind);

    #[async_trait]
    impl Strategy for Failing {
        fn kind(&self) -> StrategyKind {
            self.0
        }

        async fn execute(&self, _query: &str, _context: &QueryContext) -> RecallResult<StrategyOutput> {
            Err(RecallError::strategy(self.0.to_string(), "backend exploded"))
        }
    }

    struct Slow(StrategyKind);

    #[async_trait]
    impl Strategy for Slow {
        fn kind(&self) -> StrategyKind {
            self.0
        }

        async fn execute(&self, _query: &str, _context: &QueryContext) -> RecallResult<StrategyOutput> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(StrategyOutput::success(json!({}), 1.0))
        }
    }

    fn fixed(kind: StrategyKind, calls: &Arc<AtomicUsize>) -> Arc<dyn Strategy> {
        Arc::new(Fixed {
            kind,
            confidence: 0.8,
            calls: calls.clone(),
        })
    }

    #[tokio::test]
    async fn test_empty_query_is_validation_error() {
        let coordinator = Coordinator::new(CoordinatorConfig::default());
        let err = coordinator.coordinate("   ", QueryContext::default()).await.unwrap_err();
        assert!(matches!(err, RecallError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_successful_coordination() {
        let calls = Arc::new(AtomicUsize::new(0));
        let coordinator = Coordinator::new(CoordinatorConfig::default())
            .with_strategy(fixed(StrategyKind::MemoryLookup, &calls))
            .with_strategy(fixed(StrategyKind::HybridSearch, &calls));

        let result = coordinator
            .coordinate("rust async runtime", QueryContext::new("test"))
            .await
            .unwrap();

        assert!(result.success);
        assert!(!result.fallback_activated);
        assert_eq!(result.strategies_used, vec![StrategyKind::MemoryLookup, StrategyKind::HybridSearch]);
        assert_eq!(result.results.result_count, 2);
        assert!((result.results.confidence_score - 0.8).abs() < 1e-6);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(coordinator.status().successful_queries, 1);
    }

    #[tokio::test]
    async fn test_failed_strategy_is_recorded_not_propagated() {
        let calls = Arc::new(AtomicUsize::new(0));
        let coordinator = Coordinator::new(CoordinatorConfig::default())
            .with_strategy(fixed(StrategyKind::MemoryLookup, &calls))
            .with_strategy(Arc::new(Failing(StrategyKind::HybridSearch)));

        let result = coordinator.coordinate("rust async", QueryContext::default()).await.unwrap();
        assert!(result.success);
        assert!(result.fallback_activated);
        assert_eq!(result.results.failed_strategies, vec![StrategyKind::HybridSearch]);
        assert!(result.metadata.errors["hybrid_search"].contains("backend exploded"));
    }

    #[tokio::test]
    async fn test_all_failed_returns_degraded_result() {
        let coordinator = Coordinator::new(CoordinatorConfig::default())
            .with_strategy(Arc::new(Failing(StrategyKind::MemoryLookup)))
            .with_strategy(Arc::new(Failing(StrategyKind::HybridSearch)));

        let result = coordinator.coordinate("rust async", QueryContext::default()).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.results.confidence_score, 0.0);
        assert!(result.results.successful_strategies.is_empty());
        assert!(result.results.items.is_empty());
        assert_eq!(coordinator.status().failed_queries, 1);
        assert_eq!(coordinator.status().last_success, Some(false));
        assert_eq!(coordinator.cache_len().await, 0);
    }

    #[tokio::test]
    async fn test_strategy_timeout_is_bounded() {
        let calls = Arc::new(AtomicUsize::new(0));
        let config = CoordinatorConfig {
            strategy_timeout_ms: 50,
            ..Default::default()
        };
        let coordinator = Coordinator::new(config)
            .with_strategy(fixed(StrategyKind::MemoryLookup, &calls))
            .with_strategy(Arc::new(Slow(StrategyKind::HybridSearch)));

        let start = Instant::now();
        let result = coordinator.coordinate("rust async", QueryContext::default()).await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(result.success);
        assert!(result.metadata.errors["hybrid_search"].contains("timed out"));
    }

    #[tokio::test]
    async fn test_global_timeout_keeps_finished_strategies() {
        let calls = Arc::new(AtomicUsize::new(0));
        let config = CoordinatorConfig {
            global_timeout_ms: 100,
            ..Default::default()
        };
        let coordinator = Coordinator::new(config)
            .with_strategy(fixed(StrategyKind::MemoryLookup, &calls))
            .with_strategy(Arc::new(Slow(StrategyKind::HybridSearch)));

        let start = Instant::now();
        let result = coordinator.coordinate("rust async", QueryContext::default()).await.unwrap();

        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(result.success);
        assert_eq!(result.results.successful_strategies, vec![StrategyKind::MemoryLookup]);
        assert_eq!(result.results.failed_strategies, vec![StrategyKind::HybridSearch]);
        assert_eq!(result.results.result_count, 1);
        assert!(result.metadata.errors["hybrid_search"].contains("timed out"));
        assert!(!result.metadata.errors.contains_key("memory_lookup"));
    }

    #[tokio::test]
    async fn test_cache_hits_are_not_routing_decisions() {
        let calls = Arc::new(AtomicUsize::new(0));
        let coordinator = Coordinator::new(CoordinatorConfig::default())
            .with_strategy(fixed(StrategyKind::MemoryLookup, &calls));

        coordinator.coordinate("rust async", QueryContext::default()).await.unwrap();
        let cached = coordinator.coordinate("rust async", QueryContext::default()).await.unwrap();

        assert!(cached.metadata.cache_hit);
        assert_eq!(coordinator.routing_analytics().total_decisions, 1);
        assert_eq!(coordinator.recent_decisions(10).len(), 1);
        assert_eq!(coordinator.status().total_queries, 2);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_strategies() {
        let calls = Arc::new(AtomicUsize::new(0));
        let coordinator = Coordinator::new(CoordinatorConfig::default())
            .with_strategy(fixed(StrategyKind::MemoryLookup, &calls))
            .with_strategy(fixed(StrategyKind::HybridSearch, &calls));

        let first = coordinator.coordinate("Rust  async", QueryContext::new("cli")).await.unwrap();
        let invocations = coordinator.invocation_counts();
        let second = coordinator.coordinate("rust async", QueryContext::new("cli")).await.unwrap();

        assert!(second.metadata.cache_hit);
        assert_eq!(first.strategies_used, second.strategies_used);
        assert_eq!(first.results, second.results);
        assert_eq!(coordinator.invocation_counts(), invocations);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(coordinator.status().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_cancellation_marks_strategies_failed() {
        let coordinator = Coordinator::new(CoordinatorConfig::default())
            .with_strategy(Arc::new(Slow(StrategyKind::MemoryLookup)));

        let cancel = tokio_util::sync::CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = coordinator
            .coordinate("rust", QueryContext::default().with_cancel(cancel))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.metadata.errors["memory_lookup"].contains("cancelled"));
    }

    #[tokio::test]
    async fn test_analytics_and_metric_source() {
        let calls = Arc::new(AtomicUsize::new(0));
        let coordinator = Coordinator::new(CoordinatorConfig::default())
            .with_strategy(fixed(StrategyKind::MemoryLookup, &calls))
            .with_strategy(fixed(StrategyKind::HybridSearch, &calls));

        assert!(coordinator.collect().is_empty());
        coordinator.coordinate("rust async", QueryContext::default()).await.unwrap();
        coordinator.coordinate("how do I find docs?", QueryContext::default()).await.unwrap();

        let analytics = coordinator.routing_analytics();
        assert_eq!(analytics.total_decisions, 2);
        assert_eq!(analytics.by_query_type["general"], 1);
        assert_eq!(analytics.by_query_type["search_query"], 1);
        assert_eq!(analytics.strategy_invocations["memory_lookup"], 2);
        assert_eq!(coordinator.recent_decisions(1).len(), 1);

        let samples = coordinator.collect();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].name, "coordination_success_rate");
        assert_eq!(samples[0].value, 1.0);
    }

    #[tokio::test]
    async fn test_cache_hit_rate_reported_after_warm_up() {
        let calls = Arc::new(AtomicUsize::new(0));
        let coordinator = Coordinator::new(CoordinatorConfig::default())
            .with_strategy(fixed(StrategyKind::MemoryLookup, &calls));

        for i in 0..CACHE_RATE_MIN_QUERIES - 1 {
            coordinator
                .coordinate(&format!("query number {}", i), QueryContext::default())
                .await
                .unwrap();
        }
        assert!(coordinator.collect().iter().all(|s| s.name != "cache_hit_rate"));

        coordinator.coordinate("query number 0", QueryContext::default()).await.unwrap();
        let samples = coordinator.collect();
        let rate = samples.iter().find(|s| s.name == "cache_hit_rate").unwrap();
        assert!((rate.value - 1.0 / CACHE_RATE_MIN_QUERIES as f64).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_cache_hit_rate_not_reported_with_cache_off() {
        let calls = Arc::new(AtomicUsize::new(0));
        let config = CoordinatorConfig {
            cache_enabled: false,
            ..Default::default()
        };
        let coordinator = Coordinator::new(config).with_strategy(fixed(StrategyKind::MemoryLookup, &calls));

        for _ in 0..CACHE_RATE_MIN_QUERIES {
            coordinator.coordinate("rust async", QueryContext::default()).await.unwrap();
        }
        assert!(coordinator.collect().iter().all(|s| s.name != "cache_hit_rate"));
    }
}
