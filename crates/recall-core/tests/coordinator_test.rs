//! End-to-end coordinator behaviour with scripted strategies.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use recall_core::error::{RecallError, RecallResult};
use recall_core::traits::Strategy;
use recall_core::types::{QueryContext, StrategyKind, StrategyOutput};
use recall_core::{Coordinator, CoordinatorConfig, MonitorConfig, ProductionMonitor};

enum Script {
    Items(Vec<&'static str>, f32),
    Fail,
    Hang,
}

struct Scripted {
    kind: StrategyKind,
    script: Script,
    calls: AtomicUsize,
}

impl Scripted {
    fn new(kind: StrategyKind, script: Script) -> Arc<Self> {
        Arc::new(Self {
            kind,
            script,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Strategy for Scripted {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    async fn execute(&self, _query: &str, _context: &QueryContext) -> RecallResult<StrategyOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Items(ids, confidence) => {
                let items: Vec<_> = ids.iter().map(|id| json!({"id": id, "content": id})).collect();
                Ok(StrategyOutput::success(json!({ "items": items }), *confidence))
            }
            Script::Fail => Err(RecallError::strategy(self.kind.to_string(), "scripted failure")),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(StrategyOutput::success(json!({ "items": [] }), 1.0))
            }
        }
    }
}

fn ctx() -> QueryContext {
    QueryContext::new("cli").with_capability(StrategyKind::HybridSearch)
}

#[tokio::test]
async fn test_cached_repeat_does_not_reinvoke_strategies() {
    let memory = Scripted::new(StrategyKind::MemoryLookup, Script::Items(vec!["a", "b"], 0.8));
    let hybrid = Scripted::new(StrategyKind::HybridSearch, Script::Items(vec!["b", "c"], 0.6));
    let coordinator = Coordinator::new(CoordinatorConfig::default())
        .with_strategy(memory.clone())
        .with_strategy(hybrid.clone());

    let first = coordinator
        .coordinate("what did we decide about caching", ctx())
        .await
        .unwrap();
    let second = coordinator
        .coordinate("what did we decide about caching", ctx())
        .await
        .unwrap();

    assert!(!first.metadata.cache_hit);
    assert!(second.metadata.cache_hit);
    assert_ne!(first.metadata.request_id, second.metadata.request_id);
    assert_eq!(first.results.items, second.results.items);
    assert_eq!(memory.calls.load(Ordering::SeqCst), 1);
    assert_eq!(coordinator.invocation_counts()[&StrategyKind::MemoryLookup], 1);

    let status = coordinator.status();
    assert_eq!(status.total_queries, 2);
    assert_eq!(status.cache_hits, 1);
}

#[tokio::test]
async fn test_items_are_deduplicated_across_strategies() {
    let coordinator = Coordinator::new(CoordinatorConfig::default())
        .with_strategy(Scripted::new(StrategyKind::MemoryLookup, Script::Items(vec!["a", "b"], 0.8)))
        .with_strategy(Scripted::new(StrategyKind::HybridSearch, Script::Items(vec!["b", "c"], 0.6)));

    let result = coordinator
        .coordinate("find notes about tokio", ctx())
        .await
        .unwrap();

    let ids: Vec<&str> = result.results.items.iter().filter_map(|i| i["id"].as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(result.results.result_count, 3);
    assert!(result.results.confidence_score > 0.6 && result.results.confidence_score < 0.8);
}

#[tokio::test]
async fn test_all_strategies_failing_is_reported_not_raised() {
    let coordinator = Coordinator::new(CoordinatorConfig::default())
        .with_strategy(Scripted::new(StrategyKind::MemoryLookup, Script::Fail))
        .with_strategy(Scripted::new(StrategyKind::HybridSearch, Script::Fail));

    let result = coordinator
        .coordinate("anything at all", ctx())
        .await
        .unwrap();

    assert!(!result.success);
    assert!(result.fallback_activated);
    assert_eq!(result.results.result_count, 0);
    assert_eq!(result.results.failed_strategies.len(), 2);
    assert!(result.metadata.errors.contains_key("coordinator"));

    // Failures are not cached.
    let again = coordinator
        .coordinate("anything at all", ctx())
        .await
        .unwrap();
    assert!(!again.metadata.cache_hit);
    assert_eq!(coordinator.status().failed_queries, 2);
}

#[tokio::test]
async fn test_slow_strategy_times_out_without_sinking_the_rest() {
    let config = CoordinatorConfig {
        strategy_timeout_ms: 50,
        ..Default::default()
    };
    let coordinator = Coordinator::new(config)
        .with_strategy(Scripted::new(StrategyKind::MemoryLookup, Script::Items(vec!["a"], 0.9)))
        .with_strategy(Scripted::new(StrategyKind::HybridSearch, Script::Hang));

    let result = coordinator
        .coordinate("find notes about tokio", ctx())
        .await
        .unwrap();

    assert!(result.success);
    assert!(result.fallback_activated);
    assert_eq!(result.results.successful_strategies, vec![StrategyKind::MemoryLookup]);
    assert!(result.metadata.errors["hybrid_search"].contains("timed out"));
}

#[tokio::test]
async fn test_empty_query_is_rejected() {
    let coordinator = Coordinator::new(CoordinatorConfig::default());
    let err = coordinator.coordinate("   ", ctx()).await.unwrap_err();
    assert!(matches!(err, RecallError::Validation { .. }));
}

#[tokio::test]
async fn test_coordination_metrics_reach_the_monitor() {
    let dir = tempfile::tempdir().unwrap();
    let monitor = Arc::new(ProductionMonitor::new(MonitorConfig::default().with_log_dir(dir.path())));
    let coordinator = Coordinator::new(CoordinatorConfig::default())
        .with_strategy(Scripted::new(StrategyKind::MemoryLookup, Script::Fail))
        .with_metrics(monitor.clone());

    coordinator
        .coordinate("anything at all", ctx())
        .await
        .unwrap();

    assert_eq!(monitor.history("coordination_latency_ms").len(), 1);
    let success = monitor.history("coordination_success_rate");
    assert_eq!(success[0].value, 0.0);

    // A zero success rate is below the critical floor.
    let alerts = monitor.recent_alerts(10);
    assert!(alerts.iter().any(|a| a.metric == "coordination_success_rate"));
}
