//! Cross-encoder reranking with a latency budget.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use recall_core::bridge::{Bridge, Operation};
use recall_core::config::RerankConfig;
use recall_core::error::{RecallError, RecallResult};
use recall_core::text::{bigram_dice, term_overlap, text_similarity};
use recall_core::traits::{noop_sink, MemoryStore, MetricsSink, Strategy};
use recall_core::types::{MemoryEntry, QueryContext, StrategyKind, StrategyOutput};

use crate::support::by_score_then_id;

/// Budget compliance counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RerankStats {
    pub calls: u64,
    pub within_budget: u64,
    pub cross_encoder_fallbacks: u64,
}

impl RerankStats {
    /// Fraction of calls that finished within budget (1.0 before any call).
    pub fn compliance_rate(&self) -> f64 {
        if self.calls == 0 {
            1.0
        } else {
            self.within_budget as f64 / self.calls as f64
        }
    }
}

/// Local stand-in for a cross-encoder score.
pub fn lexical_cross_score(query: &str, document: &str) -> f32 {
    (0.5 * term_overlap(query, document) + 0.5 * bigram_dice(query, document)).clamp(0.0, 1.0)
}

/// Cross-encoder scores from a component answer: a bare array of numbers or
/// an object with `scores`. `None` when the shape or length is wrong.
fn parse_scores(data: &Value, expected: usize) -> Option<Vec<f32>> {
    let list = data.as_array().or_else(|| data.get("scores").and_then(Value::as_array))?;
    let scores: Option<Vec<f32>> = list
        .iter()
        .map(|v| v.as_f64().map(|s| (s as f32).clamp(0.0, 1.0)))
        .collect();
    scores.filter(|s| s.len() == expected)
}

/// Reranks stored candidates: `final = original_weight·original + cross_weight·cross`.
pub struct RerankStrategy {
    bridge: Arc<Bridge>,
    store: Arc<dyn MemoryStore>,
    config: RerankConfig,
    metrics: Arc<dyn MetricsSink>,
    stats: Mutex<RerankStats>,
    priority: f32,
}

impl RerankStrategy {
    pub fn new(bridge: Arc<Bridge>, store: Arc<dyn MemoryStore>, config: RerankConfig) -> Self {
        Self {
            bridge,
            store,
            config,
            metrics: noop_sink(),
            stats: Mutex::new(RerankStats::default()),
            priority: 1.0,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_priority(mut self, priority: f32) -> Self {
        self.priority = priority;
        self
    }

    pub fn stats(&self) -> RerankStats {
        self.stats.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn candidates(&self, query: &str, entries: Vec<MemoryEntry>) -> Vec<(f32, MemoryEntry)> {
        let mut scored: Vec<(f32, MemoryEntry)> = entries
            .into_iter()
            .map(|e| (text_similarity(query, &e.content), e))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| by_score_then_id((&a.1.id, a.0), (&b.1.id, b.0)));
        scored.truncate(self.config.candidate_limit);
        scored
    }

    fn record(&self, elapsed_ms: u64, cross_fallback: bool) -> bool {
        let within = elapsed_ms <= self.config.budget_ms;
        {
            let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
            stats.calls += 1;
            if within {
                stats.within_budget += 1;
            }
            if cross_fallback {
                stats.cross_encoder_fallbacks += 1;
            }
        }
        if !within {
            warn!(elapsed_ms, budget_ms = self.config.budget_ms, "Rerank exceeded latency budget");
        }
        self.metrics.record("rerank_latency_ms", elapsed_ms as f64, "ms", "reranking");
        self.metrics.record(
            "rerank_budget_compliance",
            if within { 1.0 } else { 0.0 },
            "ratio",
            "reranking",
        );
        within
    }
}

#[async_trait]
impl Strategy for RerankStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Reranking
    }

    fn priority(&self) -> f32 {
        self.priority
    }

    async fn execute(&self, query: &str, context: &QueryContext) -> RecallResult<StrategyOutput> {
        let started = Instant::now();
        let entries = self
            .store
            .list()
            .await
            .map_err(|e| RecallError::strategy(self.kind().to_string(), e.to_string()))?;

        let candidates = self.candidates(query, entries);
        if candidates.is_empty() {
            let within = self.record(started.elapsed().as_millis() as u64, false);
            return Ok(StrategyOutput::success(json!({ "items": [] }), 0.0)
                .with_metadata("within_budget", json!(within)));
        }

        let documents: Vec<String> = candidates.iter().map(|(_, e)| e.content.clone()).collect();
        let response = self
            .bridge
            .call_with_cancel(
                Operation::CrossEncode {
                    query: query.to_string(),
                    documents: documents.clone(),
                },
                &context.cancel,
            )
            .await?;

        let remote = if response.fallback {
            None
        } else {
            let parsed = parse_scores(&response.data, documents.len());
            if parsed.is_none() {
                warn!(candidates = documents.len(), "Cross-encoder answer has the wrong shape");
            }
            parsed
        };
        let cross_fallback = remote.is_none();
        let cross_scores =
            remote.unwrap_or_else(|| documents.iter().map(|d| lexical_cross_score(query, d)).collect());

        let mut reranked: Vec<(f32, f32, f32, &MemoryEntry)> = candidates
            .iter()
            .zip(cross_scores)
            .map(|((original, entry), cross)| {
                let score = self.config.original_weight * original + self.config.cross_weight * cross;
                (score, *original, cross, entry)
            })
            .collect();
        reranked.sort_by(|a, b| by_score_then_id((&a.3.id, a.0), (&b.3.id, b.0)));
        reranked.truncate(self.config.top_k);

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let within = self.record(elapsed_ms, cross_fallback);
        debug!(candidates = candidates.len(), elapsed_ms, cross_fallback, "Rerank complete");

        let weight_sum = (self.config.original_weight + self.config.cross_weight).max(f32::EPSILON);
        let confidence = reranked.first().map(|r| r.0 / weight_sum).unwrap_or(0.0);
        let items: Vec<Value> = reranked
            .iter()
            .map(|(score, original, cross, entry)| {
                json!({
                    "id": entry.id,
                    "content": entry.content,
                    "score": score,
                    "original_score": original,
                    "cross_score": cross,
                })
            })
            .collect();

        Ok(StrategyOutput::success(json!({ "items": items }), confidence)
            .with_fallback(cross_fallback)
            .with_metadata("latency_ms", json!(elapsed_ms))
            .with_metadata("within_budget", json!(within)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bridge_with, store_with, MockWire, WireStub};
    use recall_core::bridge::Component;
    use std::sync::atomic::Ordering;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(String, f64)>>);

    impl MetricsSink for Recorder {
        fn record(&self, name: &str, value: f64, _unit: &str, _component: &str) {
            self.0.lock().unwrap().push((name.to_string(), value));
        }
    }

    #[tokio::test]
    async fn test_cross_scores_reorder_candidates() {
        let store = store_with(&["rust async runtime tokio", "rust async book"]).await;
        // Scores follow candidate order, so the weaker lexical match gets 1.0.
        let stub = WireStub::new().answer("cross_encode", json!({"scores": [0.0, 1.0]}));
        let bridge = bridge_with(stub, &[Component::CrossEncoder]);
        let strategy = RerankStrategy::new(bridge, store, RerankConfig::default());

        let out = strategy.execute("rust async", &QueryContext::new("test")).await.unwrap();
        assert!(!out.fallback);
        let items = out.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["cross_score"], 1.0);
        assert!(items[0]["score"].as_f64().unwrap() > items[1]["score"].as_f64().unwrap());
    }

    #[tokio::test]
    async fn test_lexical_scores_on_fallback_and_metrics() {
        let store = store_with(&["circuit breaker trips after failures", "bananas"]).await;
        let recorder = Arc::new(Recorder::default());
        let strategy = RerankStrategy::new(bridge_with(WireStub::new(), &[]), store, RerankConfig::default())
            .with_metrics(recorder.clone());

        let out = strategy
            .execute("when does the circuit breaker trip", &QueryContext::new("test"))
            .await
            .unwrap();

        assert!(out.success);
        assert!(out.fallback);
        assert_eq!(out.items()[0]["content"], "circuit breaker trips after failures");
        assert_eq!(strategy.stats().cross_encoder_fallbacks, 1);

        let recorded = recorder.0.lock().unwrap();
        assert!(recorded.iter().any(|(n, _)| n == "rerank_latency_ms"));
        assert!(recorded.iter().any(|(n, v)| n == "rerank_budget_compliance" && *v == 1.0));
    }

    #[tokio::test]
    async fn test_wrong_length_answer_is_treated_as_fallback() {
        let store = store_with(&["alpha beta", "alpha gamma"]).await;
        let stub = WireStub::new().answer("cross_encode", json!([0.9]));
        let calls = stub.calls();
        let strategy = RerankStrategy::new(bridge_with(stub, &[Component::CrossEncoder]), store, RerankConfig::default());

        let out = strategy.execute("alpha", &QueryContext::new("test")).await.unwrap();
        assert!(out.fallback);
        assert_eq!(out.items().len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_candidates_skips_the_bridge() {
        let mut wire = MockWire::new();
        wire.expect_invoke().times(0);
        let strategy = RerankStrategy::new(
            bridge_with(wire, &[Component::CrossEncoder]),
            store_with(&[]).await,
            RerankConfig::default(),
        );

        let out = strategy.execute("anything", &QueryContext::new("test")).await.unwrap();
        assert!(out.success);
        assert!(out.items().is_empty());
        assert_eq!(strategy.stats().compliance_rate(), 1.0);
    }

    #[test]
    fn test_parse_scores() {
        assert_eq!(parse_scores(&json!([0.5, 2.0]), 2), Some(vec![0.5, 1.0]));
        assert_eq!(parse_scores(&json!({"scores": [0.1]}), 2), None);
        assert_eq!(parse_scores(&json!(["x"]), 1), None);
    }
}
