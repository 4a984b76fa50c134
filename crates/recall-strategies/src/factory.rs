//! Factory for creating strategies from configuration.

use std::sync::Arc;

use strum::IntoEnumIterator;
use tracing::info;

use recall_core::bridge::Bridge;
use recall_core::config::StrategyConfig;
use recall_core::traits::{MemoryStore, MetricsSink, Strategy};
use recall_core::types::StrategyKind;

use crate::agentic::AgenticExtractionStrategy;
use crate::ecl::EclPipelineStrategy;
use crate::hybrid::HybridSearchStrategy;
use crate::memory::MemoryLookupStrategy;
use crate::preference::PreferenceLookupStrategy;
use crate::rerank::RerankStrategy;

/// Shared dependencies handed to every strategy.
#[derive(Clone)]
pub struct StrategyDeps {
    pub bridge: Arc<Bridge>,
    pub store: Arc<dyn MemoryStore>,
    pub metrics: Arc<dyn MetricsSink>,
}

/// Factory for creating strategies.
pub struct StrategyFactory;

impl StrategyFactory {
    /// Aggregation weight used when the configuration sets none.
    pub fn default_priority(kind: StrategyKind) -> f32 {
        match kind {
            StrategyKind::MemoryLookup => 1.0,
            StrategyKind::HybridSearch => 1.2,
            StrategyKind::Reranking => 1.5,
            StrategyKind::AgenticExtraction => 1.0,
            StrategyKind::EclPipeline => 0.8,
            StrategyKind::PreferenceLookup => 1.0,
        }
    }

    /// Create one strategy.
    pub fn create(kind: StrategyKind, config: &StrategyConfig, deps: &StrategyDeps) -> Arc<dyn Strategy> {
        let priority = config.priority(kind, Self::default_priority(kind));
        match kind {
            StrategyKind::MemoryLookup => {
                Arc::new(MemoryLookupStrategy::new(deps.store.clone(), config.memory.clone()).with_priority(priority))
            }
            StrategyKind::HybridSearch => Arc::new(
                HybridSearchStrategy::new(deps.bridge.clone(), deps.store.clone(), config.hybrid.clone())
                    .with_priority(priority),
            ),
            StrategyKind::Reranking => Arc::new(
                RerankStrategy::new(deps.bridge.clone(), deps.store.clone(), config.rerank.clone())
                    .with_metrics(deps.metrics.clone())
                    .with_priority(priority),
            ),
            StrategyKind::AgenticExtraction => Arc::new(
                AgenticExtractionStrategy::new(deps.bridge.clone(), config.agentic.clone()).with_priority(priority),
            ),
            StrategyKind::EclPipeline => {
                Arc::new(EclPipelineStrategy::new(deps.bridge.clone(), config.ecl.clone()).with_priority(priority))
            }
            StrategyKind::PreferenceLookup => Arc::new(
                PreferenceLookupStrategy::new(deps.bridge.clone(), deps.store.clone(), config.preference.clone())
                    .with_priority(priority),
            ),
        }
    }

    /// Create every enabled strategy.
    pub fn create_all(config: &StrategyConfig, deps: &StrategyDeps) -> Vec<Arc<dyn Strategy>> {
        let strategies: Vec<Arc<dyn Strategy>> = StrategyKind::iter()
            .filter(|kind| config.is_enabled(*kind))
            .map(|kind| Self::create(kind, config, deps))
            .collect();
        info!(count = strategies.len(), "Created strategies");
        strategies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bridge_with, store_with};
    use crate::testing::WireStub;
    use recall_core::traits::noop_sink;

    async fn deps() -> StrategyDeps {
        StrategyDeps {
            bridge: bridge_with(WireStub::new(), &[]),
            store: store_with(&[]).await,
            metrics: noop_sink(),
        }
    }

    #[tokio::test]
    async fn test_all_strategies_by_default() {
        let strategies = StrategyFactory::create_all(&StrategyConfig::default(), &deps().await);
        assert_eq!(strategies.len(), 6);
        let rerank = strategies.iter().find(|s| s.kind() == StrategyKind::Reranking).unwrap();
        assert_eq!(rerank.priority(), 1.5);
    }

    #[tokio::test]
    async fn test_enabled_subset_and_priority_override() {
        let mut config = StrategyConfig {
            enabled: vec![StrategyKind::MemoryLookup, StrategyKind::EclPipeline],
            ..Default::default()
        };
        config.priorities.insert("ecl_pipeline".to_string(), 2.0);

        let strategies = StrategyFactory::create_all(&config, &deps().await);
        let kinds: Vec<StrategyKind> = strategies.iter().map(|s| s.kind()).collect();
        assert_eq!(kinds, vec![StrategyKind::MemoryLookup, StrategyKind::EclPipeline]);
        assert_eq!(strategies[1].priority(), 2.0);
    }
}
