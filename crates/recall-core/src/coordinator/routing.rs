//! Strategy selection from query analysis.

use std::collections::HashSet;

use crate::types::{Complexity, QueryAnalysis, QueryContext, QueryType, StrategyKind};

/// Base strategy set for each query type, in priority order.
pub fn base_strategies(query_type: QueryType) -> &'static [StrategyKind] {
    use StrategyKind::*;
    match query_type {
        QueryType::CodeAnalysis => &[MemoryLookup, AgenticExtraction, EclPipeline],
        QueryType::SearchQuery => &[MemoryLookup, HybridSearch, Reranking],
        QueryType::ErrorAnalysis => &[MemoryLookup, AgenticExtraction, HybridSearch],
        QueryType::MemoryQuery => &[MemoryLookup, PreferenceLookup, HybridSearch],
        QueryType::General => &[MemoryLookup, HybridSearch],
    }
}

/// Maps an analysis plus caller hints to an ordered strategy list.
#[derive(Debug, Clone)]
pub struct Router {
    max_strategies: usize,
}

impl Router {
    pub fn new(max_strategies: usize) -> Self {
        Self {
            max_strategies: max_strategies.max(1),
        }
    }

    /// Select strategies: base set, ECL for high complexity, then caller
    /// capabilities; unregistered strategies are dropped before the cap.
    pub fn route(
        &self,
        analysis: &QueryAnalysis,
        context: &QueryContext,
        registered: &HashSet<StrategyKind>,
    ) -> Vec<StrategyKind> {
        let mut selected: Vec<StrategyKind> = base_strategies(analysis.query_type).to_vec();

        if analysis.complexity == Complexity::High {
            selected.push(StrategyKind::EclPipeline);
        }
        selected.extend(context.capabilities.iter().copied());

        let mut seen = HashSet::new();
        selected
            .into_iter()
            .filter(|kind| registered.contains(kind))
            .filter(|kind| seen.insert(*kind))
            .take(self.max_strategies)
            .collect()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(5)
    }
}
