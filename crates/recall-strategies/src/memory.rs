//! Memory lookup: lexical ranking over the local memory store.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use recall_core::config::LookupConfig;
use recall_core::error::{RecallError, RecallResult};
use recall_core::text::{term_overlap, text_similarity};
use recall_core::traits::{MemoryStore, Strategy};
use recall_core::types::{MemoryEntry, QueryContext, StrategyKind, StrategyOutput};

use crate::support::{by_score_then_id, entry_item};

/// Score of an entry against a query: text similarity plus keyword overlap.
pub fn lookup_score(query: &str, entry: &MemoryEntry) -> f32 {
    let similarity = text_similarity(query, &entry.content);
    let haystack = format!("{} {}", entry.content, entry.keywords.join(" "));
    (0.6 * similarity + 0.4 * term_overlap(query, &haystack)).clamp(0.0, 1.0)
}

/// Rank `entries` against `query`, keeping those at or above `min_score`.
pub(crate) fn rank_entries(
    query: &str,
    entries: &[MemoryEntry],
    min_score: f32,
    limit: usize,
) -> Vec<(f32, MemoryEntry)> {
    let mut scored: Vec<(f32, MemoryEntry)> = entries
        .iter()
        .map(|e| (lookup_score(query, e), e))
        .filter(|(score, _)| *score >= min_score)
        .map(|(score, e)| (score, e.clone()))
        .collect();
    scored.sort_by(|a, b| by_score_then_id((&a.1.id, a.0), (&b.1.id, b.0)));
    scored.truncate(limit);
    scored
}

/// Looks up stored memories relevant to the query. Purely local.
pub struct MemoryLookupStrategy {
    store: Arc<dyn MemoryStore>,
    config: LookupConfig,
    priority: f32,
}

impl MemoryLookupStrategy {
    pub fn new(store: Arc<dyn MemoryStore>, config: LookupConfig) -> Self {
        Self {
            store,
            config,
            priority: 1.0,
        }
    }

    pub fn with_priority(mut self, priority: f32) -> Self {
        self.priority = priority;
        self
    }
}

#[async_trait]
impl Strategy for MemoryLookupStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MemoryLookup
    }

    fn priority(&self) -> f32 {
        self.priority
    }

    async fn execute(&self, query: &str, _context: &QueryContext) -> RecallResult<StrategyOutput> {
        let entries = self
            .store
            .list()
            .await
            .map_err(|e| RecallError::strategy(self.kind().to_string(), e.to_string()))?;

        let ranked = rank_entries(query, &entries, self.config.min_score, self.config.limit);
        debug!(candidates = entries.len(), matched = ranked.len(), "Memory lookup ranked entries");

        let confidence = ranked.first().map(|(score, _)| *score).unwrap_or(0.0);
        let items: Vec<_> = ranked.iter().map(|(score, e)| entry_item(e, *score)).collect();

        Ok(StrategyOutput::success(json!({ "items": items }), confidence)
            .with_metadata("searched", json!(entries.len())))
    }
}
