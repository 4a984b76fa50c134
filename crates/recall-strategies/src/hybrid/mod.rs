//! Hybrid search: vector and keyword rankings merged with RRF.
//!
//! Both rankings come from bridge components. When a call degrades, a local
//! ranking over the memory store stands in for that side: character-bigram
//! similarity for the vector side, term overlap for the keyword side.

mod fusion;

pub use fusion::{FusedItem, RrfFusion};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use recall_core::bridge::{Bridge, Operation};
use recall_core::config::HybridSearchConfig;
use recall_core::error::RecallResult;
use recall_core::text::{bigram_dice, term_overlap};
use recall_core::traits::{MemoryStore, Strategy};
use recall_core::types::{MemoryEntry, QueryContext, StrategyKind, StrategyOutput};

use crate::support::{by_score_then_id, item_id, item_text, result_list};

/// One side of the hybrid ranking.
#[derive(Debug, Default)]
struct Ranking {
    ids: Vec<String>,
    documents: HashMap<String, Value>,
    fallback: bool,
}

/// Which local scorer replaces a degraded side.
#[derive(Clone, Copy)]
enum Side {
    Vector,
    Keyword,
}

impl Side {
    fn name(self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Keyword => "keyword",
        }
    }

    fn local_score(self, query: &str, entry: &MemoryEntry) -> f32 {
        match self {
            Self::Vector => bigram_dice(query, &entry.content),
            Self::Keyword => {
                term_overlap(query, &format!("{} {}", entry.content, entry.keywords.join(" ")))
            }
        }
    }
}

/// Hybrid vector + keyword search.
pub struct HybridSearchStrategy {
    bridge: Arc<Bridge>,
    store: Arc<dyn MemoryStore>,
    fusion: RrfFusion,
    config: HybridSearchConfig,
    priority: f32,
}

impl HybridSearchStrategy {
    pub fn new(bridge: Arc<Bridge>, store: Arc<dyn MemoryStore>, config: HybridSearchConfig) -> Self {
        Self {
            bridge,
            store,
            fusion: RrfFusion::new(config.rrf_k),
            config,
            priority: 1.0,
        }
    }

    pub fn with_priority(mut self, priority: f32) -> Self {
        self.priority = priority;
        self
    }

    async fn rank(&self, side: Side, query: &str, context: &QueryContext) -> RecallResult<Ranking> {
        let operation = match side {
            Side::Vector => Operation::VectorSearch {
                query: query.to_string(),
                limit: self.config.candidate_limit,
            },
            Side::Keyword => Operation::KeywordSearch {
                query: query.to_string(),
                limit: self.config.candidate_limit,
            },
        };

        let response = self.bridge.call_with_cancel(operation, &context.cancel).await?;
        if !response.fallback {
            let mut ranking = Ranking::default();
            for (position, item) in result_list(&response.data).into_iter().enumerate() {
                let id = item_id(&item, side.name(), position);
                if !ranking.documents.contains_key(&id) {
                    ranking.ids.push(id.clone());
                    ranking.documents.insert(id, item);
                }
            }
            return Ok(ranking);
        }

        debug!(
            side = side.name(),
            reason = ?response.fallback_reason,
            "Ranking side degraded, using local ranking"
        );
        self.local_rank(side, query).await
    }

    async fn local_rank(&self, side: Side, query: &str) -> RecallResult<Ranking> {
        let entries = match self.store.list().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(side = side.name(), error = %e, "Local ranking unavailable");
                Vec::new()
            }
        };

        let mut scored: Vec<(f32, &MemoryEntry)> = entries
            .iter()
            .map(|e| (side.local_score(query, e), e))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| by_score_then_id((&a.1.id, a.0), (&b.1.id, b.0)));
        scored.truncate(self.config.candidate_limit);

        let mut ranking = Ranking {
            fallback: true,
            ..Default::default()
        };
        for (score, entry) in scored {
            ranking.ids.push(entry.id.clone());
            ranking.documents.insert(
                entry.id.clone(),
                json!({ "id": entry.id, "content": entry.content, "score": score }),
            );
        }
        Ok(ranking)
    }
}

#[async_trait]
impl Strategy for HybridSearchStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::HybridSearch
    }

    fn priority(&self) -> f32 {
        self.priority
    }

    async fn execute(&self, query: &str, context: &QueryContext) -> RecallResult<StrategyOutput> {
        let (vector, keyword) = tokio::join!(
            self.rank(Side::Vector, query, context),
            self.rank(Side::Keyword, query, context)
        );
        let (vector, keyword) = (vector?, keyword?);

        let fused = self.fusion.fuse(&[
            (Side::Vector.name(), vector.ids.clone()),
            (Side::Keyword.name(), keyword.ids.clone()),
        ]);

        let items: Vec<Value> = fused
            .iter()
            .take(self.config.limit)
            .map(|f| {
                let doc = vector.documents.get(&f.id).or_else(|| keyword.documents.get(&f.id));
                json!({
                    "id": f.id,
                    "content": doc.and_then(item_text),
                    "score": f.score,
                    "boosted": f.boosted,
                    "sources": f.sources,
                })
            })
            .collect();

        let confidence = fused
            .first()
            .map(|top| top.score / self.fusion.max_score(2))
            .unwrap_or(0.0);

        Ok(StrategyOutput::success(json!({ "items": items }), confidence)
            .with_fallback(vector.fallback || keyword.fallback)
            .with_metadata("vector_fallback", json!(vector.fallback))
            .with_metadata("keyword_fallback", json!(keyword.fallback))
            .with_metadata("fused", json!(fused.len())))
    }
}
