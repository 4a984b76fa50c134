//! Admission control for new memory content.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{debug, info, warn};

use super::types::{
    CrosscheckAction, CrosscheckConfig, CrosscheckContext, CrosscheckDecision, CrosscheckStats,
    ExecutionResult, SimilarEntry, SubmitResult,
};
use crate::text;
use crate::traits::{noop_sink, InsertOutcome, MemoryStore, MetricSource, MetricsSink};
use crate::types::{clamp_unit, content_hash, MemoryEntry, MetricSample};

const PREVIEW_CHARS: usize = 80;

/// Decides whether candidate content is added, merged or skipped.
///
/// Policy, in order:
/// 1. too short or empty: skip
/// 2. exact hash match (original or merged content): skip
/// 3. similarity at or above `similarity_threshold`: skip; at or above
///    `merge_threshold`: merge into the closest entry
/// 4. otherwise add when both unique value and confidence clear their
///    thresholds
///
/// Content without any word token that is not an exact duplicate, or a store
/// that cannot be read, yields a low-confidence add.
pub struct CrosscheckEngine {
    config: CrosscheckConfig,
    store: Arc<dyn MemoryStore>,
    stats: Mutex<CrosscheckStats>,
    metrics: Arc<dyn MetricsSink>,
}

impl CrosscheckEngine {
    pub fn new(config: CrosscheckConfig, store: Arc<dyn MemoryStore>) -> Self {
        Self {
            config,
            store,
            stats: Mutex::new(CrosscheckStats::default()),
            metrics: noop_sink(),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &CrosscheckConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn MemoryStore> {
        &self.store
    }

    fn bump(&self, f: impl FnOnce(&mut CrosscheckStats)) {
        let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut stats);
    }

    /// Counters since construction.
    pub fn stats(&self) -> CrosscheckStats {
        self.stats.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Decide what to do with `content`. Never fails.
    pub async fn analyze(&self, content: &str, context: &CrosscheckContext) -> CrosscheckDecision {
        let start = Instant::now();
        self.bump(|s| s.analyses += 1);
        let decision = self.decide(content).await;
        debug!(
            action = %decision.action,
            confidence = decision.confidence,
            max_similarity = decision.max_similarity,
            source = %context.source,
            "Crosscheck decision"
        );
        self.metrics.record(
            "crosscheck_latency_ms",
            start.elapsed().as_millis() as f64,
            "ms",
            "crosscheck",
        );
        decision
    }

    async fn decide(&self, content: &str) -> CrosscheckDecision {
        let trimmed = content.trim();
        if trimmed.chars().count() < self.config.min_content_length {
            return CrosscheckDecision::skip(format!(
                "content shorter than {} characters",
                self.config.min_content_length
            ));
        }

        let hash = content_hash(trimmed);
        match self.store.find_by_hash(&hash).await {
            Ok(Some(existing)) => {
                let mut decision = CrosscheckDecision::skip(format!("exact duplicate of {}", existing.id));
                decision.duplicate = true;
                decision.max_similarity = 1.0;
                decision.similar_entries = vec![similar(&existing, 1.0)];
                return decision;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Memory store unavailable during crosscheck");
                return self.low_confidence_add("memory store unavailable");
            }
        }

        if text::tokenize(trimmed).is_empty() {
            return self.low_confidence_add("content has no recognizable tokens");
        }

        let entries = match self.store.list().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Memory store unavailable during crosscheck");
                return self.low_confidence_add("memory store unavailable");
            }
        };

        let mut scored: Vec<(f32, &MemoryEntry)> = entries
            .iter()
            .map(|entry| (text::text_similarity(trimmed, &entry.content), entry))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));

        let similar_entries: Vec<SimilarEntry> = scored
            .iter()
            .take(self.config.max_similar_entries)
            .filter(|(sim, _)| *sim > 0.0)
            .map(|(sim, entry)| similar(entry, *sim))
            .collect();
        let max_similarity = scored.first().map_or(0.0, |(sim, _)| *sim);
        let unique_value = self.unique_value(trimmed);

        let base = CrosscheckDecision {
            should_add: false,
            action: CrosscheckAction::Skip,
            confidence: 0.0,
            similar_entries,
            unique_value,
            reasoning: String::new(),
            max_similarity,
            merge_target: None,
            duplicate: false,
        };

        if max_similarity >= self.config.similarity_threshold {
            return CrosscheckDecision {
                confidence: max_similarity,
                duplicate: true,
                reasoning: format!(
                    "near duplicate (similarity {:.2} >= {:.2})",
                    max_similarity, self.config.similarity_threshold
                ),
                ..base
            };
        }

        if max_similarity >= self.config.merge_threshold {
            let target = scored.first().map(|(_, entry)| entry.id.clone());
            return CrosscheckDecision {
                action: CrosscheckAction::Merge,
                confidence: max_similarity,
                reasoning: format!(
                    "overlaps existing entry (similarity {:.2}), merging",
                    max_similarity
                ),
                merge_target: target,
                ..base
            };
        }

        let confidence = clamp_unit(0.6 * (1.0 - max_similarity) + 0.4 * unique_value);
        if unique_value < self.config.unique_value_threshold {
            return CrosscheckDecision {
                confidence,
                reasoning: format!(
                    "low unique value ({:.2} < {:.2})",
                    unique_value, self.config.unique_value_threshold
                ),
                ..base
            };
        }
        if confidence < self.config.confidence_threshold {
            return CrosscheckDecision {
                confidence,
                reasoning: format!(
                    "low confidence ({:.2} < {:.2})",
                    confidence, self.config.confidence_threshold
                ),
                ..base
            };
        }

        CrosscheckDecision {
            should_add: true,
            action: CrosscheckAction::Add,
            confidence,
            reasoning: format!(
                "new content (unique value {:.2}, max similarity {:.2})",
                unique_value, max_similarity
            ),
            ..base
        }
    }

    fn low_confidence_add(&self, reason: &str) -> CrosscheckDecision {
        CrosscheckDecision {
            should_add: true,
            action: CrosscheckAction::Add,
            confidence: clamp_unit(self.config.low_confidence),
            similar_entries: Vec::new(),
            unique_value: 0.0,
            reasoning: format!("{}; storing with low confidence", reason),
            max_similarity: 0.0,
            merge_target: None,
            duplicate: false,
        }
    }

    /// Unique value: keyword density 0.6, length 0.2, structural markers 0.2.
    pub fn unique_value(&self, content: &str) -> f32 {
        let density = text::keyword_density(content);
        let length = (content.chars().count() as f32 / 200.0).min(1.0);
        let markers = text::structural_marker_score(content);
        clamp_unit(0.6 * density + 0.2 * length + 0.2 * markers)
    }

    /// Apply a decision.
    pub async fn execute(
        &self,
        content: &str,
        decision: &CrosscheckDecision,
        context: &CrosscheckContext,
    ) -> ExecutionResult {
        match decision.action {
            CrosscheckAction::Add => self.execute_add(content, decision, context).await,
            CrosscheckAction::Merge => self.execute_merge(content, decision, context).await,
            CrosscheckAction::Skip => {
                self.bump(|s| {
                    s.skipped += 1;
                    if decision.duplicate {
                        s.duplicates_prevented += 1;
                    }
                });
                ExecutionResult {
                    success: true,
                    action: CrosscheckAction::Skip,
                    memory_id: decision.similar_entries.first().map(|e| e.id.clone()),
                    message: decision.reasoning.clone(),
                }
            }
        }
    }

    async fn execute_add(
        &self,
        content: &str,
        decision: &CrosscheckDecision,
        context: &CrosscheckContext,
    ) -> ExecutionResult {
        let trimmed = content.trim();
        let entry = MemoryEntry::new(trimmed, context.category.clone(), context.source.clone())
            .with_keywords(text::extract_keywords(trimmed, self.config.max_keywords))
            .with_confidence(decision.confidence)
            .with_similarity_score(decision.max_similarity)
            .with_unique_value_score(decision.unique_value);

        match self.store.insert_if_absent(entry).await {
            Ok(InsertOutcome::Inserted(id)) => {
                self.bump(|s| s.added += 1);
                info!(memory_id = %id, source = %context.source, "Memory added");
                ExecutionResult {
                    success: true,
                    action: CrosscheckAction::Add,
                    memory_id: Some(id),
                    message: "memory added".to_string(),
                }
            }
            Ok(InsertOutcome::AlreadyExists(id)) => {
                self.bump(|s| {
                    s.skipped += 1;
                    s.duplicates_prevented += 1;
                });
                debug!(memory_id = %id, "Concurrent duplicate collapsed");
                ExecutionResult {
                    success: true,
                    action: CrosscheckAction::Skip,
                    memory_id: Some(id),
                    message: "identical content already stored".to_string(),
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to store memory");
                ExecutionResult {
                    success: false,
                    action: CrosscheckAction::Add,
                    memory_id: None,
                    message: e.to_string(),
                }
            }
        }
    }

    async fn execute_merge(
        &self,
        content: &str,
        decision: &CrosscheckDecision,
        context: &CrosscheckContext,
    ) -> ExecutionResult {
        let Some(target) = decision.merge_target.as_deref() else {
            return ExecutionResult {
                success: false,
                action: CrosscheckAction::Merge,
                memory_id: None,
                message: "merge decision without a target".to_string(),
            };
        };

        let trimmed = content.trim();
        let keywords = match self.store.get(target).await {
            Ok(Some(existing)) => text::extract_keywords(
                &format!("{}\n{}", existing.content, trimmed),
                self.config.max_keywords,
            ),
            _ => text::extract_keywords(trimmed, self.config.max_keywords),
        };

        match self
            .store
            .merge_into(
                target,
                trimmed,
                &content_hash(trimmed),
                keywords,
                self.config.merge_confidence_boost,
            )
            .await
        {
            Ok(entry) => {
                self.bump(|s| s.merged += 1);
                info!(memory_id = %entry.id, source = %context.source, "Memory merged");
                ExecutionResult {
                    success: true,
                    action: CrosscheckAction::Merge,
                    memory_id: Some(entry.id),
                    message: "content merged into existing memory".to_string(),
                }
            }
            Err(e) => {
                warn!(memory_id = target, error = %e, "Failed to merge memory");
                ExecutionResult {
                    success: false,
                    action: CrosscheckAction::Merge,
                    memory_id: Some(target.to_string()),
                    message: e.to_string(),
                }
            }
        }
    }

    /// Analyze and execute in one step.
    pub async fn submit(&self, content: &str, context: &CrosscheckContext) -> SubmitResult {
        let decision = self.analyze(content, context).await;
        let execution = self.execute(content, &decision, context).await;
        SubmitResult { decision, execution }
    }
}

fn similar(entry: &MemoryEntry, similarity: f32) -> SimilarEntry {
    SimilarEntry {
        id: entry.id.clone(),
        similarity: clamp_unit(similarity),
        preview: entry.content.chars().take(PREVIEW_CHARS).collect(),
    }
}

impl MetricSource for CrosscheckEngine {
    fn source_name(&self) -> &str {
        "crosscheck"
    }

    fn collect(&self) -> Vec<MetricSample> {
        let stats = self.stats();
        if stats.analyses == 0 {
            return Vec::new();
        }
        let decided = (stats.added + stats.merged + stats.skipped).max(1) as f64;
        vec![
            MetricSample::new("crosscheck_add_rate", stats.added as f64 / decided, "ratio", "crosscheck"),
            MetricSample::new(
                "crosscheck_duplicates_prevented",
                stats.duplicates_prevented as f64,
                "count",
                "crosscheck",
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crosscheck::InMemoryStore;
    use crate::error::{RecallError, RecallResult};
    use async_trait::async_trait;

    fn engine() -> CrosscheckEngine {
        CrosscheckEngine::new(CrosscheckConfig::default(), Arc::new(InMemoryStore::new()))
    }

    fn ctx() -> CrosscheckContext {
        CrosscheckContext::new("test", "fact")
    }

    #[tokio::test]
    async fn test_short_content_skips() {
        let decision = engine().analyze("  tiny  ", &ctx()).await;
        assert_eq!(decision.action, CrosscheckAction::Skip);
        assert!(!decision.should_add);
    }

    #[tokio::test]
    async fn test_symbols_only_is_low_confidence_add() {
        let decision = engine().analyze("!!!! ???? ----", &ctx()).await;
        assert_eq!(decision.action, CrosscheckAction::Add);
        assert!((decision.confidence - 0.3).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_symbols_only_repeat_is_skipped() {
        let engine = engine();
        let first = engine.submit("!!!! ???? ----", &ctx()).await;
        assert_eq!(first.decision.action, CrosscheckAction::Add);

        let second = engine.analyze("!!!! ???? ----", &ctx()).await;
        assert_eq!(second.action, CrosscheckAction::Skip);
        assert!(second.duplicate);
        assert_eq!(second.similar_entries[0].id, first.execution.memory_id.unwrap());
    }

    #[tokio::test]
    async fn test_cyrillic_near_duplicate_is_not_added() {
        let engine = engine();
        let first = engine
            .submit("Система кэширования ускоряет поиск документов в базе знаний", &ctx())
            .await;
        assert_eq!(first.decision.action, CrosscheckAction::Add);
        assert!(first.decision.confidence > 0.3, "confidence {}", first.decision.confidence);

        let second = engine
            .submit("Система кэширования ускоряет поиск документов в базе знаний!", &ctx())
            .await;
        assert_ne!(second.decision.action, CrosscheckAction::Add);
        assert!(second.decision.max_similarity >= 0.85);
        assert_eq!(engine.store().len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cjk_exact_duplicate_is_skipped() {
        let engine = engine();
        let content = "缓存系统 加速 知识库 文档 检索";
        let first = engine.submit(content, &ctx()).await;
        assert_eq!(first.decision.action, CrosscheckAction::Add);

        let second = engine.submit(content, &ctx()).await;
        assert_eq!(second.decision.action, CrosscheckAction::Skip);
        assert!(second.decision.duplicate);
        assert_eq!(second.execution.memory_id, first.execution.memory_id);
    }

    #[tokio::test]
    async fn test_novel_content_is_added() {
        let engine = engine();
        let result = engine
            .submit("Tokio provides an async runtime with a work-stealing scheduler", &ctx())
            .await;
        assert_eq!(result.decision.action, CrosscheckAction::Add);
        assert!(result.execution.success);
        assert!(result.execution.memory_id.unwrap().starts_with("mem_"));
        assert_eq!(engine.stats().added, 1);
    }

    #[tokio::test]
    async fn test_low_value_content_is_skipped() {
        let decision = engine().analyze("the the the the the the", &ctx()).await;
        assert_eq!(decision.action, CrosscheckAction::Skip);
        assert!(decision.reasoning.contains("unique value"));
    }

    #[tokio::test]
    async fn test_exact_repeat_is_skipped_and_counted() {
        let engine = engine();
        let content = "Serde derives Serialize and Deserialize for Rust structs";
        engine.submit(content, &ctx()).await;
        let second = engine.submit(content, &ctx()).await;

        assert_eq!(second.decision.action, CrosscheckAction::Skip);
        assert!(second.decision.duplicate);
        assert_eq!(engine.store().len().await.unwrap(), 1);
        assert_eq!(engine.stats().duplicates_prevented, 1);
    }

    #[tokio::test]
    async fn test_similar_content_merges_with_boost() {
        let engine = engine();
        let first = engine
            .submit("Next.js is a React framework for production applications", &ctx())
            .await;
        let second = engine
            .submit("Next.js is a React framework for building production apps", &ctx())
            .await;

        assert_ne!(second.decision.action, CrosscheckAction::Add);
        if second.decision.action == CrosscheckAction::Merge {
            let entry = engine
                .store()
                .get(first.execution.memory_id.as_deref().unwrap())
                .await
                .unwrap()
                .unwrap();
            assert!((entry.confidence - (first.decision.confidence + 0.1).min(1.0)).abs() < 1e-5);
            assert_eq!(entry.merged_hashes.len(), 1);
            assert_eq!(engine.stats().merged, 1);

            // The merged text is now known verbatim.
            let third = engine
                .analyze("Next.js is a React framework for building production apps", &ctx())
                .await;
            assert!(third.duplicate);
        }
        assert_eq!(engine.store().len().await.unwrap(), 1);
    }

    struct BrokenStore;

    #[async_trait]
    impl MemoryStore for BrokenStore {
        async fn get(&self, _id: &str) -> RecallResult<Option<MemoryEntry>> {
            Err(RecallError::storage("offline"))
        }
        async fn find_by_hash(&self, _hash: &str) -> RecallResult<Option<MemoryEntry>> {
            Err(RecallError::storage("offline"))
        }
        async fn list(&self) -> RecallResult<Vec<MemoryEntry>> {
            Err(RecallError::storage("offline"))
        }
        async fn insert_if_absent(&self, _entry: MemoryEntry) -> RecallResult<InsertOutcome> {
            Err(RecallError::storage_write("offline"))
        }
        async fn merge_into(
            &self,
            _id: &str,
            _content: &str,
            _content_hash: &str,
            _keywords: Vec<String>,
            _confidence_boost: f32,
        ) -> RecallResult<MemoryEntry> {
            Err(RecallError::storage_write("offline"))
        }
        async fn len(&self) -> RecallResult<usize> {
            Err(RecallError::storage("offline"))
        }
    }

    #[tokio::test]
    async fn test_store_failure_degrades_to_low_confidence_add() {
        let engine = CrosscheckEngine::new(CrosscheckConfig::default(), Arc::new(BrokenStore));
        let result = engine.submit("Some perfectly reasonable content here", &ctx()).await;
        assert_eq!(result.decision.action, CrosscheckAction::Add);
        assert!((result.decision.confidence - 0.3).abs() < 1e-6);
        assert!(!result.execution.success);
    }

    #[tokio::test]
    async fn test_metric_source() {
        let engine = engine();
        assert!(engine.collect().is_empty());
        engine
            .submit("Axum routes requests through tower services and layers", &ctx())
            .await;
        let samples = engine.collect();
        assert_eq!(samples[0].name, "crosscheck_add_rate");
        assert_eq!(samples[0].value, 1.0);
    }
}
