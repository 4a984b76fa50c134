//! Preference lookup through the preference store, with a local scan of
//! stored "preference" memories when the store is unavailable.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use recall_core::bridge::{Bridge, Operation};
use recall_core::config::LookupConfig;
use recall_core::error::{RecallError, RecallResult};
use recall_core::text::{term_overlap, text_similarity};
use recall_core::traits::{MemoryStore, Strategy};
use recall_core::types::{QueryContext, StrategyKind, StrategyOutput};

use crate::support::{by_score_then_id, entry_item, item_id, result_list};

const PREFERENCE_CATEGORY: &str = "preference";

pub struct PreferenceLookupStrategy {
    bridge: Arc<Bridge>,
    store: Arc<dyn MemoryStore>,
    config: LookupConfig,
    priority: f32,
}

impl PreferenceLookupStrategy {
    pub fn new(bridge: Arc<Bridge>, store: Arc<dyn MemoryStore>, config: LookupConfig) -> Self {
        Self {
            bridge,
            store,
            config,
            priority: 1.0,
        }
    }

    pub fn with_priority(mut self, priority: f32) -> Self {
        self.priority = priority;
        self
    }

    async fn scan_local(&self, query: &str) -> RecallResult<Vec<Value>> {
        let entries = self
            .store
            .list()
            .await
            .map_err(|e| RecallError::strategy(self.kind().to_string(), e.to_string()))?;

        let mut scored: Vec<_> = entries
            .iter()
            .filter(|e| e.category == PREFERENCE_CATEGORY)
            .map(|e| (term_overlap(query, &e.content).max(text_similarity(query, &e.content)), e))
            .filter(|(score, _)| *score >= self.config.min_score)
            .collect();
        scored.sort_by(|a, b| by_score_then_id((&a.1.id, a.0), (&b.1.id, b.0)));
        scored.truncate(self.config.limit);

        Ok(scored.into_iter().map(|(score, e)| entry_item(e, score)).collect())
    }
}

fn top_score(items: &[Value]) -> f32 {
    items
        .iter()
        .filter_map(|i| i.get("score").and_then(Value::as_f64))
        .fold(0.0_f64, f64::max) as f32
}

#[async_trait]
impl Strategy for PreferenceLookupStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PreferenceLookup
    }

    fn priority(&self) -> f32 {
        self.priority
    }

    async fn execute(&self, query: &str, context: &QueryContext) -> RecallResult<StrategyOutput> {
        let response = self
            .bridge
            .call_with_cancel(
                Operation::LookupPreferences {
                    user_id: context.user_id.clone(),
                    query: query.to_string(),
                },
                &context.cancel,
            )
            .await?;

        if !response.fallback {
            let mut items = result_list(&response.data);
            items.truncate(self.config.limit);
            for (pos, item) in items.iter_mut().enumerate() {
                let id = item_id(item, PREFERENCE_CATEGORY, pos);
                if let Value::Object(map) = item {
                    map.entry("id").or_insert(json!(id));
                }
            }
            // Remote answers without scores count as a moderate match.
            let confidence = if items.is_empty() {
                0.0
            } else {
                let top = top_score(&items);
                if top > 0.0 { top } else { 0.6 }
            };
            debug!(matched = items.len(), "Preferences served by the preference store");
            return Ok(StrategyOutput::success(json!({ "items": items }), confidence)
                .with_metadata("source", json!("preference_store")));
        }

        let items = self.scan_local(query).await?;
        debug!(matched = items.len(), reason = ?response.fallback_reason, "Preferences served from local memories");
        let confidence = top_score(&items);
        Ok(StrategyOutput::success(json!({ "items": items }), confidence)
            .with_fallback(true)
            .with_metadata("source", json!("local"))
            .with_metadata("fallback_reason", json!(response.fallback_reason)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bridge_with, store_with_category, MockWire, WireStub};
    use mockall::predicate::{always, function};
    use recall_core::bridge::{BridgeRequest, Component};

    #[tokio::test]
    async fn test_store_answer_is_used() {
        let stub = WireStub::new().answer(
            "lookup_preferences",
            json!({"results": [{"id": "p1", "content": "prefers tabs", "score": 0.9}, {"content": "dark mode"}]}),
        );
        let strategy = PreferenceLookupStrategy::new(
            bridge_with(stub, &[Component::PreferenceStore]),
            store_with_category(&[], "preference").await,
            LookupConfig::default(),
        );

        let out = strategy
            .execute("editor indentation", &QueryContext::new("test").with_user("u1"))
            .await
            .unwrap();
        assert!(!out.fallback);
        assert_eq!(out.items().len(), 2);
        assert_eq!(out.items()[1]["id"], json!(recall_core::types::memory_id_for("dark mode")));
        assert!((out.confidence - 0.9).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_user_scope_reaches_the_store() {
        let mut wire = MockWire::new();
        wire.expect_invoke()
            .with(always(), function(|req: &BridgeRequest| req.args["user_id"] == "alice"))
            .times(1)
            .returning(|_, _| Ok(json!([])));
        let strategy = PreferenceLookupStrategy::new(
            bridge_with(wire, &[Component::PreferenceStore]),
            store_with_category(&[], "preference").await,
            LookupConfig::default(),
        );

        let out = strategy
            .execute("theme", &QueryContext::new("test").with_user("alice"))
            .await
            .unwrap();
        assert!(out.items().is_empty());
        assert_eq!(out.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_local_scan_on_fallback() {
        let store = store_with_category(&["user prefers dark theme in the editor", "prefers spaces over tabs"], "preference").await;
        store
            .insert_if_absent(recall_core::types::MemoryEntry::new("dark theme docs are outdated", "fact", "test"))
            .await
            .unwrap();
        let strategy = PreferenceLookupStrategy::new(bridge_with(WireStub::new(), &[]), store, LookupConfig::default());

        let out = strategy.execute("dark theme", &QueryContext::new("test")).await.unwrap();
        assert!(out.success);
        assert!(out.fallback);
        assert_eq!(out.metadata["source"], json!("local"));
        let items = out.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["category"], "preference");
        assert_eq!(items[0]["content"], "user prefers dark theme in the editor");
    }
}
