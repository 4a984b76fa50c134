//! TTL result cache for coordinations.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use super::types::CoordinationResult;
use crate::types::{normalize_query, QueryContext};

/// Cache key: SHA-256 of the normalized query and the context fingerprint.
pub fn cache_key(query: &str, context: &QueryContext) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_query(query).as_bytes());
    hasher.update(b"\x00");
    hasher.update(context.fingerprint().as_bytes());
    hex::encode(hasher.finalize())
}

struct CacheEntry {
    result: CoordinationResult,
    inserted_at: Instant,
}

/// Bounded TTL cache. Expired entries are evicted first, then the oldest.
pub struct ResultCache {
    ttl: Duration,
    max_entries: usize,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ResultCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Fresh entry for `key`, if any.
    pub async fn get(&self, key: &str) -> Option<CoordinationResult> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.inserted_at.elapsed() < self.ttl)
            .map(|e| e.result.clone())
    }

    /// Store a result.
    pub async fn insert(&self, key: String, result: CoordinationResult) {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            let ttl = self.ttl;
            entries.retain(|_, e| e.inserted_at.elapsed() < ttl);
            if entries.len() >= self.max_entries {
                if let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, e)| e.inserted_at)
                    .map(|(k, _)| k.clone())
                {
                    entries.remove(&oldest);
                }
            }
        }
        entries.insert(
            key,
            CacheEntry {
                result,
                inserted_at: Instant::now(),
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::types::{AggregatedResults, CoordinationMetadata};
    use crate::types::{Complexity, QueryAnalysis, QueryFlags, QueryType, RoutingDecision};
    use chrono::Utc;

    fn result(id: &str) -> CoordinationResult {
        CoordinationResult {
            success: true,
            results: AggregatedResults::default(),
            strategies_used: vec![],
            routing_decision: RoutingDecision {
                query_analysis: QueryAnalysis {
                    query_type: QueryType::General,
                    complexity: Complexity::Low,
                    flags: QueryFlags::default(),
                    token_count: 1,
                },
                selected_strategies: vec![],
                timestamp: Utc::now(),
            },
            fallback_activated: false,
            metadata: CoordinationMetadata {
                request_id: id.to_string(),
                latency_ms: 0,
                cache_hit: false,
                query_type: QueryType::General,
                complexity: Complexity::Low,
                errors: Default::default(),
                timestamp: Utc::now(),
            },
        }
    }

    #[test]
    fn test_key_normalizes_query() {
        let ctx = QueryContext::new("cli");
        assert_eq!(cache_key("Find  Bugs", &ctx), cache_key("find bugs", &ctx));
        assert_ne!(cache_key("find bugs", &ctx), cache_key("find bugs", &QueryContext::new("hook")));
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let cache = ResultCache::new(Duration::from_millis(30), 10);
        cache.insert("k".into(), result("a")).await;
        assert!(cache.get("k").await.is_some());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn test_evicts_oldest_when_full() {
        let cache = ResultCache::new(Duration::from_secs(60), 2);
        cache.insert("a".into(), result("a")).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.insert("b".into(), result("b")).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.insert("c".into(), result("c")).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get("a").await.is_none());
        assert_eq!(cache.get("c").await.unwrap().metadata.request_id, "c");
    }
}
