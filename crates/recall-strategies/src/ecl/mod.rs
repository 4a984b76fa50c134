//! Extract, cognify, load: turns free text into a knowledge graph.
//!
//! Runs are memoized by the SHA-256 of the input so the same content is only
//! loaded into the graph once while it stays cached.

mod cognify;
mod extract;
mod load;

pub use cognify::{cognify, Relationship};
pub use extract::{extract_entities, Entity, EntityClass};
pub use load::{EntityNode, KnowledgeGraph, LoadReport, RelationEdge};

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use recall_core::bridge::{Bridge, Operation};
use recall_core::config::EclConfig;
use recall_core::error::RecallResult;
use recall_core::traits::Strategy;
use recall_core::types::{QueryContext, StrategyKind, StrategyOutput};

/// Result of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
    pub load: LoadReport,
}

impl PipelineRun {
    /// Mean relationship confidence, 0.5 with entities but no relationships,
    /// 0.1 with nothing found.
    pub fn confidence(&self) -> f32 {
        if self.entities.is_empty() {
            0.1
        } else if self.relationships.is_empty() {
            0.5
        } else {
            self.relationships.iter().map(|r| r.confidence).sum::<f32>() / self.relationships.len() as f32
        }
    }
}

fn content_key(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Bounded run cache, oldest entry evicted first.
#[derive(Debug)]
struct RunCache {
    capacity: usize,
    runs: HashMap<String, PipelineRun>,
    order: VecDeque<String>,
}

impl RunCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            runs: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, key: &str) -> Option<PipelineRun> {
        self.runs.get(key).cloned()
    }

    fn put(&mut self, key: String, run: PipelineRun) {
        if self.capacity == 0 {
            return;
        }
        if self.runs.insert(key.clone(), run).is_none() {
            self.order.push_back(key);
        }
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.runs.remove(&oldest);
            }
        }
    }

    fn len(&self) -> usize {
        self.runs.len()
    }
}

/// The local pipeline: extraction, co-occurrence and graph load.
pub struct EclPipeline {
    config: EclConfig,
    graph: Mutex<KnowledgeGraph>,
    cache: Mutex<RunCache>,
}

impl EclPipeline {
    pub fn new(config: EclConfig) -> Self {
        Self {
            cache: Mutex::new(RunCache::new(config.cache_size)),
            graph: Mutex::new(KnowledgeGraph::new()),
            config,
        }
    }

    /// Run the pipeline. Returns the run and whether it came from the cache.
    pub fn process(&self, text: &str) -> (PipelineRun, bool) {
        let key = content_key(text);
        if let Some(run) = self.cache.lock().unwrap_or_else(|e| e.into_inner()).get(&key) {
            return (run, true);
        }

        let entities = extract_entities(text, self.config.min_generic_frequency, self.config.max_entities);
        let relationships = cognify(text, &entities);
        let load = self
            .graph
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .load(&entities, &relationships);

        let run = PipelineRun {
            entities,
            relationships,
            load,
        };
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .put(key, run.clone());
        (run, false)
    }

    /// (entities, relationships) currently in the graph.
    pub fn graph_size(&self) -> (usize, usize) {
        let graph = self.graph.lock().unwrap_or_else(|e| e.into_inner());
        (graph.entity_count(), graph.relationship_count())
    }

    /// Neighbour keys of an entity, strongest relationship first.
    pub fn related(&self, key: &str) -> Vec<String> {
        let graph = self.graph.lock().unwrap_or_else(|e| e.into_inner());
        graph
            .neighbors(&key.to_lowercase())
            .into_iter()
            .map(|(node, _)| node.key.clone())
            .collect()
    }

    pub fn cached_runs(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Strategy wrapper around [`EclPipeline`] that mirrors fresh loads to the
/// knowledge-graph component.
pub struct EclPipelineStrategy {
    bridge: Arc<Bridge>,
    pipeline: EclPipeline,
    push_to_bridge: bool,
    priority: f32,
}

impl EclPipelineStrategy {
    pub fn new(bridge: Arc<Bridge>, config: EclConfig) -> Self {
        Self {
            bridge,
            push_to_bridge: config.push_to_bridge,
            pipeline: EclPipeline::new(config),
            priority: 1.0,
        }
    }

    pub fn with_priority(mut self, priority: f32) -> Self {
        self.priority = priority;
        self
    }

    pub fn pipeline(&self) -> &EclPipeline {
        &self.pipeline
    }

    /// Best-effort push; the local graph stays authoritative.
    async fn push(&self, run: &PipelineRun, context: &QueryContext) -> bool {
        let entities: Vec<Value> = run.entities.iter().filter_map(|e| serde_json::to_value(e).ok()).collect();
        let relationships: Vec<Value> = run
            .relationships
            .iter()
            .filter_map(|r| serde_json::to_value(r).ok())
            .collect();

        match self
            .bridge
            .call_with_cancel(Operation::LoadGraph { entities, relationships }, &context.cancel)
            .await
        {
            Ok(response) if !response.fallback => true,
            Ok(response) => {
                debug!(reason = ?response.fallback_reason, "Knowledge graph component unavailable");
                false
            }
            Err(e) => {
                warn!(error = %e, "Knowledge graph push failed");
                false
            }
        }
    }
}

#[async_trait]
impl Strategy for EclPipelineStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::EclPipeline
    }

    fn priority(&self) -> f32 {
        self.priority
    }

    async fn execute(&self, query: &str, context: &QueryContext) -> RecallResult<StrategyOutput> {
        let (run, cache_hit) = self.pipeline.process(query);

        let pushed = if cache_hit || !self.push_to_bridge || run.entities.is_empty() {
            false
        } else {
            self.push(&run, context).await
        };

        debug!(
            entities = run.entities.len(),
            relationships = run.relationships.len(),
            cache_hit,
            pushed,
            "ECL pipeline complete"
        );

        let confidence = run.confidence();
        Ok(StrategyOutput::success(
            json!({
                "entities": run.entities,
                "relationships": run.relationships,
                "load": run.load,
            }),
            confidence,
        )
        .with_metadata("cache_hit", json!(cache_hit))
        .with_metadata("graph_pushed", json!(pushed)))
    }
}
