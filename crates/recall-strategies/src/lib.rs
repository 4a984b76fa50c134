//! recall-strategies - Retrieval and enrichment strategies for recall.
//!
//! Every strategy implements [`recall_core::traits::Strategy`] and is
//! registered with the coordinator, usually through [`StrategyFactory`].
//!
//! # Strategies
//!
//! - **Memory lookup** - lexical ranking over stored memories
//! - **Hybrid search** - vector and keyword results fused with RRF
//! - **Reranking** - cross-encoder rescoring under a latency budget
//! - **Agentic extraction** - code blocks and design patterns
//! - **ECL pipeline** - entities and relationships into a knowledge graph
//! - **Preference lookup** - user preferences, scoped by user id

pub mod agentic;
pub mod ecl;
pub mod hybrid;
pub mod memory;
pub mod preference;
pub mod rerank;

mod factory;
mod support;

#[cfg(test)]
mod testing;

pub use agentic::AgenticExtractionStrategy;
pub use ecl::{EclPipeline, EclPipelineStrategy};
pub use factory::{StrategyDeps, StrategyFactory};
pub use hybrid::{RrfFusion, HybridSearchStrategy};
pub use memory::MemoryLookupStrategy;
pub use preference::PreferenceLookupStrategy;
pub use rerank::{RerankStats, RerankStrategy};

// Re-export core types
pub use recall_core::traits::Strategy;
pub use recall_core::types::{StrategyKind, StrategyOutput};
