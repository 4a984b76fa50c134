//! Query coordination: analysis, routing, concurrent execution, caching
//! and aggregation, with a status surface for external tooling.

mod aggregate;
mod analysis;
mod cache;
mod engine;
mod routing;
mod status;
mod types;

pub use aggregate::aggregate;
pub use analysis::QueryAnalyzer;
pub use cache::{cache_key, ResultCache};
pub use engine::Coordinator;
pub use routing::{base_strategies, Router};
pub use status::{CoordinatorStatus, StatusBus};
pub use types::{
    AggregatedResults, CoordinationMetadata, CoordinationResult, CoordinatorConfig, RoutingAnalytics,
};
