//! recall-core - Core library for recall.
//!
//! This crate provides the query coordinator, the out-of-process bridge,
//! crosscheck admission control and the production monitor. Strategy
//! implementations live in `recall-strategies`.
//!
//! # Example
//!
//! ```ignore
//! use recall_core::{Coordinator, CoordinatorConfig, QueryContext};
//!
//! let coordinator = Coordinator::new(CoordinatorConfig::default())
//!     .with_strategies(strategies);
//!
//! let result = coordinator
//!     .coordinate("how do I fix this borrow checker error?", QueryContext::new("cli"))
//!     .await?;
//! println!("{} results from {:?}", result.results.result_count, result.strategies_used);
//! ```

pub mod bridge;
pub mod config;
pub mod coordinator;
pub mod crosscheck;
pub mod error;
pub mod monitor;
pub mod text;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use bridge::{Bridge, BridgeConfig, BridgeResponse, Component, FallbackReason, Operation};
pub use config::{RecallConfig, StrategyConfig};
pub use coordinator::{CoordinationResult, Coordinator, CoordinatorConfig, CoordinatorStatus, StatusBus};
pub use crosscheck::{
    CrosscheckAction, CrosscheckConfig, CrosscheckContext, CrosscheckDecision, CrosscheckEngine,
    ExecutionResult, InMemoryStore,
};
pub use error::{ErrorCode, RecallError, RecallResult};
pub use monitor::{MonitorConfig, MonitorScheduler, ProductionMonitor};
pub use traits::{MemoryStore, MetricSource, MetricsSink, Strategy};
pub use types::{
    MemoryEntry, QueryAnalysis, QueryContext, QueryType, RoutingDecision, StrategyKind,
    StrategyOutput, StrategyResult,
};
