//! Crosscheck: admission control for the memory corpus.

mod engine;
mod store;
mod types;

pub use engine::CrosscheckEngine;
pub use store::{ArchiveStats, InMemoryStore};
pub use types::{
    CrosscheckAction, CrosscheckConfig, CrosscheckContext, CrosscheckDecision, CrosscheckStats,
    ExecutionResult, SimilarEntry, SubmitResult,
};
