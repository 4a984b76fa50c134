//! Core traits for recall components.

mod memory_store;
mod metrics;
mod strategy;

pub use memory_store::*;
pub use metrics::*;
pub use strategy::*;
