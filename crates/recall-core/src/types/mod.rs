//! Core types for recall.

mod memory_entry;
mod metric;
mod query;
mod strategy;

pub use memory_entry::*;
pub(crate) use memory_entry::clamp_unit;
pub use metric::*;
pub use query::*;
pub use strategy::*;
