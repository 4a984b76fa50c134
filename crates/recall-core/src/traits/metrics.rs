//! Metric injection seams.
//!
//! Components never reach for a global monitor; they receive a
//! [`MetricsSink`] at construction and optionally expose a [`MetricSource`]
//! that the monitor polls on its collection schedule.

use std::sync::Arc;

use crate::types::MetricSample;

/// Receiver for metric values pushed by components.
///
/// Implementations must not block: `record` is called on hot paths.
pub trait MetricsSink: Send + Sync {
    fn record(&self, name: &str, value: f64, unit: &str, component: &str);
}

/// Component that can report a snapshot of its own metrics.
pub trait MetricSource: Send + Sync {
    /// Name used in logs.
    fn source_name(&self) -> &str;

    /// Current metric values.
    fn collect(&self) -> Vec<MetricSample>;
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn record(&self, _name: &str, _value: f64, _unit: &str, _component: &str) {}
}

/// Shared no-op sink.
pub fn noop_sink() -> Arc<dyn MetricsSink> {
    Arc::new(NoopSink)
}
