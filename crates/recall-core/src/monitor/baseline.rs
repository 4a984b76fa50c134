//! Metric baselines and threshold classification.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::MetricStatus;

/// Which way is good for a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

/// Target and alert thresholds for one metric.
///
/// A value is critical once it crosses `critical` (strictly), warning once
/// it crosses `warning`, and normal otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub target: f64,
    pub warning: f64,
    pub critical: f64,
    pub direction: Direction,
}

impl Baseline {
    pub const fn lower_is_better(target: f64, warning: f64, critical: f64) -> Self {
        Self {
            target,
            warning,
            critical,
            direction: Direction::LowerIsBetter,
        }
    }

    pub const fn higher_is_better(target: f64, warning: f64, critical: f64) -> Self {
        Self {
            target,
            warning,
            critical,
            direction: Direction::HigherIsBetter,
        }
    }

    /// Classify a value.
    pub fn classify(&self, value: f64) -> MetricStatus {
        let crosses = |threshold: f64| match self.direction {
            Direction::LowerIsBetter => value > threshold,
            Direction::HigherIsBetter => value < threshold,
        };
        if crosses(self.critical) {
            MetricStatus::Critical
        } else if crosses(self.warning) {
            MetricStatus::Warning
        } else {
            MetricStatus::Normal
        }
    }

    /// Threshold crossed for a status (the target for normal values).
    pub fn threshold_for(&self, status: MetricStatus) -> f64 {
        match status {
            MetricStatus::Normal => self.target,
            MetricStatus::Warning => self.warning,
            MetricStatus::Critical => self.critical,
        }
    }

    /// Whether the thresholds are ordered consistently with the direction.
    pub fn is_consistent(&self) -> bool {
        match self.direction {
            Direction::LowerIsBetter => self.target <= self.warning && self.warning <= self.critical,
            Direction::HigherIsBetter => self.target >= self.warning && self.warning >= self.critical,
        }
    }
}

/// Baselines for the metrics the core components emit.
pub fn default_baselines() -> BTreeMap<String, Baseline> {
    [
        ("response_time_ms", Baseline::lower_is_better(200.0, 500.0, 1000.0)),
        ("coordination_latency_ms", Baseline::lower_is_better(500.0, 2000.0, 5000.0)),
        ("bridge_latency_ms", Baseline::lower_is_better(100.0, 1000.0, 5000.0)),
        ("rerank_latency_ms", Baseline::lower_is_better(50.0, 100.0, 200.0)),
        ("crosscheck_latency_ms", Baseline::lower_is_better(20.0, 100.0, 500.0)),
        ("success_rate", Baseline::higher_is_better(0.99, 0.95, 0.90)),
        ("coordination_success_rate", Baseline::higher_is_better(0.95, 0.90, 0.80)),
        ("bridge_success_rate", Baseline::higher_is_better(0.95, 0.85, 0.70)),
        ("cache_hit_rate", Baseline::higher_is_better(0.30, 0.05, 0.0)),
        ("rerank_budget_compliance", Baseline::higher_is_better(1.0, 0.5, 0.0)),
        ("error_rate", Baseline::lower_is_better(0.01, 0.05, 0.10)),
        ("bridge_fallback_rate", Baseline::lower_is_better(0.05, 0.20, 0.50)),
        ("memory_usage_mb", Baseline::lower_is_better(256.0, 512.0, 1024.0)),
    ]
    .into_iter()
    .map(|(name, baseline)| (name.to_string(), baseline))
    .collect()
}
