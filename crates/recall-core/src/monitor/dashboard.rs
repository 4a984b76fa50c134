//! Dashboard snapshot.

use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use super::baseline::Baseline;
use crate::types::{Alert, MetricStatus, PerformanceMetric};

const RECENT_ALERTS: usize = 10;

/// Overall health derived from the latest value of every metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SystemStatus {
    Healthy,
    Warning,
    Critical,
}

impl SystemStatus {
    /// Worst latest status wins.
    pub fn from_latest<'a>(latest: impl IntoIterator<Item = &'a PerformanceMetric>) -> Self {
        match latest.into_iter().map(|m| m.status).max() {
            Some(MetricStatus::Critical) => Self::Critical,
            Some(MetricStatus::Warning) => Self::Warning,
            _ => Self::Healthy,
        }
    }
}

/// Aggregates over a metric's history window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub current: f64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl SummaryStatistics {
    pub fn from_history(history: &VecDeque<PerformanceMetric>) -> Option<Self> {
        let current = history.back()?.value;
        let (sum, min, max) = history.iter().fold(
            (0.0, f64::INFINITY, f64::NEG_INFINITY),
            |(sum, min, max), m| (sum + m.value, min.min(m.value), max.max(m.value)),
        );
        Some(Self {
            current,
            avg: sum / history.len() as f64,
            min,
            max,
            count: history.len(),
        })
    }
}

/// Snapshot written to `dashboard.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub timestamp: DateTime<Utc>,
    pub system_status: SystemStatus,
    pub current_metrics: BTreeMap<String, PerformanceMetric>,
    pub summary_statistics: BTreeMap<String, SummaryStatistics>,
    pub alert_counts: BTreeMap<String, u64>,
    pub recent_alerts: Vec<Alert>,
    pub baselines: BTreeMap<String, Baseline>,
}

impl Dashboard {
    pub fn build(
        histories: &HashMap<String, VecDeque<PerformanceMetric>>,
        alerts: &VecDeque<Alert>,
        baselines: &BTreeMap<String, Baseline>,
    ) -> Self {
        let current_metrics: BTreeMap<String, PerformanceMetric> = histories
            .iter()
            .filter_map(|(name, h)| h.back().map(|m| (name.clone(), m.clone())))
            .collect();
        let summary_statistics = histories
            .iter()
            .filter_map(|(name, h)| SummaryStatistics::from_history(h).map(|s| (name.clone(), s)))
            .collect();

        let mut alert_counts = BTreeMap::new();
        for alert in alerts {
            *alert_counts.entry(alert.severity.to_string()).or_insert(0) += 1;
        }

        let skip = alerts.len().saturating_sub(RECENT_ALERTS);
        Self {
            timestamp: Utc::now(),
            system_status: SystemStatus::from_latest(current_metrics.values()),
            current_metrics,
            summary_statistics,
            alert_counts,
            recent_alerts: alerts.iter().skip(skip).cloned().collect(),
            baselines: baselines.clone(),
        }
    }
}
