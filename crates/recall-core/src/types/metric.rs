//! Performance metric and alert types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Classification of a metric value against its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MetricStatus {
    Normal,
    Warning,
    Critical,
}

/// One recorded metric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetric {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub component: String,
    pub status: MetricStatus,
    pub timestamp: DateTime<Utc>,
}

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
}

impl AlertSeverity {
    /// Severity for a status; `None` for normal values.
    pub fn for_status(status: MetricStatus) -> Option<Self> {
        match status {
            MetricStatus::Normal => None,
            MetricStatus::Warning => Some(Self::Medium),
            MetricStatus::Critical => Some(Self::High),
        }
    }
}

/// An alert raised by the production monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub severity: AlertSeverity,
    pub component: String,
    pub metric: String,
    pub message: String,
    pub metric_value: f64,
    /// The threshold that was crossed.
    pub threshold: f64,
}

/// A value pulled from a [`MetricSource`](crate::traits::MetricSource).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub component: String,
}

impl MetricSample {
    pub fn new(name: impl Into<String>, value: f64, unit: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            unit: unit.into(),
            component: component.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_for_status() {
        assert_eq!(AlertSeverity::for_status(MetricStatus::Normal), None);
        assert_eq!(AlertSeverity::for_status(MetricStatus::Warning), Some(AlertSeverity::Medium));
        assert_eq!(AlertSeverity::for_status(MetricStatus::Critical), Some(AlertSeverity::High));
    }

    #[test]
    fn test_status_ordering() {
        assert!(MetricStatus::Critical > MetricStatus::Warning);
        assert!(MetricStatus::Warning > MetricStatus::Normal);
    }
}
