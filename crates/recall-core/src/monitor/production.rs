//! Production monitor: classification, alerting, history and file output.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::baseline::{default_baselines, Baseline};
use super::dashboard::{Dashboard, SystemStatus};
use super::queue::DropOldestQueue;
use super::sink::{append_ndjson, write_json_snapshot};
use crate::error::{RecallError, RecallResult};
use crate::traits::{MetricSource, MetricsSink};
use crate::types::{Alert, AlertSeverity, MetricStatus, PerformanceMetric};

pub const METRICS_FILE: &str = "metrics.jsonl";
pub const ALERTS_FILE: &str = "alerts.jsonl";
pub const DASHBOARD_FILE: &str = "dashboard.json";

/// Monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Directory for metrics.jsonl, alerts.jsonl and dashboard.json.
    pub log_dir: PathBuf,
    pub collect_interval_secs: u64,
    pub flush_interval_secs: u64,
    pub dashboard_interval_secs: u64,
    /// Values retained per metric.
    pub history_size: usize,
    /// Alerts retained.
    pub alert_history_size: usize,
    /// Records buffered between flushes.
    pub queue_capacity: usize,
    /// Overrides and additions to the default baselines.
    pub baselines: BTreeMap<String, Baseline>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let log_dir = dirs::home_dir()
            .map(|h| h.join(".recall").join("monitoring"))
            .unwrap_or_else(|| PathBuf::from(".recall/monitoring"));
        Self {
            log_dir,
            collect_interval_secs: 30,
            flush_interval_secs: 10,
            dashboard_interval_secs: 60,
            history_size: 100,
            alert_history_size: 50,
            queue_capacity: 10_000,
            baselines: BTreeMap::new(),
        }
    }
}

impl MonitorConfig {
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = log_dir.into();
        self
    }
}

/// Result of `get_status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub is_monitoring: bool,
    pub uptime_secs: u64,
    pub metrics_tracked: usize,
    pub alerts_generated: u64,
    pub system_status: SystemStatus,
    /// Records discarded because the I/O queue was full.
    pub dropped_records: u64,
}

/// Counts from one flush.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlushStats {
    pub metrics_written: usize,
    pub alerts_written: usize,
}

#[derive(Debug, Default)]
struct MonitorState {
    histories: HashMap<String, VecDeque<PerformanceMetric>>,
    alerts: VecDeque<Alert>,
}

/// Turns metric values into statuses, alerts and a dashboard.
///
/// `record_metric` is synchronous and never touches the filesystem; records
/// go to bounded drop-oldest queues that the flush job drains.
pub struct ProductionMonitor {
    config: MonitorConfig,
    baselines: RwLock<BTreeMap<String, Baseline>>,
    state: Mutex<MonitorState>,
    metric_queue: DropOldestQueue<PerformanceMetric>,
    alert_queue: DropOldestQueue<Alert>,
    sources: Mutex<Vec<Arc<dyn MetricSource>>>,
    alerts_generated: AtomicU64,
    monitoring: AtomicBool,
    created_at: Instant,
    started_at: Mutex<Option<Instant>>,
}

impl ProductionMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        let mut baselines = default_baselines();
        for (name, baseline) in &config.baselines {
            if !baseline.is_consistent() {
                warn!(metric = %name, "Baseline thresholds are not ordered for their direction");
            }
            baselines.insert(name.clone(), *baseline);
        }

        Self {
            metric_queue: DropOldestQueue::new(config.queue_capacity),
            alert_queue: DropOldestQueue::new(config.queue_capacity),
            config,
            baselines: RwLock::new(baselines),
            state: Mutex::new(MonitorState::default()),
            sources: Mutex::new(Vec::new()),
            alerts_generated: AtomicU64::new(0),
            monitoring: AtomicBool::new(false),
            created_at: Instant::now(),
            started_at: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Baseline for a metric.
    pub fn baseline(&self, name: &str) -> RecallResult<Baseline> {
        self.baselines
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .copied()
            .ok_or_else(|| RecallError::ConfigMissing(name.to_string()))
    }

    /// Add or replace a baseline.
    pub fn set_baseline(&self, name: impl Into<String>, baseline: Baseline) {
        self.baselines
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.into(), baseline);
    }

    pub fn baselines(&self) -> BTreeMap<String, Baseline> {
        self.baselines.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Register a component polled by the collect job.
    pub fn register_source(&self, source: Arc<dyn MetricSource>) {
        self.sources
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(source);
    }

    /// Classify, store and (for warning/critical values) alert.
    ///
    /// Metrics without a baseline are classified as normal.
    pub fn record_metric(&self, name: &str, value: f64, unit: &str, component: &str) -> PerformanceMetric {
        let (status, baseline) = match self.baseline(name) {
            Ok(baseline) => (baseline.classify(value), Some(baseline)),
            Err(e) => {
                debug!(metric = name, "{}", e);
                (MetricStatus::Normal, None)
            }
        };

        let metric = PerformanceMetric {
            name: name.to_string(),
            value,
            unit: unit.to_string(),
            component: component.to_string(),
            status,
            timestamp: Utc::now(),
        };

        let alert = match (AlertSeverity::for_status(status), baseline) {
            (Some(severity), Some(baseline)) => Some(Alert {
                id: uuid::Uuid::new_v4().to_string(),
                timestamp: metric.timestamp,
                severity,
                component: component.to_string(),
                metric: name.to_string(),
                message: format!(
                    "{} is {} at {:.2}{} (threshold {:.2}, target {:.2})",
                    name, status, value, unit, baseline.threshold_for(status), baseline.target
                ),
                metric_value: value,
                threshold: baseline.threshold_for(status),
            }),
            _ => None,
        };

        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let history = state.histories.entry(name.to_string()).or_default();
            if history.len() >= self.config.history_size.max(1) {
                history.pop_front();
            }
            history.push_back(metric.clone());

            if let Some(alert) = &alert {
                if state.alerts.len() >= self.config.alert_history_size.max(1) {
                    state.alerts.pop_front();
                }
                state.alerts.push_back(alert.clone());
            }
        }

        self.metric_queue.push(metric.clone());
        if let Some(alert) = alert {
            self.alerts_generated.fetch_add(1, Ordering::Relaxed);
            self.alert_queue.push(alert);
        }
        metric
    }

    /// Poll every registered source once. Returns the number of samples.
    pub fn collect_now(&self) -> usize {
        let sources: Vec<Arc<dyn MetricSource>> =
            self.sources.lock().unwrap_or_else(|e| e.into_inner()).clone();
        let mut collected = 0;
        for source in sources {
            let samples = source.collect();
            debug!(source = source.source_name(), samples = samples.len(), "Collected metrics");
            for sample in samples {
                self.record_metric(&sample.name, sample.value, &sample.unit, &sample.component);
                collected += 1;
            }
        }
        collected
    }

    /// Append queued metrics and alerts to their NDJSON files.
    pub async fn flush(&self) -> RecallResult<FlushStats> {
        let mut stats = FlushStats::default();

        let metrics = self.metric_queue.drain();
        match append_ndjson(&self.config.log_dir.join(METRICS_FILE), &metrics).await {
            Ok(n) => stats.metrics_written = n,
            Err(e) => {
                self.metric_queue.requeue(metrics);
                return Err(e);
            }
        }

        let alerts = self.alert_queue.drain();
        for alert in &alerts {
            match alert.severity {
                AlertSeverity::High => error!(
                    alert_id = %alert.id,
                    component = %alert.component,
                    metric = %alert.metric,
                    value = alert.metric_value,
                    "{}", alert.message
                ),
                _ => warn!(
                    alert_id = %alert.id,
                    component = %alert.component,
                    metric = %alert.metric,
                    value = alert.metric_value,
                    "{}", alert.message
                ),
            }
        }
        match append_ndjson(&self.config.log_dir.join(ALERTS_FILE), &alerts).await {
            Ok(n) => stats.alerts_written = n,
            Err(e) => {
                self.alert_queue.requeue(alerts);
                return Err(e);
            }
        }

        Ok(stats)
    }

    /// Current dashboard snapshot.
    pub fn dashboard(&self) -> Dashboard {
        let baselines = self.baselines();
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Dashboard::build(&state.histories, &state.alerts, &baselines)
    }

    /// Recompute the dashboard and overwrite dashboard.json.
    pub async fn write_dashboard(&self) -> RecallResult<Dashboard> {
        let dashboard = self.dashboard();
        write_json_snapshot(&self.config.log_dir.join(DASHBOARD_FILE), &dashboard).await?;
        Ok(dashboard)
    }

    /// History window of a metric, oldest first.
    pub fn history(&self, name: &str) -> Vec<PerformanceMetric> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .histories
            .get(name)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The most recent alerts, oldest first.
    pub fn recent_alerts(&self, limit: usize) -> Vec<Alert> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let skip = state.alerts.len().saturating_sub(limit);
        state.alerts.iter().skip(skip).cloned().collect()
    }

    pub(crate) fn set_monitoring(&self, on: bool) {
        self.monitoring.store(on, Ordering::SeqCst);
        let mut started = self.started_at.lock().unwrap_or_else(|e| e.into_inner());
        *started = on.then(Instant::now);
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitoring.load(Ordering::SeqCst)
    }

    pub fn get_status(&self) -> MonitorStatus {
        let uptime_from = self
            .started_at
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .unwrap_or(self.created_at);
        let (metrics_tracked, system_status) = {
            let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            (
                state.histories.len(),
                SystemStatus::from_latest(state.histories.values().filter_map(|h| h.back())),
            )
        };

        MonitorStatus {
            is_monitoring: self.is_monitoring(),
            uptime_secs: uptime_from.elapsed().as_secs(),
            metrics_tracked,
            alerts_generated: self.alerts_generated.load(Ordering::Relaxed),
            system_status,
            dropped_records: self.metric_queue.dropped() + self.alert_queue.dropped(),
        }
    }
}

impl MetricsSink for ProductionMonitor {
    fn record(&self, name: &str, value: f64, unit: &str, component: &str) {
        self.record_metric(name, value, unit, component);
    }
}
