//! Production monitoring: baselines, alerts, NDJSON logs and a dashboard.

mod baseline;
mod dashboard;
mod production;
mod queue;
mod scheduler;
mod sink;

pub use baseline::{default_baselines, Baseline, Direction};
pub use dashboard::{Dashboard, SummaryStatistics, SystemStatus};
pub use production::{
    FlushStats, MonitorConfig, MonitorStatus, ProductionMonitor, ALERTS_FILE, DASHBOARD_FILE, METRICS_FILE,
};
pub use queue::DropOldestQueue;
pub use scheduler::MonitorScheduler;
pub use sink::{append_ndjson, write_json_snapshot};
