//! Background jobs for the production monitor.
//!
//! Three repeated jobs run on tokio-cron-scheduler: metric collection from
//! registered sources, NDJSON flushing, and dashboard regeneration.

use std::sync::Arc;
use std::time::Duration;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{debug, error, info};

use super::production::ProductionMonitor;

/// Runs the monitor's periodic jobs.
///
/// # Example
///
/// ```ignore
/// use recall_core::monitor::{MonitorConfig, MonitorScheduler, ProductionMonitor};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let monitor = Arc::new(ProductionMonitor::new(MonitorConfig::default()));
/// let mut scheduler = MonitorScheduler::new(monitor).await?;
/// scheduler.start().await?;
/// // ...
/// scheduler.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct MonitorScheduler {
    scheduler: JobScheduler,
    monitor: Arc<ProductionMonitor>,
}

impl MonitorScheduler {
    /// Create the scheduler. Call `start()` to begin.
    pub async fn new(monitor: Arc<ProductionMonitor>) -> Result<Self, JobSchedulerError> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self { scheduler, monitor })
    }

    pub fn monitor(&self) -> &Arc<ProductionMonitor> {
        &self.monitor
    }

    pub async fn start(&self) -> Result<(), JobSchedulerError> {
        let config = self.monitor.config().clone();

        let monitor = self.monitor.clone();
        let collect = Job::new_repeated_async(
            Duration::from_secs(config.collect_interval_secs.max(1)),
            move |_uuid, _lock| {
                let monitor = monitor.clone();
                Box::pin(async move {
                    let collected = monitor.collect_now();
                    debug!(collected, "Metric collection complete");
                })
            },
        )?;

        let monitor = self.monitor.clone();
        let flush = Job::new_repeated_async(
            Duration::from_secs(config.flush_interval_secs.max(1)),
            move |_uuid, _lock| {
                let monitor = monitor.clone();
                Box::pin(async move {
                    match monitor.flush().await {
                        Ok(stats) => debug!(
                            metrics = stats.metrics_written,
                            alerts = stats.alerts_written,
                            "Monitor flush complete"
                        ),
                        Err(e) => error!(error = %e, "Monitor flush failed"),
                    }
                })
            },
        )?;

        let monitor = self.monitor.clone();
        let dashboard = Job::new_repeated_async(
            Duration::from_secs(config.dashboard_interval_secs.max(1)),
            move |_uuid, _lock| {
                let monitor = monitor.clone();
                Box::pin(async move {
                    match monitor.write_dashboard().await {
                        Ok(d) => debug!(status = %d.system_status, "Dashboard written"),
                        Err(e) => error!(error = %e, "Dashboard write failed"),
                    }
                })
            },
        )?;

        self.scheduler.add(collect).await?;
        self.scheduler.add(flush).await?;
        self.scheduler.add(dashboard).await?;
        self.scheduler.start().await?;
        self.monitor.set_monitoring(true);

        info!(
            log_dir = %config.log_dir.display(),
            collect_secs = config.collect_interval_secs,
            flush_secs = config.flush_interval_secs,
            dashboard_secs = config.dashboard_interval_secs,
            "Production monitoring started"
        );
        Ok(())
    }

    /// Stop the jobs, then flush and write the dashboard one last time.
    pub async fn shutdown(&mut self) -> Result<(), JobSchedulerError> {
        info!("Shutting down production monitoring");
        self.scheduler.shutdown().await?;
        self.monitor.set_monitoring(false);

        if let Err(e) = self.monitor.flush().await {
            error!(error = %e, "Final monitor flush failed");
        }
        if let Err(e) = self.monitor.write_dashboard().await {
            error!(error = %e, "Final dashboard write failed");
        }
        Ok(())
    }
}
