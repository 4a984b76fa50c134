//! Server state management.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use recall_core::bridge::Bridge;
use recall_core::config::RecallConfig;
use recall_core::crosscheck::{CrosscheckEngine, InMemoryStore};
use recall_core::error::RecallResult;
use recall_core::monitor::ProductionMonitor;
use recall_core::Coordinator;
use recall_strategies::{StrategyDeps, StrategyFactory};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub config: RecallConfig,
    pub bridge: Arc<Bridge>,
    pub store: Arc<InMemoryStore>,
    pub crosscheck: Arc<CrosscheckEngine>,
    pub coordinator: Arc<Coordinator>,
    pub monitor: Arc<ProductionMonitor>,
    pub started_at: Instant,
}

impl AppState {
    /// Wire every component from configuration.
    ///
    /// The monitor is the metrics sink for the bridge, the crosscheck engine,
    /// the strategies and the coordinator, and polls each of them as a source.
    pub fn from_config(config: RecallConfig) -> RecallResult<Self> {
        let monitor = Arc::new(ProductionMonitor::new(config.monitor.clone()));
        let bridge = Arc::new(Bridge::with_default_transport(config.bridge.clone())?.with_metrics(monitor.clone()));
        let store = Arc::new(InMemoryStore::new());
        let crosscheck = Arc::new(
            CrosscheckEngine::new(config.crosscheck.clone(), store.clone()).with_metrics(monitor.clone()),
        );

        let deps = StrategyDeps {
            bridge: bridge.clone(),
            store: store.clone(),
            metrics: monitor.clone(),
        };
        let strategies = StrategyFactory::create_all(&config.strategies, &deps);
        let coordinator = Arc::new(
            Coordinator::new(config.coordinator.clone())
                .with_strategies(strategies)
                .with_metrics(monitor.clone()),
        );

        monitor.register_source(bridge.clone());
        monitor.register_source(crosscheck.clone());
        monitor.register_source(coordinator.clone());

        info!(
            strategies = ?coordinator.registered_strategies(),
            log_dir = %config.monitor.log_dir.display(),
            "Application state ready"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                bridge,
                store,
                crosscheck,
                coordinator,
                monitor,
                started_at: Instant::now(),
            }),
        })
    }

    pub fn bridge(&self) -> &Arc<Bridge> {
        &self.inner.bridge
    }

    pub fn store(&self) -> &Arc<InMemoryStore> {
        &self.inner.store
    }

    pub fn crosscheck(&self) -> &Arc<CrosscheckEngine> {
        &self.inner.crosscheck
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.inner.coordinator
    }

    pub fn monitor(&self) -> &Arc<ProductionMonitor> {
        &self.inner.monitor
    }

    pub fn uptime_secs(&self) -> u64 {
        self.inner.started_at.elapsed().as_secs()
    }
}
