//! Status surface for external tooling.
//!
//! Uses a tokio watch channel: readers always see the latest status and a
//! slow reader never blocks the coordinator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Latest coordinator outcome plus running counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorStatus {
    pub last_success: Option<bool>,
    pub total_queries: u64,
    pub successful_queries: u64,
    pub failed_queries: u64,
    pub cache_hits: u64,
    pub fallback_activations: u64,
    pub updated_at: DateTime<Utc>,
}

impl Default for CoordinatorStatus {
    fn default() -> Self {
        Self {
            last_success: None,
            total_queries: 0,
            successful_queries: 0,
            failed_queries: 0,
            cache_hits: 0,
            fallback_activations: 0,
            updated_at: Utc::now(),
        }
    }
}

impl CoordinatorStatus {
    /// Successful share of all queries (1.0 before the first query).
    pub fn success_rate(&self) -> f64 {
        if self.total_queries == 0 {
            1.0
        } else {
            self.successful_queries as f64 / self.total_queries as f64
        }
    }

    /// Cache hit share of all queries.
    pub fn cache_hit_rate(&self) -> f64 {
        if self.total_queries == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_queries as f64
        }
    }
}

/// Publisher side of the status surface. Clones share one channel.
#[derive(Clone)]
pub struct StatusBus {
    sender: watch::Sender<CoordinatorStatus>,
}

impl StatusBus {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(CoordinatorStatus::default());
        Self { sender }
    }

    /// Apply an update and notify subscribers.
    pub fn update(&self, f: impl FnOnce(&mut CoordinatorStatus)) {
        self.sender.send_modify(|status| {
            f(status);
            status.updated_at = Utc::now();
        });
    }

    /// Latest status.
    pub fn current(&self) -> CoordinatorStatus {
        self.sender.borrow().clone()
    }

    /// Subscribe to changes.
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorStatus> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new()
    }
}
