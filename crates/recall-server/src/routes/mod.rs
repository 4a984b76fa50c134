//! Route definitions for the REST API.

mod coordinate;
mod crosscheck;
mod health;
mod memories;
mod monitor;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Coordination
        .route("/coordinate", post(coordinate::coordinate))
        .route("/status", get(coordinate::status))
        .route("/analytics", get(coordinate::analytics))
        // Admission control
        .route("/crosscheck/analyze", post(crosscheck::analyze))
        .route("/crosscheck/execute", post(crosscheck::execute))
        .route("/crosscheck/submit", post(crosscheck::submit))
        // Stored memories
        .route("/memories", get(memories::list_memories))
        // Monitoring
        .route("/monitor/metrics", post(monitor::record_metric))
        .route("/monitor/status", get(monitor::monitor_status))
        .route("/monitor/dashboard", get(monitor::monitor_dashboard))
        // Attach state
        .with_state(state)
}

pub use coordinate::*;
pub use crosscheck::*;
pub use health::*;
pub use memories::*;
pub use monitor::*;
