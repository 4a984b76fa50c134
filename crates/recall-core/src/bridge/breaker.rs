//! Per-component circuit breaker.
//!
//! ```text
//! ┌────────┐  N failures   ┌────────┐  cooldown   ┌──────────┐
//! │ Closed ├──────────────►│  Open  ├────────────►│ HalfOpen │
//! └───▲────┘               └───▲────┘             └────┬─────┘
//!     │                        │   trial failure       │
//!     │  trial success         └───────────────────────┤
//!     └────────────────────────────────────────────────┘
//! ```
//!
//! While half-open exactly one trial call is admitted; concurrent callers are
//! rejected until the trial reports back. All transitions happen under a
//! single mutex that is never held across an await.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{info, warn};

use super::operation::Component;

/// Circuit breaker state for a single component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CircuitState {
    /// Healthy: all calls go through.
    Closed,
    /// Tripped: calls are short-circuited until the cooldown expires.
    Open,
    /// Cooldown elapsed: one trial call decides the next state.
    HalfOpen,
}

/// Admission decision for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permit {
    /// Normal call (retries allowed).
    Allowed,
    /// The single half-open trial (no retries).
    Trial,
    /// Short-circuited; no IPC may happen.
    Rejected,
}

#[derive(Debug, Clone)]
struct ComponentHealth {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

impl Default for ComponentHealth {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            trial_in_flight: false,
        }
    }
}

/// Breaker thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures before tripping to open.
    pub failure_threshold: u32,
    /// Milliseconds to stay open before admitting a trial.
    pub cooldown_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_ms: 30_000,
        }
    }
}

/// Snapshot of one component's breaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakerSnapshot {
    pub component: Component,
    pub state: CircuitState,
    pub consecutive_failures: u32,
}

/// Per-component circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    components: Mutex<HashMap<Component, ComponentHealth>>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker.
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config: BreakerConfig {
                failure_threshold: config.failure_threshold.max(1),
                cooldown_ms: config.cooldown_ms,
            },
            components: Mutex::new(HashMap::new()),
        }
    }

    fn cooldown(&self) -> Duration {
        Duration::from_millis(self.config.cooldown_ms)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Component, ComponentHealth>> {
        // A panic while holding the lock cannot leave a half-written transition
        // behind, so a poisoned map is still consistent.
        self.components.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Decide whether a call to `component` may proceed.
    pub fn try_acquire(&self, component: Component) -> Permit {
        let cooldown = self.cooldown();
        let mut components = self.lock();
        let health = components.entry(component).or_default();

        match health.state {
            CircuitState::Closed => Permit::Allowed,
            CircuitState::Open => {
                let elapsed = health.opened_at.map_or(true, |t| t.elapsed() >= cooldown);
                if elapsed {
                    health.state = CircuitState::HalfOpen;
                    health.trial_in_flight = true;
                    info!(component = %component, "Circuit half-open, admitting trial call");
                    Permit::Trial
                } else {
                    Permit::Rejected
                }
            }
            CircuitState::HalfOpen => {
                if health.trial_in_flight {
                    Permit::Rejected
                } else {
                    health.trial_in_flight = true;
                    Permit::Trial
                }
            }
        }
    }

    /// Record a successful call.
    pub fn record_success(&self, component: Component) {
        let mut components = self.lock();
        let health = components.entry(component).or_default();
        if health.state != CircuitState::Closed {
            info!(component = %component, "Circuit closed after successful trial");
        }
        *health = ComponentHealth::default();
    }

    /// Record a failed call (timeout, non-zero exit, malformed response).
    pub fn record_failure(&self, component: Component) {
        let threshold = self.config.failure_threshold;
        let mut components = self.lock();
        let health = components.entry(component).or_default();
        health.consecutive_failures = health.consecutive_failures.saturating_add(1);

        match health.state {
            CircuitState::HalfOpen => {
                health.state = CircuitState::Open;
                health.opened_at = Some(Instant::now());
                health.trial_in_flight = false;
                warn!(component = %component, "Trial call failed, circuit re-opened");
            }
            CircuitState::Closed if health.consecutive_failures >= threshold => {
                health.state = CircuitState::Open;
                health.opened_at = Some(Instant::now());
                warn!(
                    component = %component,
                    failures = health.consecutive_failures,
                    cooldown_ms = self.config.cooldown_ms,
                    "Circuit opened"
                );
            }
            _ => {}
        }
    }

    /// Give back a trial permit whose call was cancelled before completing.
    pub fn release_trial(&self, component: Component) {
        let mut components = self.lock();
        if let Some(health) = components.get_mut(&component) {
            if health.state == CircuitState::HalfOpen {
                health.trial_in_flight = false;
            }
        }
    }

    /// Current state of a component.
    pub fn state(&self, component: Component) -> CircuitState {
        self.lock()
            .get(&component)
            .map_or(CircuitState::Closed, |h| h.state)
    }

    /// Snapshot of every tracked component.
    pub fn snapshot(&self) -> Vec<BreakerSnapshot> {
        let mut report: Vec<BreakerSnapshot> = self
            .lock()
            .iter()
            .map(|(component, health)| BreakerSnapshot {
                component: *component,
                state: health.state,
                consecutive_failures: health.consecutive_failures,
            })
            .collect();
        report.sort_by_key(|s| s.component);
        report
    }

    /// Reset all components to closed.
    pub fn reset(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_breaker(threshold: u32, cooldown_ms: u64) -> CircuitBreaker {
        CircuitBreaker::new(BreakerConfig {
            failure_threshold: threshold,
            cooldown_ms,
        })
    }

    #[test]
    fn initial_state_is_closed() {
        let breaker = make_breaker(3, 60_000);
        assert_eq!(breaker.state(Component::VectorIndex), CircuitState::Closed);
        assert_eq!(breaker.try_acquire(Component::VectorIndex), Permit::Allowed);
    }

    #[test]
    fn stays_closed_below_threshold() {
        let breaker = make_breaker(3, 60_000);
        breaker.record_failure(Component::CrossEncoder);
        breaker.record_failure(Component::CrossEncoder);
        assert_eq!(breaker.state(Component::CrossEncoder), CircuitState::Closed);
    }

    #[test]
    fn trips_to_open_at_threshold_and_rejects() {
        let breaker = make_breaker(3, 60_000);
        for _ in 0..3 {
            breaker.record_failure(Component::CrossEncoder);
        }
        assert_eq!(breaker.state(Component::CrossEncoder), CircuitState::Open);
        assert_eq!(breaker.try_acquire(Component::CrossEncoder), Permit::Rejected);
    }

    #[test]
    fn half_open_admits_exactly_one_trial() {
        let breaker = make_breaker(1, 0);
        breaker.record_failure(Component::PatternMiner);
        assert_eq!(breaker.try_acquire(Component::PatternMiner), Permit::Trial);
        assert_eq!(breaker.state(Component::PatternMiner), CircuitState::HalfOpen);
        assert_eq!(breaker.try_acquire(Component::PatternMiner), Permit::Rejected);
        assert_eq!(breaker.try_acquire(Component::PatternMiner), Permit::Rejected);
    }

    #[test]
    fn trial_success_closes() {
        let breaker = make_breaker(1, 0);
        breaker.record_failure(Component::KeywordIndex);
        assert_eq!(breaker.try_acquire(Component::KeywordIndex), Permit::Trial);
        breaker.record_success(Component::KeywordIndex);
        assert_eq!(breaker.state(Component::KeywordIndex), CircuitState::Closed);
        assert_eq!(breaker.try_acquire(Component::KeywordIndex), Permit::Allowed);
    }

    #[test]
    fn trial_failure_reopens() {
        let breaker = make_breaker(1, 0);
        breaker.record_failure(Component::KeywordIndex);
        assert_eq!(breaker.try_acquire(Component::KeywordIndex), Permit::Trial);
        breaker.record_failure(Component::KeywordIndex);
        assert_eq!(breaker.state(Component::KeywordIndex), CircuitState::Open);
    }

    #[test]
    fn released_trial_can_be_retaken() {
        let breaker = make_breaker(1, 0);
        breaker.record_failure(Component::VectorIndex);
        assert_eq!(breaker.try_acquire(Component::VectorIndex), Permit::Trial);
        breaker.release_trial(Component::VectorIndex);
        assert_eq!(breaker.try_acquire(Component::VectorIndex), Permit::Trial);
    }

    #[test]
    fn components_are_independent() {
        let breaker = make_breaker(2, 60_000);
        breaker.record_failure(Component::VectorIndex);
        breaker.record_failure(Component::VectorIndex);
        assert_eq!(breaker.state(Component::VectorIndex), CircuitState::Open);
        assert_eq!(breaker.state(Component::KeywordIndex), CircuitState::Closed);
        assert_eq!(breaker.try_acquire(Component::KeywordIndex), Permit::Allowed);
    }

    #[test]
    fn success_resets_consecutive_failures() {
        let breaker = make_breaker(3, 60_000);
        for _ in 0..10 {
            breaker.record_failure(Component::CrossEncoder);
            breaker.record_failure(Component::CrossEncoder);
            breaker.record_success(Component::CrossEncoder);
        }
        assert_eq!(breaker.state(Component::CrossEncoder), CircuitState::Closed);
    }

    #[test]
    fn snapshot_and_reset() {
        let breaker = make_breaker(3, 60_000);
        breaker.record_failure(Component::VectorIndex);
        breaker.record_success(Component::KeywordIndex);
        let report = breaker.snapshot();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].component, Component::VectorIndex);
        assert_eq!(report[0].consecutive_failures, 1);

        breaker.reset();
        assert!(breaker.snapshot().is_empty());
    }

    #[test]
    fn concurrent_acquire_yields_single_trial() {
        use std::sync::Arc;

        let breaker = Arc::new(make_breaker(1, 0));
        breaker.record_failure(Component::CrossEncoder);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let breaker = breaker.clone();
                std::thread::spawn(move || breaker.try_acquire(Component::CrossEncoder))
            })
            .collect();
        let permits: Vec<Permit> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(permits.iter().filter(|p| **p == Permit::Trial).count(), 1);
    }
}
