//! The bridge: typed, breaker-guarded calls into external components.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use backon::{ExponentialBuilder, Retryable};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::breaker::{BreakerConfig, BreakerSnapshot, CircuitBreaker, CircuitState, Permit};
use super::fallback::{fallback_error, fallback_payload, FallbackReason};
use super::operation::{Component, Operation};
use super::transport::{ComponentEndpoint, EndpointTransport, Transport, TransportError};
use crate::error::{RecallError, RecallResult};
use crate::traits::{noop_sink, MetricSource, MetricsSink};
use crate::types::MetricSample;

const RECENT_CALLS: usize = 100;

/// Bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
    /// Initial retry delay in milliseconds.
    pub retry_min_delay_ms: u64,
    /// Maximum retry delay in milliseconds.
    pub retry_max_delay_ms: u64,
    /// Circuit breaker thresholds.
    pub breaker: BreakerConfig,
    /// Endpoints keyed by component name (e.g. `cross_encoder`).
    pub components: BTreeMap<String, ComponentEndpoint>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_retries: 2,
            retry_min_delay_ms: 50,
            retry_max_delay_ms: 1_000,
            breaker: BreakerConfig::default(),
            components: BTreeMap::new(),
        }
    }
}

impl BridgeConfig {
    /// Register an endpoint for a component.
    pub fn with_component(mut self, component: Component, endpoint: ComponentEndpoint) -> Self {
        self.components.insert(component.to_string(), endpoint);
        self
    }

    /// Validate endpoint names and declared methods.
    pub fn validate(&self) -> RecallResult<HashMap<Component, ComponentEndpoint>> {
        let mut endpoints = HashMap::new();
        for (name, endpoint) in &self.components {
            let component: Component = name.parse().map_err(|_| {
                RecallError::Configuration(format!(
                    "unknown bridge component '{}'; expected one of {:?}",
                    name,
                    Component::all().iter().map(|c| c.to_string()).collect::<Vec<_>>()
                ))
            })?;
            if endpoint.target.trim().is_empty() {
                return Err(RecallError::Configuration(format!(
                    "bridge component '{}' has an empty target",
                    name
                )));
            }
            if let Some(method) = endpoint.methods.iter().find(|m| !component.supports(m)) {
                return Err(RecallError::unsupported(component.to_string(), method.clone()));
            }
            endpoints.insert(component, endpoint.clone());
        }
        Ok(endpoints)
    }
}

/// Outcome of a bridge call as seen by the breaker and the metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CallOutcome {
    Success,
    Fallback,
    Error,
}

/// One bridge call, kept in a bounded recent-call log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeCallRecord {
    pub component: Component,
    pub method: String,
    pub latency_ms: u64,
    pub outcome: CallOutcome,
    pub timestamp: DateTime<Utc>,
}

/// Normalized bridge answer. `fallback` distinguishes degraded answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeResponse {
    pub component: Component,
    pub method: String,
    pub data: serde_json::Value,
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
    pub latency_ms: u64,
    pub attempts: u32,
}

impl BridgeResponse {
    /// Error equivalent of a fallback (None for real answers).
    pub fn degradation(&self, timeout_ms: u64) -> Option<RecallError> {
        self.fallback_reason
            .map(|reason| fallback_error(self.component, &self.method, reason, timeout_ms))
    }
}

/// Per-component latency statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentLatency {
    pub calls: u64,
    pub fallbacks: u64,
    pub avg_latency_ms: f64,
    #[serde(skip)]
    total_latency_ms: u64,
}

/// Aggregate bridge counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeMetrics {
    pub total_calls: u64,
    pub success_count: u64,
    pub fallback_count: u64,
    pub error_count: u64,
    pub success_rate: f64,
    pub components: BTreeMap<String, ComponentLatency>,
}

/// Overall bridge health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unavailable,
}

/// Health report for one component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentReport {
    pub component: Component,
    pub configured: bool,
    pub state: CircuitState,
    pub consecutive_failures: u32,
}

/// Result of `Bridge::health_check`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeHealth {
    pub status: HealthStatus,
    pub components: Vec<ComponentReport>,
    pub metrics: BridgeMetrics,
}

#[derive(Debug, Default)]
struct CallStats {
    total_calls: u64,
    success_count: u64,
    fallback_count: u64,
    error_count: u64,
    per_component: HashMap<Component, ComponentLatency>,
    recent: VecDeque<BridgeCallRecord>,
}

#[derive(Debug)]
enum AttemptError {
    Timeout,
    Transport(TransportError),
}

impl AttemptError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Transport(e) => e.is_transient(),
        }
    }

    fn reason(&self) -> FallbackReason {
        match self {
            Self::Timeout => FallbackReason::Timeout,
            Self::Transport(e) => FallbackReason::from_transport(e),
        }
    }
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out"),
            Self::Transport(e) => write!(f, "{}", e),
        }
    }
}

type AttemptFuture<'a> =
    Pin<Box<dyn Future<Output = Result<serde_json::Value, AttemptError>> + Send + 'a>>;

/// Out-of-process bridge with per-component circuit breaking.
///
/// # Example
///
/// ```ignore
/// let config = BridgeConfig::default()
///     .with_component(Component::CrossEncoder, ComponentEndpoint::http("http://localhost:9000/rpc"));
/// let bridge = Bridge::with_default_transport(config)?;
///
/// let response = bridge
///     .call(Operation::CrossEncode { query: "q".into(), documents: vec!["d".into()] })
///     .await?;
/// if response.fallback {
///     // degraded answer
/// }
/// ```
pub struct Bridge {
    config: BridgeConfig,
    endpoints: HashMap<Component, ComponentEndpoint>,
    transport: Arc<dyn Transport>,
    breaker: CircuitBreaker,
    stats: Mutex<CallStats>,
    metrics: Arc<dyn MetricsSink>,
}

impl Bridge {
    /// Create a bridge; endpoints are validated here, not at call time.
    pub fn new(config: BridgeConfig, transport: Arc<dyn Transport>) -> RecallResult<Self> {
        let endpoints = config.validate()?;
        debug!(components = endpoints.len(), "Bridge endpoints validated");
        Ok(Self {
            breaker: CircuitBreaker::new(config.breaker.clone()),
            config,
            endpoints,
            transport,
            stats: Mutex::new(CallStats::default()),
            metrics: noop_sink(),
        })
    }

    /// Create a bridge with the process/http transport.
    pub fn with_default_transport(config: BridgeConfig) -> RecallResult<Self> {
        Self::new(config, Arc::new(EndpointTransport::new()))
    }

    /// Inject a metrics sink.
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Whether an endpoint is configured for the component.
    pub fn is_configured(&self, component: Component) -> bool {
        self.endpoints.contains_key(&component)
    }

    /// Per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }

    /// Circuit breaker (read access for diagnostics).
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Call an operation.
    pub async fn call(&self, operation: Operation) -> RecallResult<BridgeResponse> {
        self.call_with_cancel(operation, &CancellationToken::new()).await
    }

    /// Call an operation, abandoning it (and killing any child process) on cancellation.
    ///
    /// Returns `Err` only for operations the configured endpoint does not
    /// serve; every runtime failure becomes a fallback response.
    pub async fn call_with_cancel(
        &self,
        operation: Operation,
        cancel: &CancellationToken,
    ) -> RecallResult<BridgeResponse> {
        let start = Instant::now();
        let component = operation.component();
        let method = operation.method();

        let endpoint = match self.endpoints.get(&component) {
            Some(endpoint) => endpoint,
            None => {
                debug!(component = %component, method, "Component not configured, using fallback");
                return Ok(self.fallback(component, method, FallbackReason::NotConfigured, start, 0));
            }
        };

        if !endpoint.serves(method) {
            self.record(component, method, CallOutcome::Error, start);
            return Err(RecallError::unsupported(component.to_string(), method));
        }

        let permit = self.breaker.try_acquire(component);
        if permit == Permit::Rejected {
            debug!(component = %component, method, "Circuit open, call short-circuited");
            return Ok(self.fallback(component, method, FallbackReason::CircuitOpen, start, 0));
        }

        let request = operation.to_request();
        let timeout = self.timeout();
        let attempts = std::sync::atomic::AtomicU32::new(0);

        let attempt_once = || async {
            attempts.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            match tokio::time::timeout(timeout, self.transport.invoke(endpoint, &request)).await {
                Ok(result) => result.map_err(AttemptError::Transport),
                Err(_) => Err(AttemptError::Timeout),
            }
        };

        let call: AttemptFuture<'_> = if permit == Permit::Trial || self.config.max_retries == 0 {
            Box::pin(attempt_once())
        } else {
            Box::pin(
                attempt_once
                    .retry(
                        ExponentialBuilder::default()
                            .with_max_times(self.config.max_retries as usize)
                            .with_min_delay(Duration::from_millis(self.config.retry_min_delay_ms))
                            .with_max_delay(Duration::from_millis(self.config.retry_max_delay_ms)),
                    )
                    .when(|e: &AttemptError| e.is_transient())
                    .notify(|err: &AttemptError, dur: Duration| {
                        debug!(component = %component, method, error = %err, "Retrying bridge call in {:?}", dur);
                    }),
            )
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = call => Some(result),
        };
        let attempts = attempts.load(std::sync::atomic::Ordering::Relaxed);

        match result {
            None => {
                if permit == Permit::Trial {
                    self.breaker.release_trial(component);
                }
                debug!(component = %component, method, "Bridge call cancelled");
                Ok(self.fallback(component, method, FallbackReason::Cancelled, start, attempts))
            }
            Some(Ok(data)) => {
                self.breaker.record_success(component);
                let latency_ms = self.record(component, method, CallOutcome::Success, start);
                Ok(BridgeResponse {
                    component,
                    method: method.to_string(),
                    data,
                    fallback: false,
                    fallback_reason: None,
                    latency_ms,
                    attempts,
                })
            }
            Some(Err(err)) => {
                self.breaker.record_failure(component);
                warn!(component = %component, method, attempts, error = %err, "Bridge call failed, using fallback");
                Ok(self.fallback(component, method, err.reason(), start, attempts))
            }
        }
    }

    fn fallback(
        &self,
        component: Component,
        method: &str,
        reason: FallbackReason,
        start: Instant,
        attempts: u32,
    ) -> BridgeResponse {
        let latency_ms = self.record(component, method, CallOutcome::Fallback, start);
        BridgeResponse {
            component,
            method: method.to_string(),
            data: fallback_payload(component, method, reason),
            fallback: true,
            fallback_reason: Some(reason),
            latency_ms,
            attempts,
        }
    }

    fn record(&self, component: Component, method: &str, outcome: CallOutcome, start: Instant) -> u64 {
        let latency_ms = start.elapsed().as_millis() as u64;
        {
            let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
            stats.total_calls += 1;
            match outcome {
                CallOutcome::Success => stats.success_count += 1,
                CallOutcome::Fallback => stats.fallback_count += 1,
                CallOutcome::Error => stats.error_count += 1,
            }

            let entry = stats.per_component.entry(component).or_default();
            entry.calls += 1;
            entry.total_latency_ms += latency_ms;
            entry.avg_latency_ms = entry.total_latency_ms as f64 / entry.calls as f64;
            if outcome == CallOutcome::Fallback {
                entry.fallbacks += 1;
            }

            if stats.recent.len() >= RECENT_CALLS {
                stats.recent.pop_front();
            }
            stats.recent.push_back(BridgeCallRecord {
                component,
                method: method.to_string(),
                latency_ms,
                outcome,
                timestamp: Utc::now(),
            });
        }

        self.metrics
            .record("bridge_latency_ms", latency_ms as f64, "ms", "bridge");
        latency_ms
    }

    /// Aggregate counters.
    pub fn metrics(&self) -> BridgeMetrics {
        let stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        let success_rate = if stats.total_calls == 0 {
            1.0
        } else {
            stats.success_count as f64 / stats.total_calls as f64
        };
        BridgeMetrics {
            total_calls: stats.total_calls,
            success_count: stats.success_count,
            fallback_count: stats.fallback_count,
            error_count: stats.error_count,
            success_rate,
            components: stats
                .per_component
                .iter()
                .map(|(c, l)| (c.to_string(), l.clone()))
                .collect(),
        }
    }

    /// The most recent calls, oldest first.
    pub fn recent_calls(&self) -> Vec<BridgeCallRecord> {
        let stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        stats.recent.iter().cloned().collect()
    }

    /// Report configuration and breaker state without doing any IPC.
    pub fn health_check(&self) -> BridgeHealth {
        let snapshots: HashMap<Component, BreakerSnapshot> = self
            .breaker
            .snapshot()
            .into_iter()
            .map(|s| (s.component, s))
            .collect();

        let components: Vec<ComponentReport> = Component::all()
            .into_iter()
            .map(|component| {
                let snapshot = snapshots.get(&component);
                ComponentReport {
                    component,
                    configured: self.is_configured(component),
                    state: snapshot.map_or(CircuitState::Closed, |s| s.state),
                    consecutive_failures: snapshot.map_or(0, |s| s.consecutive_failures),
                }
            })
            .collect();

        let status = if self.endpoints.is_empty() {
            HealthStatus::Unavailable
        } else if components
            .iter()
            .any(|c| c.configured && c.state != CircuitState::Closed)
        {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        BridgeHealth {
            status,
            components,
            metrics: self.metrics(),
        }
    }
}

impl MetricSource for Bridge {
    fn source_name(&self) -> &str {
        "bridge"
    }

    fn collect(&self) -> Vec<MetricSample> {
        let metrics = self.metrics();
        if metrics.total_calls == 0 {
            return Vec::new();
        }
        let fallback_rate = metrics.fallback_count as f64 / metrics.total_calls as f64;
        vec![
            MetricSample::new("bridge_success_rate", metrics.success_rate, "ratio", "bridge"),
            MetricSample::new("bridge_fallback_rate", fallback_rate, "ratio", "bridge"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::transport::MockTransport;
    use serde_json::json;

    fn config(threshold: u32, cooldown_ms: u64) -> BridgeConfig {
        BridgeConfig {
            timeout_ms: 200,
            max_retries: 0,
            breaker: BreakerConfig {
                failure_threshold: threshold,
                cooldown_ms,
            },
            ..Default::default()
        }
        .with_component(Component::CrossEncoder, ComponentEndpoint::http("http://localhost:1/rpc"))
    }

    fn cross_encode() -> Operation {
        Operation::CrossEncode {
            query: "rust".into(),
            documents: vec!["rust book".into()],
        }
    }

    #[tokio::test]
    async fn test_success_passes_data_through() {
        let mut transport = MockTransport::new();
        transport
            .expect_invoke()
            .times(1)
            .returning(|_, _| Ok(json!({"scores": [0.9]})));

        let bridge = Bridge::new(config(3, 60_000), Arc::new(transport)).unwrap();
        let response = bridge.call(cross_encode()).await.unwrap();

        assert!(!response.fallback);
        assert_eq!(response.data["scores"][0], 0.9);
        assert_eq!(bridge.metrics().success_count, 1);
    }

    #[tokio::test]
    async fn test_breaker_stops_ipc_after_threshold() {
        let mut transport = MockTransport::new();
        transport
            .expect_invoke()
            .times(3)
            .returning(|_, _| Err(TransportError::Exit { code: Some(1), stderr: "boom".into() }));

        let bridge = Bridge::new(config(3, 60_000), Arc::new(transport)).unwrap();
        for _ in 0..3 {
            let response = bridge.call(cross_encode()).await.unwrap();
            assert!(response.fallback);
            assert_eq!(response.fallback_reason, Some(FallbackReason::ProcessFailed));
        }

        // Open: no further invocations are allowed by the mock.
        for _ in 0..5 {
            let response = bridge.call(cross_encode()).await.unwrap();
            assert!(response.fallback);
            assert_eq!(response.fallback_reason, Some(FallbackReason::CircuitOpen));
            assert_eq!(response.attempts, 0);
        }
        assert_eq!(bridge.breaker().state(Component::CrossEncoder), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_exactly_one_trial_after_cooldown() {
        let mut transport = MockTransport::new();
        transport
            .expect_invoke()
            .times(2)
            .returning(|_, _| Err(TransportError::Malformed("garbage".into())));

        let bridge = Bridge::new(config(1, 50), Arc::new(transport)).unwrap();
        bridge.call(cross_encode()).await.unwrap();
        assert_eq!(bridge.breaker().state(Component::CrossEncoder), CircuitState::Open);

        let rejected = bridge.call(cross_encode()).await.unwrap();
        assert_eq!(rejected.fallback_reason, Some(FallbackReason::CircuitOpen));

        tokio::time::sleep(Duration::from_millis(80)).await;

        let trial = bridge.call(cross_encode()).await.unwrap();
        assert_eq!(trial.attempts, 1);
        assert_eq!(trial.fallback_reason, Some(FallbackReason::MalformedResponse));

        // Trial failed: open again, next call short-circuits.
        let after = bridge.call(cross_encode()).await.unwrap();
        assert_eq!(after.fallback_reason, Some(FallbackReason::CircuitOpen));
    }

    #[tokio::test]
    async fn test_trial_success_closes_circuit() {
        let mut transport = MockTransport::new();
        let mut seq = mockall::Sequence::new();
        transport
            .expect_invoke()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(TransportError::Http("503".into())));
        transport
            .expect_invoke()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(json!({"scores": [0.4]})));

        let bridge = Bridge::new(config(1, 0), Arc::new(transport)).unwrap();
        assert!(bridge.call(cross_encode()).await.unwrap().fallback);
        let trial = bridge.call(cross_encode()).await.unwrap();
        assert!(!trial.fallback);
        assert_eq!(bridge.breaker().state(Component::CrossEncoder), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let mut transport = MockTransport::new();
        let mut seq = mockall::Sequence::new();
        transport
            .expect_invoke()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(TransportError::Http("503".into())));
        transport
            .expect_invoke()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(json!({"scores": []})));

        let mut cfg = config(5, 60_000);
        cfg.max_retries = 2;
        cfg.retry_min_delay_ms = 1;
        cfg.retry_max_delay_ms = 2;

        let bridge = Bridge::new(cfg, Arc::new(transport)).unwrap();
        let response = bridge.call(cross_encode()).await.unwrap();
        assert!(!response.fallback);
        assert_eq!(response.attempts, 3);
    }

    #[tokio::test]
    async fn test_unconfigured_component_falls_back_without_ipc() {
        let transport = MockTransport::new();
        let bridge = Bridge::new(config(3, 60_000), Arc::new(transport)).unwrap();

        let response = bridge
            .call(Operation::VectorSearch { query: "q".into(), limit: 3 })
            .await
            .unwrap();
        assert!(response.fallback);
        assert_eq!(response.fallback_reason, Some(FallbackReason::NotConfigured));
        assert_eq!(response.data["results"], json!([]));
    }

    #[tokio::test]
    async fn test_undeclared_method_is_an_error() {
        let transport = MockTransport::new();
        let cfg = BridgeConfig::default().with_component(
            Component::CrossEncoder,
            ComponentEndpoint::http("http://localhost:1/rpc").with_methods(vec!["cross_encode".into()]),
        );
        let bridge = Bridge::new(cfg, Arc::new(transport)).unwrap();
        assert!(bridge.is_configured(Component::CrossEncoder));

        let bad = BridgeConfig::default().with_component(
            Component::CrossEncoder,
            ComponentEndpoint::http("http://localhost:1/rpc").with_methods(vec!["vector_search".into()]),
        );
        let err = Bridge::new(bad, Arc::new(MockTransport::new())).err().unwrap();
        assert!(matches!(err, RecallError::UnsupportedOperation { .. }));
    }

    #[tokio::test]
    async fn test_unknown_component_rejected_at_startup() {
        let mut cfg = BridgeConfig::default();
        cfg.components
            .insert("vector_db".to_string(), ComponentEndpoint::http("http://localhost:1"));
        let err = Bridge::new(cfg, Arc::new(MockTransport::new())).err().unwrap();
        assert!(matches!(err, RecallError::Configuration(_)));
    }

    struct SlowTransport;

    #[async_trait::async_trait]
    impl Transport for SlowTransport {
        async fn invoke(
            &self,
            _endpoint: &ComponentEndpoint,
            _request: &crate::bridge::BridgeRequest,
        ) -> Result<serde_json::Value, TransportError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(json!({}))
        }
    }

    #[tokio::test]
    async fn test_timeout_becomes_fallback() {
        let mut cfg = config(3, 60_000);
        cfg.timeout_ms = 20;
        let bridge = Bridge::new(cfg, Arc::new(SlowTransport)).unwrap();

        let response = bridge.call(cross_encode()).await.unwrap();
        assert!(response.fallback);
        assert_eq!(response.fallback_reason, Some(FallbackReason::Timeout));
        assert!(matches!(
            response.degradation(20),
            Some(RecallError::BridgeTimeout { .. })
        ));
        assert_eq!(bridge.breaker().snapshot()[0].consecutive_failures, 1);
    }

    #[tokio::test]
    async fn test_cancellation_does_not_count_as_failure() {
        let mut cfg = config(1, 60_000);
        cfg.timeout_ms = 5_000;
        let bridge = Bridge::new(cfg, Arc::new(SlowTransport)).unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let response = bridge.call_with_cancel(cross_encode(), &cancel).await.unwrap();
        assert_eq!(response.fallback_reason, Some(FallbackReason::Cancelled));
        assert_eq!(bridge.breaker().state(Component::CrossEncoder), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_health_and_metric_source() {
        let mut transport = MockTransport::new();
        transport
            .expect_invoke()
            .returning(|_, _| Err(TransportError::Http("down".into())));
        let bridge = Bridge::new(config(1, 60_000), Arc::new(transport)).unwrap();

        assert_eq!(bridge.health_check().status, HealthStatus::Healthy);
        assert!(bridge.collect().is_empty());

        bridge.call(cross_encode()).await.unwrap();
        let health = bridge.health_check();
        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.metrics.fallback_count, 1);

        let samples = bridge.collect();
        let fallback_rate = samples.iter().find(|s| s.name == "bridge_fallback_rate").unwrap();
        assert_eq!(fallback_rate.value, 1.0);
        assert_eq!(bridge.recent_calls().len(), 1);
    }

    #[test]
    fn test_no_components_is_unavailable() {
        let bridge = Bridge::new(BridgeConfig::default(), Arc::new(MockTransport::new())).unwrap();
        assert_eq!(bridge.health_check().status, HealthStatus::Unavailable);
    }
}
