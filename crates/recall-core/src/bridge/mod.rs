//! Bridge to out-of-process components.
//!
//! Strategies never talk to external runtimes directly. They submit a typed
//! [`Operation`] and always receive a [`BridgeResponse`]: either the
//! component's answer or a deterministic fallback tagged with a
//! [`FallbackReason`].

mod breaker;
mod client;
mod fallback;
mod operation;
mod transport;

pub use breaker::{BreakerConfig, BreakerSnapshot, CircuitBreaker, CircuitState, Permit};
pub use client::{
    Bridge, BridgeCallRecord, BridgeConfig, BridgeHealth, BridgeMetrics, BridgeResponse, CallOutcome,
    ComponentLatency, ComponentReport, HealthStatus,
};
pub use fallback::{fallback_error, fallback_payload, FallbackReason};
pub use operation::{BridgeRequest, Component, Operation, WireResponse};
pub use transport::{parse_wire, ComponentEndpoint, EndpointKind, EndpointTransport, Transport, TransportError};
