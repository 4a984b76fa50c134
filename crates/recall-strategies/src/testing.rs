//! Test doubles for bridge-backed strategies.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use mockall::mock;
use serde_json::Value;

use recall_core::bridge::{
    Bridge, BridgeConfig, BridgeRequest, Component, ComponentEndpoint, Transport, TransportError,
};
use recall_core::crosscheck::InMemoryStore;
use recall_core::traits::MemoryStore;
use recall_core::types::MemoryEntry;

mock! {
    pub Wire {}

    #[async_trait]
    impl Transport for Wire {
        async fn invoke(
            &self,
            endpoint: &ComponentEndpoint,
            request: &BridgeRequest,
        ) -> Result<Value, TransportError>;
    }
}

/// Answers each method with a canned document; unknown methods fail remotely.
#[derive(Default)]
pub struct WireStub {
    answers: HashMap<String, Value>,
    calls: Arc<AtomicUsize>,
}

impl WireStub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, method: &str, value: Value) -> Self {
        self.answers.insert(method.to_string(), value);
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl Transport for WireStub {
    async fn invoke(&self, _endpoint: &ComponentEndpoint, request: &BridgeRequest) -> Result<Value, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers
            .get(&request.method)
            .cloned()
            .ok_or_else(|| TransportError::Remote(format!("no answer for {}", request.method)))
    }
}

/// Bridge over `transport` with the given components configured, no retries.
pub fn bridge_with(transport: impl Transport + 'static, components: &[Component]) -> Arc<Bridge> {
    let config = components.iter().fold(
        BridgeConfig {
            max_retries: 0,
            ..Default::default()
        },
        |config, component| config.with_component(*component, ComponentEndpoint::process("stub", Vec::new())),
    );
    Arc::new(Bridge::new(config, Arc::new(transport)).unwrap())
}

/// In-memory store holding one entry per content string.
pub async fn store_with(contents: &[&str]) -> Arc<InMemoryStore> {
    store_with_category(contents, "fact").await
}

pub async fn store_with_category(contents: &[&str], category: &str) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    for content in contents {
        store
            .insert_if_absent(MemoryEntry::new(*content, category, "test"))
            .await
            .unwrap();
    }
    store
}
