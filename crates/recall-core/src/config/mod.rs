//! Configuration system for recall.
//!
//! `RecallConfig` can be loaded from a file (TOML, JSON or YAML), from
//! `RECALL_*` environment variables, or from a flat map of dotted keys such
//! as `coordinator.cache_ttl_secs = 60`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bridge::{BridgeConfig, Component, ComponentEndpoint};
use crate::coordinator::CoordinatorConfig;
use crate::crosscheck::CrosscheckConfig;
use crate::error::{RecallError, RecallResult};
use crate::monitor::{Baseline, MonitorConfig};
use crate::types::StrategyKind;

/// Hybrid search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridSearchConfig {
    /// RRF constant `k` in `1 / (k + rank)`.
    pub rrf_k: f32,
    /// Results returned after fusion.
    pub limit: usize,
    /// Candidates requested from each side.
    pub candidate_limit: usize,
}

impl Default for HybridSearchConfig {
    fn default() -> Self {
        Self {
            rrf_k: 60.0,
            limit: 10,
            candidate_limit: 50,
        }
    }
}

/// Reranking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    pub original_weight: f32,
    pub cross_weight: f32,
    /// Latency budget per rerank call.
    pub budget_ms: u64,
    /// Candidates pulled from the memory store.
    pub candidate_limit: usize,
    pub top_k: usize,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            original_weight: 0.3,
            cross_weight: 0.7,
            budget_ms: 100,
            candidate_limit: 20,
            top_k: 10,
        }
    }
}

/// ECL pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EclConfig {
    /// Pipeline results cached by content hash.
    pub cache_size: usize,
    /// Minimum frequency for generic capitalised terms.
    pub min_generic_frequency: usize,
    /// Entities kept per run.
    pub max_entities: usize,
    /// Push the loaded graph to the knowledge-graph component.
    pub push_to_bridge: bool,
}

impl Default for EclConfig {
    fn default() -> Self {
        Self {
            cache_size: 128,
            min_generic_frequency: 2,
            max_entities: 50,
            push_to_bridge: true,
        }
    }
}

/// Code-pattern extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgenticConfig {
    /// Local matches below this confidence are dropped.
    pub min_confidence: f32,
    /// Blocks analysed per query.
    pub max_blocks: usize,
}

impl Default for AgenticConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            max_blocks: 20,
        }
    }
}

/// Memory and preference lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub limit: usize,
    /// Entries scoring below this are not returned.
    pub min_score: f32,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            limit: 10,
            min_score: 0.1,
        }
    }
}

/// Settings for the built-in strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Strategies to register; empty registers all of them.
    pub enabled: Vec<StrategyKind>,
    /// Aggregation weights keyed by strategy name.
    pub priorities: BTreeMap<String, f32>,
    pub memory: LookupConfig,
    pub preference: LookupConfig,
    pub hybrid: HybridSearchConfig,
    pub rerank: RerankConfig,
    pub agentic: AgenticConfig,
    pub ecl: EclConfig,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            enabled: Vec::new(),
            priorities: BTreeMap::new(),
            memory: LookupConfig::default(),
            preference: LookupConfig::default(),
            hybrid: HybridSearchConfig::default(),
            rerank: RerankConfig::default(),
            agentic: AgenticConfig::default(),
            ecl: EclConfig::default(),
        }
    }
}

impl StrategyConfig {
    pub fn is_enabled(&self, kind: StrategyKind) -> bool {
        self.enabled.is_empty() || self.enabled.contains(&kind)
    }

    /// Configured priority, or `default` when unset.
    pub fn priority(&self, kind: StrategyKind, default: f32) -> f32 {
        self.priorities
            .get(&kind.to_string())
            .copied()
            .unwrap_or(default)
    }
}

/// Main recall configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecallConfig {
    pub bridge: BridgeConfig,
    pub crosscheck: CrosscheckConfig,
    pub coordinator: CoordinatorConfig,
    pub monitor: MonitorConfig,
    pub strategies: StrategyConfig,
}

impl RecallConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> RecallResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| RecallError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| RecallError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| RecallError::Configuration(e.to_string()))?,
            _ => {
                return Err(RecallError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `RECALL_*` environment variables.
    ///
    /// Recognised variables:
    /// - `RECALL_LOG_DIR`
    /// - `RECALL_BRIDGE_TIMEOUT_MS`, `RECALL_BRIDGE_MAX_RETRIES`
    /// - `RECALL_COMPONENT_<NAME>` (e.g. `RECALL_COMPONENT_CROSS_ENCODER=python3 ce.py`)
    /// - `RECALL_GLOBAL_TIMEOUT_MS`, `RECALL_STRATEGY_TIMEOUT_MS`
    /// - `RECALL_CACHE_ENABLED`, `RECALL_CACHE_TTL_SECS`
    /// - `RECALL_SIMILARITY_THRESHOLD`, `RECALL_MERGE_THRESHOLD`
    pub fn from_env() -> RecallResult<Self> {
        Self::from_env_vars(std::env::vars())
    }

    /// Same as [`from_env`](Self::from_env) over an explicit variable set.
    pub fn from_env_vars(vars: impl IntoIterator<Item = (String, String)>) -> RecallResult<Self> {
        let mut map = HashMap::new();
        for (key, value) in vars {
            let Some(name) = key.strip_prefix("RECALL_") else {
                continue;
            };
            let dotted = match name {
                "LOG_DIR" => "monitor.log_dir".to_string(),
                "BRIDGE_TIMEOUT_MS" => "bridge.timeout_ms".to_string(),
                "BRIDGE_MAX_RETRIES" => "bridge.max_retries".to_string(),
                "GLOBAL_TIMEOUT_MS" => "coordinator.global_timeout_ms".to_string(),
                "STRATEGY_TIMEOUT_MS" => "coordinator.strategy_timeout_ms".to_string(),
                "CACHE_ENABLED" => "coordinator.cache_enabled".to_string(),
                "CACHE_TTL_SECS" => "coordinator.cache_ttl_secs".to_string(),
                "SIMILARITY_THRESHOLD" => "crosscheck.similarity_threshold".to_string(),
                "MERGE_THRESHOLD" => "crosscheck.merge_threshold".to_string(),
                other => match other.strip_prefix("COMPONENT_") {
                    Some(component) => format!("bridge.components.{}", component.to_lowercase()),
                    None => continue,
                },
            };
            map.insert(dotted, value);
        }
        Self::from_map(&map)
    }

    /// Build configuration from flat dotted keys over the defaults.
    ///
    /// Values are coerced to the type of the default at the same path.
    /// `bridge.components.<name>` values are endpoint strings: a URL for an
    /// HTTP endpoint, otherwise a command line.
    pub fn from_map<K, V>(map: &HashMap<K, V>) -> RecallResult<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut tree = serde_json::to_value(Self::default())?;

        let mut keys: Vec<(&str, &str)> = map.iter().map(|(k, v)| (k.as_ref(), v.as_ref())).collect();
        keys.sort();

        for (key, raw) in keys {
            let segments: Vec<&str> = key.split('.').map(str::trim).collect();
            if segments.iter().any(|s| s.is_empty()) {
                return Err(RecallError::Configuration(format!("invalid config key '{}'", key)));
            }

            let value = match segments.as_slice() {
                ["bridge", "components", _] => {
                    let endpoint = ComponentEndpoint::parse(raw).ok_or_else(|| {
                        RecallError::Configuration(format!("empty endpoint for '{}'", key))
                    })?;
                    serde_json::to_value(endpoint)?
                }
                ["monitor", "baselines", _] => serde_json::from_str::<Baseline>(raw)
                    .map_err(|e| RecallError::Configuration(format!("{}: {}", key, e)))
                    .and_then(|b| Ok(serde_json::to_value(b)?))?,
                _ => coerce(lookup(&tree, &segments), raw),
            };
            insert(&mut tree, &segments, value)?;
        }

        let config: Self = serde_json::from_value(tree)
            .map_err(|e| RecallError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> RecallResult<()> {
        self.bridge.validate()?;

        let c = &self.crosscheck;
        for (name, value) in [
            ("crosscheck.similarity_threshold", c.similarity_threshold),
            ("crosscheck.merge_threshold", c.merge_threshold),
            ("crosscheck.unique_value_threshold", c.unique_value_threshold),
            ("crosscheck.confidence_threshold", c.confidence_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(RecallError::Configuration(format!("{} must be in [0, 1], got {}", name, value)));
            }
        }
        if c.merge_threshold > c.similarity_threshold {
            return Err(RecallError::Configuration(
                "crosscheck.merge_threshold must not exceed crosscheck.similarity_threshold".to_string(),
            ));
        }

        let rerank = &self.strategies.rerank;
        if rerank.original_weight < 0.0 || rerank.cross_weight < 0.0 {
            return Err(RecallError::Configuration("rerank weights must be non-negative".to_string()));
        }
        if self.strategies.hybrid.rrf_k <= 0.0 {
            return Err(RecallError::Configuration("strategies.hybrid.rrf_k must be positive".to_string()));
        }
        if self.coordinator.global_timeout_ms == 0 {
            return Err(RecallError::Configuration("coordinator.global_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> RecallConfigBuilder {
        RecallConfigBuilder::default()
    }
}

fn lookup<'a>(tree: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    segments.iter().try_fold(tree, |node, segment| node.get(*segment))
}

/// Parse `raw` as the same JSON type as `existing`; unknown paths guess.
fn coerce(existing: Option<&Value>, raw: &str) -> Value {
    let raw = raw.trim();
    match existing {
        Some(Value::String(_)) => Value::String(raw.to_string()),
        Some(Value::Array(_)) => Value::Array(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
                .collect(),
        ),
        _ => serde_json::from_str::<Value>(raw)
            .ok()
            .filter(|v| v.is_number() || v.is_boolean())
            .unwrap_or_else(|| Value::String(raw.to_string())),
    }
}

fn insert(tree: &mut Value, segments: &[&str], value: Value) -> RecallResult<()> {
    let Some((last, parents)) = segments.split_last() else {
        return Ok(());
    };
    let mut node = tree;
    for segment in parents {
        let object = node
            .as_object_mut()
            .ok_or_else(|| RecallError::Configuration(format!("'{}' is not a section", segment)))?;
        node = object
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Default::default()));
    }
    node.as_object_mut()
        .ok_or_else(|| RecallError::Configuration(format!("cannot set '{}'", segments.join("."))))?
        .insert(last.to_string(), value);
    Ok(())
}

/// Builder for RecallConfig.
#[derive(Default)]
pub struct RecallConfigBuilder {
    config: RecallConfig,
}

impl RecallConfigBuilder {
    pub fn bridge(mut self, config: BridgeConfig) -> Self {
        self.config.bridge = config;
        self
    }

    /// Register one bridge endpoint.
    pub fn component(mut self, component: Component, endpoint: ComponentEndpoint) -> Self {
        self.config.bridge = self.config.bridge.with_component(component, endpoint);
        self
    }

    pub fn crosscheck(mut self, config: CrosscheckConfig) -> Self {
        self.config.crosscheck = config;
        self
    }

    pub fn coordinator(mut self, config: CoordinatorConfig) -> Self {
        self.config.coordinator = config;
        self
    }

    pub fn monitor(mut self, config: MonitorConfig) -> Self {
        self.config.monitor = config;
        self
    }

    /// Set the monitor log directory.
    pub fn log_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.monitor.log_dir = path.into();
        self
    }

    pub fn strategies(mut self, config: StrategyConfig) -> Self {
        self.config.strategies = config;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> RecallResult<RecallConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::EndpointKind;
    use std::io::Write;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults() {
        let config = RecallConfig::default();
        assert_eq!(config.bridge.timeout_ms, 5_000);
        assert_eq!(config.coordinator.cache_ttl_secs, 300);
        assert_eq!(config.crosscheck.similarity_threshold, 0.85);
        assert_eq!(config.strategies.hybrid.rrf_k, 60.0);
        assert_eq!(config.strategies.rerank.budget_ms, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_map_coerces_types() {
        let config = RecallConfig::from_map(&map(&[
            ("coordinator.cache_enabled", "false"),
            ("coordinator.cache_ttl_secs", "60"),
            ("crosscheck.similarity_threshold", "0.9"),
            ("monitor.log_dir", "/tmp/1234"),
            ("strategies.enabled", "memory_lookup, hybrid_search"),
            ("strategies.priorities.reranking", "2.5"),
        ]))
        .unwrap();

        assert!(!config.coordinator.cache_enabled);
        assert_eq!(config.coordinator.cache_ttl_secs, 60);
        assert_eq!(config.crosscheck.similarity_threshold, 0.9);
        assert_eq!(config.monitor.log_dir, PathBuf::from("/tmp/1234"));
        assert_eq!(
            config.strategies.enabled,
            vec![StrategyKind::MemoryLookup, StrategyKind::HybridSearch]
        );
        assert_eq!(config.strategies.priority(StrategyKind::Reranking, 1.0), 2.5);
    }

    #[test]
    fn test_from_map_components() {
        let config = RecallConfig::from_map(&map(&[
            ("bridge.components.cross_encoder", "python3 -m encoder --stdio"),
            ("bridge.components.vector_index", "http://localhost:8080/bridge"),
        ]))
        .unwrap();

        let encoder = &config.bridge.components["cross_encoder"];
        assert_eq!(encoder.kind, EndpointKind::Process);
        assert_eq!(encoder.target, "python3");
        assert_eq!(encoder.args, vec!["-m", "encoder", "--stdio"]);
        assert_eq!(config.bridge.components["vector_index"].kind, EndpointKind::Http);
    }

    #[test]
    fn test_from_map_rejects_bad_input() {
        assert!(matches!(
            RecallConfig::from_map(&map(&[("bridge.components.teleporter", "run")])),
            Err(RecallError::Configuration(_))
        ));
        assert!(RecallConfig::from_map(&map(&[("coordinator.cache_ttl_secs", "soon")])).is_err());
        assert!(RecallConfig::from_map(&map(&[("crosscheck.merge_threshold", "0.95")])).is_err());
        assert!(RecallConfig::from_map(&map(&[("coordinator..x", "1")])).is_err());
    }

    #[test]
    fn test_from_map_baseline_override() {
        let config = RecallConfig::from_map(&map(&[(
            "monitor.baselines.queue_depth",
            r#"{"target": 10, "warning": 100, "critical": 1000, "direction": "lower_is_better"}"#,
        )]))
        .unwrap();
        assert_eq!(config.monitor.baselines["queue_depth"].critical, 1000.0);
    }

    #[test]
    fn test_from_env_vars() {
        let config = RecallConfig::from_env_vars(vec![
            ("RECALL_CACHE_TTL_SECS".to_string(), "15".to_string()),
            ("RECALL_COMPONENT_PATTERN_MINER".to_string(), "miner --json".to_string()),
            ("RECALL_UNKNOWN".to_string(), "ignored".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ])
        .unwrap();
        assert_eq!(config.coordinator.cache_ttl_secs, 15);
        assert_eq!(config.bridge.components["pattern_miner"].target, "miner");
    }

    #[test]
    fn test_from_file_formats() {
        let mut toml_file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(toml_file, "[coordinator]\nmax_strategies = 2\n\n[strategies.rerank]\nbudget_ms = 50").unwrap();
        let config = RecallConfig::from_file(toml_file.path()).unwrap();
        assert_eq!(config.coordinator.max_strategies, 2);
        assert_eq!(config.strategies.rerank.budget_ms, 50);

        let mut yaml_file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(yaml_file, "bridge:\n  timeout_ms: 250").unwrap();
        assert_eq!(RecallConfig::from_file(yaml_file.path()).unwrap().bridge.timeout_ms, 250);

        let txt = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        assert!(matches!(RecallConfig::from_file(txt.path()), Err(RecallError::Configuration(_))));
    }

    #[test]
    fn test_builder() {
        let config = RecallConfig::builder()
            .component(Component::CrossEncoder, ComponentEndpoint::http("http://localhost:9000"))
            .log_dir("/var/log/recall")
            .build()
            .unwrap();
        assert!(config.bridge.components.contains_key("cross_encoder"));
        assert_eq!(config.monitor.log_dir, PathBuf::from("/var/log/recall"));
    }
}
