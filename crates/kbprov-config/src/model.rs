use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default collection status poll interval in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Default collection status attempt ceiling
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 30;

/// Default wait before policy-dependent calls, in seconds
pub const DEFAULT_PROPAGATION_DELAY_SECS: u64 = 60;

/// Default vector dimension (Titan text embeddings v1)
pub const DEFAULT_INDEX_DIMENSION: u32 = 1536;

pub const DEFAULT_INDEX_ENGINE: &str = "faiss";
pub const DEFAULT_INDEX_METHOD: &str = "hnsw";
pub const DEFAULT_EF_CONSTRUCTION: u32 = 512;
pub const DEFAULT_HNSW_M: u32 = 16;

/// Default object-storage inclusion path for the data source
pub const DEFAULT_INCLUSION_PREFIX: &str = "knowledgeBase/";

/// Where a configuration value came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    Default,
    File(PathBuf),
    Env,
    Cli,
    Programmatic,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::File(path) => write!(f, "file:{}", path.display()),
            Self::Env => write!(f, "env"),
            Self::Cli => write!(f, "cli"),
            Self::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// Effective kbprov configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub aws: AwsSettings,
    pub timing: TimingConfig,
    pub index: IndexConfig,
    pub data_source: DataSourceConfig,
    pub state: StateConfig,
    pub orchestrator: OrchestratorSettings,
    /// Source of each explicitly set key, keyed by `section.key`
    pub source_attribution: BTreeMap<String, ConfigSource>,
}

/// `[aws]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AwsSettings {
    /// Region override; the SDK default chain applies when unset
    pub region: Option<String>,
    /// Endpoint override for every service client (e.g. LocalStack)
    pub endpoint_url: Option<String>,
    /// Per-operation timeout applied to SDK clients
    pub operation_timeout_secs: Option<u64>,
}

impl AwsSettings {
    #[must_use]
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_secs.map(Duration::from_secs)
    }
}

/// `[timing]` section: every wait in the create chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingConfig {
    pub poll_interval_secs: Option<u64>,
    pub max_poll_attempts: Option<u32>,
    pub propagation_delay_secs: Option<u64>,
}

impl TimingConfig {
    /// Timing with every wait set to zero, for tests and local fakes
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            poll_interval_secs: Some(0),
            max_poll_attempts: None,
            propagation_delay_secs: Some(0),
        }
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(
            self.poll_interval_secs
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
        )
    }

    #[must_use]
    pub fn max_poll_attempts(&self) -> u32 {
        self.max_poll_attempts.unwrap_or(DEFAULT_MAX_POLL_ATTEMPTS)
    }

    #[must_use]
    pub fn propagation_delay(&self) -> Duration {
        Duration::from_secs(
            self.propagation_delay_secs
                .unwrap_or(DEFAULT_PROPAGATION_DELAY_SECS),
        )
    }
}

/// `[index]` section: vector index construction parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    pub dimension: Option<u32>,
    pub engine: Option<String>,
    pub method: Option<String>,
    pub ef_construction: Option<u32>,
    pub m: Option<u32>,
}

impl IndexConfig {
    #[must_use]
    pub fn dimension(&self) -> u32 {
        self.dimension.unwrap_or(DEFAULT_INDEX_DIMENSION)
    }

    #[must_use]
    pub fn engine(&self) -> &str {
        self.engine.as_deref().unwrap_or(DEFAULT_INDEX_ENGINE)
    }

    #[must_use]
    pub fn method(&self) -> &str {
        self.method.as_deref().unwrap_or(DEFAULT_INDEX_METHOD)
    }

    #[must_use]
    pub fn ef_construction(&self) -> u32 {
        self.ef_construction.unwrap_or(DEFAULT_EF_CONSTRUCTION)
    }

    #[must_use]
    pub fn m(&self) -> u32 {
        self.m.unwrap_or(DEFAULT_HNSW_M)
    }
}

/// `[data_source]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataSourceConfig {
    pub inclusion_prefix: Option<String>,
}

impl DataSourceConfig {
    #[must_use]
    pub fn inclusion_prefix(&self) -> &str {
        self.inclusion_prefix
            .as_deref()
            .unwrap_or(DEFAULT_INCLUSION_PREFIX)
    }
}

/// State store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateBackend {
    /// AWS Systems Manager Parameter Store
    #[default]
    Ssm,
    /// Process-local map; state does not survive the process
    Memory,
}

impl std::fmt::Display for StateBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ssm => write!(f, "ssm"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// `[state]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateConfig {
    pub backend: Option<String>,
}

/// `[orchestrator]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrchestratorSettings {
    /// The orchestrator's own execution role, used when the event omits it
    pub execution_role_arn: Option<String>,
    /// Overrides the physical resource id derived from the execution context
    pub physical_resource_id: Option<String>,
}

impl Config {
    /// Built-in defaults with no explicit values
    #[must_use]
    pub fn defaults() -> Self {
        Self::default()
    }

    /// Effective configuration as `key -> (value, source)` pairs
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();
        let source = |key: &str| {
            self.source_attribution
                .get(key)
                .cloned()
                .unwrap_or(ConfigSource::Default)
                .to_string()
        };
        let mut add = |key: &str, value: String| {
            config.insert(key.to_string(), (value, source(key)));
        };

        if let Some(region) = &self.aws.region {
            add("aws.region", region.clone());
        }
        if let Some(endpoint) = &self.aws.endpoint_url {
            add("aws.endpoint_url", endpoint.clone());
        }
        if let Some(timeout) = self.aws.operation_timeout_secs {
            add("aws.operation_timeout_secs", timeout.to_string());
        }
        add(
            "timing.poll_interval_secs",
            self.timing.poll_interval().as_secs().to_string(),
        );
        add(
            "timing.max_poll_attempts",
            self.timing.max_poll_attempts().to_string(),
        );
        add(
            "timing.propagation_delay_secs",
            self.timing.propagation_delay().as_secs().to_string(),
        );
        add("index.dimension", self.index.dimension().to_string());
        add("index.engine", self.index.engine().to_string());
        add("index.method", self.index.method().to_string());
        add(
            "index.ef_construction",
            self.index.ef_construction().to_string(),
        );
        add("index.m", self.index.m().to_string());
        add(
            "data_source.inclusion_prefix",
            self.data_source.inclusion_prefix().to_string(),
        );
        add(
            "state.backend",
            self.state
                .backend
                .clone()
                .unwrap_or_else(|| StateBackend::default().to_string()),
        );
        if let Some(role) = &self.orchestrator.execution_role_arn {
            add("orchestrator.execution_role_arn", role.clone());
        }
        if let Some(id) = &self.orchestrator.physical_resource_id {
            add("orchestrator.physical_resource_id", id.clone());
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::defaults();
        assert_eq!(config.timing.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.timing.max_poll_attempts(), 30);
        assert_eq!(config.timing.propagation_delay(), Duration::from_secs(60));
        assert_eq!(config.index.dimension(), 1536);
        assert_eq!(config.index.engine(), "faiss");
        assert_eq!(config.index.method(), "hnsw");
        assert_eq!(config.index.ef_construction(), 512);
        assert_eq!(config.index.m(), 16);
        assert_eq!(config.data_source.inclusion_prefix(), "knowledgeBase/");
        assert!(config.aws.operation_timeout().is_none());
    }

    #[test]
    fn immediate_timing_keeps_attempt_budget() {
        let timing = TimingConfig::immediate();
        assert_eq!(timing.poll_interval(), Duration::ZERO);
        assert_eq!(timing.propagation_delay(), Duration::ZERO);
        assert_eq!(timing.max_poll_attempts(), DEFAULT_MAX_POLL_ATTEMPTS);
    }

    #[test]
    fn effective_config_reports_defaults() {
        let effective = Config::defaults().effective_config();
        assert_eq!(
            effective.get("state.backend"),
            Some(&("ssm".to_string(), "default".to_string()))
        );
        assert!(!effective.contains_key("aws.region"));
    }
}
