use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use kbprov_utils::error::ConfigError;

use super::{
    AwsSettings, Config, ConfigSource, DataSourceConfig, IndexConfig, OrchestratorSettings,
    StateConfig, TimingConfig,
};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "KBPROV_CONFIG";

/// Config file looked up in the working directory when none is named
pub const DEFAULT_CONFIG_FILE: &str = "kbprov.toml";

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    aws: Option<AwsSettings>,
    timing: Option<TimingConfig>,
    index: Option<IndexConfig>,
    data_source: Option<DataSourceConfig>,
    state: Option<StateConfig>,
    orchestrator: Option<OrchestratorSettings>,
}

/// Values supplied on the command line; they win over every other source
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub region: Option<String>,
    pub state_backend: Option<String>,
}

/// Copy `$from.$field` into `$into.$field` when set, recording its source
macro_rules! merge_field {
    ($attr:expr, $source:expr, $section:literal, $into:expr, $from:expr, $($field:ident),+) => {
        $(
            if $from.$field.is_some() {
                $into.$field = $from.$field;
                $attr.insert(
                    concat!($section, ".", stringify!($field)).to_string(),
                    $source.clone(),
                );
            }
        )+
    };
}

impl Config {
    /// Discover and load configuration: CLI > environment > file > defaults
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the config file cannot be read or parsed,
    /// an environment value does not parse, or validation fails.
    pub fn discover(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(|source| ConfigError::Io {
            path: ".".to_string(),
            source,
        })?;
        Self::discover_with(overrides, &cwd, |key| std::env::var(key).ok())
    }

    /// Discovery with an explicit working directory and environment lookup
    ///
    /// This is the path-driven variant used by tests to avoid process-global state.
    ///
    /// # Errors
    ///
    /// See [`Config::discover`].
    pub fn discover_with<F>(
        overrides: &ConfigOverrides,
        start_dir: &Path,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::defaults();

        let config_path = overrides
            .config_path
            .clone()
            .or_else(|| env(CONFIG_ENV_VAR).map(PathBuf::from))
            .or_else(|| {
                let candidate = start_dir.join(DEFAULT_CONFIG_FILE);
                candidate.is_file().then_some(candidate)
            });

        if let Some(path) = &config_path {
            debug!(path = %path.display(), "Loading config file");
            let file = Self::load_config_file(path)?;
            config.apply_file(file, ConfigSource::File(path.clone()));
        }

        config.apply_env(&env)?;
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn apply_file(&mut self, file: TomlConfig, source: ConfigSource) {
        let attr = &mut self.source_attribution;
        if let Some(aws) = file.aws {
            merge_field!(
                attr,
                source,
                "aws",
                self.aws,
                aws,
                region,
                endpoint_url,
                operation_timeout_secs
            );
        }
        if let Some(timing) = file.timing {
            merge_field!(
                attr,
                source,
                "timing",
                self.timing,
                timing,
                poll_interval_secs,
                max_poll_attempts,
                propagation_delay_secs
            );
        }
        if let Some(index) = file.index {
            merge_field!(
                attr,
                source,
                "index",
                self.index,
                index,
                dimension,
                engine,
                method,
                ef_construction,
                m
            );
        }
        if let Some(data_source) = file.data_source {
            merge_field!(
                attr,
                source,
                "data_source",
                self.data_source,
                data_source,
                inclusion_prefix
            );
        }
        if let Some(state) = file.state {
            merge_field!(attr, source, "state", self.state, state, backend);
        }
        if let Some(orchestrator) = file.orchestrator {
            merge_field!(
                attr,
                source,
                "orchestrator",
                self.orchestrator,
                orchestrator,
                execution_role_arn,
                physical_resource_id
            );
        }
    }

    fn apply_env<F>(&mut self, env: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_settings = EnvSettings::read(env)?;
        let attr = &mut self.source_attribution;
        let source = ConfigSource::Env;
        merge_field!(
            attr,
            source,
            "aws",
            self.aws,
            env_settings.aws,
            region,
            endpoint_url,
            operation_timeout_secs
        );
        merge_field!(
            attr,
            source,
            "timing",
            self.timing,
            env_settings.timing,
            poll_interval_secs,
            max_poll_attempts,
            propagation_delay_secs
        );
        merge_field!(attr, source, "state", self.state, env_settings.state, backend);
        merge_field!(
            attr,
            source,
            "orchestrator",
            self.orchestrator,
            env_settings.orchestrator,
            execution_role_arn,
            physical_resource_id
        );
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(region) = &overrides.region {
            self.aws.region = Some(region.clone());
            self.source_attribution
                .insert("aws.region".to_string(), ConfigSource::Cli);
        }
        if let Some(backend) = &overrides.state_backend {
            self.state.backend = Some(backend.clone());
            self.source_attribution
                .insert("state.backend".to_string(), ConfigSource::Cli);
        }
    }
}

/// Values read from `KBPROV_*` environment variables
struct EnvSettings {
    aws: AwsSettings,
    timing: TimingConfig,
    state: StateConfig,
    orchestrator: OrchestratorSettings,
}

impl EnvSettings {
    fn read<F>(env: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            aws: AwsSettings {
                region: env("KBPROV_REGION"),
                endpoint_url: env("KBPROV_ENDPOINT_URL"),
                operation_timeout_secs: parse_env(env, "KBPROV_OPERATION_TIMEOUT_SECS")?,
            },
            timing: TimingConfig {
                poll_interval_secs: parse_env(env, "KBPROV_POLL_INTERVAL_SECS")?,
                max_poll_attempts: parse_env(env, "KBPROV_MAX_POLL_ATTEMPTS")?,
                propagation_delay_secs: parse_env(env, "KBPROV_PROPAGATION_DELAY_SECS")?,
            },
            state: StateConfig {
                backend: env("KBPROV_STATE_BACKEND"),
            },
            orchestrator: OrchestratorSettings {
                execution_role_arn: env("KBPROV_EXECUTION_ROLE_ARN"),
                physical_resource_id: env("KBPROV_PHYSICAL_RESOURCE_ID"),
            },
        })
    }
}

fn parse_env<F, T>(env: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match env(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
    }
}
