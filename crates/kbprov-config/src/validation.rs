use kbprov_utils::error::ConfigError;

use super::{Config, StateBackend};

fn invalid(key: &str, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.into(),
    }
}

impl Config {
    /// Convert the state backend string to its enum
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an unknown backend name.
    pub fn state_backend(&self) -> Result<StateBackend, ConfigError> {
        match self.state.backend.as_deref().unwrap_or("ssm") {
            "ssm" => Ok(StateBackend::Ssm),
            "memory" => Ok(StateBackend::Memory),
            other => Err(invalid(
                "state.backend",
                format!("Unknown state backend: {other} (expected ssm or memory)"),
            )),
        }
    }

    /// Validate value ranges across all sections
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError::InvalidValue` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.state_backend()?;

        if self.timing.max_poll_attempts() == 0 {
            return Err(invalid(
                "timing.max_poll_attempts",
                "must be at least 1",
            ));
        }

        let dimension = self.index.dimension();
        if dimension == 0 || dimension > 16_000 {
            return Err(invalid(
                "index.dimension",
                format!("{dimension} is outside 1..=16000"),
            ));
        }

        if self.index.m() < 2 {
            return Err(invalid("index.m", "must be at least 2"));
        }

        if self.index.ef_construction() == 0 {
            return Err(invalid("index.ef_construction", "must be at least 1"));
        }

        if !matches!(self.index.engine(), "faiss" | "nmslib" | "lucene") {
            return Err(invalid(
                "index.engine",
                format!("Unknown engine: {}", self.index.engine()),
            ));
        }

        let inclusion = self.data_source.inclusion_prefix();
        if inclusion.is_empty() {
            return Err(invalid("data_source.inclusion_prefix", "must not be empty"));
        }

        if let Some(endpoint) = &self.aws.endpoint_url
            && !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(invalid(
                "aws.endpoint_url",
                format!("{endpoint} is not an http(s) URL"),
            ));
        }

        if let Some(role) = &self.orchestrator.execution_role_arn
            && !role.starts_with("arn:")
        {
            return Err(invalid(
                "orchestrator.execution_role_arn",
                format!("{role} is not an ARN"),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DataSourceConfig, IndexConfig, StateConfig, TimingConfig};

    #[test]
    fn defaults_are_valid() {
        assert!(Config::defaults().validate().is_ok());
        assert_eq!(Config::defaults().state_backend().unwrap(), StateBackend::Ssm);
    }

    #[test]
    fn rejects_zero_attempts() {
        let config = Config {
            timing: TimingConfig {
                max_poll_attempts: Some(0),
                ..TimingConfig::default()
            },
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timing.max_poll_attempts"));
    }

    #[test]
    fn rejects_zero_dimension() {
        let config = Config {
            index: IndexConfig {
                dimension: Some(0),
                ..IndexConfig::default()
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_inclusion_prefix() {
        let config = Config {
            data_source: DataSourceConfig {
                inclusion_prefix: Some(String::new()),
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unknown_backend() {
        let config = Config {
            state: StateConfig {
                backend: Some("redis".to_string()),
            },
            ..Config::default()
        };
        let err = config.state_backend().unwrap_err();
        assert!(err.to_string().contains("redis"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn memory_backend_parses() {
        let config = Config {
            state: StateConfig {
                backend: Some("memory".to_string()),
            },
            ..Config::default()
        };
        assert_eq!(config.state_backend().unwrap(), StateBackend::Memory);
    }
}
