use std::time::Duration;

use kbprov_utils::error::ConfigError;

use super::{Config, ConfigSource};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// Use this when embedding the orchestrator without environment variables
    /// or config files.
    ///
    /// # Example
    ///
    /// ```rust
    /// use kbprov_config::Config;
    /// use std::time::Duration;
    ///
    /// let config = Config::builder()
    ///     .poll_interval(Duration::from_secs(10))
    ///     .max_poll_attempts(90)
    ///     .state_backend("memory")
    ///     .build()
    ///     .expect("valid config");
    /// assert_eq!(config.timing.max_poll_attempts(), 90);
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for programmatic configuration.
///
/// All values set via the builder are attributed to `ConfigSource::Programmatic`.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn mark(&mut self, key: &str) {
        self.config
            .source_attribution
            .insert(key.to_string(), ConfigSource::Programmatic);
    }

    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.aws.region = Some(region.into());
        self.mark("aws.region");
        self
    }

    #[must_use]
    pub fn endpoint_url(mut self, endpoint: impl Into<String>) -> Self {
        self.config.aws.endpoint_url = Some(endpoint.into());
        self.mark("aws.endpoint_url");
        self
    }

    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.timing.poll_interval_secs = Some(interval.as_secs());
        self.mark("timing.poll_interval_secs");
        self
    }

    #[must_use]
    pub fn max_poll_attempts(mut self, attempts: u32) -> Self {
        self.config.timing.max_poll_attempts = Some(attempts);
        self.mark("timing.max_poll_attempts");
        self
    }

    #[must_use]
    pub fn propagation_delay(mut self, delay: Duration) -> Self {
        self.config.timing.propagation_delay_secs = Some(delay.as_secs());
        self.mark("timing.propagation_delay_secs");
        self
    }

    #[must_use]
    pub fn index_dimension(mut self, dimension: u32) -> Self {
        self.config.index.dimension = Some(dimension);
        self.mark("index.dimension");
        self
    }

    #[must_use]
    pub fn inclusion_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.data_source.inclusion_prefix = Some(prefix.into());
        self.mark("data_source.inclusion_prefix");
        self
    }

    #[must_use]
    pub fn state_backend(mut self, backend: impl Into<String>) -> Self {
        self.config.state.backend = Some(backend.into());
        self.mark("state.backend");
        self
    }

    #[must_use]
    pub fn execution_role_arn(mut self, arn: impl Into<String>) -> Self {
        self.config.orchestrator.execution_role_arn = Some(arn.into());
        self.mark("orchestrator.execution_role_arn");
        self
    }

    #[must_use]
    pub fn physical_resource_id(mut self, id: impl Into<String>) -> Self {
        self.config.orchestrator.physical_resource_id = Some(id.into());
        self.mark("orchestrator.physical_resource_id");
        self
    }

    /// Validate and return the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if validation fails.
    pub fn build(self) -> Result<Config, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
