//! SSM Parameter Store backend

use async_trait::async_trait;
use aws_sdk_ssm::Client;
use aws_sdk_ssm::types::ParameterType;
use aws_smithy_types::timeout::TimeoutConfig;
use std::time::Duration;
use tracing::debug;

use kbprov_utils::aws::classify_sdk_error;

use crate::{StateError, StateStore};

/// Overrides applied on top of the shared `SdkConfig`
#[derive(Debug, Clone, Default)]
pub struct SsmStoreConfig {
    pub region: Option<String>,
    /// Alternate endpoint, e.g. LocalStack
    pub endpoint_url: Option<String>,
    pub operation_timeout: Option<Duration>,
}

/// State store over plain `String` parameters
#[derive(Clone)]
pub struct SsmStateStore {
    client: Client,
}

impl std::fmt::Debug for SsmStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsmStateStore").finish_non_exhaustive()
    }
}

impl SsmStateStore {
    #[must_use]
    pub fn new(sdk_config: &aws_config::SdkConfig, config: SsmStoreConfig) -> Self {
        let mut builder = aws_sdk_ssm::config::Builder::from(sdk_config);

        if let Some(region) = config.region {
            builder = builder.region(aws_sdk_ssm::config::Region::new(region));
        }

        if let Some(endpoint) = config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        if let Some(timeout) = config.operation_timeout {
            let timeout_config = TimeoutConfig::builder()
                .operation_timeout(timeout)
                .build();
            builder = builder.timeout_config(timeout_config);
        }

        Self {
            client: Client::from_conf(builder.build()),
        }
    }

    /// Create from a pre-built client
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn backend(err: impl std::fmt::Display) -> StateError {
    StateError::Backend(err.to_string())
}

#[async_trait]
impl StateStore for SsmStateStore {
    async fn put(&self, key: &str, value: &str) -> Result<(), StateError> {
        debug!(key, "PutParameter");
        self.client
            .put_parameter()
            .name(key)
            .value(value)
            .r#type(ParameterType::String)
            .overwrite(true)
            .send()
            .await
            .map_err(|e| backend(classify_sdk_error("PutParameter", e)))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<String, StateError> {
        debug!(key, "GetParameter");
        let output = match self.client.get_parameter().name(key).send().await {
            Ok(output) => output,
            Err(e) => {
                let not_found = e
                    .as_service_error()
                    .is_some_and(|svc| svc.is_parameter_not_found());
                if not_found {
                    return Err(StateError::NotFound {
                        key: key.to_string(),
                    });
                }
                return Err(backend(classify_sdk_error("GetParameter", e)));
            }
        };

        output
            .parameter()
            .and_then(|p| p.value())
            .map(str::to_string)
            .ok_or_else(|| StateError::NotFound {
                key: key.to_string(),
            })
    }

    async fn delete(&self, key: &str) -> Result<(), StateError> {
        debug!(key, "DeleteParameter");
        match self.client.delete_parameter().name(key).send().await {
            Ok(_) => Ok(()),
            Err(e) => {
                let not_found = e
                    .as_service_error()
                    .is_some_and(|svc| svc.is_parameter_not_found());
                if not_found {
                    Ok(())
                } else {
                    Err(backend(classify_sdk_error("DeleteParameter", e)))
                }
            }
        }
    }
}
