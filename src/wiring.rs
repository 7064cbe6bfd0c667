//! Production wiring: AWS clients and the state backend from `Config`

use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use std::sync::Arc;
use tracing::{debug, warn};

use kbprov_config::{Config, StateBackend};
use kbprov_knowledge::{BedrockAgentApi, BedrockAgentConfig};
use kbprov_orchestrator::{ExecutionContext, Orchestrator};
use kbprov_search::{AossApi, AossApiConfig};
use kbprov_state::{InMemoryStateStore, SsmStateStore, SsmStoreConfig, StateStore};
use kbprov_utils::TokioSleeper;

/// Load the shared SDK configuration, applying the configured region
pub async fn load_sdk_config(config: &Config) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &config.aws.region {
        loader = loader.region(Region::new(region.clone()));
    }
    loader.load().await
}

/// State store selected by `state.backend`
///
/// # Errors
///
/// Fails when the backend name is unknown.
pub fn state_store(config: &Config, sdk_config: &SdkConfig) -> Result<Arc<dyn StateStore>> {
    let backend = config.state_backend()?;
    debug!(%backend, "Selected state backend");
    Ok(match backend {
        StateBackend::Ssm => Arc::new(SsmStateStore::new(
            sdk_config,
            SsmStoreConfig {
                region: config.aws.region.clone(),
                endpoint_url: config.aws.endpoint_url.clone(),
                operation_timeout: config.aws.operation_timeout(),
            },
        )),
        StateBackend::Memory => {
            warn!("Using the in-memory state backend; nothing persists past this process");
            Arc::new(InMemoryStateStore::new())
        }
    })
}

/// An `Orchestrator` talking to the real services
///
/// # Errors
///
/// Fails when the state backend is unknown or the search client cannot be
/// built (no region or credentials provider).
pub async fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    let sdk_config = load_sdk_config(config).await;
    let state = state_store(config, &sdk_config)?;

    let search_api = AossApi::new(
        &sdk_config,
        AossApiConfig {
            region: config.aws.region.clone(),
            endpoint_url: config.aws.endpoint_url.clone(),
            operation_timeout: config.aws.operation_timeout(),
        },
    )
    .context("Failed to build the OpenSearch Serverless client")?;

    let knowledge_api = BedrockAgentApi::new(
        &sdk_config,
        BedrockAgentConfig {
            region: config.aws.region.clone(),
            endpoint_url: config.aws.endpoint_url.clone(),
            operation_timeout: config.aws.operation_timeout(),
        },
    );

    Ok(Orchestrator::from_config(
        config,
        Arc::new(search_api),
        Arc::new(knowledge_api),
        state,
        Arc::new(TokioSleeper),
        ExecutionContext::from_env(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_backend_is_selectable() {
        let config = Config::builder().state_backend("memory").build().unwrap();
        let sdk_config = SdkConfig::builder().build();
        assert!(state_store(&config, &sdk_config).is_ok());
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let mut config = Config::defaults();
        config.state.backend = Some("dynamo".to_string());
        let sdk_config = SdkConfig::builder().build();
        let err = state_store(&config, &sdk_config).err().unwrap();
        assert!(err.to_string().contains("dynamo"));
    }
}
