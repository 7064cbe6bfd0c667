//! OpenSearch Serverless over the AWS SDK, with signed HTTP for the index

use async_trait::async_trait;
use aws_sdk_opensearchserverless::Client;
use aws_sdk_opensearchserverless::types::{AccessPolicyType, CollectionType, SecurityPolicyType};
use aws_smithy_types::timeout::TimeoutConfig;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use kbprov_utils::ServiceError;
use kbprov_utils::aws::{classify_sdk_error, classify_status};

use crate::api::{AccessPolicyRequest, SearchPlatformApi, SecurityPolicyRequest};
use crate::model::{CollectionRecord, CollectionStatus, SecurityPolicyKind};
use crate::signing::RequestSigner;

/// Default per-request timeout for index calls
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Overrides applied on top of the shared `SdkConfig`
#[derive(Debug, Clone, Default)]
pub struct AossApiConfig {
    pub region: Option<String>,
    /// Control-plane endpoint override; index calls always use the collection endpoint
    pub endpoint_url: Option<String>,
    pub operation_timeout: Option<Duration>,
}

/// Production `SearchPlatformApi`
#[derive(Clone)]
pub struct AossApi {
    client: Client,
    http: reqwest::Client,
    signer: RequestSigner,
}

impl std::fmt::Debug for AossApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AossApi")
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}

impl AossApi {
    /// # Errors
    ///
    /// Fails when no credentials provider or region is configured, or the
    /// HTTP client cannot be built.
    pub fn new(
        sdk_config: &aws_config::SdkConfig,
        config: AossApiConfig,
    ) -> Result<Self, ServiceError> {
        let mut builder = aws_sdk_opensearchserverless::config::Builder::from(sdk_config);

        if let Some(region) = &config.region {
            builder = builder.region(aws_sdk_opensearchserverless::config::Region::new(
                region.clone(),
            ));
        }

        if let Some(endpoint) = config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        if let Some(timeout) = config.operation_timeout {
            builder = builder.timeout_config(
                TimeoutConfig::builder().operation_timeout(timeout).build(),
            );
        }

        let region = config
            .region
            .or_else(|| sdk_config.region().map(ToString::to_string))
            .ok_or_else(|| ServiceError::Validation("No AWS region configured".to_string()))?;
        let credentials = sdk_config.credentials_provider().ok_or_else(|| {
            ServiceError::AccessDenied("No AWS credentials provider configured".to_string())
        })?;

        let http = reqwest::Client::builder()
            .timeout(config.operation_timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT))
            .build()
            .map_err(|e| ServiceError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client: Client::from_conf(builder.build()),
            http,
            signer: RequestSigner::new(credentials, region),
        })
    }
}

fn security_policy_type(kind: SecurityPolicyKind) -> SecurityPolicyType {
    match kind {
        SecurityPolicyKind::Encryption => SecurityPolicyType::Encryption,
        SecurityPolicyKind::Network => SecurityPolicyType::Network,
    }
}

#[async_trait]
impl SearchPlatformApi for AossApi {
    async fn create_security_policy(
        &self,
        request: SecurityPolicyRequest,
    ) -> Result<(), ServiceError> {
        self.client
            .create_security_policy()
            .client_token(request.client_token)
            .name(request.name)
            .r#type(security_policy_type(request.kind))
            .policy(request.policy)
            .send()
            .await
            .map_err(|e| classify_sdk_error("CreateSecurityPolicy", e))?;
        Ok(())
    }

    async fn create_access_policy(&self, request: AccessPolicyRequest) -> Result<(), ServiceError> {
        self.client
            .create_access_policy()
            .client_token(request.client_token)
            .name(request.name)
            .r#type(AccessPolicyType::Data)
            .policy(request.policy)
            .send()
            .await
            .map_err(|e| classify_sdk_error("CreateAccessPolicy", e))?;
        Ok(())
    }

    async fn create_collection(
        &self,
        name: &str,
        client_token: &str,
    ) -> Result<String, ServiceError> {
        let output = self
            .client
            .create_collection()
            .client_token(client_token)
            .name(name)
            .r#type(CollectionType::Vectorsearch)
            .send()
            .await
            .map_err(|e| classify_sdk_error("CreateCollection", e))?;

        output
            .create_collection_detail()
            .and_then(|detail| detail.id())
            .map(str::to_string)
            .ok_or_else(|| ServiceError::Other("CreateCollection returned no id".to_string()))
    }

    async fn get_collection(&self, id: &str) -> Result<Option<CollectionRecord>, ServiceError> {
        let output = self
            .client
            .batch_get_collection()
            .ids(id)
            .send()
            .await
            .map_err(|e| classify_sdk_error("BatchGetCollection", e))?;

        Ok(output.collection_details().first().map(|detail| {
            CollectionRecord {
                id: detail.id().unwrap_or(id).to_string(),
                arn: detail.arn().unwrap_or_default().to_string(),
                name: detail.name().unwrap_or_default().to_string(),
                endpoint: detail.collection_endpoint().unwrap_or_default().to_string(),
                status: detail
                    .status()
                    .map(|status| CollectionStatus::from_service(status.as_str()))
                    .unwrap_or(CollectionStatus::Creating),
            }
        }))
    }

    async fn create_index(
        &self,
        endpoint: &str,
        name: &str,
        body: &Value,
    ) -> Result<(), ServiceError> {
        let url = format!("{}/{name}", endpoint.trim_end_matches('/'));
        let payload = serde_json::to_vec(body)
            .map_err(|e| ServiceError::Validation(format!("Index body: {e}")))?;
        let content_type = ("content-type", "application/json");

        let signed = self
            .signer
            .sign("PUT", &url, &[content_type], &payload)
            .await?;

        let mut request = self
            .http
            .put(&url)
            .header(content_type.0, content_type.1)
            .body(payload);
        for (header, value) in signed {
            request = request.header(header, value);
        }

        debug!(url = %url, "Creating index");
        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::Transport(format!("CreateIndex: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(classify_status(
            status.as_u16(),
            format!("CreateIndex returned {status}: {text}"),
        ))
    }

    async fn delete_access_policy(
        &self,
        name: &str,
        client_token: &str,
    ) -> Result<(), ServiceError> {
        self.client
            .delete_access_policy()
            .client_token(client_token)
            .name(name)
            .r#type(AccessPolicyType::Data)
            .send()
            .await
            .map_err(|e| classify_sdk_error("DeleteAccessPolicy", e))?;
        Ok(())
    }

    async fn delete_security_policy(
        &self,
        kind: SecurityPolicyKind,
        name: &str,
        client_token: &str,
    ) -> Result<(), ServiceError> {
        self.client
            .delete_security_policy()
            .client_token(client_token)
            .name(name)
            .r#type(security_policy_type(kind))
            .send()
            .await
            .map_err(|e| classify_sdk_error("DeleteSecurityPolicy", e))?;
        Ok(())
    }

    async fn delete_collection(&self, id: &str, client_token: &str) -> Result<(), ServiceError> {
        self.client
            .delete_collection()
            .client_token(client_token)
            .id(id)
            .send()
            .await
            .map_err(|e| classify_sdk_error("DeleteCollection", e))?;
        Ok(())
    }
}
