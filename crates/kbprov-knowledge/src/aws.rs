//! Bedrock Agent over the AWS SDK

use async_trait::async_trait;
use aws_sdk_bedrockagent::Client;
use aws_sdk_bedrockagent::types::{
    DataSourceConfiguration, DataSourceType, KnowledgeBaseConfiguration, KnowledgeBaseStorageType,
    KnowledgeBaseType, OpenSearchServerlessConfiguration, OpenSearchServerlessFieldMapping,
    S3DataSourceConfiguration, StorageConfiguration, VectorKnowledgeBaseConfiguration,
};
use aws_smithy_types::error::operation::BuildError;
use aws_smithy_types::timeout::TimeoutConfig;
use std::time::Duration;

use kbprov_utils::ServiceError;
use kbprov_utils::aws::classify_sdk_error;

use crate::api::KnowledgeApi;
use crate::model::{CreatedKnowledgeBase, DataSourceRequest, KnowledgeBaseRequest};

/// Overrides applied on top of the shared `SdkConfig`
#[derive(Debug, Clone, Default)]
pub struct BedrockAgentConfig {
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub operation_timeout: Option<Duration>,
}

/// Production `KnowledgeApi`
#[derive(Clone)]
pub struct BedrockAgentApi {
    client: Client,
}

impl std::fmt::Debug for BedrockAgentApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BedrockAgentApi").finish_non_exhaustive()
    }
}

impl BedrockAgentApi {
    #[must_use]
    pub fn new(sdk_config: &aws_config::SdkConfig, config: BedrockAgentConfig) -> Self {
        let mut builder = aws_sdk_bedrockagent::config::Builder::from(sdk_config);

        if let Some(region) = config.region {
            builder = builder.region(aws_sdk_bedrockagent::config::Region::new(region));
        }

        if let Some(endpoint) = config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        if let Some(timeout) = config.operation_timeout {
            builder = builder.timeout_config(
                TimeoutConfig::builder().operation_timeout(timeout).build(),
            );
        }

        Self {
            client: Client::from_conf(builder.build()),
        }
    }

    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn invalid(err: BuildError) -> ServiceError {
    ServiceError::Validation(format!("Malformed request: {err}"))
}

fn knowledge_base_shapes(
    request: &KnowledgeBaseRequest,
) -> Result<(KnowledgeBaseConfiguration, StorageConfiguration), BuildError> {
    let knowledge_base = KnowledgeBaseConfiguration::builder()
        .r#type(KnowledgeBaseType::Vector)
        .vector_knowledge_base_configuration(
            VectorKnowledgeBaseConfiguration::builder()
                .embedding_model_arn(&request.embedding_model_arn)
                .build()?,
        )
        .build()?;

    let field_mapping = OpenSearchServerlessFieldMapping::builder()
        .vector_field(&request.field_mapping.vector_field)
        .text_field(&request.field_mapping.text_field)
        .metadata_field(&request.field_mapping.metadata_field)
        .build()?;

    let storage = StorageConfiguration::builder()
        .r#type(KnowledgeBaseStorageType::OpensearchServerless)
        .opensearch_serverless_configuration(
            OpenSearchServerlessConfiguration::builder()
                .collection_arn(&request.collection_arn)
                .vector_index_name(&request.vector_index_name)
                .field_mapping(field_mapping)
                .build()?,
        )
        .build()?;

    Ok((knowledge_base, storage))
}

fn data_source_shape(request: &DataSourceRequest) -> Result<DataSourceConfiguration, BuildError> {
    DataSourceConfiguration::builder()
        .r#type(DataSourceType::S3)
        .s3_configuration(
            S3DataSourceConfiguration::builder()
                .bucket_arn(&request.bucket_arn)
                .set_inclusion_prefixes(Some(request.inclusion_prefixes.clone()))
                .build()?,
        )
        .build()
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

#[async_trait]
impl KnowledgeApi for BedrockAgentApi {
    async fn create_knowledge_base(
        &self,
        request: KnowledgeBaseRequest,
    ) -> Result<CreatedKnowledgeBase, ServiceError> {
        let (knowledge_base, storage) = knowledge_base_shapes(&request).map_err(invalid)?;

        let output = self
            .client
            .create_knowledge_base()
            .client_token(request.client_token)
            .name(request.name)
            .role_arn(request.role_arn)
            .knowledge_base_configuration(knowledge_base)
            .storage_configuration(storage)
            .send()
            .await
            .map_err(|e| classify_sdk_error("CreateKnowledgeBase", e))?;

        Ok(output
            .knowledge_base()
            .map(|kb| CreatedKnowledgeBase {
                id: non_empty(kb.knowledge_base_id()),
                arn: non_empty(kb.knowledge_base_arn()),
            })
            .unwrap_or_default())
    }

    async fn create_data_source(
        &self,
        request: DataSourceRequest,
    ) -> Result<Option<String>, ServiceError> {
        let configuration = data_source_shape(&request).map_err(invalid)?;

        let output = self
            .client
            .create_data_source()
            .knowledge_base_id(request.knowledge_base_id)
            .client_token(request.client_token)
            .name(request.name)
            .data_source_configuration(configuration)
            .send()
            .await
            .map_err(|e| classify_sdk_error("CreateDataSource", e))?;

        Ok(output
            .data_source()
            .and_then(|ds| non_empty(ds.data_source_id())))
    }

    async fn delete_knowledge_base(&self, knowledge_base_id: &str) -> Result<(), ServiceError> {
        self.client
            .delete_knowledge_base()
            .knowledge_base_id(knowledge_base_id)
            .send()
            .await
            .map_err(|e| classify_sdk_error("DeleteKnowledgeBase", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldMapping;
    use kbprov_utils::LogicalPrefix;

    #[test]
    fn knowledge_base_shapes_bind_collection_and_fields() {
        let prefix = LogicalPrefix::new("acme").unwrap();
        let request = KnowledgeBaseRequest {
            name: "acme".to_string(),
            role_arn: "arn:aws:iam::1:role/kb".to_string(),
            embedding_model_arn: "m1".to_string(),
            collection_arn: "arn:aws:aoss:us-east-1:1:collection/col-acme".to_string(),
            vector_index_name: "acme".to_string(),
            field_mapping: FieldMapping::for_prefix(&prefix),
            client_token: "token".to_string(),
        };
        let (kb, storage) = knowledge_base_shapes(&request).unwrap();

        let kb = format!("{kb:?}");
        assert!(kb.contains("Vector"));
        assert!(kb.contains("m1"));
        let storage = format!("{storage:?}");
        assert!(storage.contains("OpensearchServerless"));
        assert!(storage.contains("acme-vector"));
        assert!(storage.contains("col-acme"));
    }

    #[test]
    fn data_source_shape_limits_inclusion_prefix() {
        let request = DataSourceRequest {
            knowledge_base_id: "kb-1".to_string(),
            name: "acme".to_string(),
            bucket_arn: "b1".to_string(),
            inclusion_prefixes: vec!["knowledgeBase/".to_string()],
            client_token: "token".to_string(),
        };
        let shape = format!("{:?}", data_source_shape(&request).unwrap());
        assert!(shape.contains("S3"));
        assert!(shape.contains("knowledgeBase/"));
    }
}
