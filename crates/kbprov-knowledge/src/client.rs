use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use kbprov_config::TimingConfig;
use kbprov_state::{PrefixStore, StateField, StateStore};
use kbprov_utils::poll::await_propagation;
use kbprov_utils::{LogicalPrefix, ProvisionError, ServiceError, Sleeper};

use crate::api::KnowledgeApi;
use crate::model::{
    DataSourceRecord, DataSourceRequest, FieldMapping, KnowledgeBaseRecord, KnowledgeBaseRequest,
    KnowledgeSnapshot,
};

/// Provisioning operations on the knowledge-resource service
pub struct KnowledgeResourceClient {
    api: Arc<dyn KnowledgeApi>,
    state: Arc<dyn StateStore>,
    sleeper: Arc<dyn Sleeper>,
    timing: TimingConfig,
    inclusion_prefix: String,
}

impl std::fmt::Debug for KnowledgeResourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeResourceClient")
            .field("timing", &self.timing)
            .field("inclusion_prefix", &self.inclusion_prefix)
            .finish_non_exhaustive()
    }
}

impl KnowledgeResourceClient {
    #[must_use]
    pub fn new(
        api: Arc<dyn KnowledgeApi>,
        state: Arc<dyn StateStore>,
        sleeper: Arc<dyn Sleeper>,
        timing: TimingConfig,
        inclusion_prefix: impl Into<String>,
    ) -> Self {
        Self {
            api,
            state,
            sleeper,
            timing,
            inclusion_prefix: inclusion_prefix.into(),
        }
    }

    fn scoped(&self, prefix: &LogicalPrefix) -> PrefixStore {
        PrefixStore::new(Arc::clone(&self.state), prefix.clone())
    }

    /// Create the knowledge base over the collection and persist its identifiers.
    ///
    /// Waits for the access policy to propagate first.
    ///
    /// # Errors
    ///
    /// `KnowledgeBaseCreationFailed` on a service error or when the response
    /// lacks the id or the ARN; `State` when persisting fails.
    pub async fn create_knowledge_base(
        &self,
        role_arn: &str,
        prefix: &LogicalPrefix,
        embedding_model_arn: &str,
        collection_arn: &str,
    ) -> Result<KnowledgeBaseRecord, ProvisionError> {
        await_propagation(
            self.sleeper.as_ref(),
            self.timing.propagation_delay(),
            "access policy before knowledge base creation",
        )
        .await;

        let request = KnowledgeBaseRequest {
            name: prefix.to_string(),
            role_arn: role_arn.to_string(),
            embedding_model_arn: embedding_model_arn.to_string(),
            collection_arn: collection_arn.to_string(),
            vector_index_name: prefix.to_string(),
            field_mapping: FieldMapping::for_prefix(prefix),
            client_token: Uuid::new_v4().to_string(),
        };

        let created = self
            .api
            .create_knowledge_base(request)
            .await
            .map_err(|e| ProvisionError::KnowledgeBaseCreationFailed(e.to_string()))?;

        let (Some(id), Some(arn)) = (created.id, created.arn) else {
            return Err(ProvisionError::KnowledgeBaseCreationFailed(
                "response is missing the knowledge base id or ARN".to_string(),
            ));
        };

        let scoped = self.scoped(prefix);
        scoped.put(StateField::KnowledgeBaseId, &id).await?;
        scoped.put(StateField::KnowledgeBaseArn, &arn).await?;

        info!(knowledge_base_id = %id, "Knowledge base created");
        Ok(KnowledgeBaseRecord { id, arn })
    }

    /// Bind the bucket to the knowledge base and persist the data source id
    ///
    /// # Errors
    ///
    /// `DataSourceCreationFailed` on a service error or a missing id;
    /// `State` when persisting fails.
    pub async fn create_data_source(
        &self,
        bucket_arn: &str,
        knowledge_base_id: &str,
        prefix: &LogicalPrefix,
    ) -> Result<DataSourceRecord, ProvisionError> {
        let request = DataSourceRequest {
            knowledge_base_id: knowledge_base_id.to_string(),
            name: prefix.to_string(),
            bucket_arn: bucket_arn.to_string(),
            inclusion_prefixes: vec![self.inclusion_prefix.clone()],
            client_token: Uuid::new_v4().to_string(),
        };

        let id = self
            .api
            .create_data_source(request)
            .await
            .map_err(|e| ProvisionError::DataSourceCreationFailed(e.to_string()))?
            .ok_or_else(|| {
                ProvisionError::DataSourceCreationFailed(
                    "response is missing the data source id".to_string(),
                )
            })?;

        self.scoped(prefix)
            .put(StateField::DataSourceId, &id)
            .await?;

        info!(data_source_id = %id, "Data source created");
        Ok(DataSourceRecord { id })
    }

    /// Delete the knowledge base recorded under the prefix
    ///
    /// # Errors
    ///
    /// `NotFound` when no id is persisted or the service no longer knows it;
    /// `KnowledgeBaseDeletionFailed` on any other service error.
    pub async fn delete_knowledge_base(
        &self,
        prefix: &LogicalPrefix,
    ) -> Result<(), ProvisionError> {
        let id = self.scoped(prefix).get(StateField::KnowledgeBaseId).await?;
        self.api
            .delete_knowledge_base(&id)
            .await
            .map_err(|e| match e {
                ServiceError::NotFound(msg) => ProvisionError::NotFound(msg),
                other => ProvisionError::KnowledgeBaseDeletionFailed(other.to_string()),
            })?;
        info!(knowledge_base_id = %id, "Knowledge base deletion requested");
        Ok(())
    }

    /// Persisted knowledge-side identifiers; no remote call is made
    ///
    /// # Errors
    ///
    /// `NotFound` naming the first missing key.
    pub async fn update_knowledge_base(
        &self,
        prefix: &LogicalPrefix,
    ) -> Result<KnowledgeSnapshot, ProvisionError> {
        let scoped = self.scoped(prefix);
        let knowledge_base = KnowledgeBaseRecord {
            id: scoped.get(StateField::KnowledgeBaseId).await?,
            arn: scoped.get(StateField::KnowledgeBaseArn).await?,
        };
        let data_source = DataSourceRecord {
            id: scoped.get(StateField::DataSourceId).await?,
        };
        Ok(KnowledgeSnapshot {
            knowledge_base,
            data_source,
        })
    }
}
