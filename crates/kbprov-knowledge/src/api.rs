use async_trait::async_trait;

use kbprov_utils::ServiceError;

use crate::model::{CreatedKnowledgeBase, DataSourceRequest, KnowledgeBaseRequest};

/// Remote operations of the knowledge-resource service
#[async_trait]
pub trait KnowledgeApi: Send + Sync {
    async fn create_knowledge_base(
        &self,
        request: KnowledgeBaseRequest,
    ) -> Result<CreatedKnowledgeBase, ServiceError>;

    /// Returns the data source id when the service reports one
    async fn create_data_source(
        &self,
        request: DataSourceRequest,
    ) -> Result<Option<String>, ServiceError>;

    async fn delete_knowledge_base(&self, knowledge_base_id: &str) -> Result<(), ServiceError>;
}
