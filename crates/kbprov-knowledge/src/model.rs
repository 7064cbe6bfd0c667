use serde::{Deserialize, Serialize};

use kbprov_utils::LogicalPrefix;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBaseRecord {
    pub id: String,
    pub arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceRecord {
    pub id: String,
}

/// Persisted knowledge-side identifiers, as returned on `Update`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeSnapshot {
    pub knowledge_base: KnowledgeBaseRecord,
    pub data_source: DataSourceRecord,
}

/// Names of the collection index fields the knowledge base reads and writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub vector_field: String,
    pub text_field: String,
    pub metadata_field: String,
}

impl FieldMapping {
    /// `{prefix}-vector` / `text` / `metadata`
    #[must_use]
    pub fn for_prefix(prefix: &LogicalPrefix) -> Self {
        Self {
            vector_field: prefix.vector_field(),
            text_field: "text".to_string(),
            metadata_field: "metadata".to_string(),
        }
    }
}

/// `CreateKnowledgeBase` input for a `VECTOR` knowledge base on a serverless collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeBaseRequest {
    pub name: String,
    pub role_arn: String,
    pub embedding_model_arn: String,
    pub collection_arn: String,
    pub vector_index_name: String,
    pub field_mapping: FieldMapping,
    pub client_token: String,
}

/// Identifiers returned by `CreateKnowledgeBase`; either may be absent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatedKnowledgeBase {
    pub id: Option<String>,
    pub arn: Option<String>,
}

/// `CreateDataSource` input for an `S3` data source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceRequest {
    pub knowledge_base_id: String,
    pub name: String,
    pub bucket_arn: String,
    pub inclusion_prefixes: Vec<String>,
    pub client_token: String,
}
