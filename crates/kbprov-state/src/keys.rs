use kbprov_utils::LogicalPrefix;
use std::fmt;

/// One persisted identifier of a provisioning chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateField {
    CollectionId,
    CollectionArn,
    CollectionName,
    CollectionEndpoint,
    KnowledgeBaseId,
    KnowledgeBaseArn,
    DataSourceId,
}

impl StateField {
    /// Every field, in creation order
    pub const ALL: [StateField; 7] = [
        StateField::CollectionId,
        StateField::CollectionArn,
        StateField::CollectionName,
        StateField::CollectionEndpoint,
        StateField::KnowledgeBaseId,
        StateField::KnowledgeBaseArn,
        StateField::DataSourceId,
    ];

    /// Field name as it appears in keys and response data
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CollectionId => "collectionId",
            Self::CollectionArn => "collectionArn",
            Self::CollectionName => "collectionName",
            Self::CollectionEndpoint => "collectionEndpoint",
            Self::KnowledgeBaseId => "knowledgeBaseId",
            Self::KnowledgeBaseArn => "knowledgeBaseArn",
            Self::DataSourceId => "dataSourceId",
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full store key for a field: `/{prefix}/{field}`
#[must_use]
pub fn state_key(prefix: &LogicalPrefix, field: StateField) -> String {
    format!("/{}/{}", prefix.as_str(), field.as_str())
}
