use serde::{Deserialize, Serialize};

/// Activation state of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionStatus {
    Creating,
    Active,
    Failed,
}

impl CollectionStatus {
    /// Map the service status string; transitional states count as `Creating`
    #[must_use]
    pub fn from_service(status: &str) -> Self {
        match status {
            "ACTIVE" => Self::Active,
            "FAILED" => Self::Failed,
            _ => Self::Creating,
        }
    }
}

impl std::fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Creating => write!(f, "CREATING"),
            Self::Active => write!(f, "ACTIVE"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// A vector-search collection as reported by the service or persisted state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub id: String,
    pub arn: String,
    pub name: String,
    pub endpoint: String,
    pub status: CollectionStatus,
}

/// Security policy families attached to a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SecurityPolicyKind {
    Encryption,
    Network,
}

impl SecurityPolicyKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Encryption => "encryption",
            Self::Network => "network",
        }
    }
}

impl std::fmt::Display for SecurityPolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
