use std::time::Duration;
use thiserror::Error;

/// Failure of a single remote call, classified from the SDK or HTTP layer.
///
/// Clients never inspect raw SDK errors. The AWS adapters map every failure
/// into one of these variants, and the client layer decides whether a given
/// class is fatal for the step it is running.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Network, dispatch or timeout failure before a service response
    #[error("Transport error: {0}")]
    Transport(String),

    /// Throttling or quota rejection
    #[error("Throttled: {0}")]
    Throttled(String),

    /// Credentials rejected or permission missing
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// The addressed resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A resource with the same name already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Request rejected as malformed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Any other service failure
    #[error("Service error: {0}")]
    Other(String),
}

impl ServiceError {
    /// True when the resource already exists under the requested name
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// State store failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// The key is absent from the store
    #[error("State key not found: {key}")]
    NotFound { key: String },

    /// The backing store rejected or failed the call
    #[error("State store error: {0}")]
    Backend(String),
}

/// Provisioning error taxonomy.
///
/// Every variant except `IndexCreationFailed` aborts the create chain. During
/// teardown the orchestrator classifies each step's error as fatal or
/// swallowed; see `kbprov_orchestrator::teardown`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProvisionError {
    #[error("Failed to create {policy} policy: {reason}")]
    PolicyCreationFailed { policy: String, reason: String },

    #[error("Failed to create collection: {0}")]
    CollectionCreationFailed(String),

    #[error("Collection did not become active after {attempts} status checks at {interval:?} intervals")]
    CollectionTimeout { attempts: u32, interval: Duration },

    #[error("Failed to create index: {0}")]
    IndexCreationFailed(String),

    #[error("Failed to create knowledge base: {0}")]
    KnowledgeBaseCreationFailed(String),

    #[error("Failed to create data source: {0}")]
    DataSourceCreationFailed(String),

    #[error("Failed to delete {policy} policy: {reason}")]
    PolicyDeletionFailed { policy: String, reason: String },

    #[error("Failed to delete collection: {0}")]
    CollectionDeletionFailed(String),

    #[error("Failed to delete knowledge base: {0}")]
    KnowledgeBaseDeletionFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid lifecycle request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    State(StateError),
}

impl From<StateError> for ProvisionError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::NotFound { key } => Self::NotFound(key),
            other => Self::State(other),
        }
    }
}

impl ProvisionError {
    /// True when the error names something that does not exist
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Trait for errors that can provide user-friendly messages with context
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;
}

impl UserFriendlyError for ProvisionError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::PolicyCreationFailed { .. } => Some(
                "Security and access policies are created before the collection; \
                 no collection was requested."
                    .to_string(),
            ),
            Self::CollectionTimeout { .. } => Some(
                "The collection may still finish activating. Send Delete before retrying Create."
                    .to_string(),
            ),
            Self::KnowledgeBaseCreationFailed(_) | Self::DataSourceCreationFailed(_) => Some(
                "The collection and its policies were left in place; earlier steps are not \
                 rolled back."
                    .to_string(),
            ),
            Self::CollectionDeletionFailed(_) | Self::KnowledgeBaseDeletionFailed(_) => Some(
                "Persisted identifiers were purged regardless; the resource may need manual cleanup."
                    .to_string(),
            ),
            Self::IndexCreationFailed(_) => {
                Some("Index creation failures do not abort the create chain.".to_string())
            }
            Self::State(_) | Self::NotFound(_) => {
                Some("Persisted identifiers live under /{prefix}/{field}.".to_string())
            }
            _ => None,
        }
    }
}

impl UserFriendlyError for StateError {
    fn user_message(&self) -> String {
        match self {
            Self::NotFound { key } => format!("No persisted value for {key}"),
            Self::Backend(msg) => format!("State store unavailable: {msg}"),
        }
    }

    fn context(&self) -> Option<String> {
        None
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {reason}")]
    Parse { path: String, reason: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidValue { .. } => Some(
                "Values come from KBPROV_* environment variables first, then the config file."
                    .to_string(),
            ),
            _ => None,
        }
    }
}
