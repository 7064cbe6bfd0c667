use async_trait::async_trait;
use serde_json::Value;

use kbprov_utils::ServiceError;

use crate::model::{CollectionRecord, SecurityPolicyKind};

/// `CreateSecurityPolicy` input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityPolicyRequest {
    pub kind: SecurityPolicyKind,
    pub name: String,
    pub policy: String,
    pub client_token: String,
}

/// `CreateAccessPolicy` input; the policy type is always `data`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicyRequest {
    pub name: String,
    pub policy: String,
    pub client_token: String,
}

/// Remote operations of the search platform.
///
/// Implementations do not retry, poll or persist anything. Every failure is
/// returned as a classified `ServiceError`.
#[async_trait]
pub trait SearchPlatformApi: Send + Sync {
    async fn create_security_policy(&self, request: SecurityPolicyRequest)
    -> Result<(), ServiceError>;

    async fn create_access_policy(&self, request: AccessPolicyRequest) -> Result<(), ServiceError>;

    /// Request a `VECTORSEARCH` collection and return its id
    async fn create_collection(&self, name: &str, client_token: &str)
    -> Result<String, ServiceError>;

    /// Current details of a collection, `None` when the service returns none
    async fn get_collection(&self, id: &str) -> Result<Option<CollectionRecord>, ServiceError>;

    /// Create index `name` on the collection at `endpoint`
    async fn create_index(&self, endpoint: &str, name: &str, body: &Value)
    -> Result<(), ServiceError>;

    async fn delete_access_policy(&self, name: &str, client_token: &str)
    -> Result<(), ServiceError>;

    async fn delete_security_policy(
        &self,
        kind: SecurityPolicyKind,
        name: &str,
        client_token: &str,
    ) -> Result<(), ServiceError>;

    async fn delete_collection(&self, id: &str, client_token: &str) -> Result<(), ServiceError>;
}
