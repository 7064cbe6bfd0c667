//! In-memory `SearchPlatformApi` for tests

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use kbprov_utils::ServiceError;

use crate::api::{AccessPolicyRequest, SearchPlatformApi, SecurityPolicyRequest};
use crate::model::{CollectionRecord, CollectionStatus, SecurityPolicyKind};

/// One recorded call against the fake
#[derive(Debug, Clone, PartialEq)]
pub enum SearchCall {
    CreateSecurityPolicy {
        kind: SecurityPolicyKind,
        name: String,
        policy: String,
        client_token: String,
    },
    CreateAccessPolicy {
        name: String,
        policy: String,
        client_token: String,
    },
    CreateCollection {
        name: String,
        client_token: String,
    },
    GetCollection {
        id: String,
    },
    CreateIndex {
        endpoint: String,
        name: String,
        body: Value,
    },
    DeleteAccessPolicy {
        name: String,
    },
    DeleteSecurityPolicy {
        kind: SecurityPolicyKind,
        name: String,
    },
    DeleteCollection {
        id: String,
    },
}

impl SearchCall {
    #[must_use]
    pub fn operation(&self) -> SearchOperation {
        match self {
            Self::CreateSecurityPolicy {
                kind: SecurityPolicyKind::Encryption,
                ..
            } => SearchOperation::CreateEncryptionPolicy,
            Self::CreateSecurityPolicy {
                kind: SecurityPolicyKind::Network,
                ..
            } => SearchOperation::CreateNetworkPolicy,
            Self::CreateAccessPolicy { .. } => SearchOperation::CreateAccessPolicy,
            Self::CreateCollection { .. } => SearchOperation::CreateCollection,
            Self::GetCollection { .. } => SearchOperation::GetCollection,
            Self::CreateIndex { .. } => SearchOperation::CreateIndex,
            Self::DeleteAccessPolicy { .. } => SearchOperation::DeleteAccessPolicy,
            Self::DeleteSecurityPolicy {
                kind: SecurityPolicyKind::Encryption,
                ..
            } => SearchOperation::DeleteEncryptionPolicy,
            Self::DeleteSecurityPolicy {
                kind: SecurityPolicyKind::Network,
                ..
            } => SearchOperation::DeleteNetworkPolicy,
            Self::DeleteCollection { .. } => SearchOperation::DeleteCollection,
        }
    }

    /// True for every call except status reads
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::GetCollection { .. })
    }
}

/// Operation names used to script failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SearchOperation {
    CreateEncryptionPolicy,
    CreateNetworkPolicy,
    CreateAccessPolicy,
    CreateCollection,
    GetCollection,
    CreateIndex,
    DeleteAccessPolicy,
    DeleteEncryptionPolicy,
    DeleteNetworkPolicy,
    DeleteCollection,
}

#[derive(Debug)]
enum Activation {
    /// `ACTIVE` on the n-th status read
    After(u32),
    Never,
    Fails,
}

#[derive(Debug)]
struct FakeState {
    calls: Vec<SearchCall>,
    failures: BTreeMap<SearchOperation, ServiceError>,
    activation: Activation,
    empty_reads: u32,
    status_reads: u32,
}

/// Scriptable fake of the search platform.
///
/// Collections get deterministic identifiers derived from their name and,
/// by default, are `ACTIVE` on the first status read.
#[derive(Debug)]
pub struct FakeSearchApi {
    state: Mutex<FakeState>,
}

impl Default for FakeSearchApi {
    fn default() -> Self {
        Self {
            state: Mutex::new(FakeState {
                calls: Vec::new(),
                failures: BTreeMap::new(),
                activation: Activation::After(1),
                empty_reads: 0,
                status_reads: 0,
            }),
        }
    }
}

impl FakeSearchApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        // A poisoned fake means an earlier test assertion already panicked
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Collection becomes `ACTIVE` on the `n`-th status read
    #[must_use]
    pub fn activate_after(self, reads: u32) -> Self {
        self.lock().activation = Activation::After(reads.max(1));
        self
    }

    /// Collection stays `CREATING` forever
    #[must_use]
    pub fn never_activate(self) -> Self {
        self.lock().activation = Activation::Never;
        self
    }

    /// Collection reports `FAILED` on the first status read
    #[must_use]
    pub fn fail_activation(self) -> Self {
        self.lock().activation = Activation::Fails;
        self
    }

    /// The first `reads` status reads return no collection details
    #[must_use]
    pub fn empty_status_reads(self, reads: u32) -> Self {
        self.lock().empty_reads = reads;
        self
    }

    /// Make `operation` fail with `error`
    #[must_use]
    pub fn failing(self, operation: SearchOperation, error: ServiceError) -> Self {
        self.lock().failures.insert(operation, error);
        self
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<SearchCall> {
        self.lock().calls.clone()
    }

    pub fn operations(&self) -> Vec<SearchOperation> {
        self.lock().calls.iter().map(SearchCall::operation).collect()
    }

    pub fn count(&self, operation: SearchOperation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    pub fn mutation_count(&self) -> usize {
        self.lock().calls.iter().filter(|c| c.is_mutation()).count()
    }

    /// Deterministic record for a collection created under `name`
    #[must_use]
    pub fn collection_for(name: &str, status: CollectionStatus) -> CollectionRecord {
        CollectionRecord {
            id: format!("col-{name}"),
            arn: format!("arn:aws:aoss:us-east-1:123456789012:collection/col-{name}"),
            name: name.to_string(),
            endpoint: format!("https://col-{name}.us-east-1.aoss.amazonaws.com"),
            status,
        }
    }

    fn record(&self, call: SearchCall) -> Result<(), ServiceError> {
        let operation = call.operation();
        let mut state = self.lock();
        state.calls.push(call);
        match state.failures.get(&operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SearchPlatformApi for FakeSearchApi {
    async fn create_security_policy(
        &self,
        request: SecurityPolicyRequest,
    ) -> Result<(), ServiceError> {
        self.record(SearchCall::CreateSecurityPolicy {
            kind: request.kind,
            name: request.name,
            policy: request.policy,
            client_token: request.client_token,
        })
    }

    async fn create_access_policy(&self, request: AccessPolicyRequest) -> Result<(), ServiceError> {
        self.record(SearchCall::CreateAccessPolicy {
            name: request.name,
            policy: request.policy,
            client_token: request.client_token,
        })
    }

    async fn create_collection(
        &self,
        name: &str,
        client_token: &str,
    ) -> Result<String, ServiceError> {
        self.record(SearchCall::CreateCollection {
            name: name.to_string(),
            client_token: client_token.to_string(),
        })?;
        Ok(format!("col-{name}"))
    }

    async fn get_collection(&self, id: &str) -> Result<Option<CollectionRecord>, ServiceError> {
        self.record(SearchCall::GetCollection { id: id.to_string() })?;

        let mut state = self.lock();
        if state.empty_reads > 0 {
            state.empty_reads -= 1;
            return Ok(None);
        }
        state.status_reads += 1;
        let reads = state.status_reads;
        let status = match state.activation {
            Activation::After(n) if reads >= n => CollectionStatus::Active,
            Activation::Fails => CollectionStatus::Failed,
            _ => CollectionStatus::Creating,
        };
        let name = id.strip_prefix("col-").unwrap_or(id);
        Ok(Some(Self::collection_for(name, status)))
    }

    async fn create_index(
        &self,
        endpoint: &str,
        name: &str,
        body: &Value,
    ) -> Result<(), ServiceError> {
        self.record(SearchCall::CreateIndex {
            endpoint: endpoint.to_string(),
            name: name.to_string(),
            body: body.clone(),
        })
    }

    async fn delete_access_policy(
        &self,
        name: &str,
        _client_token: &str,
    ) -> Result<(), ServiceError> {
        self.record(SearchCall::DeleteAccessPolicy {
            name: name.to_string(),
        })
    }

    async fn delete_security_policy(
        &self,
        kind: SecurityPolicyKind,
        name: &str,
        _client_token: &str,
    ) -> Result<(), ServiceError> {
        self.record(SearchCall::DeleteSecurityPolicy {
            kind,
            name: name.to_string(),
        })
    }

    async fn delete_collection(&self, id: &str, _client_token: &str) -> Result<(), ServiceError> {
        self.record(SearchCall::DeleteCollection { id: id.to_string() })
    }
}
