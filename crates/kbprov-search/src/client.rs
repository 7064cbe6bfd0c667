use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use kbprov_config::TimingConfig;
use kbprov_state::{PrefixStore, StateField, StateStore};
use kbprov_utils::poll::await_propagation;
use kbprov_utils::{
    LogicalPrefix, PollError, PollStatus, ProvisionError, ServiceError, Sleeper, poll_until,
};

use crate::api::{AccessPolicyRequest, SearchPlatformApi, SecurityPolicyRequest};
use crate::index::{IndexSpec, index_body};
use crate::model::{CollectionRecord, CollectionStatus, SecurityPolicyKind};
use crate::policy::{access_policy, encryption_policy, network_policy};

fn client_token() -> String {
    Uuid::new_v4().to_string()
}

/// Provisioning operations on the search platform.
///
/// Create calls treat a policy that already exists under the prefix as
/// created, so a retried `Create` converges past the policy stage.
pub struct SearchPlatformClient {
    api: Arc<dyn SearchPlatformApi>,
    state: Arc<dyn StateStore>,
    sleeper: Arc<dyn Sleeper>,
    timing: TimingConfig,
    index: IndexSpec,
}

impl std::fmt::Debug for SearchPlatformClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchPlatformClient")
            .field("timing", &self.timing)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

impl SearchPlatformClient {
    #[must_use]
    pub fn new(
        api: Arc<dyn SearchPlatformApi>,
        state: Arc<dyn StateStore>,
        sleeper: Arc<dyn Sleeper>,
        timing: TimingConfig,
        index: IndexSpec,
    ) -> Self {
        Self {
            api,
            state,
            sleeper,
            timing,
            index,
        }
    }

    fn scoped(&self, prefix: &LogicalPrefix) -> PrefixStore {
        PrefixStore::new(Arc::clone(&self.state), prefix.clone())
    }

    async fn create_security_policy(
        &self,
        prefix: &LogicalPrefix,
        kind: SecurityPolicyKind,
        policy: String,
    ) -> Result<(), ProvisionError> {
        let request = SecurityPolicyRequest {
            kind,
            name: prefix.to_string(),
            policy,
            client_token: client_token(),
        };
        match self.api.create_security_policy(request).await {
            Ok(()) => Ok(()),
            Err(ServiceError::Conflict(msg)) => {
                info!(policy = %kind, detail = %msg, "Security policy already exists");
                Ok(())
            }
            Err(e) => Err(ProvisionError::PolicyCreationFailed {
                policy: kind.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// # Errors
    ///
    /// `PolicyCreationFailed` on any service error other than a conflict.
    pub async fn create_encryption_policy(
        &self,
        prefix: &LogicalPrefix,
    ) -> Result<(), ProvisionError> {
        self.create_security_policy(
            prefix,
            SecurityPolicyKind::Encryption,
            encryption_policy(prefix),
        )
        .await
    }

    /// # Errors
    ///
    /// `PolicyCreationFailed` on any service error other than a conflict.
    pub async fn create_network_policy(
        &self,
        prefix: &LogicalPrefix,
    ) -> Result<(), ProvisionError> {
        self.create_security_policy(prefix, SecurityPolicyKind::Network, network_policy(prefix))
            .await
    }

    /// Grant the fixed permission set to `principals`
    ///
    /// # Errors
    ///
    /// `PolicyCreationFailed` when `principals` is empty or the service rejects
    /// the policy.
    pub async fn create_access_policy(
        &self,
        prefix: &LogicalPrefix,
        principals: &[String],
    ) -> Result<(), ProvisionError> {
        if principals.is_empty() {
            return Err(ProvisionError::PolicyCreationFailed {
                policy: "data".to_string(),
                reason: "no principals to grant".to_string(),
            });
        }
        debug!(principals = ?principals, "Access policy principals");

        let request = AccessPolicyRequest {
            name: prefix.to_string(),
            policy: access_policy(prefix, principals),
            client_token: client_token(),
        };
        match self.api.create_access_policy(request).await {
            Ok(()) => Ok(()),
            Err(ServiceError::Conflict(msg)) => {
                info!(detail = %msg, "Access policy already exists");
                Ok(())
            }
            Err(e) => Err(ProvisionError::PolicyCreationFailed {
                policy: "data".to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Create the collection, wait for `ACTIVE` and persist its identifiers
    ///
    /// # Errors
    ///
    /// - `CollectionCreationFailed` on a service error, a `FAILED` status, or
    ///   an active collection missing identifiers
    /// - `CollectionTimeout` once the attempt budget is spent
    /// - `State` when persisting fails
    pub async fn create_collection(
        &self,
        prefix: &LogicalPrefix,
    ) -> Result<CollectionRecord, ProvisionError> {
        let id = self
            .api
            .create_collection(prefix.as_str(), &client_token())
            .await
            .map_err(|e| ProvisionError::CollectionCreationFailed(e.to_string()))?;
        info!(collection_id = %id, "Collection requested");

        // Written before polling so a timed-out or failed collection is still
        // found by `Delete`
        let scoped = self.scoped(prefix);
        scoped.put(StateField::CollectionId, &id).await?;

        let interval = self.timing.poll_interval();
        let max_attempts = self.timing.max_poll_attempts();
        let api = Arc::clone(&self.api);

        let polled = poll_until(self.sleeper.as_ref(), interval, max_attempts, |attempt| {
            let api = Arc::clone(&api);
            let id = id.clone();
            async move {
                let record = api
                    .get_collection(&id)
                    .await
                    .map_err(|e| ProvisionError::CollectionCreationFailed(e.to_string()))?;
                match record {
                    Some(record) if record.status == CollectionStatus::Active => {
                        Ok(PollStatus::Ready(record))
                    }
                    Some(record) if record.status == CollectionStatus::Failed => {
                        Err(ProvisionError::CollectionCreationFailed(format!(
                            "collection {id} entered FAILED status"
                        )))
                    }
                    Some(record) => {
                        debug!(attempt, status = %record.status, "Collection not active yet");
                        Ok(PollStatus::Pending)
                    }
                    None => {
                        debug!(attempt, "Collection details not available yet");
                        Ok(PollStatus::Pending)
                    }
                }
            }
        })
        .await;

        let record = match polled {
            Ok(record) => record,
            Err(PollError::Timeout { attempts }) => {
                return Err(ProvisionError::CollectionTimeout { attempts, interval });
            }
            Err(PollError::Check(e)) => return Err(e),
        };

        for (label, value) in [
            ("arn", &record.arn),
            ("name", &record.name),
            ("endpoint", &record.endpoint),
        ] {
            if value.is_empty() {
                return Err(ProvisionError::CollectionCreationFailed(format!(
                    "active collection {} reported no {label}",
                    record.id
                )));
            }
        }

        scoped.put(StateField::CollectionArn, &record.arn).await?;
        scoped.put(StateField::CollectionName, &record.name).await?;
        scoped
            .put(StateField::CollectionEndpoint, &record.endpoint)
            .await?;

        info!(collection_id = %record.id, endpoint = %record.endpoint, "Collection active");
        Ok(record)
    }

    /// Create the vector index after the access-policy propagation wait.
    ///
    /// Returns whether the index exists afterwards. Failures are logged and
    /// do not abort the chain.
    pub async fn create_index(&self, endpoint: &str, prefix: &LogicalPrefix) -> bool {
        await_propagation(
            self.sleeper.as_ref(),
            self.timing.propagation_delay(),
            "access policy before index creation",
        )
        .await;

        let body = index_body(prefix, &self.index);
        match self.api.create_index(endpoint, prefix.as_str(), &body).await {
            Ok(()) => true,
            Err(ServiceError::Conflict(msg)) => {
                info!(detail = %msg, "Index already exists");
                true
            }
            Err(e) => {
                let err = ProvisionError::IndexCreationFailed(e.to_string());
                warn!(error = %err, index_created = false, "Continuing without index");
                false
            }
        }
    }

    /// # Errors
    ///
    /// `PolicyDeletionFailed` on any service error; `NotFound` when nothing
    /// exists under the prefix.
    pub async fn delete_access_policy(&self, prefix: &LogicalPrefix) -> Result<(), ProvisionError> {
        self.api
            .delete_access_policy(prefix.as_str(), &client_token())
            .await
            .map_err(|e| match e {
                ServiceError::NotFound(msg) => ProvisionError::NotFound(msg),
                other => ProvisionError::PolicyDeletionFailed {
                    policy: "data".to_string(),
                    reason: other.to_string(),
                },
            })
    }

    /// # Errors
    ///
    /// `PolicyDeletionFailed` on any service error; `NotFound` when nothing
    /// exists under the prefix.
    pub async fn delete_security_policy(
        &self,
        prefix: &LogicalPrefix,
        kind: SecurityPolicyKind,
    ) -> Result<(), ProvisionError> {
        self.api
            .delete_security_policy(kind, prefix.as_str(), &client_token())
            .await
            .map_err(|e| match e {
                ServiceError::NotFound(msg) => ProvisionError::NotFound(msg),
                other => ProvisionError::PolicyDeletionFailed {
                    policy: kind.to_string(),
                    reason: other.to_string(),
                },
            })
    }

    /// Delete the collection recorded under the prefix
    ///
    /// # Errors
    ///
    /// `NotFound` when no collection id is persisted or the service no longer
    /// knows it; `CollectionDeletionFailed` on any other service error.
    pub async fn delete_collection(&self, prefix: &LogicalPrefix) -> Result<(), ProvisionError> {
        let id = self.scoped(prefix).get(StateField::CollectionId).await?;
        self.api
            .delete_collection(&id, &client_token())
            .await
            .map_err(|e| match e {
                ServiceError::NotFound(msg) => ProvisionError::NotFound(msg),
                other => ProvisionError::CollectionDeletionFailed(other.to_string()),
            })?;
        info!(collection_id = %id, "Collection deletion requested");
        Ok(())
    }

    /// Persisted collection identifiers; no remote call is made
    ///
    /// # Errors
    ///
    /// `NotFound` naming the first missing key.
    pub async fn update_collection(
        &self,
        prefix: &LogicalPrefix,
    ) -> Result<CollectionRecord, ProvisionError> {
        let scoped = self.scoped(prefix);
        Ok(CollectionRecord {
            id: scoped.get(StateField::CollectionId).await?,
            arn: scoped.get(StateField::CollectionArn).await?,
            name: scoped.get(StateField::CollectionName).await?,
            endpoint: scoped.get(StateField::CollectionEndpoint).await?,
            status: CollectionStatus::Active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeSearchApi, SearchCall, SearchOperation};
    use kbprov_state::InMemoryStateStore;
    use kbprov_utils::RecordingSleeper;
    use std::time::Duration;

    struct Harness {
        api: Arc<FakeSearchApi>,
        state: Arc<InMemoryStateStore>,
        sleeper: Arc<RecordingSleeper>,
        client: SearchPlatformClient,
    }

    fn harness(api: FakeSearchApi) -> Harness {
        let api = Arc::new(api);
        let state = Arc::new(InMemoryStateStore::new());
        let sleeper = Arc::new(RecordingSleeper::new());
        let client = SearchPlatformClient::new(
            api.clone(),
            state.clone(),
            sleeper.clone(),
            TimingConfig::default(),
            IndexSpec::default(),
        );
        Harness {
            api,
            state,
            sleeper,
            client,
        }
    }

    fn acme() -> LogicalPrefix {
        LogicalPrefix::new("acme").unwrap()
    }

    #[tokio::test]
    async fn collection_persists_four_fields_once_active() {
        let h = harness(FakeSearchApi::new().activate_after(3));
        let record = h.client.create_collection(&acme()).await.unwrap();

        assert_eq!(record.name, "acme");
        assert_eq!(record.status, CollectionStatus::Active);
        assert_eq!(h.api.count(SearchOperation::GetCollection), 3);
        assert_eq!(h.sleeper.recorded(), vec![Duration::from_secs(30); 2]);

        let entries = h.state.entries();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries["/acme/collectionId"], "col-acme");
        assert_eq!(entries["/acme/collectionName"], "acme");
        assert!(entries["/acme/collectionEndpoint"].starts_with("https://"));
    }

    #[tokio::test]
    async fn collection_times_out_after_thirty_checks() {
        let h = harness(FakeSearchApi::new().never_activate());
        let err = h.client.create_collection(&acme()).await.unwrap_err();

        assert_eq!(
            err,
            ProvisionError::CollectionTimeout {
                attempts: 30,
                interval: Duration::from_secs(30)
            }
        );
        assert_eq!(h.api.count(SearchOperation::GetCollection), 30);
        let waits = h.sleeper.recorded();
        assert_eq!(waits.len(), 29);
        assert!(waits.iter().all(|d| *d == Duration::from_secs(30)));
        assert_eq!(h.state.keys_with_prefix("/acme/"), vec!["/acme/collectionId"]);
    }

    #[tokio::test]
    async fn empty_details_count_as_pending() {
        let h = harness(FakeSearchApi::new().empty_status_reads(2));
        h.client.create_collection(&acme()).await.unwrap();
        assert_eq!(h.api.count(SearchOperation::GetCollection), 3);
    }

    #[tokio::test]
    async fn failed_status_stops_polling() {
        let h = harness(FakeSearchApi::new().fail_activation());
        let err = h.client.create_collection(&acme()).await.unwrap_err();
        assert!(matches!(err, ProvisionError::CollectionCreationFailed(_)));
        assert_eq!(h.api.count(SearchOperation::GetCollection), 1);
        assert!(h.sleeper.recorded().is_empty());
        assert_eq!(h.state.entries()["/acme/collectionId"], "col-acme");
    }

    #[tokio::test]
    async fn collection_conflict_is_fatal() {
        let h = harness(FakeSearchApi::new().failing(
            SearchOperation::CreateCollection,
            ServiceError::Conflict("exists".into()),
        ));
        let err = h.client.create_collection(&acme()).await.unwrap_err();
        assert!(matches!(err, ProvisionError::CollectionCreationFailed(_)));
        assert_eq!(h.api.count(SearchOperation::GetCollection), 0);
    }

    #[tokio::test]
    async fn policy_conflict_counts_as_created() {
        let h = harness(FakeSearchApi::new().failing(
            SearchOperation::CreateNetworkPolicy,
            ServiceError::Conflict("exists".into()),
        ));
        h.client.create_network_policy(&acme()).await.unwrap();
    }

    #[tokio::test]
    async fn policy_failure_names_policy() {
        let h = harness(FakeSearchApi::new().failing(
            SearchOperation::CreateEncryptionPolicy,
            ServiceError::AccessDenied("nope".into()),
        ));
        let err = h.client.create_encryption_policy(&acme()).await.unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::PolicyCreationFailed { ref policy, .. } if policy == "encryption"
        ));
    }

    #[tokio::test]
    async fn create_calls_carry_distinct_client_tokens() {
        let h = harness(FakeSearchApi::new());
        h.client.create_encryption_policy(&acme()).await.unwrap();
        h.client.create_network_policy(&acme()).await.unwrap();

        let tokens: Vec<String> = h
            .api
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                SearchCall::CreateSecurityPolicy { client_token, .. } => Some(client_token),
                _ => None,
            })
            .collect();
        assert_eq!(tokens.len(), 2);
        assert_ne!(tokens[0], tokens[1]);
        assert!(tokens.iter().all(|t| Uuid::parse_str(t).is_ok()));
    }

    #[tokio::test]
    async fn access_policy_requires_principals() {
        let h = harness(FakeSearchApi::new());
        assert!(h.client.create_access_policy(&acme(), &[]).await.is_err());
        assert!(h.api.calls().is_empty());
    }

    #[tokio::test]
    async fn index_waits_for_propagation_and_swallows_errors() {
        let h = harness(FakeSearchApi::new().failing(
            SearchOperation::CreateIndex,
            ServiceError::Validation("mapper_parsing_exception".into()),
        ));
        let created = h.client.create_index("https://col-acme", &acme()).await;

        assert!(!created);
        assert_eq!(h.sleeper.recorded(), vec![Duration::from_secs(60)]);
        assert!(matches!(
            h.api.calls().as_slice(),
            [SearchCall::CreateIndex { name, .. }] if name == "acme"
        ));
    }

    #[tokio::test]
    async fn existing_index_counts_as_created() {
        let h = harness(FakeSearchApi::new().failing(
            SearchOperation::CreateIndex,
            ServiceError::Conflict("resource_already_exists_exception".into()),
        ));
        assert!(h.client.create_index("https://col-acme", &acme()).await);
    }

    #[tokio::test]
    async fn delete_collection_without_state_is_not_found() {
        let h = harness(FakeSearchApi::new());
        let err = h.client.delete_collection(&acme()).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(h.api.calls().is_empty());
    }

    #[tokio::test]
    async fn delete_collection_maps_service_errors() {
        let h = harness(FakeSearchApi::new().failing(
            SearchOperation::DeleteCollection,
            ServiceError::Throttled("slow down".into()),
        ));
        h.state.put("/acme/collectionId", "col-acme").await.unwrap();
        let err = h.client.delete_collection(&acme()).await.unwrap_err();
        assert!(matches!(err, ProvisionError::CollectionDeletionFailed(_)));
    }

    #[tokio::test]
    async fn update_collection_is_read_through() {
        let h = harness(FakeSearchApi::new());
        h.client.create_collection(&acme()).await.unwrap();
        let before = h.api.calls().len();

        let first = h.client.update_collection(&acme()).await.unwrap();
        let second = h.client.update_collection(&acme()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.id, "col-acme");
        assert_eq!(h.api.calls().len(), before);
    }

    #[tokio::test]
    async fn update_collection_reports_missing_key() {
        let h = harness(FakeSearchApi::new());
        h.state.put("/acme/collectionId", "col-acme").await.unwrap();
        let err = h.client.update_collection(&acme()).await.unwrap_err();
        assert_eq!(err, ProvisionError::NotFound("/acme/collectionArn".to_string()));
    }
}
