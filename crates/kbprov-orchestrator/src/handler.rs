use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{Instrument, debug, info, warn};

use kbprov_config::Config;
use kbprov_knowledge::{
    DataSourceRecord, KnowledgeApi, KnowledgeBaseRecord, KnowledgeResourceClient,
};
use kbprov_search::{
    CollectionRecord, IndexSpec, SearchPlatformApi, SearchPlatformClient, SecurityPolicyKind,
    access_principals,
};
use kbprov_state::{PrefixStore, StateField, StateStore};
use kbprov_utils::logging::{StepTimer, lifecycle_span};
use kbprov_utils::{LogicalPrefix, ProvisionError, Sleeper, UserFriendlyError};

use crate::event::{
    ExecutionContext, LifecycleEvent, LifecycleResponse, ProvisioningRequest, RequestType,
    ResponseStatus,
};
use crate::teardown::{StepOutcome, TeardownReport, TeardownStep};

pub const CREATE_SUCCESS_REASON: &str = "CreateKnowledgeBase successful";
pub const UPDATE_SUCCESS_REASON: &str = "UpdateKnowledgeBase successful";
pub const DELETE_SUCCESS_REASON: &str = "DeleteKnowledgeBase successful";

/// Response `Data` for Create and Update
pub type ResponseData = BTreeMap<String, String>;

fn response_data(
    collection: &CollectionRecord,
    knowledge_base: &KnowledgeBaseRecord,
    data_source: &DataSourceRecord,
) -> ResponseData {
    [
        (StateField::CollectionArn, &collection.arn),
        (StateField::CollectionId, &collection.id),
        (StateField::CollectionName, &collection.name),
        (StateField::CollectionEndpoint, &collection.endpoint),
        (StateField::DataSourceId, &data_source.id),
        (StateField::KnowledgeBaseId, &knowledge_base.id),
        (StateField::KnowledgeBaseArn, &knowledge_base.arn),
    ]
    .into_iter()
    .map(|(field, value)| (field.as_str().to_string(), value.clone()))
    .collect()
}

async fn step<T, F>(name: &'static str, work: F) -> Result<T, ProvisionError>
where
    F: Future<Output = Result<T, ProvisionError>>,
{
    let timer = StepTimer::start(name);
    match work.await {
        Ok(value) => {
            timer.complete();
            Ok(value)
        }
        Err(err) => {
            timer.fail(&err);
            Err(err)
        }
    }
}

/// The lifecycle handler.
///
/// Holds no state between invocations: everything a later `Update` or
/// `Delete` needs is read back from the state store.
pub struct Orchestrator {
    search: SearchPlatformClient,
    knowledge: KnowledgeResourceClient,
    state: Arc<dyn StateStore>,
    context: ExecutionContext,
    default_role_arn: Option<String>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("search", &self.search)
            .field("knowledge", &self.knowledge)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        search: SearchPlatformClient,
        knowledge: KnowledgeResourceClient,
        state: Arc<dyn StateStore>,
        context: ExecutionContext,
    ) -> Self {
        Self {
            search,
            knowledge,
            state,
            context,
            default_role_arn: None,
        }
    }

    /// Wire both clients from configuration around the given service seams
    #[must_use]
    pub fn from_config(
        config: &Config,
        search_api: Arc<dyn SearchPlatformApi>,
        knowledge_api: Arc<dyn KnowledgeApi>,
        state: Arc<dyn StateStore>,
        sleeper: Arc<dyn Sleeper>,
        context: ExecutionContext,
    ) -> Self {
        let search = SearchPlatformClient::new(
            search_api,
            Arc::clone(&state),
            Arc::clone(&sleeper),
            config.timing.clone(),
            IndexSpec::from(&config.index),
        );
        let knowledge = KnowledgeResourceClient::new(
            knowledge_api,
            Arc::clone(&state),
            sleeper,
            config.timing.clone(),
            config.data_source.inclusion_prefix(),
        );
        let context = context.with_physical_resource_id(
            config.orchestrator.physical_resource_id.clone(),
        );
        Self::new(search, knowledge, state, context)
            .with_default_role_arn(config.orchestrator.execution_role_arn.clone())
    }

    /// Role granted collection access when the event does not name one
    #[must_use]
    pub fn with_default_role_arn(mut self, role_arn: Option<String>) -> Self {
        self.default_role_arn = role_arn;
        self
    }

    /// Process one lifecycle event start to finish.
    ///
    /// Never fails: every error becomes a `FAILED` response whose reason is
    /// the error's user message.
    pub async fn handle(&self, event: &LifecycleEvent) -> LifecycleResponse {
        let span = lifecycle_span(
            event.request_type.as_str(),
            event.prefix_hint(),
            &event.request_id,
        );
        async {
            debug!(event = ?event, "Lifecycle event received");
            let (status, reason, data) = self.dispatch(event).await;
            let response = LifecycleResponse {
                status,
                reason,
                physical_resource_id: self.context.physical_resource_id(),
                stack_id: event.stack_id.clone(),
                request_id: event.request_id.clone(),
                logical_resource_id: event.logical_resource_id.clone(),
                data,
            };
            info!(
                status = ?response.status,
                reason = %response.reason,
                physical_resource_id = %response.physical_resource_id,
                "Lifecycle response"
            );
            response
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, event: &LifecycleEvent) -> (ResponseStatus, String, ResponseData) {
        let request = match event.to_request(self.default_role_arn.as_deref()) {
            Ok(request) => request,
            // A Create rejected for its prefix left nothing behind under it
            Err(err) if event.request_type == RequestType::Delete => {
                warn!(
                    prefix = event.prefix_hint(),
                    error = %err,
                    "Delete request not valid; nothing to delete"
                );
                return (
                    ResponseStatus::Success,
                    DELETE_SUCCESS_REASON.to_string(),
                    ResponseData::new(),
                );
            }
            Err(err) => return (ResponseStatus::Failed, err.user_message(), ResponseData::new()),
        };

        let result = match request.request_type {
            RequestType::Create => self
                .create(&request)
                .await
                .map(|data| (CREATE_SUCCESS_REASON.to_string(), data)),
            RequestType::Update => self
                .update(&request.prefix)
                .await
                .map(|data| (UPDATE_SUCCESS_REASON.to_string(), data)),
            RequestType::Delete => {
                let report = self.delete(&request.prefix).await;
                if report.is_success() {
                    Ok((DELETE_SUCCESS_REASON.to_string(), ResponseData::new()))
                } else {
                    return (
                        ResponseStatus::Failed,
                        report.failure_reason(),
                        ResponseData::new(),
                    );
                }
            }
        };

        match result {
            Ok((reason, data)) => (ResponseStatus::Success, reason, data),
            Err(err) => (ResponseStatus::Failed, err.user_message(), ResponseData::new()),
        }
    }

    /// Build the full chain, persisting each identifier as it appears.
    ///
    /// # Errors
    ///
    /// The first fatal step error; earlier resources are left in place.
    pub async fn create(
        &self,
        request: &ProvisioningRequest,
    ) -> Result<ResponseData, ProvisionError> {
        let prefix = &request.prefix;
        let principals = access_principals(
            &request.access_policy_principal_arns,
            &request.role_arn,
            &request.orchestrator_role_arn,
        );

        step(
            "create_access_policy",
            self.search.create_access_policy(prefix, &principals),
        )
        .await?;
        step("create_network_policy", self.search.create_network_policy(prefix)).await?;
        step(
            "create_encryption_policy",
            self.search.create_encryption_policy(prefix),
        )
        .await?;

        let collection = step("create_collection", self.search.create_collection(prefix)).await?;

        let timer = StepTimer::start("create_index");
        if self.search.create_index(&collection.endpoint, prefix).await {
            timer.complete();
        } else {
            timer.swallow(&"index not created");
        }

        let knowledge_base = step(
            "create_knowledge_base",
            self.knowledge.create_knowledge_base(
                &request.role_arn,
                prefix,
                &request.embedding_model_arn,
                &collection.arn,
            ),
        )
        .await?;

        let data_source = step(
            "create_data_source",
            self.knowledge
                .create_data_source(&request.bucket_arn, &knowledge_base.id, prefix),
        )
        .await?;

        Ok(response_data(&collection, &knowledge_base, &data_source))
    }

    /// Project the persisted identifiers; no remote resource is touched
    ///
    /// # Errors
    ///
    /// `NotFound` naming every missing key.
    pub async fn update(&self, prefix: &LogicalPrefix) -> Result<ResponseData, ProvisionError> {
        let scoped = PrefixStore::new(Arc::clone(&self.state), prefix.clone());
        let persisted = scoped.snapshot().await?;
        if !persisted.is_complete() {
            let missing: Vec<String> = persisted
                .missing()
                .into_iter()
                .map(|field| scoped.key(field))
                .collect();
            return Err(ProvisionError::NotFound(missing.join(", ")));
        }

        let collection = step("update_collection", self.search.update_collection(prefix)).await?;
        let snapshot = step(
            "update_knowledge_base",
            self.knowledge.update_knowledge_base(prefix),
        )
        .await?;
        Ok(response_data(
            &collection,
            &snapshot.knowledge_base,
            &snapshot.data_source,
        ))
    }

    /// Run every teardown step, then purge every persisted key
    pub async fn delete(&self, prefix: &LogicalPrefix) -> TeardownReport {
        let mut report = TeardownReport::default();

        for teardown in TeardownStep::ORDER {
            let timer = StepTimer::start(teardown.name());
            let result = match teardown {
                TeardownStep::AccessPolicy => self.search.delete_access_policy(prefix).await,
                TeardownStep::NetworkPolicy => {
                    self.search
                        .delete_security_policy(prefix, SecurityPolicyKind::Network)
                        .await
                }
                TeardownStep::EncryptionPolicy => {
                    self.search
                        .delete_security_policy(prefix, SecurityPolicyKind::Encryption)
                        .await
                }
                TeardownStep::Collection => self.search.delete_collection(prefix).await,
                TeardownStep::KnowledgeBase => self.knowledge.delete_knowledge_base(prefix).await,
            };

            let outcome = StepOutcome::classify(teardown, result);
            match &outcome {
                StepOutcome::Completed => timer.complete(),
                StepOutcome::Absent(what) => {
                    info!(step = teardown.name(), detail = %what, "Nothing to delete");
                    timer.complete();
                }
                StepOutcome::Swallowed(err) => timer.swallow(err),
                StepOutcome::Fatal(err) => timer.fail(err),
            }
            report.record(teardown, outcome);
        }

        let timer = StepTimer::start("purge_state");
        report.purge = PrefixStore::new(Arc::clone(&self.state), prefix.clone())
            .purge()
            .await;
        if report.purge.is_clean() {
            timer.complete();
        } else {
            timer.fail(&format!("{} keys not purged", report.purge.failed.len()));
        }

        report
    }
}
