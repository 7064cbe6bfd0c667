//! In-memory `KnowledgeApi` for tests

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use kbprov_utils::ServiceError;

use crate::api::KnowledgeApi;
use crate::model::{CreatedKnowledgeBase, DataSourceRequest, KnowledgeBaseRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnowledgeCall {
    CreateKnowledgeBase(KnowledgeBaseRequest),
    CreateDataSource(DataSourceRequest),
    DeleteKnowledgeBase { id: String },
}

impl KnowledgeCall {
    #[must_use]
    pub fn operation(&self) -> KnowledgeOperation {
        match self {
            Self::CreateKnowledgeBase(_) => KnowledgeOperation::CreateKnowledgeBase,
            Self::CreateDataSource(_) => KnowledgeOperation::CreateDataSource,
            Self::DeleteKnowledgeBase { .. } => KnowledgeOperation::DeleteKnowledgeBase,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KnowledgeOperation {
    CreateKnowledgeBase,
    CreateDataSource,
    DeleteKnowledgeBase,
}

#[derive(Debug, Default)]
struct FakeState {
    calls: Vec<KnowledgeCall>,
    failures: BTreeMap<KnowledgeOperation, ServiceError>,
    omit_arn: bool,
    omit_data_source_id: bool,
}

/// Scriptable fake of the knowledge-resource service.
///
/// Knowledge bases get id `kb-{name}`, data sources `ds-{name}`.
#[derive(Debug, Default)]
pub struct FakeKnowledgeApi {
    state: Mutex<FakeState>,
}

impl FakeKnowledgeApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[must_use]
    pub fn failing(self, operation: KnowledgeOperation, error: ServiceError) -> Self {
        self.lock().failures.insert(operation, error);
        self
    }

    /// `CreateKnowledgeBase` responses carry an id but no ARN
    #[must_use]
    pub fn without_knowledge_base_arn(self) -> Self {
        self.lock().omit_arn = true;
        self
    }

    /// `CreateDataSource` responses carry no id
    #[must_use]
    pub fn without_data_source_id(self) -> Self {
        self.lock().omit_data_source_id = true;
        self
    }

    pub fn calls(&self) -> Vec<KnowledgeCall> {
        self.lock().calls.clone()
    }

    pub fn operations(&self) -> Vec<KnowledgeOperation> {
        self.lock().calls.iter().map(KnowledgeCall::operation).collect()
    }

    fn record(&self, call: KnowledgeCall) -> Result<(), ServiceError> {
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
impl KnowledgeApi for FakeKnowledgeApi {
    async fn create_knowledge_base(
        &self,
        request: KnowledgeBaseRequest,
    ) -> Result<CreatedKnowledgeBase, ServiceError> {
        let name = request.name.clone();
        self.record(KnowledgeCall::CreateKnowledgeBase(request))?;
        let omit_arn = self.lock().omit_arn;
        Ok(CreatedKnowledgeBase {
            id: Some(format!("kb-{name}")),
            arn: (!omit_arn).then(|| {
                format!("arn:aws:bedrock:us-east-1:123456789012:knowledge-base/kb-{name}")
            }),
        })
    }

    async fn create_data_source(
        &self,
        request: DataSourceRequest,
    ) -> Result<Option<String>, ServiceError> {
        let name = request.name.clone();
        self.record(KnowledgeCall::CreateDataSource(request))?;
        let omit = self.lock().omit_data_source_id;
        Ok((!omit).then(|| format!("ds-{name}")))
    }

    async fn delete_knowledge_base(&self, knowledge_base_id: &str) -> Result<(), ServiceError> {
        self.record(KnowledgeCall::DeleteKnowledgeBase {
            id: knowledge_base_id.to_string(),
        })
    }
}
