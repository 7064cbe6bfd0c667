use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use kbprov_utils::LogicalPrefix;

use crate::keys::{StateField, state_key};
use crate::{StateError, StateStore};

/// Snapshot of the fields persisted for one prefix
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
    values: BTreeMap<StateField, String>,
}

impl PersistedState {
    #[must_use]
    pub fn get(&self, field: StateField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn insert(&mut self, field: StateField, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    /// True when every field is present and non-empty
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    /// Fields absent or stored as empty strings
    #[must_use]
    pub fn missing(&self) -> Vec<StateField> {
        StateField::ALL
            .into_iter()
            .filter(|field| self.get(*field).is_none_or(str::is_empty))
            .collect()
    }
}

/// Result of purging every key of a prefix
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// Fields deleted, with the value they held when one could be read
    pub removed: Vec<(StateField, Option<String>)>,
    /// Fields whose deletion failed
    pub failed: Vec<(StateField, StateError)>,
}

impl PurgeReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Field-level view of a state store scoped to one prefix
#[derive(Clone)]
pub struct PrefixStore {
    store: Arc<dyn StateStore>,
    prefix: LogicalPrefix,
}

impl std::fmt::Debug for PrefixStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefixStore")
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl PrefixStore {
    #[must_use]
    pub fn new(store: Arc<dyn StateStore>, prefix: LogicalPrefix) -> Self {
        Self { store, prefix }
    }

    #[must_use]
    pub fn prefix(&self) -> &LogicalPrefix {
        &self.prefix
    }

    #[must_use]
    pub fn key(&self, field: StateField) -> String {
        state_key(&self.prefix, field)
    }

    /// # Errors
    ///
    /// Propagates the backend error.
    pub async fn put(&self, field: StateField, value: &str) -> Result<(), StateError> {
        let key = self.key(field);
        debug!(key = %key, "Persisting identifier");
        self.store.put(&key, value).await
    }

    /// # Errors
    ///
    /// `StateError::NotFound` when the field was never persisted.
    pub async fn get(&self, field: StateField) -> Result<String, StateError> {
        self.store.get(&self.key(field)).await
    }

    /// Like `get`, but an absent field is `Ok(None)`
    ///
    /// # Errors
    ///
    /// Propagates backend errors other than `NotFound`.
    pub async fn get_optional(&self, field: StateField) -> Result<Option<String>, StateError> {
        match self.get(field).await {
            Ok(value) => Ok(Some(value)),
            Err(StateError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Read every field present for this prefix
    ///
    /// # Errors
    ///
    /// Propagates the first backend error other than `NotFound`.
    pub async fn snapshot(&self) -> Result<PersistedState, StateError> {
        let mut state = PersistedState::default();
        for field in StateField::ALL {
            if let Some(value) = self.get_optional(field).await? {
                state.insert(field, value);
            }
        }
        Ok(state)
    }

    /// Delete every field of this prefix, continuing past failures.
    ///
    /// The value of each field is read first so the report keeps a record of
    /// identifiers that no longer have a persisted reference.
    pub async fn purge(&self) -> PurgeReport {
        let mut report = PurgeReport::default();
        for field in StateField::ALL {
            let previous = self.get_optional(field).await.ok().flatten();
            match self.store.delete(&self.key(field)).await {
                Ok(()) => report.removed.push((field, previous)),
                Err(e) => {
                    warn!(key = %self.key(field), error = %e, "Failed to purge state key");
                    report.failed.push((field, e));
                }
            }
        }
        report
    }
}
