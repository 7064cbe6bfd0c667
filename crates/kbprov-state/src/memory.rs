use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use crate::{StateError, StateStore};

/// Process-local state store.
///
/// State lives only as long as the process. It backs the `memory` state
/// backend used for local dry runs, and is the store every orchestrator test
/// runs against. Individual keys can be made to fail to exercise partial writes.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    entries: Mutex<BTreeMap<String, String>>,
    failing: Mutex<BTreeSet<String>>,
}

impl InMemoryStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `entries`
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        if let Ok(mut map) = store.entries.lock() {
            map.extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        }
        store
    }

    /// Make every operation on `key` fail with a backend error
    pub fn fail_key(&self, key: impl Into<String>) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(key.into());
        }
    }

    /// Copy of every stored entry
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.entries
            .lock()
            .map(|map| map.clone())
            .unwrap_or_default()
    }

    /// Stored keys starting with `prefix`
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries()
            .into_keys()
            .filter(|key| key.starts_with(prefix))
            .collect()
    }

    fn check(&self, key: &str) -> Result<(), StateError> {
        let failing = self
            .failing
            .lock()
            .map_err(|_| StateError::Backend("state lock poisoned".to_string()))?;
        if failing.contains(key) {
            return Err(StateError::Backend(format!("injected failure for {key}")));
        }
        Ok(())
    }

    fn map(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>, StateError> {
        self.entries
            .lock()
            .map_err(|_| StateError::Backend("state lock poisoned".to_string()))
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn put(&self, key: &str, value: &str) -> Result<(), StateError> {
        self.check(key)?;
        self.map()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<String, StateError> {
        self.check(key)?;
        self.map()?
            .get(key)
            .cloned()
            .ok_or_else(|| StateError::NotFound {
                key: key.to_string(),
            })
    }

    async fn delete(&self, key: &str) -> Result<(), StateError> {
        self.check(key)?;
        self.map()?.remove(key);
        Ok(())
    }
}
