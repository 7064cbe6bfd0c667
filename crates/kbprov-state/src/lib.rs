//! State store adapter for kbprov
//!
//! The orchestrator is stateless between invocations; the identifiers each
//! create step produces are persisted here under `/{prefix}/{field}` so that a
//! later `Update` or `Delete` invocation can recover them.
//!
//! - `StateStore`: the raw `put`/`get`/`delete` contract over full keys
//! - `PrefixStore`: field-level access scoped to one `LogicalPrefix`
//! - `PersistedState`: a snapshot of every field present for a prefix
//! - `InMemoryStateStore` and `SsmStateStore`: the two backends

mod keys;
mod memory;
mod prefixed;
mod ssm;

use async_trait::async_trait;

pub use kbprov_utils::error::StateError;
pub use keys::{StateField, state_key};
pub use memory::InMemoryStateStore;
pub use prefixed::{PersistedState, PrefixStore, PurgeReport};
pub use ssm::{SsmStateStore, SsmStoreConfig};

/// Durable, namespaced string key/value store.
///
/// No transactions span keys; callers tolerate partial writes.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Store `value` under `key`, overwriting any previous value
    async fn put(&self, key: &str, value: &str) -> Result<(), StateError>;

    /// Read the value under `key`
    ///
    /// Fails with `StateError::NotFound` when the key is absent.
    async fn get(&self, key: &str) -> Result<String, StateError>;

    /// Remove `key`; succeeds when the key is already absent
    async fn delete(&self, key: &str) -> Result<(), StateError>;
}
