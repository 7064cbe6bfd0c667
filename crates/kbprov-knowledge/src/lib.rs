//! Knowledge-resource client for kbprov
//!
//! Creates the knowledge base bound to an active collection, binds the
//! object-storage data source to it, and removes the knowledge base on
//! teardown. The data source has no delete call of its own; it goes with
//! its parent.

mod api;
mod aws;
mod client;
mod model;

#[cfg(any(test, feature = "test-utils"))]
mod fake;

pub use api::KnowledgeApi;
pub use aws::{BedrockAgentApi, BedrockAgentConfig};
pub use client::KnowledgeResourceClient;
pub use model::{
    CreatedKnowledgeBase, DataSourceRecord, DataSourceRequest, FieldMapping, KnowledgeBaseRecord,
    KnowledgeBaseRequest, KnowledgeSnapshot,
};

#[cfg(any(test, feature = "test-utils"))]
pub use fake::{FakeKnowledgeApi, KnowledgeCall, KnowledgeOperation};
