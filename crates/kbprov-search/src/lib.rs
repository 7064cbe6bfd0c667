//! Search-platform client for kbprov
//!
//! Creates and removes everything the knowledge base needs on the
//! OpenSearch Serverless side, in dependency order:
//!
//! 1. encryption and network security policies, the data access policy
//! 2. the `VECTORSEARCH` collection, polled until `ACTIVE`
//! 3. the vector index inside the collection
//!
//! `SearchPlatformApi` is the seam to the service. `AossApi` implements it
//! over the AWS SDK plus a SigV4-signed HTTP call for the index; the
//! `test-utils` feature adds `FakeSearchApi`.
//!
//! `SearchPlatformClient` layers the provisioning semantics on top: client
//! tokens, conflict handling, polling, propagation waits and persistence of
//! the collection identifiers.

mod api;
mod aws;
mod client;
mod index;
mod model;
mod policy;
mod signing;

#[cfg(any(test, feature = "test-utils"))]
mod fake;

pub use api::{AccessPolicyRequest, SearchPlatformApi, SecurityPolicyRequest};
pub use aws::{AossApi, AossApiConfig};
pub use client::SearchPlatformClient;
pub use index::{IndexSpec, index_body};
pub use model::{CollectionRecord, CollectionStatus, SecurityPolicyKind};
pub use policy::{access_policy, access_principals, encryption_policy, network_policy};

#[cfg(any(test, feature = "test-utils"))]
pub use fake::{FakeSearchApi, SearchCall, SearchOperation};
