//! Provisioning orchestrator for kbprov
//!
//! Turns one lifecycle event into a response:
//!
//! - `Create`: access, network and encryption policies, then the collection
//!   (polled to active), the index, the knowledge base and the data source.
//!   The first fatal error stops the chain; nothing is rolled back.
//! - `Update`: a read-through of the persisted identifiers.
//! - `Delete`: every teardown step under its `ErrorPolicy`, then a purge of
//!   every persisted key for the prefix.

mod event;
mod handler;
pub mod teardown;

pub use event::{
    DEFAULT_PHYSICAL_RESOURCE_ID, ExecutionContext, LifecycleEvent, LifecycleResponse,
    ProvisioningRequest, RequestType, ResourceProperties, ResponseStatus, parse_principal_arns,
};
pub use handler::{
    CREATE_SUCCESS_REASON, DELETE_SUCCESS_REASON, Orchestrator, ResponseData,
    UPDATE_SUCCESS_REASON,
};
pub use teardown::{ErrorPolicy, StepOutcome, TeardownReport, TeardownStep};
