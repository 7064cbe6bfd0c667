//! Foundation utilities shared by every kbprov crate
//!
//! - `error`: the provisioning error taxonomy and the user-facing message trait
//! - `types`: `LogicalPrefix`, the join key between clients and the state store
//! - `poll`: the `Sleeper` seam, `poll_until` and `await_propagation`
//! - `logging`: tracing subscriber setup and per-step log helpers
//! - `aws`: classification of AWS SDK errors into `ServiceError`
//! - `exit_codes`: process exit codes for the CLI

pub mod aws;
pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod poll;
pub mod types;

pub use error::{ProvisionError, ServiceError, StateError, UserFriendlyError};
pub use poll::{PollError, PollStatus, Sleeper, TokioSleeper, poll_until};
pub use types::LogicalPrefix;

#[cfg(any(test, feature = "test-utils"))]
pub use poll::RecordingSleeper;
