//! kbprov: lifecycle handler for an OpenSearch Serverless collection, a
//! Bedrock knowledge base over it, and the S3 data source feeding it.
//!
//! The member crates do the work; this crate wires them to the real AWS
//! services and exposes two entry points:
//!
//! - `cli`: the `kbprov` command line (`handle`, `lambda`, `config`)
//! - `lambda`: the Lambda Runtime API loop
//!
//! ## Stable API
//!
//! - [`Orchestrator`] and its event types
//! - [`Config`] and [`ConfigOverrides`]
//! - [`build_orchestrator`] for embedding the handler elsewhere
//! - [`ExitCode`]

pub mod cli;
pub mod lambda;
mod wiring;

pub use kbprov_config::{Config, ConfigOverrides};
pub use kbprov_orchestrator::{
    ExecutionContext, LifecycleEvent, LifecycleResponse, Orchestrator, RequestType,
    ResponseStatus, TeardownReport,
};
pub use kbprov_utils::exit_codes::ExitCode;
pub use kbprov_utils::logging::LogFormat;
pub use wiring::{build_orchestrator, load_sdk_config, state_store};
