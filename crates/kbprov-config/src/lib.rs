//! Configuration management for kbprov
//!
//! Hierarchical configuration with precedence: CLI > environment > file >
//! defaults. The TOML file supports `[aws]`, `[timing]`, `[index]`,
//! `[data_source]`, `[state]` and `[orchestrator]` sections; every key is
//! optional and falls back to a documented default.

mod builder;
mod discovery;
mod model;
mod validation;

pub use builder::ConfigBuilder;
pub use discovery::{CONFIG_ENV_VAR, ConfigOverrides, DEFAULT_CONFIG_FILE};
pub use kbprov_utils::error::ConfigError;
pub use model::*;
