//! CLI command implementations
//!
//! Each `execute_*` function handles one subcommand.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::io::Read;
use tracing::error;

use crate::lambda::{RuntimeClient, serve};
use crate::wiring::build_orchestrator;
use crate::{Config, ExitCode, LifecycleEvent, LifecycleResponse};

// ============================================================================
// Handle Command
// ============================================================================

/// Read a lifecycle event from a path, or from stdin when `source` is `-`
///
/// # Errors
///
/// Fails when the document cannot be read or is not a lifecycle event.
pub fn read_event(source: &str) -> Result<LifecycleEvent> {
    let text = if source == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read the event from stdin")?;
        text
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read event file {source}"))?
    };
    parse_event(&text).with_context(|| format!("Invalid lifecycle event in {source}"))
}

/// # Errors
///
/// Fails on malformed JSON or an unknown `RequestType`.
pub fn parse_event(text: &str) -> Result<LifecycleEvent> {
    Ok(serde_json::from_str(text)?)
}

/// Exit code reflecting the response status
#[must_use]
pub fn response_exit_code(response: &LifecycleResponse) -> ExitCode {
    if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::PROVISIONING_FAILED
    }
}

/// Handle one event and print the response JSON to stdout
///
/// # Errors
///
/// Fails when the AWS clients cannot be built or the response cannot be
/// serialized. Provisioning failures are not errors: they come back as a
/// `FAILED` response and exit code 3.
pub async fn execute_handle_command(
    event: &LifecycleEvent,
    pretty: bool,
    config: &Config,
) -> Result<ExitCode> {
    let orchestrator = build_orchestrator(config).await?;
    let response = orchestrator.handle(event).await;

    let rendered = if pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{rendered}");

    Ok(response_exit_code(&response))
}

// ============================================================================
// Lambda Command
// ============================================================================

/// Serve the Lambda runtime API until it becomes unreachable
///
/// # Errors
///
/// Fails outside Lambda, when the AWS clients cannot be built (reported to
/// `init/error` first), or when a result cannot be delivered.
pub async fn execute_lambda_command(config: &Config) -> Result<()> {
    let runtime = RuntimeClient::from_env()?;

    let orchestrator = match build_orchestrator(config).await {
        Ok(orchestrator) => orchestrator,
        Err(err) => {
            error!(error = %err, "Handler initialization failed");
            runtime
                .report_init_error("InitializationFailed", &format!("{err:#}"))
                .await?;
            return Err(err);
        }
    };

    serve(&orchestrator, &runtime).await
}

// ============================================================================
// Config Command
// ============================================================================

/// One `key = value (from source)` line per effective key
#[must_use]
pub fn render_effective_config(config: &Config) -> Vec<String> {
    config
        .effective_config()
        .into_iter()
        .map(|(key, (value, source))| format!("{key} = {value} (from {source})"))
        .collect()
}

/// # Errors
///
/// Fails only when JSON serialization fails.
pub fn execute_config_command(json: bool, config: &Config) -> Result<()> {
    if json {
        let entries: BTreeMap<String, BTreeMap<&str, String>> = config
            .effective_config()
            .into_iter()
            .map(|(key, (value, source))| {
                (key, BTreeMap::from([("value", value), ("source", source)]))
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("Effective configuration:");
        for line in render_effective_config(config) {
            println!("  {line}");
        }
    }
    Ok(())
}
