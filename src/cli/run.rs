//! CLI entry point and dispatch logic
//!
//! `run()` parses arguments, discovers configuration, installs logging,
//! creates the tokio runtime and dispatches to the command handlers. It
//! owns all error output.

use clap::Parser;

use kbprov_utils::UserFriendlyError;
use kbprov_utils::logging::init_tracing;

use super::args::{Cli, Commands};
use super::commands;
use crate::{Config, ConfigOverrides, ExitCode, LogFormat};

/// Main CLI execution function.
///
/// Returns `Err(ExitCode)` after printing the error; main.rs only maps the
/// code to the process exit status.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        config_path: cli.config.clone(),
        region: cli.region.clone(),
        state_backend: cli.state_backend.clone(),
    };

    let config = match Config::discover(&overrides) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("✗ {}", err.user_message());
            if let Some(context) = err.context() {
                eprintln!("  {context}");
            }
            return Err(ExitCode::CLI_ARGS);
        }
    };

    // CloudWatch ingests single-line JSON
    let format = match cli.command {
        Commands::Lambda => LogFormat::Json,
        _ => LogFormat::Compact,
    };
    if let Err(e) = init_tracing(cli.verbose, format) {
        eprintln!("✗ Failed to initialize logging: {e}");
        return Err(ExitCode::INTERNAL);
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let result = match cli.command {
        Commands::Handle { event, pretty } => {
            let event = match commands::read_event(&event) {
                Ok(event) => event,
                Err(err) => {
                    eprintln!("✗ {err:#}");
                    return Err(ExitCode::CLI_ARGS);
                }
            };
            rt.block_on(commands::execute_handle_command(&event, pretty, &config))
        }
        Commands::Lambda => rt
            .block_on(commands::execute_lambda_command(&config))
            .map(|()| ExitCode::SUCCESS),
        Commands::Config { json } => {
            commands::execute_config_command(json, &config).map(|()| ExitCode::SUCCESS)
        }
    };

    match result {
        Ok(ExitCode::SUCCESS) => Ok(()),
        Ok(code) => Err(code),
        Err(err) => {
            eprintln!("✗ {err:#}");
            Err(ExitCode::INTERNAL)
        }
    }
}
