//! CLI argument definitions and parsing structures

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// kbprov - lifecycle handler for a vector collection and knowledge base
#[derive(Parser, Debug)]
#[command(name = "kbprov")]
#[command(about = "Provision, read back and tear down an OpenSearch Serverless collection and Bedrock knowledge base")]
#[command(long_about = r#"
kbprov handles CloudFormation custom-resource lifecycle events. Create builds
the security and access policies, the vector collection, its index, the
knowledge base and its S3 data source. Update reads the persisted identifiers
back. Delete tears everything down and purges the persisted state.

EXAMPLES:
  # Handle one event from a file
  kbprov handle --event create.json

  # Handle one event from stdin against a local endpoint
  cat delete.json | kbprov --region us-east-1 handle --event -

  # Serve the Lambda runtime API (inside Lambda)
  kbprov lambda

  # Show the effective configuration and where each value came from
  kbprov config

CONFIGURATION:
  Precedence: CLI flags > KBPROV_* environment variables > config file > defaults
  The config file is --config, then $KBPROV_CONFIG, then ./kbprov.toml
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// AWS region for every service client
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// State backend: ssm or memory
    #[arg(long, global = true)]
    pub state_backend: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Handle one lifecycle event and print the response
    Handle {
        /// Event document path, or `-` for stdin
        #[arg(long)]
        event: String,

        /// Pretty-print the response JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Serve the AWS Lambda Runtime API loop
    Lambda,

    /// Print the effective configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[must_use]
pub fn build_cli() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}
