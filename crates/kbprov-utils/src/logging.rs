//! Logging and observability infrastructure for kbprov
//!
//! Structured logging via `tracing`. Each lifecycle invocation runs inside a
//! `lifecycle` span, and each chain step reports start, completion and failure
//! with `step` and `duration_ms` fields.

use std::time::Instant;
use tracing::{Level, error, info, span, warn};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Output format for the subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact human-readable lines
    Compact,
    /// Single-line JSON records, for CloudWatch ingestion
    Json,
}

/// Initialize the tracing subscriber
///
/// `RUST_LOG` overrides the default filter (`kbprov=info`, or `kbprov=debug`
/// when `verbose`).
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(verbose: bool, format: LogFormat) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("kbprov=debug,info")
            } else {
                EnvFilter::try_new("kbprov=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_span_list(false)
                        .with_target(true),
                )
                .try_init()?;
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(verbose)
                        .with_thread_ids(false)
                        .with_thread_names(false)
                        .with_line_number(false)
                        .with_file(false)
                        .with_span_events(if verbose {
                            FmtSpan::CLOSE
                        } else {
                            FmtSpan::NONE
                        })
                        .compact(),
                )
                .try_init()?;
        }
    }

    Ok(())
}

/// Span covering one lifecycle invocation
pub fn lifecycle_span(request_type: &str, prefix: &str, request_id: &str) -> tracing::Span {
    span!(
        Level::INFO,
        "lifecycle",
        request_type = %request_type,
        prefix = %prefix,
        request_id = %request_id,
    )
}

/// Timer for one chain step; logs on start and on each terminal outcome
#[derive(Debug)]
pub struct StepTimer {
    step: &'static str,
    started: Instant,
}

impl StepTimer {
    /// Log the step start and begin timing
    pub fn start(step: &'static str) -> Self {
        info!(step, "Starting step");
        Self {
            step,
            started: Instant::now(),
        }
    }

    fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }

    pub fn complete(self) {
        info!(step = self.step, duration_ms = %self.elapsed_ms(), "Step completed");
    }

    /// The step failed and the chain stops
    pub fn fail(self, error: &dyn std::fmt::Display) {
        error!(
            step = self.step,
            duration_ms = %self.elapsed_ms(),
            error = %error,
            "Step failed"
        );
    }

    /// The step failed but the chain keeps going
    pub fn swallow(self, error: &dyn std::fmt::Display) {
        warn!(
            step = self.step,
            duration_ms = %self.elapsed_ms(),
            error = %error,
            "Step failed; continuing"
        );
    }
}
