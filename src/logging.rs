//! Structured logging setup using `tracing-subscriber` and `tracing-appender`.
//!
//! Two modes:
//! - **Production** ([`init_production`]): daily-rotated JSON file layer + stderr layer
//! - **CLI** ([`init_cli`]): stderr only
//!
//! In both modes `RUST_LOG` takes precedence over the configured level.

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Holds the non-blocking writer guard for file logging.
///
/// Dropping it flushes pending entries, so keep it alive for the whole process.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Log JSON to `{logs_dir}/injest.log.YYYY-MM-DD` plus human-readable stderr.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or a global
/// subscriber is already installed.
pub fn init_production(logs_dir: &Path, level: &str) -> anyhow::Result<LoggingGuard> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("failed to create logs directory {}", logs_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(logs_dir, "injest.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking);
    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(json_layer)
        .with(console_layer)
        .try_init()
        .context("global tracing subscriber already set")?;

    Ok(LoggingGuard { _guard: guard })
}

/// Log human-readable output to stderr only.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_cli(level: &str) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("global tracing subscriber already set: {e}"))
}
