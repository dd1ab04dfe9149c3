//! Logging setup
//!
//! Installs a `tracing` subscriber for binaries and demos. Library code only
//! emits events; nothing here runs unless a caller opts in.

use anyhow::Result;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "chat_session_sdk=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Log to stderr, filtered by `RUST_LOG`
pub fn init_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

/// Log as JSON lines to a daily-rolling file in `dir`.
///
/// Keep the returned guard alive for as long as logs should be flushed.
pub fn init_file_logging(dir: impl AsRef<Path>, file_prefix: &str) -> Result<WorkerGuard> {
    let appender = tracing_appender::rolling::daily(dir.as_ref(), file_prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize file logging: {}", e))?;

    Ok(guard)
}
