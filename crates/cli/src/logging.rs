//! Tracing setup
//!
//! stdout and stderr carry console notation, so by default logs go to
//! `.bz/logs/bz.log`. `RUST_LOG` overrides the configured level.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Log file name under the logs directory
pub const LOG_FILE: &str = "bz.log";

/// Install the global subscriber
///
/// The returned guard flushes the file writer on drop; keep it alive for
/// the life of the process.
pub fn init(logs_dir: &Path, level: &str, to_stderr: bool) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level '{}'", level))?;

    if to_stderr {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;
        return Ok(None);
    }

    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("Failed to create {}", logs_dir.display()))?;
    let appender = tracing_appender::rolling::never(logs_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(true)
        .with_writer(writer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    Ok(Some(guard))
}
