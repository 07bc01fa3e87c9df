//! Tracing setup.
//!
//! Logs go to `$PARLEY_HOME/logs/parley.log` so the full-screen UI is never
//! written over. The filter comes from `PARLEY_LOG`, falling back to the
//! configured `log_level`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, paths};

pub const LOG_ENV: &str = "PARLEY_LOG";
pub const LOG_FILE_NAME: &str = "parley.log";

/// Installs the global subscriber writing to the default logs directory.
///
/// Keep the returned guard alive until exit; dropping it flushes and stops
/// the background writer.
pub fn init(config: &Config) -> Result<WorkerGuard> {
    init_in(&paths::logs_dir(), config)
}

/// Installs the global subscriber writing to `dir`.
pub fn init_in(dir: &Path, config: &Config) -> Result<WorkerGuard> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(&config.log_level))
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(guard)
}

fn env_filter(configured: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
