//! Log setup for the command-line binary.
//!
//! Stdout carries the actual output, so logs go to a daily-rotated file in
//! the data directory. `COINWATCH_LOG` takes an `EnvFilter` directive.

use std::path::{Path, PathBuf};

use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "COINWATCH_LOG";

/// Default directory for log files.
pub fn default_log_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("coinwatch").join("logs"))
}

fn env_filter() -> EnvFilter {
  EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber writing to `dir`.
///
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init(dir: &Path) -> Result<WorkerGuard> {
  std::fs::create_dir_all(dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(dir, "coinwatch.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::fmt()
    .with_env_filter(env_filter())
    .with_writer(writer)
    .with_ansi(false)
    .try_init()
    .map_err(|e| eyre!("Failed to install log subscriber: {}", e))?;

  Ok(guard)
}

/// Install the global subscriber writing to stderr.
pub fn init_stderr() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(env_filter())
    .with_writer(std::io::stderr)
    .try_init()
    .map_err(|e| eyre!("Failed to install log subscriber: {}", e))
}
