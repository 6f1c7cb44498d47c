//! Tracing setup.
//!
//! The TUI owns the terminal, so events go to a daily rolling file in the
//! data directory. Command-line runs additionally print warnings and errors
//! to stderr.

use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_ENV: &str = "QUICKMART_LOG";
const DEFAULT_FILTER: &str = "info";

/// Build the filter: QUICKMART_LOG, then the configured directive, then `info`.
fn build_filter(configured: Option<&str>) -> EnvFilter {
  EnvFilter::try_from_env(LOG_ENV)
    .or_else(|_| EnvFilter::try_new(configured.unwrap_or(DEFAULT_FILTER)))
    .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Keep the returned guard alive for the
/// lifetime of the process or buffered lines are lost.
pub fn init(log_dir: &Path, configured: Option<&str>, echo_to_stderr: bool) -> Result<WorkerGuard> {
  std::fs::create_dir_all(log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(log_dir, "quickmart.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let file_layer = fmt::layer()
    .with_writer(writer)
    .with_ansi(false)
    .with_target(false)
    .with_filter(build_filter(configured));

  let stderr_layer = echo_to_stderr.then(|| {
    fmt::layer()
      .with_writer(std::io::stderr)
      .with_target(false)
      .without_time()
      .with_filter(LevelFilter::WARN)
  });

  tracing_subscriber::registry()
    .with(file_layer)
    .with(stderr_layer)
    .try_init()
    .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;

  Ok(guard)
}
