//! Logging infrastructure for TrackSwap.
//!
//! Everything in the crate logs through `tracing`; this module only installs
//! the global subscriber:
//! - stderr output, filtered by `RUST_LOG` or the configured default level
//! - optionally a daily-rolling log file written off-thread
//!
//! # Example
//!
//! ```no_run
//! use trackswap_core::logging::{init_tracing_with_file, LogLevel};
//!
//! // Keep the guard alive until exit so buffered lines are flushed
//! let _guard = init_tracing_with_file(LogLevel::Info, ".logs").unwrap();
//! tracing::info!("Starting");
//! ```

mod types;

pub use tracing_appender::non_blocking::WorkerGuard;
pub use types::{LogLevel, LoggingError};

use std::fs;
use std::path::Path;

use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Prefix of the rolling log files (`trackswap.log.YYYY-MM-DD`).
const LOG_FILE_PREFIX: &str = "trackswap.log";

/// Install the global subscriber, writing to stderr only.
///
/// Respects `RUST_LOG`, falling back to `default_level`. Output goes to
/// stderr so stdout stays clean for machine-readable results.
pub fn init_tracing(default_level: LogLevel) -> Result<(), LoggingError> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(build_env_filter(default_level))
        .try_init()?;
    Ok(())
}

/// Like [`init_tracing`], plus a daily-rolling file in `log_dir`.
///
/// The returned guard flushes the background writer when dropped.
pub fn init_tracing_with_file(
    default_level: LogLevel,
    log_dir: impl AsRef<Path>,
) -> Result<WorkerGuard, LoggingError> {
    let log_dir = log_dir.as_ref();
    fs::create_dir_all(log_dir).map_err(|source| LoggingError::CreateDir {
        path: log_dir.to_path_buf(),
        source,
    })?;

    let file_appender = rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(build_env_filter(default_level))
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()?;

    tracing::info!("Logging to {}", log_dir.display());
    Ok(guard)
}

/// Warnings and errors through the test writer; safe to call repeatedly.
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

fn build_env_filter(default_level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()))
}
