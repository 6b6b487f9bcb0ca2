//! File logging
//!
//! The TUI owns the terminal, so log output always goes to
//! `~/.salesdash/logs/salesdash.log` through a non-blocking writer.

use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::DEFAULT_LOG_FILTER;
use crate::types::Result;

pub const LOG_FILE: &str = "salesdash.log";

/// Install the global subscriber. Keep the guard alive until exit so
/// buffered lines are flushed.
pub fn init(log_dir: &Path, filter: &str) -> Result<WorkerGuard> {
    fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_new(filter).unwrap_or_else(|e| {
        eprintln!("Invalid log filter {:?}: {}", filter, e);
        EnvFilter::new(DEFAULT_LOG_FILTER)
    });

    // A second init (tests, repeated runs in one process) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_env_filter(filter)
        .try_init();

    Ok(guard)
}
