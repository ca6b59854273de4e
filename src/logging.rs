//! Tracing setup.
//!
//! Two sinks, picked by the front-end:
//! - [`LogTarget::Stderr`] for the CLI, so reports on stdout stay clean
//! - [`LogTarget::File`] for the terminal dashboard, which owns the screen
//!
//! The filter comes from `DEMAND_LOG` (e.g. `DEMAND_LOG=debug`), default `info`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

use crate::error::AppError;

pub const LOG_ENV: &str = "DEMAND_LOG";
pub const LOG_FILE_NAME: &str = "demand.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Append to `demand.log` inside this directory.
    File(PathBuf),
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(target: &LogTarget) -> Result<(), AppError> {
    if LOG_GUARD.get().is_some() || tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let filter = build_env_filter();
    match target {
        LogTarget::Stderr => {
            let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
            Registry::default()
                .with(filter)
                .with(layer)
                .try_init()
                .map_err(|e| AppError::Terminal(format!("Failed to install logger: {e}")))?;
        }
        LogTarget::File(dir) => {
            let log_path = prepare_log_file(dir)?;
            let appender = rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            Registry::default()
                .with(filter)
                .with(layer)
                .try_init()
                .map_err(|e| AppError::Terminal(format!("Failed to install logger: {e}")))?;
            let _ = LOG_GUARD.set(guard);
            tracing::info!(path = %log_path.display(), "logging to file");
        }
    }
    Ok(())
}

fn prepare_log_file(dir: &Path) -> Result<PathBuf, AppError> {
    fs::create_dir_all(dir).map_err(|e| AppError::io(format!("Failed to create log directory '{}'", dir.display()), e))?;
    Ok(dir.join(LOG_FILE_NAME))
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_lives_in_the_requested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("artifacts");
        let path = prepare_log_file(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(path, nested.join("demand.log"));
    }
}
