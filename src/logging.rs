//! Tracing setup.
//!
//! The TUI owns the terminal, so interactive runs log to a file. Headless runs
//! log to stderr, leaving stdout for the summary or JSON output.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_ENV: &str = "LCC_TUTORIAL_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

/// Default log file for interactive runs.
pub fn default_log_file() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("lcc-tutorial")
        .join("lcc-tutorial.log")
}

/// `LCC_TUTORIAL_LOG` first, then `RUST_LOG`, then `info`.
fn env_filter() -> EnvFilter {
    match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!("invalid {LOG_ENV} directive ({err}); using {DEFAULT_DIRECTIVE}");
            EnvFilter::new(DEFAULT_DIRECTIVE)
        }),
        Err(_) => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE)),
    }
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create log directory {}", parent.display()))?;
        }
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))
}

/// Install the global subscriber. Keep the guard alive until exit so buffered
/// lines are flushed.
pub fn init(target: LogTarget) -> Result<WorkerGuard> {
    let (writer, guard, ansi) = match &target {
        LogTarget::Stderr => {
            let (w, g) = tracing_appender::non_blocking(std::io::stderr());
            (w, g, true)
        }
        LogTarget::File(path) => {
            let (w, g) = tracing_appender::non_blocking(open_log_file(path)?);
            (w, g, false)
        }
    };

    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(ansi)
                .with_writer(writer),
        )
        .try_init()
        .ok();

    if let LogTarget::File(path) = &target {
        tracing::info!(log_file = %path.display(), "tracing initialised");
    }
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_log_file_is_named_after_the_binary() {
        let path = default_log_file();
        assert_eq!(path.file_name().unwrap(), "lcc-tutorial.log");
        assert!(path.parent().unwrap().ends_with("lcc-tutorial"));
    }

    #[test]
    fn log_file_parent_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("run.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }
}
