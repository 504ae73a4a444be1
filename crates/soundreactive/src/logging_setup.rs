//! Installs the tracing subscriber described by a [`LogConfig`]
//!
//! Console output goes to stderr so stdout stays free for the output path
//! printed by the CLI. File output is appended to the day's log file through a
//! non-blocking writer.

use anyhow::{anyhow, Context, Result};
use soundreactive_core::LogConfig;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

/// Keeps the file writer thread alive; dropping it flushes pending lines
pub struct LogGuard {
    _guard: WorkerGuard,
    path: PathBuf,
}

impl LogGuard {
    /// File the log is written to
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Install the global subscriber.
///
/// Returns a guard when file output is enabled. Fails if a subscriber is
/// already installed.
pub fn init(config: &LogConfig) -> Result<Option<LogGuard>> {
    config
        .ensure_log_directory()
        .context("Failed to create log directory")?;
    let cleanup = config.file_output.then(|| config.cleanup_old_logs());

    // RUST_LOG takes precedence over the configured level
    let filter = EnvFilter::builder()
        .with_default_directive(config.parse_level().into())
        .from_env_lossy();

    let console_layer = config.console_output.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .with_target(false)
            .with_filter(filter.clone())
    });

    let (file_layer, guard) = if config.file_output {
        let (writer, guard) = file_writer(&config.current_log_path())?;
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_filter(filter);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("A global logger is already installed")?;

    match cleanup {
        Some(Ok(removed)) if removed > 0 => {
            tracing::debug!("Removed {} old log files", removed)
        }
        Some(Err(e)) => tracing::warn!("Failed to clean up old log files: {}", e),
        _ => {}
    }
    if let Some(guard) = &guard {
        tracing::info!("Logging to {}", guard.path().display());
    }
    tracing::debug!("Logging initialized at level {}", config.level);
    Ok(guard)
}

/// Non-blocking appender for `path`, created if missing
fn file_writer(path: &Path) -> Result<(NonBlocking, LogGuard)> {
    let directory = path.parent().unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("Invalid log file name: {}", path.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);
    Ok((
        writer,
        LogGuard {
            _guard: guard,
            path: path.to_path_buf(),
        },
    ))
}
