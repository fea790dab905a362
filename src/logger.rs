//! Debug logging support for dashpatch
//!
//! When debug mode is enabled via config or `--debug`, step outcomes, writes
//! and backups are logged to ~/.dashpatch/dashpatch.log.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

const LOG_FILE_NAME: &str = "dashpatch.log";
const LOG_ENV: &str = "DASHPATCH_LOG";

/// Handle for an active log file; dropping it flushes pending lines
pub struct LogHandle {
    pub path: PathBuf,
    _guard: WorkerGuard,
}

/// Initialize file logging in `log_dir` when `debug_enabled`
///
/// Returns `Ok(None)` when logging is off or the log file can't be opened;
/// a broken log never stops a patch run.
pub fn init_debug_logging(debug_enabled: bool, log_dir: &Path) -> Result<Option<LogHandle>> {
    if !debug_enabled {
        return Ok(None);
    }

    if let Err(e) = fs::create_dir_all(log_dir) {
        eprintln!("Warning: Could not create log directory {}: {}", log_dir.display(), e);
        return Ok(None);
    }

    let log_path = log_dir.join(LOG_FILE_NAME);
    if let Err(e) = fs::OpenOptions::new().create(true).append(true).open(&log_path) {
        eprintln!("Warning: Could not create log file {}: {}", log_path.display(), e);
        return Ok(None);
    }

    let appender = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("dashpatch=debug"));

    let subscriber = registry()
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .with_thread_ids(false),
        )
        .with(filter);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    Ok(Some(LogHandle {
        path: log_path,
        _guard: guard,
    }))
}
