//! Tracing setup for the queue binaries.
//!
//! Events are appended to `dlqueue.log` in the XDG state directory, shared by
//! every thread through one `Arc<File>`. `RUST_LOG` replaces the default
//! filter when it parses.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "dlqueue.log";

const DEFAULT_FILTER: &str = "info,dlqueue=debug,dlqueue_core=debug";

/// `$XDG_STATE_HOME/dlqueue/dlqueue.log`.
pub fn log_file_path() -> Result<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix("dlqueue")?;
    Ok(dirs.get_state_home().join(LOG_FILE_NAME))
}

/// Open `path` for appending, creating missing parent directories.
pub fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))
}

/// Filter from `directives`, or the default when absent or unparsable.
fn filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

fn filter_from_env() -> EnvFilter {
    filter(std::env::var("RUST_LOG").ok().as_deref())
}

/// Install the file subscriber and return the log path. Errors leave no
/// subscriber installed so the caller can use [`init_logging_stderr`].
pub fn init_logging() -> Result<PathBuf> {
    let path = log_file_path()?;
    let file = Arc::new(open_log_file(&path)?);

    tracing_subscriber::fmt()
        .with_env_filter(filter_from_env())
        .with_writer(file)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install subscriber: {e}"))?;

    tracing::info!(path = %path.display(), "logging to file");
    Ok(path)
}

/// Subscriber writing to stderr. A no-op if one is already installed.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_from_env())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
