//! Decides whether a submitted URL needs a new job row.
//!
//! The latest row for the URL is authoritative for in-flight work. For
//! finished rows the filesystem is: a finished job whose artifact has vanished
//! is treated as if it never existed.

use std::path::Path;

use crate::job_store::{Job, JobStatus, JobStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Latest row is still pending or downloading.
    DuplicateInFlight,
    /// Latest row is finished and its artifact is on disk.
    DuplicateFileExists { job: Job },
    /// No usable row; a new one should be inserted.
    New,
}

pub async fn reconcile(
    store: &JobStore,
    download_dir: &Path,
    url: &str,
) -> Result<Reconciliation, StoreError> {
    let Some(job) = store.find_latest_by_url(url).await? else {
        return Ok(Reconciliation::New);
    };

    if job.status != JobStatus::Finished {
        return Ok(Reconciliation::DuplicateInFlight);
    }

    let artifact = download_dir.join(&job.file_path);
    match tokio::fs::try_exists(&artifact).await {
        Ok(true) => Ok(Reconciliation::DuplicateFileExists { job }),
        Ok(false) => {
            tracing::debug!(id = job.id, path = %artifact.display(), "finished artifact missing");
            Ok(Reconciliation::New)
        }
        Err(e) => {
            tracing::warn!(id = job.id, path = %artifact.display(), "artifact check failed: {}", e);
            Ok(Reconciliation::New)
        }
    }
}
