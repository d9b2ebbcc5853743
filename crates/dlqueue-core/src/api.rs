//! Submission and listing operations behind the CLI and HTTP surfaces.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;

use crate::job_store::{now_millis, Job, JobId, JobStore, StoreError};
use crate::reconcile::{reconcile, Reconciliation};
use crate::url_model::parse_http_url;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid URL: {0:?}")]
    InvalidUrl(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    DownloadPending,
    FileExists,
    Saved { id: JobId },
}

impl SubmitOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            SubmitOutcome::DownloadPending => "Download pending",
            SubmitOutcome::FileExists => "File exists in filesystem",
            SubmitOutcome::Saved { .. } => "URL saved for download",
        }
    }
}

/// Queue `raw_url` unless it is already in flight or its artifact exists.
pub async fn submit(
    store: &JobStore,
    download_dir: &Path,
    raw_url: &str,
) -> Result<SubmitOutcome, ApiError> {
    let url = raw_url.trim();
    if parse_http_url(url).is_none() {
        return Err(ApiError::InvalidUrl(raw_url.to_string()));
    }

    let _submitting = store.lock_submissions().await;
    let outcome = match reconcile(store, download_dir, url).await? {
        Reconciliation::DuplicateInFlight => SubmitOutcome::DownloadPending,
        Reconciliation::DuplicateFileExists { .. } => SubmitOutcome::FileExists,
        Reconciliation::New => {
            let id = store.insert(url, now_millis()).await?;
            tracing::info!(id, url, "queued download");
            SubmitOutcome::Saved { id }
        }
    };
    Ok(outcome)
}

/// A job row plus whether its artifact is currently in the download directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadListing {
    #[serde(flatten)]
    pub job: Job,
    pub file_available: bool,
}

/// Every job, oldest first, annotated with artifact availability.
pub async fn list_downloads(
    store: &JobStore,
    download_dir: &Path,
) -> Result<Vec<DownloadListing>, StoreError> {
    let jobs = store.list_all().await?;
    let present = dir_entries(download_dir).await;
    Ok(jobs
        .into_iter()
        .map(|job| {
            let file_available = job.file_name().is_some_and(|n| present.contains(n));
            DownloadListing {
                job,
                file_available,
            }
        })
        .collect())
}

/// File names in `dir`; empty when the directory is missing or unreadable.
async fn dir_entries(dir: &Path) -> HashSet<String> {
    let mut names = HashSet::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(dir = %dir.display(), "cannot list download directory: {}", e);
            }
            return names;
        }
    };
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                if let Some(name) = entry.file_name().to_str() {
                    names.insert(name.to_string());
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), "error reading download directory: {}", e);
                break;
            }
        }
    }
    names
}
