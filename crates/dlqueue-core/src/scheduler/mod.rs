//! Periodic scheduler: claims pending jobs and drives them through the pool.
//!
//! Each tick snapshots the pending rows, marks each one `downloading`, names
//! its artifact, and submits it to the [`TransferPool`]. Completion is
//! reconciled in a per-job task: success finalizes the row, failure reverts
//! it to `pending` for the next tick. There is no retry limit.

mod complete;
mod naming;
mod trigger;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use tokio::task::JoinHandle;

use crate::job_store::{now_millis, JobId, JobStatus, JobStore, StoreError};
use crate::pool::TransferPool;
use crate::transfer::{FetchRequest, TransferError};

use self::naming::NameAllocator;

pub use trigger::next_fire;

/// How one dispatched job ended.
#[derive(Debug)]
pub enum JobOutcome {
    /// Transfer succeeded and the row was finalized.
    Finished {
        id: JobId,
        file_path: String,
        bytes: u64,
    },
    /// Transfer failed; the row is `pending` again.
    Reverted { id: JobId, error: TransferError },
    /// The row could not be updated after the transfer ended. It stays
    /// `downloading` until the next startup sweep.
    StoreFailed { id: JobId, error: StoreError },
}

impl JobOutcome {
    pub fn id(&self) -> JobId {
        match self {
            JobOutcome::Finished { id, .. }
            | JobOutcome::Reverted { id, .. }
            | JobOutcome::StoreFailed { id, .. } => *id,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, JobOutcome::Finished { .. })
    }
}

/// Why a tick dispatched nothing.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("download directory {}: {source}", path.display())]
    DownloadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Transfers handed to the pool by one tick.
#[derive(Debug, Default)]
pub struct Dispatch {
    handles: Vec<JoinHandle<JobOutcome>>,
}

impl Dispatch {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every dispatched job to be reconciled.
    pub async fn wait(self) -> Vec<JobOutcome> {
        let mut outcomes = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::error!("completion task failed: {}", e),
            }
        }
        outcomes
    }
}

/// Drives pending jobs from the store through the transfer pool.
#[derive(Debug, Clone)]
pub struct Scheduler {
    store: JobStore,
    pool: TransferPool,
    download_dir: PathBuf,
}

impl Scheduler {
    pub fn new(store: JobStore, pool: TransferPool, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            pool,
            download_dir: download_dir.into(),
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn pool(&self) -> &TransferPool {
        &self.pool
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Revert jobs stranded in `downloading` by a previous process.
    pub async fn recover(&self) -> Result<u64, StoreError> {
        let n = self.store.recover_downloading().await?;
        if n > 0 {
            tracing::info!(count = n, "reverted stranded downloads to pending");
        }
        Ok(n)
    }

    /// One pass over the pending snapshot. Returns once every job has been
    /// claimed and submitted; transfers continue in the background.
    pub async fn tick(&self) -> Result<Dispatch, TickError> {
        let pending = self.store.list_pending().await?;
        if pending.is_empty() {
            tracing::debug!("tick: nothing pending");
            return Ok(Dispatch::default());
        }
        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|source| TickError::DownloadDir {
                path: self.download_dir.clone(),
                source,
            })?;
        tracing::info!(count = pending.len(), "tick: dispatching pending jobs");

        let mut names = NameAllocator::new(&self.download_dir);
        let mut dispatch = Dispatch::default();
        for job in pending {
            match self.store.update_status(job.id, JobStatus::Downloading).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(id = job.id, "job no longer claimable, skipping");
                    continue;
                }
                Err(e) => {
                    tracing::error!(id = job.id, "failed to claim job: {}", e);
                    continue;
                }
            }

            let file_name = names.allocate(now_millis(), &job.url).await;
            let request = FetchRequest::new(job.url.clone(), self.download_dir.join(&file_name));
            tracing::debug!(id = job.id, url = %job.url, file = %file_name, "submitting");

            let transfer = self.pool.submit(request);
            let store = self.store.clone();
            let id = job.id;
            dispatch.handles.push(tokio::spawn(async move {
                complete::reconcile_outcome(&store, id, file_name, transfer.await).await
            }));
        }
        Ok(dispatch)
    }

    /// Startup sweep, then tick on every fire time of `schedule` in `tz`.
    /// Only returns on a startup failure or an exhausted schedule.
    pub async fn run(&self, schedule: &cron::Schedule, tz: Tz) -> Result<()> {
        self.recover().await.context("startup sweep of stranded jobs")?;
        tracing::info!(tz = %tz, dir = %self.download_dir.display(), "scheduler started");

        loop {
            let now = chrono::Utc::now();
            let Some(at) = next_fire(schedule, tz, now) else {
                anyhow::bail!("tick schedule has no upcoming fire times");
            };
            let wait = (at - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            match self.tick().await {
                Ok(dispatch) if !dispatch.is_empty() => {
                    tracing::info!(jobs = dispatch.len(), "tick complete");
                }
                Ok(_) => {}
                Err(e) => tracing::error!("tick skipped: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests;
