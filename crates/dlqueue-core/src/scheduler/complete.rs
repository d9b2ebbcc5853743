//! Post-transfer phase: finalize the row or put it back in the queue.

use crate::job_store::{now_millis, JobId, JobStatus, JobStore, RETENTION_MS};
use crate::transfer::TransferError;

use super::JobOutcome;

pub(super) async fn reconcile_outcome(
    store: &JobStore,
    id: JobId,
    file_path: String,
    result: Result<u64, TransferError>,
) -> JobOutcome {
    match result {
        Ok(bytes) => {
            let done_at = now_millis();
            match store
                .finalize(id, &file_path, done_at, done_at + RETENTION_MS)
                .await
            {
                Ok(updated) => {
                    if !updated {
                        tracing::warn!(id, "job was already finished; row left unchanged");
                    }
                    tracing::info!(id, file = %file_path, bytes, "download finished");
                    JobOutcome::Finished {
                        id,
                        file_path,
                        bytes,
                    }
                }
                Err(error) => {
                    tracing::error!(id, "failed to finalize job: {}", error);
                    JobOutcome::StoreFailed { id, error }
                }
            }
        }
        Err(error) => {
            tracing::warn!(id, "download failed, back to pending: {}", error);
            match store.update_status(id, JobStatus::Pending).await {
                Ok(_) => JobOutcome::Reverted { id, error },
                Err(store_err) => {
                    tracing::error!(id, "failed to revert job: {}", store_err);
                    JobOutcome::StoreFailed {
                        id,
                        error: store_err,
                    }
                }
            }
        }
    }
}
