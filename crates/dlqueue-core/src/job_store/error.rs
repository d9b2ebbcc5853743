use super::types::{JobId, JobStatus};

/// Durable-storage failure. Propagated to the caller; the store never retries.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("state directory: {0}")]
    Xdg(#[from] xdg::BaseDirectoriesError),

    #[error("unknown status {status:?} in row {id}")]
    UnknownStatus { id: JobId, status: String },

    #[error("job {id} cannot be set to {status} via a status update")]
    InvalidTransition { id: JobId, status: JobStatus },

    #[error("job {id} cannot be finalized with an empty file path")]
    EmptyFilePath { id: JobId },
}
