//! Job write operations: insert, status update, finalize, crash recovery.

use super::super::db::JobStore;
use super::super::error::StoreError;
use super::super::types::{JobId, JobStatus};

impl JobStore {
    /// Insert a new pending job requested at `request_timestamp` (Unix ms).
    pub async fn insert(&self, url: &str, request_timestamp: i64) -> Result<JobId, StoreError> {
        let row_id = sqlx::query(
            r#"
            INSERT INTO downloads (url, file_path, status, request_timestamp)
            VALUES (?1, '', ?2, ?3)
            "#,
        )
        .bind(url)
        .bind(JobStatus::Pending.as_str())
        .bind(request_timestamp)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(row_id)
    }

    /// Move a job between `pending` and `downloading` as a compare-and-set:
    /// claiming (`downloading`) only succeeds from `pending`, reverting
    /// (`pending`) only from `downloading`.
    ///
    /// Returns false when no row was updated (unknown id, already finished, or
    /// claimed/reverted by someone else). `finished` is only reachable via
    /// [`JobStore::finalize`].
    pub async fn update_status(&self, id: JobId, status: JobStatus) -> Result<bool, StoreError> {
        let expected = match status {
            JobStatus::Downloading => JobStatus::Pending,
            JobStatus::Pending => JobStatus::Downloading,
            JobStatus::Finished => return Err(StoreError::InvalidTransition { id, status }),
        };
        let r = sqlx::query(
            r#"
            UPDATE downloads
            SET status = ?1
            WHERE id = ?2 AND status = ?3
            "#,
        )
        .bind(status.as_str())
        .bind(id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        Ok(r.rows_affected() == 1)
    }

    /// Mark a job finished with its artifact path and timestamps in one statement.
    /// Returns false when no row was updated (unknown id or already finished).
    pub async fn finalize(
        &self,
        id: JobId,
        file_path: &str,
        download_timestamp: i64,
        expiration_timestamp: i64,
    ) -> Result<bool, StoreError> {
        if file_path.is_empty() {
            return Err(StoreError::EmptyFilePath { id });
        }
        let r = sqlx::query(
            r#"
            UPDATE downloads
            SET status = 'finished',
                file_path = ?1,
                download_timestamp = ?2,
                expiration_timestamp = ?3
            WHERE id = ?4 AND status != 'finished'
            "#,
        )
        .bind(file_path)
        .bind(download_timestamp)
        .bind(expiration_timestamp)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(r.rows_affected() == 1)
    }

    /// Revert any job left in `downloading` (e.g. after a crash) to `pending`.
    /// Call before scheduling so stranded jobs are picked up again.
    /// Returns the number of jobs reset.
    pub async fn recover_downloading(&self) -> Result<u64, StoreError> {
        let r = sqlx::query(
            r#"
            UPDATE downloads
            SET status = 'pending'
            WHERE status = 'downloading'
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(r.rows_affected())
    }
}
