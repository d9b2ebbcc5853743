//! Job read operations: latest-by-url, pending, all, get.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::super::db::JobStore;
use super::super::error::StoreError;
use super::super::types::{Job, JobId, JobStatus};

const JOB_COLUMNS: &str = "id, url, file_path, status, request_timestamp, \
                           download_timestamp, expiration_timestamp";

fn job_from_row(row: &SqliteRow) -> Result<Job, StoreError> {
    let id: i64 = row.try_get("id")?;
    let status_str: String = row.try_get("status")?;
    let status = JobStatus::parse(&status_str).ok_or(StoreError::UnknownStatus {
        id,
        status: status_str,
    })?;

    Ok(Job {
        id,
        url: row.try_get("url")?,
        file_path: row.try_get("file_path")?,
        status,
        request_timestamp: row.try_get("request_timestamp")?,
        download_timestamp: row.try_get("download_timestamp")?,
        expiration_timestamp: row.try_get("expiration_timestamp")?,
    })
}

impl JobStore {
    /// Most recent row for `url` (latest request first, id breaks ties).
    pub async fn find_latest_by_url(&self, url: &str) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM downloads WHERE url = ?1 \
             ORDER BY request_timestamp DESC, id DESC LIMIT 1"
        ))
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(job_from_row).transpose()
    }

    /// All rows waiting for a transfer, oldest first.
    pub async fn list_pending(&self) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM downloads WHERE status = ?1 \
             ORDER BY request_timestamp ASC, id ASC"
        ))
        .bind(JobStatus::Pending.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(job_from_row).collect()
    }

    /// All rows in any status, oldest first.
    pub async fn list_all(&self) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM downloads ORDER BY request_timestamp ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(job_from_row).collect()
    }

    /// Fetch a single row by id.
    pub async fn get(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query(&format!("SELECT {JOB_COLUMNS} FROM downloads WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(job_from_row).transpose()
    }
}
