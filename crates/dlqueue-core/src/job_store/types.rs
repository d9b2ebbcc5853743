//! Types stored in the job table.

use serde::Serialize;

/// Job identifier.
pub type JobId = i64;

/// Retention marker added to the download timestamp: 10 days in milliseconds.
pub const RETENTION_MS: i64 = 10 * 24 * 60 * 60 * 1000;

/// Lifecycle status stored as a string in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Downloading,
    Finished,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Downloading => "downloading",
            JobStatus::Finished => "finished",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "downloading" => Some(JobStatus::Downloading),
            "finished" => Some(JobStatus::Finished),
            _ => None,
        }
    }

    /// True while a job still counts as queued or in flight.
    pub fn is_in_flight(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Downloading)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// One row of the `downloads` table. Timestamps are Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub url: String,
    /// Artifact path relative to the download directory; empty until finished.
    pub file_path: String,
    pub status: JobStatus,
    pub request_timestamp: i64,
    pub download_timestamp: Option<i64>,
    pub expiration_timestamp: Option<i64>,
}

impl Job {
    /// Last path component of `file_path`, as it appears in the download directory.
    pub fn file_name(&self) -> Option<&str> {
        self.file_path
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
    }
}
