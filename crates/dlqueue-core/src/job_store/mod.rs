//! Durable job table (SQLite via sqlx).
//!
//! One row per download attempt lineage: URL, artifact path, lifecycle
//! status, and request/download/expiration timestamps. Every mutation is a
//! single-row statement, so callers never need cross-row transactions.

mod db;
mod error;
mod jobs;
mod types;

pub use db::{now_millis, JobStore};
pub use error::StoreError;
pub use types::{Job, JobId, JobStatus, RETENTION_MS};

#[cfg(test)]
pub(crate) use db::open_memory;
