//! SQLite-backed job store: connection, migrations, and timestamp helpers.
//! Row CRUD lives in `jobs`.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use super::error::StoreError;

/// Handle to the SQLite-backed job table. Cheap to clone; clones share the pool.
///
/// The default database file is stored under the XDG state directory:
/// `~/.local/state/dlqueue/downloads.db` on Debian.
#[derive(Clone)]
pub struct JobStore {
    pub(crate) pool: Pool<Sqlite>,
    /// Serializes check-then-insert submissions within this process.
    submissions: Arc<Mutex<()>>,
}

impl std::fmt::Debug for JobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobStore").finish_non_exhaustive()
    }
}

impl JobStore {
    /// Open (or create) the default job database and run migrations.
    pub async fn open_default() -> Result<Self, StoreError> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("dlqueue")?;
        let db_path = xdg_dirs.get_state_home().join("downloads.db");
        Self::open_at(db_path).await
    }

    /// Open (or create) the database at a specific path. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        let store = JobStore::from_pool(pool);
        store.migrate().await?;
        tracing::debug!(path = %path.display(), "job store opened");
        Ok(store)
    }

    fn from_pool(pool: Pool<Sqlite>) -> Self {
        Self {
            pool,
            submissions: Arc::new(Mutex::new(())),
        }
    }

    /// Held across "find latest row, then maybe insert" so concurrent
    /// submissions of one URL cannot both decide to insert. Shared by clones.
    pub(crate) async fn lock_submissions(&self) -> MutexGuard<'_, ()> {
        self.submissions.lock().await
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        // `file_path` stays '' until the row is finalized; timestamps are Unix ms.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS downloads (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                file_path TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'pending',
                request_timestamp INTEGER NOT NULL,
                download_timestamp INTEGER,
                expiration_timestamp INTEGER
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS downloads_url_requested
            ON downloads (url, request_timestamp);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Close the underlying pool, waiting for in-use connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Current time as Unix milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
/// Open an in-memory database for tests (no disk I/O).
pub(crate) async fn open_memory() -> Result<JobStore, StoreError> {
    // Single long-lived connection: each new in-memory connection would be an empty DB.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    let store = JobStore::from_pool(pool);
    store.migrate().await?;
    Ok(store)
}
