//! CLI command handlers, one file per command.

mod add;
mod list;
mod progress;
mod run;
mod serve;

pub use add::run_add;
pub use list::run_list;
pub use run::run_scheduler;
pub use serve::run_serve;

use anyhow::{Context, Result};
use std::sync::Arc;

use dlqueue_core::config::QueueConfig;
use dlqueue_core::job_store::JobStore;
use dlqueue_core::pool::TransferPool;
use dlqueue_core::scheduler::Scheduler;
use dlqueue_core::transfer::{CurlFetcher, ProgressObserver, TransferOptions};

/// Job store at the configured path, or the XDG state default.
async fn open_store(cfg: &QueueConfig) -> Result<JobStore> {
    let store = match &cfg.database_path {
        Some(path) => JobStore::open_at(path).await,
        None => JobStore::open_default().await,
    };
    store.context("open job store")
}

/// Scheduler over a curl-backed pool sized from the config.
fn build_scheduler(
    cfg: &QueueConfig,
    store: JobStore,
    observer: Arc<dyn ProgressObserver>,
) -> Scheduler {
    let fetcher = CurlFetcher::new(TransferOptions::from(&cfg.transfer()));
    let pool = TransferPool::new(cfg.pool_size, Arc::new(fetcher), observer);
    Scheduler::new(store, pool, cfg.download_dir())
}
