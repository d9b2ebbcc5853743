//! `dlqueue add <url>` – submit a URL.

use anyhow::Result;
use dlqueue_core::api::{self, SubmitOutcome};
use dlqueue_core::config::QueueConfig;

use super::open_store;

pub async fn run_add(cfg: &QueueConfig, url: &str) -> Result<()> {
    let store = open_store(cfg).await?;
    let outcome = api::submit(&store, &cfg.download_dir(), url).await?;
    match outcome {
        SubmitOutcome::Saved { id } => println!("{} (job {id})", outcome.message()),
        _ => println!("{}", outcome.message()),
    }
    Ok(())
}
