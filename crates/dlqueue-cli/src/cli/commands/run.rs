//! `dlqueue run` – run the scheduler in the foreground.

use anyhow::{Context, Result};
use dlqueue_core::config::QueueConfig;
use dlqueue_core::scheduler::JobOutcome;
use dlqueue_core::transfer::ProgressUpdate;
use std::sync::Arc;

use super::progress::spawn_renderer;
use super::{build_scheduler, open_store};

pub async fn run_scheduler(cfg: &QueueConfig, once: bool) -> Result<()> {
    let store = open_store(cfg).await?;
    let (progress_tx, progress_rx) = tokio::sync::mpsc::channel::<ProgressUpdate>(64);
    let renderer = spawn_renderer(progress_rx);
    let scheduler = build_scheduler(cfg, store, Arc::new(progress_tx));

    if !once {
        let schedule = cfg.schedule()?;
        let tz = cfg.tz()?;
        return tokio::select! {
            r = scheduler.run(&schedule, tz) => r,
            r = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, stopping scheduler");
                r.context("wait for ctrl-c")
            }
        };
    }

    // No startup sweep here: a long-running `run` or `serve` may own the
    // `downloading` rows, and claims are compare-and-set.
    let outcomes = scheduler.tick().await?.wait().await;
    // The pool holds the last progress sender; drop it so the renderer ends.
    drop(scheduler);
    let _ = renderer.await;

    if outcomes.is_empty() {
        println!("No pending downloads.");
        return Ok(());
    }
    for outcome in &outcomes {
        match outcome {
            JobOutcome::Finished {
                id,
                file_path,
                bytes,
            } => println!("job {id}: finished {file_path} ({bytes} bytes)"),
            JobOutcome::Reverted { id, error } => println!("job {id}: failed, pending again ({error})"),
            JobOutcome::StoreFailed { id, error } => println!("job {id}: store error ({error})"),
        }
    }
    let finished = outcomes.iter().filter(|o| o.is_finished()).count();
    tracing::info!(finished, total = outcomes.len(), "run --once complete");
    Ok(())
}
