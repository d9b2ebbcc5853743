//! `dlqueue serve` – HTTP API plus the scheduler loop in one process.

use anyhow::{Context, Result};
use dlqueue_core::config::QueueConfig;
use dlqueue_core::transfer::ProgressUpdate;
use std::net::SocketAddr;
use std::sync::Arc;

use super::progress::spawn_renderer;
use super::{build_scheduler, open_store};
use crate::cli::http::{router, AppState};

pub async fn run_serve(cfg: &QueueConfig, port: u16) -> Result<()> {
    let store = open_store(cfg).await?;
    let download_dir = cfg.download_dir();
    tokio::fs::create_dir_all(&download_dir)
        .await
        .with_context(|| format!("create download directory {}", download_dir.display()))?;

    let (progress_tx, progress_rx) = tokio::sync::mpsc::channel::<ProgressUpdate>(64);
    let _renderer = spawn_renderer(progress_rx);
    let scheduler = build_scheduler(cfg, store.clone(), Arc::new(progress_tx));
    let schedule = cfg.schedule()?;
    let tz = cfg.tz()?;

    let app = router(AppState {
        store,
        download_dir: Arc::new(download_dir),
        pool: scheduler.pool().clone(),
    });
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(%addr, "HTTP API listening");
    println!("Server is running on port {port}");

    tokio::select! {
        r = scheduler.run(&schedule, tz) => r,
        r = async { axum::serve(listener, app).await } => r.context("HTTP server"),
        r = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, shutting down");
            r.context("wait for ctrl-c")
        }
    }
}
