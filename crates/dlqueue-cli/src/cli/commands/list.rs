//! `dlqueue list` – show all jobs.

use anyhow::Result;
use chrono::{Local, TimeZone};
use dlqueue_core::api;
use dlqueue_core::config::QueueConfig;

use super::open_store;

pub async fn run_list(cfg: &QueueConfig) -> Result<()> {
    let store = open_store(cfg).await?;
    let downloads = api::list_downloads(&store, &cfg.download_dir()).await?;
    if downloads.is_empty() {
        println!("No downloads in database.");
        return Ok(());
    }

    println!(
        "{:<6} {:<12} {:<6} {:<20} {}",
        "ID", "STATUS", "FILE", "REQUESTED", "URL"
    );
    for d in downloads {
        let file = if d.file_available { "yes" } else { "-" };
        println!(
            "{:<6} {:<12} {:<6} {:<20} {}",
            d.job.id,
            d.job.status,
            file,
            format_millis(d.job.request_timestamp),
            d.job.url
        );
    }
    Ok(())
}

fn format_millis(ms: i64) -> String {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}
