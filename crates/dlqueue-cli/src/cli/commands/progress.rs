//! Terminal rendering of transfer progress.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use dlqueue_core::transfer::ProgressUpdate;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Prints at most one line per destination every interval, plus the final
/// update of transfers with a known size. Ends when every sender is dropped.
pub(super) fn spawn_renderer(mut rx: mpsc::Receiver<ProgressUpdate>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_print: HashMap<PathBuf, Instant> = HashMap::new();
        while let Some(update) = rx.recv().await {
            let now = Instant::now();
            let complete = update.fraction() == Some(1.0);
            let due = last_print
                .get(&update.destination)
                .map_or(true, |t| now.duration_since(*t) >= PROGRESS_INTERVAL);
            if !(due || complete) {
                continue;
            }
            println!("  {}", render_line(&update));
            if complete {
                last_print.remove(&update.destination);
            } else {
                last_print.insert(update.destination.clone(), now);
            }
        }
    })
}

fn render_line(update: &ProgressUpdate) -> String {
    let name = update
        .destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let done_mib = update.bytes_downloaded as f64 / 1_048_576.0;
    match (update.total_size, update.fraction()) {
        (Some(total), Some(fraction)) => format!(
            "{}: {:.1} / {:.1} MiB ({:.1}%)",
            name,
            done_mib,
            total as f64 / 1_048_576.0,
            fraction * 100.0
        ),
        _ => format!("{}: {:.1} MiB", name, done_mib),
    }
}
