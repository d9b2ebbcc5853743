//! Progress side channel for transfers.
//!
//! The engine reports after every body chunk; observers render or record the
//! updates independently of transfer completion.

use std::path::PathBuf;

/// Cumulative progress of one transfer, keyed by its destination path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub destination: PathBuf,
    pub bytes_downloaded: u64,
    /// Declared `Content-Length`; `None` when the server did not send one.
    pub total_size: Option<u64>,
}

impl ProgressUpdate {
    /// Fraction complete in [0.0, 1.0], or `None` if the total size is unknown.
    pub fn fraction(&self) -> Option<f64> {
        match self.total_size {
            Some(0) => Some(1.0),
            Some(total) => Some((self.bytes_downloaded as f64 / total as f64).min(1.0)),
            None => None,
        }
    }
}

/// Receives progress updates. Called from the transfer's thread; must not block.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, update: &ProgressUpdate);
}

/// Observer that drops every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _update: &ProgressUpdate) {}
}

/// Forwards updates to a channel; drops them when the consumer lags.
impl ProgressObserver for tokio::sync::mpsc::Sender<ProgressUpdate> {
    fn on_progress(&self, update: &ProgressUpdate) {
        let _ = self.try_send(update.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(done: u64, total: Option<u64>) -> ProgressUpdate {
        ProgressUpdate {
            destination: PathBuf::from("x"),
            bytes_downloaded: done,
            total_size: total,
        }
    }

    #[test]
    fn fraction_known_and_unknown() {
        assert_eq!(update(50, Some(200)).fraction(), Some(0.25));
        assert_eq!(update(300, Some(200)).fraction(), Some(1.0));
        assert_eq!(update(0, Some(0)).fraction(), Some(1.0));
        assert_eq!(update(10, None).fraction(), None);
    }

    #[tokio::test]
    async fn channel_observer_forwards_until_full() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(1);
        tx.on_progress(&update(1, None));
        tx.on_progress(&update(2, None));
        assert_eq!(rx.recv().await.unwrap().bytes_downloaded, 1);
        assert!(rx.try_recv().is_err());
    }
}
