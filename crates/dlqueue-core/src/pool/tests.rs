use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::TransferPool;
use crate::transfer::{
    FetchRequest, Fetcher, NoProgress, ProgressObserver, ProgressUpdate, TransferError,
};

/// Sleeps per fetch and records peak concurrency and start order.
#[derive(Default)]
struct GaugeFetcher {
    current: AtomicUsize,
    peak: AtomicUsize,
    started: Mutex<Vec<String>>,
    delay_ms: u64,
}

impl GaugeFetcher {
    fn with_delay(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            ..Default::default()
        }
    }
}

#[async_trait]
impl Fetcher for GaugeFetcher {
    async fn fetch(
        &self,
        request: FetchRequest,
        progress: Arc<dyn ProgressObserver>,
    ) -> Result<u64, TransferError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.started.lock().unwrap().push(request.url.clone());

        progress.on_progress(&ProgressUpdate {
            destination: request.destination.clone(),
            bytes_downloaded: 4,
            total_size: Some(8),
        });
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;

        self.current.fetch_sub(1, Ordering::SeqCst);
        if request.url.contains("fail") {
            return Err(TransferError::UnexpectedStatus { code: 500 });
        }
        if request.url.contains("panic") {
            panic!("fetcher blew up");
        }
        Ok(8)
    }
}

/// Collects every update it sees.
#[derive(Default)]
struct Recorder(Mutex<Vec<ProgressUpdate>>);

impl ProgressObserver for Recorder {
    fn on_progress(&self, update: &ProgressUpdate) {
        self.0.lock().unwrap().push(update.clone());
    }
}

fn req(name: &str) -> FetchRequest {
    FetchRequest::new(format!("http://test/{name}"), PathBuf::from(name))
}

#[tokio::test]
async fn never_exceeds_size_and_runs_everything() {
    let fetcher = Arc::new(GaugeFetcher::with_delay(20));
    let pool = TransferPool::new(3, fetcher.clone(), Arc::new(NoProgress));

    let handles: Vec<_> = (0..12).map(|i| pool.submit(req(&format!("f{i}")))).collect();
    assert_eq!(pool.active(), 3);
    assert_eq!(pool.queued(), 9);

    for h in handles {
        assert_eq!(h.await.unwrap(), 8);
    }
    assert_eq!(fetcher.peak.load(Ordering::SeqCst), 3);
    assert_eq!(fetcher.started.lock().unwrap().len(), 12);
    assert_eq!(pool.active(), 0);
    assert_eq!(pool.queued(), 0);
}

#[tokio::test]
async fn starts_in_submission_order() {
    let fetcher = Arc::new(GaugeFetcher::with_delay(5));
    let pool = TransferPool::new(1, fetcher.clone(), Arc::new(NoProgress));

    let handles: Vec<_> = ["a", "b", "c", "d"].iter().map(|n| pool.submit(req(n))).collect();
    for h in handles {
        h.await.unwrap();
    }

    let started = fetcher.started.lock().unwrap().clone();
    assert_eq!(
        started,
        vec!["http://test/a", "http://test/b", "http://test/c", "http://test/d"]
    );
}

#[tokio::test]
async fn failures_release_their_slot() {
    let fetcher = Arc::new(GaugeFetcher::with_delay(5));
    let pool = TransferPool::new(1, fetcher.clone(), Arc::new(NoProgress));

    let bad = pool.submit(req("fail-1"));
    let good = pool.submit(req("ok"));

    assert!(matches!(
        bad.await,
        Err(TransferError::UnexpectedStatus { code: 500 })
    ));
    assert_eq!(good.await.unwrap(), 8);
    assert_eq!(pool.active(), 0);
}

#[tokio::test]
async fn panicking_fetch_reports_error_and_frees_slot() {
    let fetcher = Arc::new(GaugeFetcher::with_delay(1));
    let pool = TransferPool::new(1, fetcher, Arc::new(NoProgress));

    let boom = pool.submit(req("panic"));
    let next = pool.submit(req("after"));

    assert!(matches!(boom.await, Err(TransferError::Join(_))));
    assert_eq!(next.await.unwrap(), 8);
    assert_eq!(pool.active(), 0);
}

#[tokio::test]
async fn submit_from_completion_path_still_runs() {
    let fetcher = Arc::new(GaugeFetcher::with_delay(5));
    let pool = TransferPool::new(1, fetcher.clone(), Arc::new(NoProgress));

    let first = pool.submit(req("first"));
    let chained = {
        let pool = pool.clone();
        tokio::spawn(async move {
            first.await.unwrap();
            pool.submit(req("second")).await
        })
    };

    assert_eq!(chained.await.unwrap().unwrap(), 8);
    assert_eq!(fetcher.started.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn progress_is_forwarded_and_cleared_on_completion() {
    let fetcher = Arc::new(GaugeFetcher::with_delay(50));
    let recorder = Arc::new(Recorder::default());
    let pool = TransferPool::new(2, fetcher, recorder.clone());

    let handle = pool.submit(req("tracked"));
    tokio::time::sleep(Duration::from_millis(20)).await;

    let snapshot = pool.progress_snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].destination, PathBuf::from("tracked"));
    assert_eq!(snapshot[0].fraction(), Some(0.5));

    handle.await.unwrap();
    assert!(pool.progress_snapshot().is_empty());
    assert_eq!(recorder.0.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn zero_size_is_clamped_to_one() {
    let pool = TransferPool::new(0, Arc::new(GaugeFetcher::with_delay(1)), Arc::new(NoProgress));
    assert_eq!(pool.size(), 1);
    assert_eq!(pool.submit(req("x")).await.unwrap(), 8);
}
