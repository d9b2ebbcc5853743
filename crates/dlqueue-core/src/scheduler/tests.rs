use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{JobOutcome, Scheduler, TickError};
use crate::job_store::{open_memory, JobStatus, JobStore, RETENTION_MS};
use crate::pool::TransferPool;
use crate::transfer::{FetchRequest, Fetcher, NoProgress, ProgressObserver, TransferError};

/// Writes a small body, failing each URL a configured number of times first.
#[derive(Default)]
struct FlakyFetcher {
    failures_left: Mutex<HashMap<String, u32>>,
}

impl FlakyFetcher {
    fn failing(url: &str, times: u32) -> Self {
        let f = Self::default();
        f.failures_left.lock().unwrap().insert(url.to_string(), times);
        f
    }
}

#[async_trait]
impl Fetcher for FlakyFetcher {
    async fn fetch(
        &self,
        request: FetchRequest,
        _progress: Arc<dyn ProgressObserver>,
    ) -> Result<u64, TransferError> {
        {
            let mut left = self.failures_left.lock().unwrap();
            if let Some(n) = left.get_mut(&request.url) {
                if *n > 0 {
                    *n -= 1;
                    return Err(TransferError::UnexpectedStatus { code: 503 });
                }
            }
        }
        tokio::fs::write(&request.destination, b"payload").await?;
        Ok(7)
    }
}

async fn scheduler_with(fetcher: FlakyFetcher, dir: &std::path::Path) -> (Scheduler, JobStore) {
    let store = open_memory().await.unwrap();
    let pool = TransferPool::new(2, Arc::new(fetcher), Arc::new(NoProgress));
    (Scheduler::new(store.clone(), pool, dir), store)
}

#[tokio::test]
async fn successful_transfer_finalizes_row() {
    let dir = tempfile::tempdir().unwrap();
    let (scheduler, store) = scheduler_with(FlakyFetcher::default(), dir.path()).await;
    let id = store.insert("http://host/files/a.bin", 1).await.unwrap();

    let outcomes = scheduler.tick().await.unwrap().wait().await;
    assert_eq!(outcomes.len(), 1);
    let JobOutcome::Finished { file_path, bytes, .. } = &outcomes[0] else {
        panic!("expected finished, got {:?}", outcomes[0]);
    };
    assert_eq!(*bytes, 7);
    assert!(file_path.ends_with("_a.bin"));
    assert!(dir.path().join(file_path).exists());

    let job = store.get(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Finished);
    assert_eq!(&job.file_path, file_path);
    let done = job.download_timestamp.unwrap();
    assert_eq!(job.expiration_timestamp, Some(done + RETENTION_MS));
}

#[tokio::test]
async fn failed_transfer_reverts_and_retries_next_tick() {
    let dir = tempfile::tempdir().unwrap();
    let url = "http://host/flaky.iso";
    let (scheduler, store) = scheduler_with(FlakyFetcher::failing(url, 1), dir.path()).await;
    let id = store.insert(url, 1).await.unwrap();

    let outcomes = scheduler.tick().await.unwrap().wait().await;
    assert!(matches!(outcomes[0], JobOutcome::Reverted { .. }));
    let job = store.get(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.file_path, "");

    let outcomes = scheduler.tick().await.unwrap().wait().await;
    assert!(outcomes[0].is_finished());
    assert_eq!(store.get(id).await.unwrap().unwrap().status, JobStatus::Finished);
}

#[tokio::test]
async fn same_url_twice_in_one_tick_gets_distinct_files() {
    let dir = tempfile::tempdir().unwrap();
    let (scheduler, store) = scheduler_with(FlakyFetcher::default(), dir.path()).await;
    store.insert("http://host/same.txt", 1).await.unwrap();
    store.insert("http://host/same.txt", 2).await.unwrap();

    let outcomes = scheduler.tick().await.unwrap().wait().await;
    let paths: Vec<_> = outcomes
        .iter()
        .map(|o| match o {
            JobOutcome::Finished { file_path, .. } => file_path.clone(),
            other => panic!("unexpected outcome {other:?}"),
        })
        .collect();
    assert_eq!(paths.len(), 2);
    assert_ne!(paths[0], paths[1]);
}

#[tokio::test]
async fn tick_without_pending_jobs_dispatches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (scheduler, store) = scheduler_with(FlakyFetcher::default(), dir.path()).await;
    let id = store.insert("http://host/a", 1).await.unwrap();
    store.update_status(id, JobStatus::Downloading).await.unwrap();

    let dispatch = scheduler.tick().await.unwrap();
    assert!(dispatch.is_empty());
}

#[tokio::test]
async fn recover_makes_stranded_jobs_claimable() {
    let dir = tempfile::tempdir().unwrap();
    let (scheduler, store) = scheduler_with(FlakyFetcher::default(), dir.path()).await;
    let id = store.insert("http://host/stranded.bin", 1).await.unwrap();
    store.update_status(id, JobStatus::Downloading).await.unwrap();

    assert_eq!(scheduler.recover().await.unwrap(), 1);
    let outcomes = scheduler.tick().await.unwrap().wait().await;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].id(), id);
    assert!(outcomes[0].is_finished());
}

#[tokio::test]
async fn store_failure_skips_the_tick() {
    let dir = tempfile::tempdir().unwrap();
    let (scheduler, store) = scheduler_with(FlakyFetcher::default(), dir.path()).await;
    store.close().await;
    assert!(matches!(scheduler.tick().await, Err(TickError::Store(_))));
}

#[tokio::test]
async fn unusable_download_dir_is_reported_as_such() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();
    let (scheduler, store) = scheduler_with(FlakyFetcher::default(), &blocker.join("downloads")).await;
    let id = store.insert("http://host/a.bin", 1).await.unwrap();

    let err = scheduler.tick().await.unwrap_err();
    match &err {
        TickError::DownloadDir { path, .. } => assert_eq!(path, &blocker.join("downloads")),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.to_string().starts_with("download directory "));
    // Nothing was claimed.
    assert_eq!(store.get(id).await.unwrap().unwrap().status, JobStatus::Pending);
}
