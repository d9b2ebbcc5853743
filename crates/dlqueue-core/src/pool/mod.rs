//! Bounded concurrency pool for transfers.
//!
//! Keeps at most `size` fetches in flight. Excess submissions wait in an
//! unbounded FIFO queue; whenever a slot frees, the next queued task starts.
//! Admission and release happen under one lock, so a release that triggers a
//! drain from inside a completion path can neither miss a queued task nor
//! start one twice.

mod guard;

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;

use crate::transfer::{FetchRequest, Fetcher, ProgressObserver, ProgressUpdate, TransferError};

use self::guard::SlotGuard;

type Reply = oneshot::Sender<Result<u64, TransferError>>;

struct Queued {
    request: FetchRequest,
    reply: Reply,
}

#[derive(Default)]
struct PoolState {
    active: usize,
    queue: VecDeque<Queued>,
    /// Latest update per in-flight destination.
    progress: HashMap<PathBuf, ProgressUpdate>,
}

struct Inner {
    size: usize,
    fetcher: Arc<dyn Fetcher>,
    observer: Arc<dyn ProgressObserver>,
    state: Mutex<PoolState>,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start queued tasks while capacity allows.
    fn drain(self: &Arc<Self>) {
        let ready: Vec<Queued> = {
            let mut state = self.lock_state();
            let mut ready = Vec::new();
            while state.active < self.size {
                let Some(task) = state.queue.pop_front() else {
                    break;
                };
                state.active += 1;
                ready.push(task);
            }
            ready
        };
        for task in ready {
            self.start(task);
        }
    }

    fn start(self: &Arc<Self>, task: Queued) {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let Queued { request, reply } = task;
            let destination = request.destination.clone();
            let result = {
                // Released on drop, including when the fetch panics; the
                // slot is free again before the submitter sees the result.
                let _slot = SlotGuard::new(Arc::clone(&inner), destination.clone());
                let tracker: Arc<dyn ProgressObserver> = Arc::new(Tracker {
                    inner: Arc::clone(&inner),
                });
                tracing::debug!(url = %request.url, dest = %destination.display(), "transfer started");
                inner.fetcher.fetch(request, tracker).await
            };
            let _ = reply.send(result);
        });
    }

    /// Free one slot and forget the task's progress.
    fn release(self: &Arc<Self>, destination: &Path) {
        {
            let mut state = self.lock_state();
            state.active = state.active.saturating_sub(1);
            state.progress.remove(destination);
        }
        self.drain();
    }
}

/// Records progress for snapshots and forwards it to the pool's observer.
struct Tracker {
    inner: Arc<Inner>,
}

impl ProgressObserver for Tracker {
    fn on_progress(&self, update: &ProgressUpdate) {
        self.inner
            .lock_state()
            .progress
            .insert(update.destination.clone(), update.clone());
        self.inner.observer.on_progress(update);
    }
}

/// Shared handle to the pool. Clones refer to the same queue and counters.
#[derive(Clone)]
pub struct TransferPool {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for TransferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferPool")
            .field("size", &self.inner.size)
            .field("active", &self.active())
            .field("queued", &self.queued())
            .finish()
    }
}

impl TransferPool {
    /// Create a pool running at most `size` fetches at once (minimum 1).
    pub fn new(
        size: usize,
        fetcher: Arc<dyn Fetcher>,
        observer: Arc<dyn ProgressObserver>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                size: size.max(1),
                fetcher,
                observer,
                state: Mutex::new(PoolState::default()),
            }),
        }
    }

    /// Queue a fetch. The task is enqueued before this returns, so tasks start
    /// in call order; the returned future resolves when the fetch finishes.
    /// Dropping the future does not cancel the fetch.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(
        &self,
        request: FetchRequest,
    ) -> impl Future<Output = Result<u64, TransferError>> + Send + 'static {
        let (reply, rx) = oneshot::channel();
        self.inner
            .lock_state()
            .queue
            .push_back(Queued { request, reply });
        self.inner.drain();
        async move {
            rx.await
                .unwrap_or_else(|_| Err(TransferError::Join("transfer task aborted".to_string())))
        }
    }

    /// Maximum number of concurrent fetches.
    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// Fetches currently running.
    pub fn active(&self) -> usize {
        self.inner.lock_state().active
    }

    /// Fetches waiting for a slot.
    pub fn queued(&self) -> usize {
        self.inner.lock_state().queue.len()
    }

    /// Latest progress of every running fetch.
    pub fn progress_snapshot(&self) -> Vec<ProgressUpdate> {
        self.inner.lock_state().progress.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests;
