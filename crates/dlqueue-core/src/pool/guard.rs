//! RAII guard that returns a pool slot when a transfer task ends.

use std::path::PathBuf;
use std::sync::Arc;

use super::Inner;

/// Releases the slot (and drains the queue) when dropped.
pub(super) struct SlotGuard {
    inner: Arc<Inner>,
    destination: PathBuf,
}

impl SlotGuard {
    pub(super) fn new(inner: Arc<Inner>, destination: PathBuf) -> Self {
        Self { inner, destination }
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.inner.release(&self.destination);
    }
}
