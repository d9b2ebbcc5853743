//! Artifact names that stay unique within a tick and on disk.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::url_model::destination_name;

pub(super) struct NameAllocator {
    dir: PathBuf,
    taken: HashSet<String>,
}

impl NameAllocator {
    pub(super) fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            taken: HashSet::new(),
        }
    }

    /// `<millis>_<basename>`, bumping the millisecond prefix past names already
    /// handed out this tick or present in the directory.
    pub(super) async fn allocate(&mut self, unix_millis: i64, url: &str) -> String {
        let mut millis = unix_millis;
        loop {
            let name = destination_name(millis, url);
            let on_disk = tokio::fs::try_exists(self.dir.join(&name))
                .await
                .unwrap_or(false);
            if !on_disk && self.taken.insert(name.clone()) {
                return name;
            }
            millis += 1;
        }
    }
}
