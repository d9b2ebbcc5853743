//! Transfer engine: one HTTP(S) GET streamed to a destination file.
//!
//! Uses the curl crate (libcurl) for both schemes, follows redirects in an
//! explicit depth-counted loop, and reports progress through a
//! [`ProgressObserver`]. The blocking transfer runs on tokio's blocking pool.

mod error;
mod head;
mod http;
mod progress;

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::TransferConfig;

pub use error::TransferError;
pub use http::fetch_blocking;
pub use progress::{NoProgress, ProgressObserver, ProgressUpdate};

/// Inputs of one fetch. The destination doubles as the progress key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub destination: PathBuf,
    /// Headers for this fetch only, sent after the engine-wide ones.
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Limits and headers applied to every fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOptions {
    pub max_redirects: u32,
    pub connect_timeout: Duration,
    /// Deadline for the whole fetch, redirects included.
    pub timeout: Duration,
    pub user_agent: String,
    pub headers: Vec<(String, String)>,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self::from(&TransferConfig::default())
    }
}

impl From<&TransferConfig> for TransferOptions {
    fn from(cfg: &TransferConfig) -> Self {
        Self {
            max_redirects: cfg.max_redirects,
            connect_timeout: cfg.connect_timeout(),
            timeout: cfg.timeout(),
            user_agent: cfg.user_agent.clone(),
            headers: cfg
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// Performs fetches for the concurrency pool.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    /// Fetch `request.url` into `request.destination`, returning bytes written.
    async fn fetch(
        &self,
        request: FetchRequest,
        progress: Arc<dyn ProgressObserver>,
    ) -> Result<u64, TransferError>;
}

/// libcurl-backed fetcher.
#[derive(Debug, Clone, Default)]
pub struct CurlFetcher {
    options: TransferOptions,
}

impl CurlFetcher {
    pub fn new(options: TransferOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TransferOptions {
        &self.options
    }
}

#[async_trait]
impl Fetcher for CurlFetcher {
    async fn fetch(
        &self,
        request: FetchRequest,
        progress: Arc<dyn ProgressObserver>,
    ) -> Result<u64, TransferError> {
        let options = self.options.clone();
        tokio::task::spawn_blocking(move || fetch_blocking(&request, &options, progress.as_ref()))
            .await
            .map_err(|e| TransferError::Join(e.to_string()))?
    }
}
