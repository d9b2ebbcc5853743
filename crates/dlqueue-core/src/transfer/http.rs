//! Blocking HTTP(S) GET with manual redirect handling, streaming to a file.
//!
//! libcurl's own redirect following is disabled so every hop is counted and
//! redirect bodies never reach the destination file.

use std::cell::RefCell;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use url::Url;

use super::error::TransferError;
use super::head::{is_redirect, ResponseHead};
use super::progress::{ProgressObserver, ProgressUpdate};
use super::{FetchRequest, TransferOptions};

/// Outcome of one request in the redirect chain.
enum Hop {
    Done(u64),
    Redirect(String),
}

/// Fetches `request.url` into `request.destination`, following redirects up to
/// `options.max_redirects`. Returns the number of body bytes written.
///
/// Runs in the current thread; call from `spawn_blocking` if used from async code.
pub fn fetch_blocking(
    request: &FetchRequest,
    options: &TransferOptions,
    progress: &dyn ProgressObserver,
) -> Result<u64, TransferError> {
    let deadline = Instant::now() + options.timeout;
    let mut current = parse_target(&request.url)?;
    let mut hops = 0u32;

    loop {
        match fetch_once(&current, request, deadline, options, progress)? {
            Hop::Done(bytes) => return Ok(bytes),
            Hop::Redirect(location) => {
                if hops >= options.max_redirects {
                    return Err(TransferError::TooManyRedirects {
                        limit: options.max_redirects,
                    });
                }
                hops += 1;
                let next = current
                    .join(&location)
                    .map_err(|_| TransferError::InvalidUrl(location.clone()))?;
                check_scheme(&next)?;
                tracing::debug!(from = %current, to = %next, hop = hops, "following redirect");
                current = next;
            }
        }
    }
}

fn parse_target(raw: &str) -> Result<Url, TransferError> {
    let url = Url::parse(raw.trim()).map_err(|_| TransferError::InvalidUrl(raw.to_string()))?;
    check_scheme(&url)?;
    Ok(url)
}

fn check_scheme(url: &Url) -> Result<(), TransferError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(TransferError::UnsupportedScheme(other.to_string())),
    }
}

fn fetch_once(
    url: &Url,
    request: &FetchRequest,
    deadline: Instant,
    options: &TransferOptions,
    progress: &dyn ProgressObserver,
) -> Result<Hop, TransferError> {
    let remaining = deadline
        .checked_duration_since(Instant::now())
        .filter(|d| !d.is_zero())
        .ok_or(TransferError::Timeout)?;

    let mut easy = curl::easy::Easy::new();
    easy.url(url.as_str())?;
    easy.get(true)?;
    easy.follow_location(false)?;
    easy.connect_timeout(options.connect_timeout.min(remaining))?;
    // Abort if throughput stays below 1 KiB/s for a minute, independent of the deadline.
    easy.low_speed_limit(1024)?;
    easy.low_speed_time(Duration::from_secs(60))?;
    easy.timeout(remaining)?;
    if !options.user_agent.is_empty() {
        easy.useragent(&options.user_agent)?;
    }
    let headers: Vec<_> = options.headers.iter().chain(&request.headers).collect();
    if !headers.is_empty() {
        let mut list = curl::easy::List::new();
        for (k, v) in headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        easy.http_headers(list)?;
    }

    let head = RefCell::new(ResponseHead::default());
    let sink = RefCell::new(BodySink::new(&request.destination, progress));

    let performed = {
        let mut transfer = easy.transfer();
        transfer.header_function(|line| {
            head.borrow_mut().feed(line);
            true
        })?;
        transfer.write_function(|data| {
            let (status, total) = {
                let h = head.borrow();
                (h.status, h.content_length)
            };
            if status != Some(200) {
                // Redirect and error bodies are drained and discarded.
                return Ok(data.len());
            }
            if sink.borrow_mut().accept(data, total) {
                Ok(data.len())
            } else {
                Ok(0) // short write aborts the transfer
            }
        })?;
        transfer.perform()
    };

    let mut sink = sink.into_inner();
    if let Err(e) = performed {
        if let Some(io_err) = sink.error.take() {
            return Err(TransferError::Io(io_err));
        }
        return Err(TransferError::from(e));
    }

    let code = easy.response_code()?;
    let head = head.into_inner();
    if is_redirect(code) {
        if let Some(location) = head.location {
            return Ok(Hop::Redirect(location));
        }
    }
    if code != 200 {
        return Err(TransferError::UnexpectedStatus { code });
    }

    Ok(Hop::Done(sink.finish()?))
}

/// Destination file, opened on the first body chunk of a 200 response.
struct BodySink<'a> {
    destination: &'a Path,
    progress: &'a dyn ProgressObserver,
    file: Option<BufWriter<File>>,
    written: u64,
    error: Option<std::io::Error>,
}

impl<'a> BodySink<'a> {
    fn new(destination: &'a Path, progress: &'a dyn ProgressObserver) -> Self {
        Self {
            destination,
            progress,
            file: None,
            written: 0,
            error: None,
        }
    }

    /// Writes one chunk and reports progress. On failure the error is kept for
    /// the caller and `false` is returned.
    fn accept(&mut self, data: &[u8], total_size: Option<u64>) -> bool {
        match self.write_chunk(data) {
            Ok(()) => {
                self.progress.on_progress(&ProgressUpdate {
                    destination: self.destination.to_path_buf(),
                    bytes_downloaded: self.written,
                    total_size,
                });
                true
            }
            Err(e) => {
                tracing::warn!(path = %self.destination.display(), "write failed: {}", e);
                self.error = Some(e);
                false
            }
        }
    }

    fn write_chunk(&mut self, data: &[u8]) -> std::io::Result<()> {
        if self.file.is_none() {
            self.file = Some(BufWriter::new(File::create(self.destination)?));
        }
        if let Some(file) = self.file.as_mut() {
            file.write_all(data)?;
        }
        self.written += data.len() as u64;
        Ok(())
    }

    /// Flushes, syncs, and closes the file. An empty 200 body still creates it.
    fn finish(self) -> std::io::Result<u64> {
        let writer = match self.file {
            Some(w) => w,
            None => BufWriter::new(File::create(self.destination)?),
        };
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(self.written)
    }
}
