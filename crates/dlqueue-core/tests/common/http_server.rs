//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a fixed route table: bodies with or without `Content-Length`,
//! redirects, error statuses, responses that fail a few times before
//! succeeding, responses that stall mid-body, and an echo of the request
//! head. Unknown paths get 404.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug)]
pub enum Route {
    /// 200 with `Content-Length`.
    Body(Vec<u8>),
    /// 200 without `Content-Length`; the body ends when the connection closes.
    Unsized(Vec<u8>),
    /// Redirect with the given status and `Location` value.
    Redirect { status: u16, location: String },
    /// Fixed status with a short text body.
    Status(u16),
    /// 503 for the first `failures` requests, then `body`.
    Flaky { failures: AtomicU32, body: Vec<u8> },
    /// Sends headers and part of the body, then goes silent for `pause`.
    Stall { pause: Duration },
    /// 200 whose body is the raw request head, for asserting sent headers.
    Echo,
}

impl Route {
    pub fn flaky(failures: u32, body: Vec<u8>) -> Self {
        Route::Flaky {
            failures: AtomicU32::new(failures),
            body,
        }
    }

    pub fn redirect(status: u16, location: &str) -> Self {
        Route::Redirect {
            status,
            location: location.to_string(),
        }
    }
}

/// Starts a server on a background thread. Returns the base URL without a
/// trailing slash (e.g. "http://127.0.0.1:12345"). Runs until the process exits.
pub fn start(routes: Vec<(&str, Route)>) -> String {
    let table: HashMap<String, Route> = routes
        .into_iter()
        .map(|(path, route)| (path.to_string(), route))
        .collect();
    let table = Arc::new(table);

    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let table = Arc::clone(&table);
            thread::spawn(move || handle(stream, &table));
        }
    });
    format!("http://127.0.0.1:{}", port)
}

fn handle(mut stream: TcpStream, table: &HashMap<String, Route>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let path = request_path(request);

    match table.get(path) {
        Some(Route::Body(body)) => send(&mut stream, "200 OK", &[], body),
        Some(Route::Unsized(body)) => {
            let _ = stream.write_all(b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n");
            let _ = stream.write_all(body);
        }
        Some(Route::Redirect { status, location }) => {
            let line = format!("{} {}", status, reason(*status));
            let header = format!("Location: {}", location);
            send(&mut stream, &line, &[header.as_str()], b"moved\n");
        }
        Some(Route::Status(status)) => {
            let line = format!("{} {}", status, reason(*status));
            send(&mut stream, &line, &[], b"error page\n");
        }
        Some(Route::Flaky { failures, body }) => {
            let failing = failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                send(&mut stream, "503 Service Unavailable", &[], b"busy\n");
            } else {
                send(&mut stream, "200 OK", &[], body);
            }
        }
        Some(Route::Stall { pause }) => {
            let _ = stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\n");
            let _ = stream.write_all(&[b'x'; 10]);
            let _ = stream.flush();
            thread::sleep(*pause);
        }
        Some(Route::Echo) => {
            let head = request.split("\r\n\r\n").next().unwrap_or(request);
            send(&mut stream, "200 OK", &[], head.as_bytes());
        }
        None => send(&mut stream, "404 Not Found", &[], b"not found\n"),
    }
}

fn send(stream: &mut TcpStream, status_line: &str, headers: &[&str], body: &[u8]) {
    let mut response = format!("HTTP/1.1 {}\r\nContent-Length: {}\r\n", status_line, body.len());
    for h in headers {
        response.push_str(h);
        response.push_str("\r\n");
    }
    response.push_str("Connection: close\r\n\r\n");
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(body);
}

fn request_path(request: &str) -> &str {
    request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .map(|target| target.split('?').next().unwrap_or(target))
        .unwrap_or("/")
}

fn reason(status: u16) -> &'static str {
    match status {
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}
