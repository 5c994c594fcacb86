//! Minimal HTTP/1.1 server that answers Range GETs the way the storage service does.
//!
//! Serves a single static body with the service's metadata headers
//! (`x-bz-file-id`, `x-bz-content-sha1`, ...). Ranged GETs get 206 with a
//! Content-Range clipped to the body; plain GETs get 200.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use objget_core::checksum::sha1_hex;

pub const UPLOAD_TIMESTAMP: u64 = 1_600_000_000_000;

#[derive(Debug, Clone, Default)]
pub struct RangeServerOptions {
    /// Answer this many requests with 503 before serving normally.
    pub fail_first: usize,
    /// Declare `none` instead of the body's SHA-1.
    pub unverifiable: bool,
    /// Extra `x-bz-info-*` attributes.
    pub file_info: Vec<(String, String)>,
}

/// A running server. It lives until the process exits.
pub struct RangeServer {
    pub url: String,
    hits: Arc<AtomicUsize>,
}

impl RangeServer {
    /// Requests received so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread serving `body`.
pub fn start(body: Vec<u8>) -> RangeServer {
    start_with_options(body, RangeServerOptions::default())
}

pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let opts = Arc::new(opts);
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let opts = Arc::clone(&opts);
            let n = counter.fetch_add(1, Ordering::SeqCst);
            thread::spawn(move || handle(stream, &body, &opts, n));
        }
    });
    RangeServer {
        url: format!("http://127.0.0.1:{}/file/bucket/kitten.jpg", port),
        hits,
    }
}

fn handle(mut stream: std::net::TcpStream, body: &[u8], opts: &RangeServerOptions, n: usize) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let read = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(read) => read,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..read]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, range) = parse_request(request);
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        return;
    }
    if n < opts.fail_first {
        let _ = stream.write_all(b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        return;
    }

    let total = body.len() as u64;
    let mut meta = format!(
        "Content-Type: image/jpeg\r\n\
         x-bz-file-id: 4_zfile\r\n\
         x-bz-file-name: kitten.jpg\r\n\
         x-bz-content-sha1: {}\r\n\
         x-bz-upload-timestamp: {}\r\n",
        if opts.unverifiable {
            "none".to_string()
        } else {
            sha1_hex(body)
        },
        UPLOAD_TIMESTAMP
    );
    for (k, v) in &opts.file_info {
        meta.push_str(&format!("x-bz-info-{}: {}\r\n", k, v));
    }

    let (status, content_range, slice) = match range {
        Some((start, end_incl)) => {
            let end_incl = end_incl.min(total.saturating_sub(1));
            if start >= total || start > end_incl {
                (
                    "416 Range Not Satisfiable",
                    Some(format!("bytes */{}", total)),
                    &body[0..0],
                )
            } else {
                (
                    "206 Partial Content",
                    Some(format!("bytes {}-{}/{}", start, end_incl, total)),
                    &body[start as usize..=end_incl as usize],
                )
            }
        }
        None => ("200 OK", None, body),
    };
    let content_range = content_range
        .map(|v| format!("Content-Range: {}\r\n", v))
        .unwrap_or_default();
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\n{}{}Accept-Ranges: bytes\r\nConnection: close\r\n\r\n",
        status,
        slice.len(),
        content_range,
        meta
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(slice);
}

/// Returns (method, optional (start, end_inclusive) for Range: bytes=X-Y).
fn parse_request(request: &str) -> (&str, Option<(u64, u64)>) {
    let mut method = "";
    let mut range = None;
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if method.is_empty() {
            method = line.split_whitespace().next().unwrap_or("");
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                let value = value.trim();
                if value.to_lowercase().starts_with("bytes=") {
                    let part = value[6..].trim();
                    if let Some((a, b)) = part.split_once('-') {
                        let start = a.trim().parse::<u64>().unwrap_or(0);
                        let end = b.trim();
                        let end_incl = if end.is_empty() {
                            u64::MAX
                        } else {
                            end.parse::<u64>().unwrap_or(0)
                        };
                        range = Some((start, end_incl));
                    }
                }
            }
        }
    }
    (method, range)
}
