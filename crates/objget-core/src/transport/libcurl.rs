//! libcurl-backed transport.
//!
//! Each request runs a blocking `curl::easy` transfer on its own thread. The
//! header block is handed back once the first body bytes (or the end of the
//! transfer) arrive; body chunks follow through a bounded channel so a slow
//! consumer applies back-pressure. When the consumer drops the response, the
//! next write callback returns 0 and curl aborts the connection. A cancelled
//! [`CancelToken`] aborts through the progress callback, which curl also
//! invokes while the connection is idle.

use std::cell::RefCell;
use std::io::{self, Read};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::TransferError;
use crate::metadata::Headers;
use crate::range::ByteRange;

use super::{check_status, CancelToken, RequestTarget, Response, Transport};

/// Body chunks buffered between the curl thread and the reader.
const BODY_QUEUE_DEPTH: usize = 16;

/// Per-handle libcurl settings.
#[derive(Debug, Clone, Copy)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Abort if throughput stays below this many bytes/s for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    /// Hard wall-clock cap so a completely stuck transfer eventually fails.
    pub timeout: Duration,
    /// Optional receive cap in bytes/s.
    pub max_recv_speed: Option<u64>,
    /// Optional libcurl receive buffer size.
    pub buffer_size: Option<usize>,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            timeout: Duration::from_secs(3600),
            max_recv_speed: None,
            buffer_size: None,
        }
    }
}

/// [`Transport`] over libcurl easy handles.
#[derive(Debug, Clone, Default)]
pub struct CurlTransport {
    options: CurlOptions,
}

impl CurlTransport {
    pub fn new(options: CurlOptions) -> Self {
        Self { options }
    }

    fn configure(
        &self,
        target: &RequestTarget,
        range: Option<ByteRange>,
    ) -> Result<curl::easy::Easy, curl::Error> {
        let opts = self.options;
        let mut easy = curl::easy::Easy::new();
        easy.url(&target.url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        if let Some(speed) = opts.max_recv_speed {
            easy.max_recv_speed(speed)?;
        }
        if let Some(sz) = opts.buffer_size {
            easy.buffer_size(sz)?;
        }
        easy.connect_timeout(opts.connect_timeout)?;
        easy.low_speed_limit(opts.low_speed_limit)?;
        easy.low_speed_time(opts.low_speed_time)?;
        easy.timeout(opts.timeout)?;
        easy.progress(true)?;
        // curl wants "start-end" here, not "bytes=start-end".
        if let Some(r) = range {
            easy.range(&format!("{}-{}", r.start, r.end))?;
        }
        if !target.headers.is_empty() {
            let mut list = curl::easy::List::new();
            for (k, v) in &target.headers {
                list.append(&format!("{}: {}", k.trim(), v.trim()))?;
            }
            easy.http_headers(list)?;
        }
        Ok(easy)
    }
}

impl Transport for CurlTransport {
    fn get(
        &self,
        target: &RequestTarget,
        range: Option<ByteRange>,
        cancel: &CancelToken,
    ) -> Result<Box<dyn Response>, TransferError> {
        let easy = self.configure(target, range)?;
        let (head_tx, head_rx) = mpsc::sync_channel(1);
        let (body_tx, body_rx) = mpsc::sync_channel(BODY_QUEUE_DEPTH);
        let cancel = cancel.clone();
        let worker = thread::Builder::new()
            .name("objget-http".to_string())
            .spawn(move || perform(easy, head_tx, body_tx, cancel))
            .map_err(TransferError::Stream)?;

        match head_rx.recv() {
            Ok((status, headers)) => {
                check_status(status, &target.url)?;
                Ok(Box::new(CurlResponse {
                    status,
                    headers,
                    body: body_rx,
                    pending: Vec::new(),
                    pos: 0,
                    worker: Some(worker),
                }))
            }
            // The worker hung up without producing headers: the transfer failed.
            Err(_) => match worker.join() {
                Ok(Err(e)) => Err(TransferError::Curl(e)),
                Ok(Ok(())) => Err(TransferError::UnexpectedCloudBehaviour(
                    "connection closed before response headers".to_string(),
                )),
                Err(_) => Err(TransferError::Stream(io::Error::new(
                    io::ErrorKind::Other,
                    "http worker panicked",
                ))),
            },
        }
    }
}

/// Header lines of the current response block plus the one-shot sender for them.
struct HeadState {
    lines: Vec<String>,
    tx: Option<SyncSender<(u32, Headers)>>,
}

impl HeadState {
    fn push_line(&mut self, data: &[u8]) {
        let line = String::from_utf8_lossy(data);
        let line = line.trim_end();
        // A new status line starts a new block (redirects, 100-continue).
        if line.starts_with("HTTP/") {
            self.lines.clear();
        }
        if !line.is_empty() {
            self.lines.push(line.to_string());
        }
    }

    fn send(&mut self) {
        if let Some(tx) = self.tx.take() {
            let status = parse_http_status(&self.lines).unwrap_or(0);
            let _ = tx.send((status, Headers::from_lines(&self.lines)));
        }
    }
}

fn perform(
    mut easy: curl::easy::Easy,
    head_tx: SyncSender<(u32, Headers)>,
    body_tx: SyncSender<Vec<u8>>,
    cancel: CancelToken,
) -> Result<(), curl::Error> {
    let head = RefCell::new(HeadState {
        lines: Vec::new(),
        tx: Some(head_tx),
    });
    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            head.borrow_mut().push_line(data);
            true
        })?;
        // Returning false aborts with CURLE_ABORTED_BY_CALLBACK.
        transfer.progress_function(|_, _, _, _| !cancel.is_cancelled())?;
        transfer.write_function(|data| {
            head.borrow_mut().send();
            match body_tx.send(data.to_vec()) {
                Ok(()) => Ok(data.len()),
                // Reader went away: returning 0 makes curl abort the transfer.
                Err(_) => Ok(0),
            }
        })?;
        transfer.perform()?;
    }
    // Bodyless responses never hit the write callback.
    head.borrow_mut().send();
    Ok(())
}

/// Status code from the `HTTP/x y reason` line, if present.
pub(crate) fn parse_http_status(lines: &[String]) -> Option<u32> {
    lines
        .iter()
        .find(|l| l.starts_with("HTTP/"))
        .and_then(|l| l.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
}

struct CurlResponse {
    status: u32,
    headers: Headers,
    body: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    pos: usize,
    worker: Option<JoinHandle<Result<(), curl::Error>>>,
}

impl CurlResponse {
    /// Called once the body channel closes: surfaces the transfer's outcome.
    fn finish(&mut self) -> io::Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        match worker.join() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(io::Error::new(io::ErrorKind::Other, e)),
            Err(_) => Err(io::Error::new(io::ErrorKind::Other, "http worker panicked")),
        }
    }
}

impl Read for CurlResponse {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pos >= self.pending.len() {
            match self.body.recv() {
                Ok(chunk) => {
                    self.pending = chunk;
                    self.pos = 0;
                }
                Err(_) => return self.finish().map(|()| 0),
            }
        }
        let n = buf.len().min(self.pending.len() - self.pos);
        buf[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Response for CurlResponse {
    fn status(&self) -> u32 {
        self.status
    }

    fn headers(&self) -> &Headers {
        &self.headers
    }
}
