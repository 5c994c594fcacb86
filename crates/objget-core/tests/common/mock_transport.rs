//! Scripted in-memory transport.
//!
//! Serves one object the way the storage service does (Content-Range for
//! ranged GETs, spans clipped to the object) and lets a test inject faults
//! into requests for particular ranges.

use std::io::{self, Read};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use objget_core::checksum::sha1_hex;
use objget_core::metadata::Headers;
use objget_core::range::ByteRange;
use objget_core::transport::{CancelToken, RequestTarget, Response, Transport};
use objget_core::TransferError;

pub const FILE_ID: &str = "4_z27c88f1d182b150646ff0b16_f1004ba650fe24e6b_d20180521_m223312_c002_v0001108_t0014";
pub const FILE_NAME: &str = "photos/kitten.jpg";
pub const UPLOAD_TIMESTAMP: u64 = 1_526_941_992_000;

/// What to do to a matching response.
#[derive(Debug, Clone)]
pub enum Fault {
    /// Flip every bit of the byte at this absolute offset.
    Corrupt(u64),
    /// Close the body cleanly after this many bytes.
    Truncate(usize),
    /// Fail the body read with an I/O error after this many bytes.
    StreamError(usize),
    /// Declare a Content-Range span of this many bytes.
    DeclareLen(u64),
    /// Leave out the Content-Range header.
    OmitContentRange,
    /// Answer with this HTTP status.
    Status(u32),
    /// Hold back the body for this long before the first byte.
    Delay(Duration),
    /// Append this many bytes past the requested span.
    Overrun(usize),
}

#[derive(Debug)]
struct Rule {
    range: Option<ByteRange>,
    fault: Fault,
    remaining: u32,
}

pub struct MockTransport {
    body: Vec<u8>,
    sha1: String,
    file_info: Vec<(String, String)>,
    rules: Mutex<Vec<Rule>>,
    requests: Mutex<Vec<Option<ByteRange>>>,
}

impl MockTransport {
    pub fn new(body: Vec<u8>) -> Self {
        let sha1 = sha1_hex(&body);
        Self {
            body,
            sha1,
            file_info: Vec::new(),
            rules: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Declares `value` instead of the body's real SHA-1.
    pub fn declared_sha1(mut self, value: &str) -> Self {
        self.sha1 = value.to_string();
        self
    }

    pub fn file_info(mut self, key: &str, value: &str) -> Self {
        self.file_info.push((key.to_string(), value.to_string()));
        self
    }

    /// Applies `fault` to the next `times` requests for exactly `range`.
    pub fn fault(self, range: Option<ByteRange>, fault: Fault, times: u32) -> Self {
        self.rules.lock().unwrap().push(Rule {
            range,
            fault,
            remaining: times,
        });
        self
    }

    /// Ranges requested so far, in arrival order.
    pub fn requests(&self) -> Vec<Option<ByteRange>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests_for(&self, range: ByteRange) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| **r == Some(range))
            .count()
    }

    fn take_faults(&self, range: Option<ByteRange>) -> Vec<Fault> {
        let mut rules = self.rules.lock().unwrap();
        let mut out = Vec::new();
        for rule in rules.iter_mut() {
            if rule.range == range && rule.remaining > 0 {
                rule.remaining -= 1;
                out.push(rule.fault.clone());
            }
        }
        out
    }
}

impl Transport for MockTransport {
    fn get(
        &self,
        target: &RequestTarget,
        range: Option<ByteRange>,
        cancel: &CancelToken,
    ) -> Result<Box<dyn Response>, TransferError> {
        self.requests.lock().unwrap().push(range);
        let faults = self.take_faults(range);
        let total = self.body.len() as u64;

        let mut headers = Headers::new();
        headers.insert("Content-Type", "image/jpeg");
        headers.insert("x-bz-file-id", FILE_ID);
        headers.insert("x-bz-file-name", FILE_NAME);
        headers.insert("x-bz-content-sha1", self.sha1.as_str());
        headers.insert("x-bz-upload-timestamp", UPLOAD_TIMESTAMP.to_string());
        for (k, v) in &self.file_info {
            headers.insert(format!("x-bz-info-{}", k), v.as_str());
        }

        let (start, mut data, mut declared) = match range {
            None => (0, self.body.clone(), None),
            Some(r) => {
                if r.start >= total {
                    return Err(TransferError::Http {
                        status: 416,
                        url: target.url.clone(),
                    });
                }
                let end = r.end.min(total - 1);
                let data = self.body[r.start as usize..=end as usize].to_vec();
                (r.start, data, Some((r.start, end)))
            }
        };

        let mut truncate_at = None;
        let mut error_at = None;
        let mut delay = None;
        for fault in &faults {
            match fault {
                Fault::Corrupt(offset) => {
                    if let Some(b) = offset
                        .checked_sub(start)
                        .and_then(|i| data.get_mut(i as usize))
                    {
                        *b = !*b;
                    }
                }
                Fault::Truncate(n) => truncate_at = Some(*n),
                Fault::StreamError(n) => error_at = Some(*n),
                Fault::DeclareLen(n) => {
                    declared = Some((start, start + n - 1));
                }
                Fault::OmitContentRange => declared = None,
                Fault::Status(status) => {
                    return Err(TransferError::Http {
                        status: *status,
                        url: target.url.clone(),
                    })
                }
                Fault::Delay(d) => delay = Some(*d),
                Fault::Overrun(n) => data.extend((0..*n).map(|i| i as u8 ^ 0x5a)),
            }
        }

        let (content_length, status) = match declared {
            Some((s, e)) => {
                headers.insert("Content-Range", format!("bytes {}-{}/{}", s, e, total));
                (e - s + 1, 206)
            }
            None => (data.len() as u64, if range.is_some() { 206 } else { 200 }),
        };
        headers.insert("Content-Length", content_length.to_string());

        if let Some(n) = truncate_at {
            data.truncate(n);
        }
        Ok(Box::new(MockResponse {
            status,
            headers,
            data,
            pos: 0,
            error_at,
            delay,
            cancel: cancel.clone(),
        }))
    }
}

struct MockResponse {
    status: u32,
    headers: Headers,
    data: Vec<u8>,
    pos: usize,
    error_at: Option<usize>,
    delay: Option<Duration>,
    cancel: CancelToken,
}

impl MockResponse {
    fn aborted() -> io::Error {
        io::Error::new(io::ErrorKind::ConnectionAborted, "request cancelled")
    }
}

impl Read for MockResponse {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // Stalls like a silent server, but a cancelled request wakes up.
        if let Some(d) = self.delay.take() {
            let until = Instant::now() + d;
            while Instant::now() < until {
                if self.cancel.is_cancelled() {
                    return Err(Self::aborted());
                }
                thread::sleep(Duration::from_millis(5));
            }
        }
        if self.cancel.is_cancelled() {
            return Err(Self::aborted());
        }
        let limit = self.error_at.unwrap_or(usize::MAX).min(self.data.len());
        if self.pos >= limit {
            if self.error_at.is_some() && self.pos < self.data.len() {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"));
            }
            return Ok(0);
        }
        // Small reads so chunk boundaries do not line up with windows.
        let n = buf.len().min(limit - self.pos).min(13);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Response for MockResponse {
    fn status(&self) -> u32 {
        self.status
    }

    fn headers(&self) -> &Headers {
        &self.headers
    }
}
