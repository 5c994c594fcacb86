//! Byte-range math: windows over an object and sub-ranges inside a window.
//!
//! Ranges are inclusive on both ends, matching the HTTP `Range` header.

use std::fmt;
use std::str::FromStr;

/// Inclusive byte range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    /// First byte offset.
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end, "byte range start {} > end {}", start, end);
        Self { start, end }
    }

    /// Range covering the first `len` bytes starting at `start`. `None` for
    /// `len == 0` or when the range would run past `u64::MAX`.
    pub fn with_len(start: u64, len: u64) -> Option<Self> {
        let last = len.checked_sub(1)?;
        Some(Self::new(start, start.checked_add(last)?))
    }

    /// Number of bytes, or `None` for the one span whose length does not fit
    /// in a `u64` (`0-18446744073709551615`).
    pub fn checked_len(&self) -> Option<u64> {
        (self.end - self.start).checked_add(1)
    }

    /// Number of bytes the server must return for this range. Saturates for
    /// the full `u64` span; parsed ranges never take that value.
    pub fn len(&self) -> u64 {
        self.checked_len().unwrap_or(u64::MAX)
    }

    /// HTTP Range header value: `bytes=start-end`.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for ByteRange {
    type Err = String;

    /// Parses `START-END` (inclusive), e.g. `0-999`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (a, b) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("expected START-END, got {:?}", s))?;
        let start = a
            .trim()
            .parse::<u64>()
            .map_err(|e| format!("bad range start {:?}: {}", a, e))?;
        let end = b
            .trim()
            .parse::<u64>()
            .map_err(|e| format!("bad range end {:?}: {}", b, e))?;
        if start > end {
            return Err(format!("range start {} is past end {}", start, end));
        }
        let range = ByteRange { start, end };
        if range.checked_len().is_none() {
            return Err(format!("range {} is longer than 2^64-1 bytes", range));
        }
        Ok(range)
    }
}

/// One fixed-size window of an object transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Zero-based window number within the transfer.
    pub index: u64,
    /// Absolute byte range of the window.
    pub range: ByteRange,
}

/// Iterator over consecutive windows of `window_size` bytes covering a span.
#[derive(Debug, Clone)]
pub struct Windows {
    span: Option<ByteRange>,
    window_size: u64,
    next_index: u64,
}

/// Splits `span` into windows of `window_size` bytes; the last window is clipped
/// to `span.end`. Yields nothing for an empty span (`None`).
pub fn windows(span: Option<ByteRange>, window_size: u64) -> Windows {
    Windows {
        span,
        window_size: window_size.max(1),
        next_index: 0,
    }
}

impl Iterator for Windows {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        let span = self.span?;
        let offset = self.next_index.checked_mul(self.window_size)?;
        let start = span.start.checked_add(offset)?;
        if start > span.end {
            return None;
        }
        let end = start
            .saturating_add(self.window_size - 1)
            .min(span.end);
        let window = Window {
            index: self.next_index,
            range: ByteRange::new(start, end),
        };
        self.next_index += 1;
        Some(window)
    }
}

/// Splits `range` into at most `count` contiguous sub-ranges of nearly equal size.
///
/// The first `len % count` parts get one extra byte. Never yields empty parts,
/// so fewer than `count` parts come back when the range is shorter than `count`.
pub fn plan_parts(range: ByteRange, count: usize) -> Vec<ByteRange> {
    if count == 0 {
        return Vec::new();
    }
    let total = range.len();
    let count = (count as u64).min(total);
    let base = total / count;
    let remainder = total % count;

    let mut out = Vec::with_capacity(count as usize);
    let mut offset = range.start;
    for i in 0..count {
        let len = base + if i < remainder { 1 } else { 0 };
        out.push(ByteRange::new(offset, offset + len - 1));
        offset += len;
    }
    out
}
