//! Progress reporting.
//!
//! [`ProgressFile`] wraps a destination file so every byte written is reported
//! to a [`ProgressListener`] as a cumulative count.

mod log;
mod stats;

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::dest::DestFile;

pub use log::LogProgress;
pub use stats::ProgressStats;

/// Observer of one transfer's progress. Must tolerate calls from several
/// threads at once (multi-stream windows report from every worker).
pub trait ProgressListener: Send + Sync {
    /// Total bytes the transfer is expected to write.
    fn set_total_bytes(&self, _total: u64) {}

    /// Cumulative bytes written so far. Retried windows are counted again.
    fn bytes_completed(&self, _bytes: u64) {}

    /// Transfer finished (successfully or not).
    fn close(&self) {}
}

/// Listener used when the caller supplies none.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressListener for NoProgress {}

/// Pass-through [`DestFile`] that reports every write to a listener.
pub struct ProgressFile<'a, F> {
    inner: F,
    listener: &'a dyn ProgressListener,
    written: AtomicU64,
}

impl<'a, F: DestFile> ProgressFile<'a, F> {
    pub fn new(inner: F, listener: &'a dyn ProgressListener) -> Self {
        Self {
            inner,
            listener,
            written: AtomicU64::new(0),
        }
    }

    /// Bytes written so far, including bytes rewritten by retried windows.
    pub fn bytes_written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }
}

impl<F: DestFile> DestFile for ProgressFile<'_, F> {
    fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        self.inner.write_at(offset, data)?;
        let total = self.written.fetch_add(data.len() as u64, Ordering::Relaxed) + data.len() as u64;
        self.listener.bytes_completed(total);
        Ok(())
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read_at(offset, buf)
    }

    fn finish(self) -> io::Result<()> {
        self.inner.finish()
    }
}
