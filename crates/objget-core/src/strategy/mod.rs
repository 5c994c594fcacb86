//! Window transfer strategies.
//!
//! A strategy pulls the bytes of one window into the destination and returns
//! how many bytes it wrote plus their SHA-1. The orchestrator asks a
//! [`StrategyChain`] for the first candidate that claims the window; the chain
//! always ends in the single-stream fallback, so selection cannot come up empty.

mod parallel;
mod simple;

use crate::dest::FileCursor;
use crate::error::TransferError;
use crate::metadata::ObjectMetadata;
use crate::progress::ProgressListener;
use crate::range::ByteRange;
use crate::transport::{Response, Source};

pub use parallel::ParallelDownloader;
pub use simple::SimpleDownloader;

/// Default read buffer: progress granularity vs per-call overhead.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;
/// Default number of concurrent streams for one window.
pub const DEFAULT_MAX_STREAMS: usize = 8;
/// Smallest window worth splitting over several connections.
pub const DEFAULT_MIN_PART_SIZE: u64 = 100 * 1024 * 1024;

/// Bytes written by a strategy for one window and the SHA-1 of those bytes
/// in offset order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub bytes_transferred: u64,
    pub sha1_hex: String,
}

/// Everything a strategy may use for one window attempt.
pub struct WindowContext<'a> {
    /// For strategies that open their own requests.
    pub source: Source<'a>,
    /// Response to the window's ranged GET, headers already validated.
    pub response: Box<dyn Response>,
    pub metadata: &'a ObjectMetadata,
    pub range: ByteRange,
    /// Positioned at `range.start`.
    pub cursor: FileCursor<'a>,
}

/// A registered strategy.
#[derive(Debug, Clone)]
pub enum Strategy {
    Parallel(ParallelDownloader),
    Simple(SimpleDownloader),
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Parallel(_) => "parallel",
            Strategy::Simple(_) => "simple",
        }
    }

    pub fn is_suitable(&self, metadata: &ObjectMetadata, progress: &dyn ProgressListener) -> bool {
        match self {
            Strategy::Parallel(p) => p.is_suitable(metadata, progress),
            Strategy::Simple(s) => s.is_suitable(metadata, progress),
        }
    }

    pub fn download(&self, ctx: WindowContext<'_>) -> Result<TransferOutcome, TransferError> {
        match self {
            Strategy::Simple(s) => s.download(ctx.response, ctx.cursor, ctx.range),
            Strategy::Parallel(p) => {
                // Workers open their own connections; release this one first.
                drop(ctx.response);
                p.download(ctx.source, ctx.cursor.file(), ctx.range)
            }
        }
    }
}

/// Ordered candidates terminated by a universal fallback.
#[derive(Debug, Clone)]
pub struct StrategyChain {
    candidates: Vec<Strategy>,
    fallback: Strategy,
}

impl StrategyChain {
    pub fn new(candidates: Vec<Strategy>, fallback: SimpleDownloader) -> Self {
        Self {
            candidates,
            fallback: Strategy::Simple(fallback),
        }
    }

    /// Multi-stream first, single-stream fallback.
    pub fn standard(chunk_size: usize, max_streams: usize, min_part_size: u64) -> Self {
        Self::new(
            vec![Strategy::Parallel(ParallelDownloader::new(
                chunk_size,
                max_streams,
                min_part_size,
            ))],
            SimpleDownloader::new(chunk_size),
        )
    }

    /// First strategy suitable for this window.
    pub fn select(&self, metadata: &ObjectMetadata, progress: &dyn ProgressListener) -> &Strategy {
        self.candidates
            .iter()
            .find(|s| s.is_suitable(metadata, progress))
            .unwrap_or(&self.fallback)
    }
}

impl Default for StrategyChain {
    fn default() -> Self {
        Self::standard(DEFAULT_CHUNK_SIZE, DEFAULT_MAX_STREAMS, DEFAULT_MIN_PART_SIZE)
    }
}
