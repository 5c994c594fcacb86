//! Multi-stream strategy: split one window into parts, fetch each part on its
//! own connection and write it at its absolute offset.

use std::io::{self, Read};
use std::thread;

use sha1::{Digest, Sha1};

use crate::checksum::sha1_dest_range;
use crate::dest::DestFile;
use crate::error::TransferError;
use crate::metadata::ObjectMetadata;
use crate::progress::ProgressListener;
use crate::range::{plan_parts, ByteRange};
use crate::transferer::check_range_response;
use crate::transport::{CancelToken, Source};

use super::TransferOutcome;

/// Splits windows of at least `min_part_size` bytes over up to `max_streams`
/// concurrent ranged requests.
#[derive(Debug, Clone)]
pub struct ParallelDownloader {
    chunk_size: usize,
    max_streams: usize,
    min_part_size: u64,
}

/// What one part worker fetched.
#[derive(Debug)]
struct PartOutcome {
    range: ByteRange,
    bytes: u64,
    sha1_hex: String,
}

impl ParallelDownloader {
    pub fn new(chunk_size: usize, max_streams: usize, min_part_size: u64) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            max_streams,
            min_part_size,
        }
    }

    pub fn is_suitable(&self, metadata: &ObjectMetadata, _progress: &dyn ProgressListener) -> bool {
        self.max_streams > 1 && metadata.content_length >= self.min_part_size
    }

    /// Fetches `range` with one worker per planned part. The first failing
    /// worker cancels the rest, aborting their connections even mid-read; its
    /// error is returned. On success the window digest is computed by reading
    /// the range back in offset order.
    pub fn download(
        &self,
        source: Source<'_>,
        file: &dyn DestFile,
        range: ByteRange,
    ) -> Result<TransferOutcome, TransferError> {
        let parts = plan_parts(range, self.max_streams);
        tracing::debug!(window = %range, parts = parts.len(), "multi-stream window");
        let cancel = CancelToken::new();

        let results: Vec<Result<PartOutcome, TransferError>> = thread::scope(|s| {
            let handles: Vec<_> = parts
                .iter()
                .map(|&part| {
                    let cancel = &cancel;
                    let chunk_size = self.chunk_size;
                    s.spawn(move || {
                        let r = download_part(source, file, part, chunk_size, cancel);
                        if r.is_err() {
                            cancel.cancel();
                        }
                        r
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| {
                    h.join().unwrap_or_else(|_| {
                        Err(TransferError::Stream(io::Error::new(
                            io::ErrorKind::Other,
                            "part worker panicked",
                        )))
                    })
                })
                .collect()
        });

        let mut first_cancelled = None;
        let mut bytes_transferred = 0u64;
        for result in results {
            match result {
                Ok(part) => {
                    tracing::debug!(
                        part = %part.range,
                        bytes = part.bytes,
                        sha1 = %part.sha1_hex,
                        "part done"
                    );
                    bytes_transferred += part.bytes;
                }
                Err(TransferError::Cancelled) => first_cancelled = Some(TransferError::Cancelled),
                // A real failure wins over the cancellations it caused.
                Err(e) => return Err(e),
            }
        }
        if let Some(e) = first_cancelled {
            return Err(e);
        }

        let sha1_hex = sha1_dest_range(file, range).map_err(TransferError::Storage)?;
        Ok(TransferOutcome {
            bytes_transferred,
            sha1_hex,
        })
    }
}

fn download_part(
    source: Source<'_>,
    file: &dyn DestFile,
    part: ByteRange,
    chunk_size: usize,
    cancel: &CancelToken,
) -> Result<PartOutcome, TransferError> {
    // Errors caused by a sibling's cancellation are reported as such.
    let cancelled = |e: TransferError| {
        if cancel.is_cancelled() {
            TransferError::Cancelled
        } else {
            e
        }
    };
    if cancel.is_cancelled() {
        return Err(TransferError::Cancelled);
    }
    let mut response = source
        .open_cancellable(Some(part), cancel)
        .map_err(cancelled)?;
    let metadata = ObjectMetadata::from_headers(response.headers())?;
    check_range_response(&metadata, part)?;

    let mut digest = Sha1::new();
    let mut buf = vec![0u8; chunk_size];
    let mut offset = part.start;
    loop {
        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        let n = match response.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(cancelled(TransferError::Stream(e))),
        };
        // Never spill into a neighbouring part.
        if offset - part.start + n as u64 > part.len() {
            return Err(TransferError::TruncatedOutput {
                expected: part.len(),
                received: offset - part.start + n as u64,
            });
        }
        file.write_at(offset, &buf[..n])
            .map_err(TransferError::Storage)?;
        digest.update(&buf[..n]);
        offset += n as u64;
    }
    let bytes = offset - part.start;
    if bytes != part.len() {
        return Err(TransferError::TruncatedOutput {
            expected: part.len(),
            received: bytes,
        });
    }
    Ok(PartOutcome {
        range: part,
        bytes,
        sha1_hex: hex::encode(digest.finalize()),
    })
}
