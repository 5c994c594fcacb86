//! Single-stream strategy: read the window's response body and write it
//! sequentially at the cursor.

use std::io::{self, Read, Write};

use sha1::{Digest, Sha1};

use crate::dest::FileCursor;
use crate::error::TransferError;
use crate::metadata::ObjectMetadata;
use crate::progress::ProgressListener;
use crate::range::ByteRange;
use crate::transport::Response;

use super::TransferOutcome;

/// Always suitable; the chain's fallback.
#[derive(Debug, Clone)]
pub struct SimpleDownloader {
    chunk_size: usize,
}

impl SimpleDownloader {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn is_suitable(&self, _metadata: &ObjectMetadata, _progress: &dyn ProgressListener) -> bool {
        true
    }

    /// Copies the body to the cursor. A body longer than `range` fails before
    /// any byte past the range's end is written.
    pub fn download(
        &self,
        mut response: Box<dyn Response>,
        mut cursor: FileCursor<'_>,
        range: ByteRange,
    ) -> Result<TransferOutcome, TransferError> {
        let mut digest = Sha1::new();
        let mut buf = vec![0u8; self.chunk_size];
        let mut bytes_read = 0u64;
        loop {
            let n = match response.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransferError::Stream(e)),
            };
            if bytes_read + n as u64 > range.len() {
                return Err(TransferError::TruncatedOutput {
                    expected: range.len(),
                    received: bytes_read + n as u64,
                });
            }
            cursor
                .write_all(&buf[..n])
                .map_err(TransferError::Storage)?;
            digest.update(&buf[..n]);
            bytes_read += n as u64;
        }
        Ok(TransferOutcome {
            bytes_transferred: bytes_read,
            sha1_hex: hex::encode(digest.finalize()),
        })
    }
}
