//! SHA-1 / SHA-256 helpers.
//!
//! The service declares SHA-1 for every object; strategies hash what they
//! stream. `sha256_path` backs the `checksum` CLI command.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use sha1::{Digest, Sha1};
use sha2::Sha256;

use crate::dest::DestFile;
use crate::range::ByteRange;

const BUF_SIZE: usize = 64 * 1024;

/// Lowercase hex SHA-1 of `data`.
pub fn sha1_hex(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

fn hash_file<D: Digest>(path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = D::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Compute SHA-1 of a file as lowercase hex.
pub fn sha1_path(path: &Path) -> Result<String> {
    hash_file::<Sha1>(path)
}

/// Compute SHA-256 of a file as lowercase hex.
pub fn sha256_path(path: &Path) -> Result<String> {
    hash_file::<Sha256>(path)
}

/// SHA-1 over `range` of a destination file, read back in offset order.
pub(crate) fn sha1_dest_range(file: &dyn DestFile, range: ByteRange) -> std::io::Result<String> {
    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; BUF_SIZE];
    let mut offset = range.start;
    let mut remaining = range.len();
    while remaining > 0 {
        let want = (remaining as usize).min(buf.len());
        let n = file.read_at(offset, &mut buf[..want])?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("destination ended at offset {} inside {}", offset, range),
            ));
        }
        hasher.update(&buf[..n]);
        offset += n as u64;
        remaining -= n as u64;
    }
    Ok(hex::encode(hasher.finalize()))
}
