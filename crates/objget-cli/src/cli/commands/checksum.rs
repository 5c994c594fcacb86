//! Checksum command: SHA-1 (what the service declares) or SHA-256 of a file.

use anyhow::Result;
use objget_core::checksum;
use std::path::Path;

/// Compute and print the digest of the given file.
pub fn run_checksum(path: &Path, sha256: bool) -> Result<()> {
    let digest = if sha256 {
        checksum::sha256_path(path)?
    } else {
        checksum::sha1_path(path)?
    };
    println!("{}  {}", digest, path.display());
    Ok(())
}
