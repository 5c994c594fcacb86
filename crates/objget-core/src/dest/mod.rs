//! Download destinations.
//!
//! A [`DownloadDest`] opens one [`DestFile`] per object transfer. The file is a
//! scoped resource: dropping it without [`DestFile::finish`] discards whatever
//! was written, so every early return or error releases it.
//!
//! Offsets passed to a `DestFile` are absolute object offsets. When the transfer
//! covers only a sub-range, the destination stores the bytes of that range and
//! maps offsets by subtracting `range.start`.

mod bytes;
mod cursor;
mod local;

use std::collections::BTreeMap;
use std::io;

use crate::metadata::ObjectMetadata;
use crate::range::ByteRange;

pub use bytes::{BytesDest, BytesFile};
pub use cursor::FileCursor;
pub use local::{temp_path, LocalFile, LocalFileDest, TEMP_SUFFIX};

/// What a destination learns about the object before any byte arrives.
#[derive(Debug, Clone, Copy)]
pub struct FileSpec<'a> {
    pub file_id: &'a str,
    pub file_name: &'a str,
    /// Bytes that will be written (the requested span).
    pub content_length: u64,
    pub content_type: &'a str,
    pub content_sha1: &'a str,
    pub file_info: &'a BTreeMap<String, String>,
    pub mod_time_millis: u64,
    pub range: Option<ByteRange>,
}

impl<'a> FileSpec<'a> {
    pub fn new(metadata: &'a ObjectMetadata, mod_time_millis: u64, range: Option<ByteRange>) -> Self {
        Self {
            file_id: &metadata.file_id,
            file_name: &metadata.file_name,
            content_length: metadata.content_length,
            content_type: &metadata.content_type,
            content_sha1: &metadata.content_sha1,
            file_info: &metadata.file_info,
            mod_time_millis,
            range,
        }
    }

    /// Offset subtracted from absolute object offsets.
    pub fn base_offset(&self) -> u64 {
        self.range.map(|r| r.start).unwrap_or(0)
    }
}

/// Factory for per-transfer destination files.
pub trait DownloadDest {
    type File: DestFile;

    fn make_file(&self, spec: &FileSpec<'_>) -> io::Result<Self::File>;
}

/// An open destination. Positional I/O only, so concurrent writers touching
/// disjoint ranges need no shared cursor.
pub trait DestFile: Send + Sync {
    /// Writes all of `data` at absolute object offset `offset`.
    fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()>;

    /// Reads previously written bytes at absolute object offset `offset`.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Commits the file. Not calling this discards it on drop.
    fn finish(self) -> io::Result<()>
    where
        Self: Sized;
}

/// Maps an absolute offset into a destination that starts at `base`.
pub(crate) fn relative_offset(base: u64, offset: u64) -> io::Result<u64> {
    offset.checked_sub(base).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("offset {} precedes destination start {}", offset, base),
        )
    })
}
