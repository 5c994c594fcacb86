//! Local file destination.
//!
//! Bytes go to `<path>.part` (preallocated), which is synced, stamped with the
//! object's modification time and atomically renamed into place on `finish`.
//! A file dropped without `finish` removes its `.part`.

mod builder;
mod writer;

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use super::{relative_offset, DestFile, DownloadDest, FileSpec};

pub use builder::StorageWriterBuilder;
pub use writer::StorageWriter;

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the partial file: appends `.part` (e.g. `file.iso` → `file.iso.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Downloads into a file on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFileDest {
    path: PathBuf,
}

impl LocalFileDest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DownloadDest for LocalFileDest {
    type File = LocalFile;

    fn make_file(&self, spec: &FileSpec<'_>) -> io::Result<LocalFile> {
        let tp = temp_path(&self.path);
        let mut builder = StorageWriterBuilder::create(&tp)?;
        builder.preallocate(spec.content_length)?;
        tracing::debug!(
            path = %tp.display(),
            size = spec.content_length,
            file_name = spec.file_name,
            "opened partial file"
        );
        Ok(LocalFile {
            writer: Some(builder.build()),
            final_path: self.path.clone(),
            base: spec.base_offset(),
            mod_time: SystemTime::UNIX_EPOCH + Duration::from_millis(spec.mod_time_millis),
        })
    }
}

/// Open partial file of a [`LocalFileDest`].
pub struct LocalFile {
    writer: Option<StorageWriter>,
    final_path: PathBuf,
    base: u64,
    mod_time: SystemTime,
}

impl LocalFile {
    fn writer(&self) -> io::Result<&StorageWriter> {
        self.writer
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "file already finished"))
    }
}

impl DestFile for LocalFile {
    fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        self.writer()?
            .write_at(relative_offset(self.base, offset)?, data)
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.writer()?
            .read_at(relative_offset(self.base, offset)?, buf)
    }

    fn finish(mut self) -> io::Result<()> {
        let writer = match self.writer.take() {
            Some(w) => w,
            None => return Ok(()),
        };
        writer.sync()?;
        writer.set_modified(self.mod_time)?;
        writer.finalize(&self.final_path)?;
        tracing::debug!(path = %self.final_path.display(), "download finalized");
        Ok(())
    }
}

impl Drop for LocalFile {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            let tp = writer.temp_path().to_path_buf();
            drop(writer);
            if let Err(e) = std::fs::remove_file(&tp) {
                tracing::warn!(path = %tp.display(), "failed to remove partial file: {}", e);
            } else {
                tracing::debug!(path = %tp.display(), "removed partial file");
            }
        }
    }
}
