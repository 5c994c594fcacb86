//! In-memory destination.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{relative_offset, DestFile, DownloadDest, FileSpec};

/// Collects the downloaded bytes in memory. The bytes become visible through
/// [`BytesDest::bytes`] only after the transfer finishes successfully.
#[derive(Debug, Clone, Default)]
pub struct BytesDest {
    finished: Arc<Mutex<Option<Vec<u8>>>>,
}

impl BytesDest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of the last successfully finished transfer.
    pub fn bytes(&self) -> Option<Vec<u8>> {
        lock(&self.finished).clone()
    }
}

impl DownloadDest for BytesDest {
    type File = BytesFile;

    fn make_file(&self, spec: &FileSpec<'_>) -> io::Result<BytesFile> {
        let len = usize::try_from(spec.content_length).map_err(|_| {
            io::Error::new(
                io::ErrorKind::OutOfMemory,
                format!("{} bytes do not fit in memory", spec.content_length),
            )
        })?;
        Ok(BytesFile {
            buf: Mutex::new(vec![0u8; len]),
            base: spec.base_offset(),
            sink: Arc::clone(&self.finished),
        })
    }
}

/// Open in-memory file. Dropped without `finish`, its bytes are discarded.
#[derive(Debug)]
pub struct BytesFile {
    buf: Mutex<Vec<u8>>,
    base: u64,
    sink: Arc<Mutex<Option<Vec<u8>>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DestFile for BytesFile {
    fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        let start = relative_offset(self.base, offset)? as usize;
        let end = start + data.len();
        let mut buf = lock(&self.buf);
        if end > buf.len() {
            buf.resize(end, 0);
        }
        buf[start..end].copy_from_slice(data);
        Ok(())
    }

    fn read_at(&self, offset: u64, out: &mut [u8]) -> io::Result<usize> {
        let start = relative_offset(self.base, offset)? as usize;
        let buf = lock(&self.buf);
        if start >= buf.len() {
            return Ok(0);
        }
        let n = out.len().min(buf.len() - start);
        out[..n].copy_from_slice(&buf[start..start + n]);
        Ok(n)
    }

    fn finish(self) -> io::Result<()> {
        let bytes = self.buf.into_inner().unwrap_or_else(PoisonError::into_inner);
        *lock(&self.sink) = Some(bytes);
        Ok(())
    }
}
