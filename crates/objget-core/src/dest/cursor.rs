//! Seek-then-write view over a positional [`DestFile`].

use std::io::{self, Write};

use super::DestFile;

/// Sequential writer with its own cursor. Used by single-stream transfers;
/// concurrent writers call [`DestFile::write_at`] directly instead.
pub struct FileCursor<'a> {
    file: &'a dyn DestFile,
    pos: u64,
}

impl<'a> FileCursor<'a> {
    pub fn new(file: &'a dyn DestFile) -> Self {
        Self { file, pos: 0 }
    }

    /// Moves the cursor to absolute object offset `offset`.
    pub fn seek(&mut self, offset: u64) {
        self.pos = offset;
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn file(&self) -> &'a dyn DestFile {
        self.file
    }
}

impl Write for FileCursor<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_at(self.pos, buf)?;
        self.pos += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dest::{BytesDest, DownloadDest, FileSpec};
    use std::collections::BTreeMap;

    #[test]
    fn cursor_writes_sequentially_from_seek_point() {
        let info = BTreeMap::new();
        let spec = FileSpec {
            file_id: "id",
            file_name: "n",
            content_length: 8,
            content_type: "b",
            content_sha1: "none",
            file_info: &info,
            mod_time_millis: 0,
            range: None,
        };
        let dest = BytesDest::new();
        let file = dest.make_file(&spec).unwrap();
        {
            let mut cursor = FileCursor::new(&file);
            cursor.seek(4);
            cursor.write_all(b"ef").unwrap();
            cursor.write_all(b"gh").unwrap();
            assert_eq!(cursor.position(), 8);
            cursor.seek(0);
            cursor.write_all(b"abcd").unwrap();
        }
        file.finish().unwrap();
        assert_eq!(dest.bytes().unwrap(), b"abcdefgh");
    }
}
