use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// A regular file opened for bounded, positioned reads.
///
/// Extractors that only need headers, trailers or a single container box
/// read through this instead of loading the whole file.
#[derive(Debug)]
pub struct Source {
    file: File,
    len: u64,
    path: PathBuf,
}

impl Source {
    /// Fails with a readable reason when `path` is missing, is not a regular
    /// file, or cannot be opened.
    pub fn open(path: &Path) -> Result<Self, String> {
        let meta = std::fs::metadata(path).map_err(|e| format!("cannot stat {}: {e}", path.display()))?;
        if !meta.is_file() {
            return Err(format!("{} is not a regular file", path.display()));
        }
        let file = File::open(path).map_err(|e| format!("cannot open {}: {e}", path.display()))?;
        Ok(Self { file, len: meta.len(), path: path.to_path_buf() })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Up to `limit` bytes starting at `offset`; shorter at end of file.
    pub fn read_at(&mut self, offset: u64, limit: u64) -> Result<Vec<u8>, String> {
        self.read_window(offset, limit)
            .map_err(|e| format!("cannot read {}: {e}", self.path.display()))
    }

    pub fn head(&mut self, limit: u64) -> Result<Vec<u8>, String> {
        self.read_at(0, limit)
    }

    /// The last `limit` bytes, or the whole file when it is smaller.
    pub fn tail(&mut self, limit: u64) -> Result<Vec<u8>, String> {
        self.read_at(self.len.saturating_sub(limit), limit)
    }

    /// The underlying handle, for parsers that drive their own reads.
    pub fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }

    fn read_window(&mut self, offset: u64, limit: u64) -> io::Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(offset))?;
        let want = limit.min(self.len.saturating_sub(offset));
        let mut buf = Vec::with_capacity(usize::try_from(want).unwrap_or(0));
        (&mut self.file).take(want).read_to_end(&mut buf)?;
        Ok(buf)
    }
}
