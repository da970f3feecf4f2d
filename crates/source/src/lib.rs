//! Byte sources for upload payloads.
//!
//! A [`ByteSource`] exposes the total payload length and random-access
//! reads; the session pulls one chunk-sized range at a time from it.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Errors produced by byte sources.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("read at offset {offset} past end of source ({len} bytes)")]
    OutOfBounds { offset: u64, len: u64 },
}

/// Random-access view of the bytes to upload.
///
/// Implementations are called from blocking worker threads; they may block
/// on disk I/O but must be shareable across threads.
pub trait ByteSource: Send + Sync {
    /// Total payload length in bytes.
    fn len(&self) -> u64;

    /// Reads up to `max` bytes starting at `offset`.
    ///
    /// Returns fewer bytes only at the end of the source. An `offset`
    /// beyond the end fails with [`SourceError::OutOfBounds`].
    fn read(&self, offset: u64, max: usize) -> Result<Vec<u8>, SourceError>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// FileSource
// ---------------------------------------------------------------------------

/// A file on disk. The length is fixed at open time.
pub struct FileSource {
    file: Mutex<File>,
    len: u64,
    path: PathBuf,
}

impl FileSource {
    /// Opens `path` for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file: Mutex::new(file),
            len,
            path: path.to_path_buf(),
        })
    }

    /// The path this source reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read(&self, offset: u64, max: usize) -> Result<Vec<u8>, SourceError> {
        if offset > self.len {
            return Err(SourceError::OutOfBounds {
                offset,
                len: self.len,
            });
        }

        let want = max.min((self.len - offset) as usize);
        let mut buf = vec![0u8; want];
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(offset))?;

        let mut filled = 0;
        while filled < want {
            let n = file.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(buf)
    }
}

// ---------------------------------------------------------------------------
// MemorySource
// ---------------------------------------------------------------------------

/// An in-memory payload.
pub struct MemorySource {
    data: Vec<u8>,
}

impl MemorySource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }
}

impl From<Vec<u8>> for MemorySource {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl ByteSource for MemorySource {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn read(&self, offset: u64, max: usize) -> Result<Vec<u8>, SourceError> {
        let len = self.data.len() as u64;
        if offset > len {
            return Err(SourceError::OutOfBounds { offset, len });
        }
        let start = offset as usize;
        let end = start + max.min((len - offset) as usize);
        Ok(self.data[start..end].to_vec())
    }
}
