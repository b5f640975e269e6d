//! File handles returned by the resolver.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use pak_archive::EntryReader;

use crate::error::{Result, VfsError};

/// A file opened through the search chain: either a loose file on disk or
/// an entry extracted from a pack.
pub enum VfsFile {
    Loose(LooseFile),
    Packed(EntryReader),
}

impl VfsFile {
    /// The path the file was requested by, relative to the search roots.
    pub fn name(&self) -> &str {
        match self {
            Self::Loose(f) => &f.name,
            Self::Packed(r) => r.name(),
        }
    }

    /// Where the bytes actually live: the loose file's OS path, or the
    /// containing pack's OS path.
    pub fn os_path(&self) -> &Path {
        match self {
            Self::Loose(f) => &f.os_path,
            Self::Packed(r) => r.pak_path(),
        }
    }

    pub fn len(&self) -> u64 {
        match self {
            Self::Loose(f) => f.len,
            Self::Packed(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Last-modified time as a Unix timestamp.
    pub fn timestamp(&self) -> i64 {
        match self {
            Self::Loose(f) => f.timestamp,
            Self::Packed(r) => r.timestamp(),
        }
    }

    pub(crate) fn write_all_checked(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Self::Loose(f) => {
                f.file.write_all(data)?;
                f.file.flush()?;
                f.len += data.len() as u64;
                Ok(())
            }
            Self::Packed(r) => Err(VfsError::ReadOnly(r.name().to_string())),
        }
    }
}

impl Read for VfsFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Loose(f) => f.file.read(buf),
            Self::Packed(r) => r.read(buf),
        }
    }
}

impl Seek for VfsFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Self::Loose(f) => f.file.seek(pos),
            Self::Packed(r) => r.seek(pos),
        }
    }
}

impl Write for VfsFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Loose(f) => f.file.write(buf),
            Self::Packed(_) => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "pack entries are read-only",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Loose(f) => f.file.flush(),
            Self::Packed(_) => Ok(()),
        }
    }
}

/// A loose file on the OS filesystem.
pub struct LooseFile {
    pub(crate) file: File,
    pub(crate) name: String,
    pub(crate) os_path: PathBuf,
    pub(crate) len: u64,
    pub(crate) timestamp: i64,
}

impl LooseFile {
    pub(crate) fn open_read(os_path: PathBuf, name: String) -> io::Result<Option<Self>> {
        let file = match File::open(&os_path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let metadata = file.metadata()?;
        if !metadata.is_file() {
            return Ok(None);
        }
        let timestamp = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Ok(Some(Self {
            len: metadata.len(),
            file,
            name,
            os_path,
            timestamp,
        }))
    }

    pub(crate) fn open_write(os_path: PathBuf, name: String, append: bool) -> io::Result<Self> {
        let file = if append {
            File::options().create(true).append(true).open(&os_path)?
        } else {
            File::create(&os_path)?
        };
        let len = file.metadata()?.len();
        Ok(Self {
            file,
            name,
            os_path,
            len,
            timestamp: 0,
        })
    }
}

/// Bytes of a fully read file. The buffer always carries one extra NUL byte
/// past `len`, so text consumers can treat the contents as a C string
/// without copying.
pub struct FileContents {
    data: Vec<u8>,
    timestamp: i64,
}

impl FileContents {
    pub(crate) fn new(data: Vec<u8>, timestamp: i64) -> Self {
        debug_assert_eq!(data.last(), Some(&0));
        Self { data, timestamp }
    }

    /// The file bytes, without the trailing NUL.
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.data.len() - 1]
    }

    /// The file bytes including the guaranteed trailing NUL.
    pub fn bytes_with_nul(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Consume, yielding the bytes including the trailing NUL.
    pub fn into_bytes_with_nul(self) -> Vec<u8> {
        self.data
    }
}
