//! Per-request readers over pack entries.

use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// An opened pack entry: the decompressed bytes behind an owned cursor.
///
/// Every open gets its own reader, so several readers over the same entry
/// track their positions independently.
pub struct EntryReader {
    name: String,
    pak_path: PathBuf,
    data: Cursor<Vec<u8>>,
    timestamp: i64,
}

impl EntryReader {
    pub(crate) fn new(name: String, pak_path: PathBuf, data: Vec<u8>, timestamp: i64) -> Self {
        Self {
            name,
            pak_path,
            data: Cursor::new(data),
            timestamp,
        }
    }

    /// Entry name relative to the pack root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the pack container this entry came from.
    pub fn pak_path(&self) -> &Path {
        &self.pak_path
    }

    /// Uncompressed length of the entry.
    pub fn len(&self) -> u64 {
        self.data.get_ref().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.get_ref().is_empty()
    }

    /// Last-modified time recorded in the container, as a Unix timestamp.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Consume the reader, yielding the entry bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data.into_inner()
    }
}

impl Read for EntryReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.data.read(buf)
    }
}

impl Seek for EntryReader {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.data.seek(pos)
    }
}

/// Convert a zip (DOS) datetime to a Unix timestamp, treating it as UTC.
pub(crate) fn zip_datetime_to_unix(dt: zip::DateTime) -> i64 {
    let days = days_from_civil(
        i64::from(dt.year()),
        i64::from(dt.month()),
        i64::from(dt.day()),
    );
    days * 86_400
        + i64::from(dt.hour()) * 3_600
        + i64::from(dt.minute()) * 60
        + i64::from(dt.second())
}

// Howard Hinnant's civil-days algorithm.
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let doy = (153 * (month + if month > 2 { -3 } else { 9 }) + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}
