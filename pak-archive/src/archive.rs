//! Pack catalog: an opened zip container with a hash-indexed file table.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use tracing::{debug, warn};
use zip::ZipArchive;

use crate::checksum::content_checksum;
use crate::descriptor::AddonDescriptor;
use crate::error::{PakError, Result};
use crate::hash::{FILE_HASH_SIZE, filename_eq, name_hash};
use crate::reader::EntryReader;
use crate::{ADDON_CONFIG, BINARY_CONFIG};

/// Whether a pack carries native-code content, lazily determined by the
/// presence of the `binary.conf` marker entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryStatus {
    Unknown,
    Yes,
    No,
}

const BINARY_UNKNOWN: u8 = 0;
const BINARY_YES: u8 = 1;
const BINARY_NO: u8 = 2;

/// One file inside a pack.
#[derive(Debug, Clone)]
pub struct PakEntry {
    /// Lowercased, slash-normalized entry name.
    pub name: String,
    /// Index into the zip central directory, used to reopen the entry.
    pub index: usize,
    /// Byte offset of the entry data inside the container.
    pub offset: u64,
}

/// An opened pack. The catalog is built once at load time and is read-only
/// for the lifetime of the pack; only the lazily computed flags mutate, and
/// those are atomics so lookups can share the pack freely.
pub struct PakArchive {
    path: PathBuf,
    file_count: usize,
    length: u64,
    checksum: u32,
    entries: Vec<PakEntry>,
    /// Bucket table over `entries`. Lookup walks a bucket back to front so
    /// that later-enumerated duplicates win, matching the original
    /// prepend-to-bucket behavior.
    buckets: Vec<Vec<usize>>,
    referenced: AtomicBool,
    binary: AtomicU8,
    /// Set when the pack carries an `addon.conf` entry.
    pub is_addon: bool,
    /// Parsed addon descriptor, if the pack carried a well-formed one.
    pub addon_info: Option<AddonDescriptor>,
    /// Addon explicitly enabled for this session. Managed by the chain.
    pub searchable: bool,
    /// Freshly downloaded, not yet part of the persisted chain.
    pub is_new: bool,
}

impl PakArchive {
    /// Open a pack and build its catalog.
    ///
    /// Enumerates the central directory once, hashing every entry into the
    /// bucket table and accumulating the CRC32 of every non-empty entry
    /// for the content checksum. A container that cannot be opened or
    /// enumerated yields [`PakError::Corrupt`]; the caller decides whether
    /// to skip it.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path)?;
        let length = file.metadata()?.len();
        let mut zip = ZipArchive::new(BufReader::new(file)).map_err(|e| PakError::Corrupt {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let file_count = zip.len();
        let mut entries = Vec::with_capacity(file_count);
        let mut buckets = vec![Vec::new(); FILE_HASH_SIZE];
        let mut crcs = Vec::with_capacity(file_count);

        for index in 0..file_count {
            let entry = zip.by_index_raw(index).map_err(|e| PakError::Corrupt {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            if entry.size() > 0 {
                crcs.push(entry.crc32());
            }
            let name = entry.name().to_ascii_lowercase().replace('\\', "/");
            let offset = entry.data_start();
            let bucket = name_hash(&name);
            buckets[bucket].push(entries.len());
            entries.push(PakEntry {
                name,
                index,
                offset,
            });
        }

        let checksum = content_checksum(&crcs);
        debug!(
            "loaded pack {:?}: {} entries, checksum {:#010x}",
            path, file_count, checksum
        );

        let mut pack = Self {
            path,
            file_count,
            length,
            checksum,
            entries,
            buckets,
            referenced: AtomicBool::new(false),
            binary: AtomicU8::new(BINARY_UNKNOWN),
            is_addon: false,
            addon_info: None,
            searchable: false,
            is_new: false,
        };

        // check if this is an addon pack
        if let Some(conf_index) = pack.lookup(ADDON_CONFIG).map(|entry| entry.index) {
            pack.is_addon = true;
            let mut text = String::new();
            let mut entry = zip.by_index(conf_index)?;
            entry.read_to_string(&mut text)?;
            // may be just an empty file if the addon has no dependencies
            if !text.is_empty() {
                match AddonDescriptor::parse(&text) {
                    Ok(descriptor) => pack.addon_info = Some(descriptor),
                    Err(e) => {
                        warn!("pack {:?}: discarding addon descriptor: {e}", pack.path);
                    }
                }
            }
        }

        Ok(pack)
    }

    /// Look up an entry by relative path. Case and separator insensitive.
    pub fn lookup(&self, relative_path: &str) -> Option<&PakEntry> {
        let bucket = &self.buckets[name_hash(relative_path)];
        bucket
            .iter()
            .rev()
            .map(|&i| &self.entries[i])
            .find(|entry| filename_eq(&entry.name, relative_path))
    }

    /// True when the bucket a path hashes into holds no entries at all,
    /// letting the resolver skip the pack without string comparisons.
    pub fn bucket_is_empty(&self, relative_path: &str) -> bool {
        self.buckets[name_hash(relative_path)].is_empty()
    }

    /// Open an entry for reading. A fresh container handle is opened per
    /// call and the entry is decompressed into an owned cursor, so
    /// concurrent readers of the same pack never share a position.
    pub fn open_entry(&self, entry: &PakEntry) -> Result<EntryReader> {
        let file = File::open(&self.path)?;
        let mut zip = ZipArchive::new(BufReader::new(file))?;
        let mut zipped = zip.by_index(entry.index)?;
        let mut data = Vec::with_capacity(zipped.size() as usize);
        zipped.read_to_end(&mut data)?;
        let timestamp = zipped
            .last_modified()
            .map(crate::reader::zip_datetime_to_unix)
            .unwrap_or(0);
        Ok(EntryReader::new(
            entry.name.clone(),
            self.path.clone(),
            data,
            timestamp,
        ))
    }

    /// Convenience: look up by name and open in one step.
    pub fn read_entry(&self, relative_path: &str) -> Result<EntryReader> {
        let entry = self
            .lookup(relative_path)
            .ok_or_else(|| PakError::EntryNotFound(relative_path.to_string()))?;
        self.open_entry(entry)
    }

    /// Binary classification, computed on first use from the presence of
    /// the `binary.conf` marker entry.
    pub fn binary_status(&self) -> BinaryStatus {
        match self.binary.load(Ordering::Relaxed) {
            BINARY_YES => BinaryStatus::Yes,
            BINARY_NO => BinaryStatus::No,
            _ => {
                let status = if self.lookup(BINARY_CONFIG).is_some() {
                    BINARY_YES
                } else {
                    BINARY_NO
                };
                self.binary.store(status, Ordering::Relaxed);
                if status == BINARY_YES {
                    BinaryStatus::Yes
                } else {
                    BinaryStatus::No
                }
            }
        }
    }

    /// Mark the pack as having served content this session. Returns true
    /// the first time.
    pub fn mark_referenced(&self) -> bool {
        !self.referenced.swap(true, Ordering::Relaxed)
    }

    pub fn was_referenced(&self) -> bool {
        self.referenced.load(Ordering::Relaxed)
    }

    /// Entries in enumeration order, as needed for directory listings.
    pub fn entries(&self) -> &[PakEntry] {
        &self.entries
    }

    /// Content identity of this pack, stable for its lifetime.
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    /// Total byte length of the container on disk.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Number of entries in the container.
    pub fn file_count(&self) -> usize {
        self.file_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The container's file name without its directory.
    pub fn filename(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for PakArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PakArchive")
            .field("path", &self.path)
            .field("file_count", &self.file_count)
            .field("checksum", &format_args!("{:#010x}", self.checksum))
            .field("is_addon", &self.is_addon)
            .field("searchable", &self.searchable)
            .finish_non_exhaustive()
    }
}
