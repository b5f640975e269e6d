//! Zip-backed game content pack handling.
//!
//! A pack is an ordinary zip file used as a virtual directory tree. This
//! crate opens packs, builds a hash-indexed catalog of their entries for
//! O(1) average lookup, computes a 32-bit content checksum that serves as
//! the pack's identity across sessions, and parses the optional addon and
//! binary-module descriptors a pack may carry.

pub mod archive;
pub mod checksum;
pub mod descriptor;
pub mod error;
pub mod hash;
pub mod reader;

pub use archive::{BinaryStatus, PakArchive, PakEntry};
pub use checksum::{content_checksum, file_checksum};
pub use descriptor::{AddonDescriptor, MapDecl, parse_binary_marker};
pub use error::{PakError, Result};
pub use hash::{FILE_HASH_SIZE, filename_eq, name_hash};
pub use reader::EntryReader;

/// Entry name that marks a pack as an addon and carries its descriptor.
pub const ADDON_CONFIG: &str = "addon.conf";

/// Entry name that marks a pack as carrying native-code content.
pub const BINARY_CONFIG: &str = "binary.conf";
