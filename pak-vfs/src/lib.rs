//! Layered virtual filesystem over plain directories and content packs.
//!
//! Game content is resolved by relative path through an ordered search
//! chain built at startup from the configured roots (installation, dev
//! override, writable save root) and the current mod and mission layers.
//! Each directory layer also contributes its `.pk4` packs, sorted so that
//! higher-numbered packs shadow lower-numbered ones. Later layers shadow
//! earlier ones; the first hit wins.
//!
//! # Usage
//!
//! ```no_run
//! use pak_vfs::{FileSystem, VfsConfig};
//!
//! let fs = FileSystem::init(VfsConfig {
//!     base_path: "/opt/game".into(),
//!     save_path: "/home/player/.game".into(),
//!     ..VfsConfig::default()
//! })?;
//!
//! let contents = fs.read_file("maps/city.map")?;
//! println!("{} bytes", contents.len());
//! # Ok::<(), pak_vfs::VfsError>(())
//! ```
//!
//! Addon packs (packs carrying an `addon.conf` descriptor) stay out of the
//! search order until scheduled and activated by a restart; see
//! [`FileSystem::find_file`] and [`FileSystem::schedule_addon_activation`].

mod chain;
mod config;
mod dir_cache;
mod download;
mod error;
mod file;
mod paths;
mod vfs;

pub use config::VfsConfig;
pub use download::{Fetcher, TransferHandle, TransferStatus};
pub use error::{Result, VfsError};
pub use file::{FileContents, LooseFile, VfsFile};
pub use vfs::{
    FileStat, FileSystem, FindResult, MAX_PLATFORMS, ModuleLocation, SearchFlags,
};

pub use pak_archive::{AddonDescriptor, MapDecl, PakArchive};
