//! The filesystem context: startup, the search order, and file operations.

use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use pak_archive::{BINARY_CONFIG, BinaryStatus, MapDecl, PakArchive, parse_binary_marker};
use tracing::{debug, info, warn};

use crate::chain::{Directory, SearchChain, SearchNode};
use crate::config::VfsConfig;
use crate::dir_cache::DirListingCache;
use crate::download::{Fetcher, TransferHandle, TransferJob, TransferQueue};
use crate::error::{Result, VfsError};
use crate::file::{FileContents, LooseFile, VfsFile};
use crate::paths;

/// Platform slots tracked for binary packs.
pub const MAX_PLATFORMS: usize = 6;

/// Which layers of the search order a resolution may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchFlags {
    pub dirs: bool,
    pub paks: bool,
    /// Also consult inactive addon packs, after the whole chain misses.
    pub addons: bool,
    /// Restrict pack hits to packs carrying native-code content.
    pub binary_only: bool,
}

impl SearchFlags {
    pub const DEFAULT: Self = Self {
        dirs: true,
        paks: true,
        addons: false,
        binary_only: false,
    };
    pub const DIRS_ONLY: Self = Self {
        dirs: true,
        paks: false,
        addons: false,
        binary_only: false,
    };
    pub const PAKS_ONLY: Self = Self {
        dirs: false,
        paks: true,
        addons: false,
        binary_only: false,
    };
    pub const INCLUDE_ADDONS: Self = Self {
        dirs: true,
        paks: true,
        addons: true,
        binary_only: false,
    };
    pub const BINARY_PACKS: Self = Self {
        dirs: false,
        paks: true,
        addons: false,
        binary_only: true,
    };
}

/// Outcome of [`FileSystem::find_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindResult {
    NotFound,
    Found,
    /// The file exists only inside an inactive addon pack; once that addon
    /// is scheduled, a restart makes the file resolvable.
    NeedsRestart,
}

/// Size and provenance of a resolvable file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub len: u64,
    pub timestamp: i64,
    pub in_pack: bool,
}

/// Where a binary module was found and its content identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLocation {
    /// OS path the module can be loaded from.
    pub os_path: PathBuf,
    pub timestamp: i64,
    pub file_checksum: u32,
    /// Checksum of the containing pack, when the module came from one.
    pub pack_checksum: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
struct PackRef {
    checksum: u32,
    is_addon: bool,
    searchable: bool,
}

struct Resolved {
    file: VfsFile,
    pack: Option<PackRef>,
}

/// A layered virtual filesystem over plain directories and content packs.
///
/// The search order is fixed at startup: later-added layers take
/// precedence, and within one directory layer the packs sort so that
/// higher-numbered packs shadow lower-numbered ones. All relative-path
/// operations resolve against that order; writes always land under the
/// writable save root.
pub struct FileSystem {
    config: VfsConfig,
    chain: Option<SearchChain>,
    /// Addon packs present on disk but not part of the search order.
    addon_packs: Vec<PakArchive>,
    /// Game folder of the last directory layer added, the default target
    /// for writes.
    game_folder: String,
    mod_save_path: PathBuf,
    dir_cache: Mutex<DirListingCache>,
    /// Addon checksums to activate on the next restart. Survives restarts
    /// until the matching pack shows up.
    pending_addons: Mutex<Vec<u32>>,
    restricted: AtomicBool,
    binary_platforms: Mutex<[Option<u32>; MAX_PLATFORMS]>,
    transfers: TransferQueue,
}

impl FileSystem {
    /// Build the search order from the configured roots and verify the base
    /// content is reachable.
    pub fn init(config: VfsConfig) -> Result<Self> {
        let mod_save_path = config.resolved_mod_save_path();
        let mut fs = Self {
            config,
            chain: None,
            addon_packs: Vec::new(),
            game_folder: String::new(),
            mod_save_path,
            dir_cache: Mutex::new(DirListingCache::new()),
            pending_addons: Mutex::new(Vec::new()),
            restricted: AtomicBool::new(false),
            binary_platforms: Mutex::new([None; MAX_PLATFORMS]),
            transfers: TransferQueue::start(),
        };
        fs.startup()?;
        fs.check_base_content()?;
        Ok(fs)
    }

    /// Tear down and rebuild the search order. Scheduled addon activations
    /// survive and take effect here.
    pub fn restart(&mut self) -> Result<()> {
        self.shutdown();
        self.startup()?;
        self.check_base_content()
    }

    /// Drop the search order. Every relative-path operation fails until the
    /// next [`restart`](Self::restart).
    pub fn shutdown(&mut self) {
        info!("shutting down file system");
        self.chain = None;
        self.addon_packs.clear();
        self.game_folder.clear();
        self.dir_cache.lock().clear();
        *self.binary_platforms.lock() = [None; MAX_PLATFORMS];
    }

    pub fn is_initialized(&self) -> bool {
        self.chain.is_some()
    }

    pub fn config(&self) -> &VfsConfig {
        &self.config
    }

    /// The game folder new writes default to.
    pub fn game_folder(&self) -> &str {
        &self.game_folder
    }

    fn check_base_content(&self) -> Result<()> {
        if self.read_file("default.cfg").is_err() {
            return Err(VfsError::MissingBaseContent);
        }
        Ok(())
    }

    fn misuse(&self, err: VfsError) -> VfsError {
        if self.config.abort_on_misuse {
            panic!("filesystem misuse: {err}");
        }
        err
    }

    fn chain(&self) -> Result<&SearchChain> {
        match &self.chain {
            Some(chain) => Ok(chain),
            None => Err(self.misuse(VfsError::Uninitialized)),
        }
    }

    // ------------------------------------------------------------------
    // startup

    fn startup(&mut self) -> Result<()> {
        info!("initializing file system");
        let mut chain = SearchChain::new();

        let base_content = self.config.base_content.clone();
        self.setup_game_directories(&mut chain, &base_content);

        let mod_name = self.config.mod_name.clone();
        if !mod_name.is_empty() && !mod_name.eq_ignore_ascii_case(&base_content) {
            self.setup_game_directories(&mut chain, &mod_name);
        }

        let mission = self.config.mission_name.clone();
        if !mission.is_empty() && !mission.eq_ignore_ascii_case(&mod_name) {
            let root = self.mod_save_path.clone();
            self.add_game_directory(&mut chain, &root, &mission);
        }

        self.classify_addons(&mut chain);

        info!("current search path:");
        for node in &chain.nodes {
            match node {
                SearchNode::Dir(dir) => {
                    info!("  {}/{}", dir.root.display(), dir.gamedir);
                }
                SearchNode::Pack(pack) => {
                    info!("  {} ({} files)", pack.path().display(), pack.file_count());
                }
            }
        }

        self.chain = Some(chain);
        Ok(())
    }

    /// Add one game folder under every configured root. Roots added later
    /// shadow earlier ones, so the writable save root ends up on top.
    fn setup_game_directories(&mut self, chain: &mut SearchChain, gamedir: &str) {
        let base = self.config.base_path.clone();
        self.add_game_directory(chain, &base, gamedir);
        if let Some(dev) = self.config.dev_path.clone() {
            self.add_game_directory(chain, &dev, gamedir);
        }
        let save = self.config.save_path.clone();
        self.add_game_directory(chain, &save, gamedir);
    }

    fn add_game_directory(&mut self, chain: &mut SearchChain, root: &Path, gamedir: &str) {
        // a root aliased under two config entries is only added once
        if chain.has_directory(root, gamedir) {
            return;
        }
        self.game_folder = gamedir.to_string();
        chain.nodes.insert(
            0,
            SearchNode::Dir(Directory {
                root: root.to_path_buf(),
                gamedir: gamedir.to_string(),
            }),
        );

        let pak_dir = paths::build_os_path(root, gamedir, "", self.config.case_sensitive_os);
        let extension = format!(".{}", self.config.pack_extension);
        let mut pak_names = self.list_os_files(&pak_dir, &extension).unwrap_or_default();
        pak_names.sort_unstable_by(|a, b| a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase()));

        // inserting each pack right below its directory reverses the sorted
        // order, so higher-numbered packs are searched first
        for pak_name in &pak_names {
            let pak_path =
                paths::build_os_path(root, gamedir, pak_name, self.config.case_sensitive_os);
            match PakArchive::load(&pak_path) {
                Ok(pack) => {
                    debug!(
                        "added pack {} ({:#010x})",
                        pack.path().display(),
                        pack.checksum()
                    );
                    chain.nodes.insert(1, SearchNode::Pack(pack));
                }
                Err(e) => warn!("skipping pack {}: {e}", pak_path.display()),
            }
        }
    }

    /// Decide which addon packs participate in the search and move the rest
    /// off the chain. Activating an addon also activates everything it
    /// declares a dependency on, transitively.
    fn classify_addons(&mut self, chain: &mut SearchChain) {
        let mut pending = self.pending_addons.lock();

        if self.config.search_addons {
            for pack in chain.packs_mut() {
                if pack.is_addon {
                    pack.searchable = true;
                }
            }
        } else {
            let mut worklist: Vec<u32> = Vec::new();
            for pack in chain.packs_mut() {
                if !pack.is_addon {
                    continue;
                }
                if let Some(pos) = pending.iter().position(|&c| c == pack.checksum()) {
                    pending.remove(pos);
                    pack.searchable = true;
                    info!("addon pack {} is on", pack.path().display());
                    if let Some(addon) = &pack.addon_info {
                        worklist.extend(&addon.depends);
                    }
                }
            }
            while let Some(checksum) = worklist.pop() {
                match chain.find_pack_mut(checksum) {
                    Some(dep) if !dep.searchable => {
                        dep.searchable = true;
                        if let Some(pos) = pending.iter().position(|&c| c == checksum) {
                            pending.remove(pos);
                        }
                        info!("addon pack {} pulled in as a dependency", dep.path().display());
                        if let Some(addon) = &dep.addon_info {
                            worklist.extend(&addon.depends);
                        }
                    }
                    Some(_) => {}
                    None => debug!("addon dependency {checksum:#010x} is not present"),
                }
            }
        }
        drop(pending);

        let nodes = std::mem::take(&mut chain.nodes);
        for node in nodes {
            match node {
                SearchNode::Pack(pack) if pack.is_addon && !pack.searchable => {
                    debug!("addon pack {} is off", pack.path().display());
                    self.addon_packs.push(pack);
                }
                node => chain.nodes.push(node),
            }
        }
    }

    // ------------------------------------------------------------------
    // resolution

    fn resolve(
        &self,
        relative_path: &str,
        flags: SearchFlags,
        gamedir: Option<&str>,
    ) -> Result<Resolved> {
        let chain = self.chain()?;
        if relative_path.is_empty() {
            return Err(self.misuse(VfsError::InvalidArgument("empty path".into())));
        }
        let Some(relative_path) = paths::validate_relative_path(relative_path) else {
            return Err(VfsError::NotFound(relative_path.to_string()));
        };
        if relative_path.is_empty() {
            return Err(VfsError::NotFound(String::new()));
        }

        let restricted = self.restricted.load(Ordering::Relaxed);
        for node in &chain.nodes {
            match node {
                SearchNode::Dir(dir) if flags.dirs => {
                    if restricted && !paths::file_allowed_from_dir(relative_path) {
                        continue;
                    }
                    if let Some(wanted) = gamedir
                        && dir.gamedir != wanted
                    {
                        continue;
                    }
                    let os_path = paths::build_os_path(
                        &dir.root,
                        &dir.gamedir,
                        relative_path,
                        self.config.case_sensitive_os,
                    );
                    if let Some(loose) = self.open_loose(&os_path, relative_path) {
                        return Ok(Resolved {
                            file: VfsFile::Loose(loose),
                            pack: None,
                        });
                    }
                }
                SearchNode::Pack(pack) if flags.paks => {
                    if flags.binary_only && pack.binary_status() != BinaryStatus::Yes {
                        continue;
                    }
                    if pack.bucket_is_empty(relative_path) {
                        continue;
                    }
                    if let Some(entry) = pack.lookup(relative_path) {
                        if pack.mark_referenced() {
                            debug!(
                                "pack {} referenced for the first time ({relative_path})",
                                pack.path().display()
                            );
                        }
                        let reader = pack.open_entry(entry)?;
                        return Ok(Resolved {
                            file: VfsFile::Packed(reader),
                            pack: Some(PackRef {
                                checksum: pack.checksum(),
                                is_addon: pack.is_addon,
                                searchable: pack.searchable,
                            }),
                        });
                    }
                }
                _ => {}
            }
        }

        if flags.addons {
            for pack in &self.addon_packs {
                if let Some(entry) = pack.lookup(relative_path) {
                    debug!(
                        "found {relative_path} in inactive addon {}",
                        pack.path().display()
                    );
                    let reader = pack.open_entry(entry)?;
                    return Ok(Resolved {
                        file: VfsFile::Packed(reader),
                        pack: Some(PackRef {
                            checksum: pack.checksum(),
                            is_addon: true,
                            searchable: false,
                        }),
                    });
                }
            }
        }

        debug!("can't find {relative_path}");
        Err(VfsError::NotFound(relative_path.to_string()))
    }

    fn open_loose(&self, os_path: &Path, name: &str) -> Option<LooseFile> {
        match LooseFile::open_read(os_path.to_path_buf(), name.to_string()) {
            Ok(Some(file)) => return Some(file),
            Ok(None) => {}
            Err(e) => {
                debug!("could not open {}: {e}", os_path.display());
                return None;
            }
        }
        if !self.config.case_sensitive_os {
            return None;
        }
        // retry against the on-disk casing of the file name
        let parent = os_path.parent()?;
        let wanted = os_path.file_name()?.to_str()?;
        let listed = self.list_os_files(parent, "").ok()?;
        for actual in listed {
            if actual != wanted && actual.eq_ignore_ascii_case(wanted) {
                let retry = parent.join(&actual);
                if let Ok(Some(file)) = LooseFile::open_read(retry, name.to_string()) {
                    return Some(file);
                }
            }
        }
        None
    }

    fn list_os_files(&self, directory: &Path, extension: &str) -> std::io::Result<Vec<String>> {
        if let Some(names) = self.dir_cache.lock().get(directory, extension) {
            return Ok(names);
        }
        let names = sys_list_files(directory, extension)?;
        self.dir_cache
            .lock()
            .insert(directory.to_path_buf(), extension.to_string(), names.clone());
        Ok(names)
    }

    // ------------------------------------------------------------------
    // reading

    /// Open a file for reading through the search order.
    pub fn open_file_read(&self, relative_path: &str) -> Result<VfsFile> {
        Ok(self.resolve(relative_path, SearchFlags::DEFAULT, None)?.file)
    }

    /// Open for reading with an explicit layer selection.
    pub fn open_file_read_flags(&self, relative_path: &str, flags: SearchFlags) -> Result<VfsFile> {
        Ok(self.resolve(relative_path, flags, None)?.file)
    }

    /// Open for reading, restricting directory layers to one game folder.
    pub fn open_file_read_in(&self, relative_path: &str, gamedir: &str) -> Result<VfsFile> {
        Ok(self
            .resolve(relative_path, SearchFlags::DEFAULT, Some(gamedir))?
            .file)
    }

    /// Read a whole file. The returned buffer carries a trailing NUL byte
    /// past the reported length, so text content can be handed to C-string
    /// consumers without a copy.
    pub fn read_file(&self, relative_path: &str) -> Result<FileContents> {
        if relative_path.is_empty() {
            return Err(self.misuse(VfsError::InvalidArgument("read_file: empty path".into())));
        }
        let mut file = self.open_file_read(relative_path)?;
        let len = file.len() as usize;
        let mut data = vec![0u8; len + 1];
        let got = read_full(&mut file, &mut data[..len])?;
        if got != len {
            return Err(VfsError::ShortIo {
                op: "read",
                path: relative_path.to_string(),
                expected: len as u64,
                actual: got as u64,
            });
        }
        Ok(FileContents::new(data, file.timestamp()))
    }

    /// Size and timestamp of a file without reading it.
    pub fn stat_file(&self, relative_path: &str) -> Result<FileStat> {
        let resolved = self.resolve(relative_path, SearchFlags::DEFAULT, None)?;
        Ok(FileStat {
            len: resolved.file.len(),
            timestamp: resolved.file.timestamp(),
            in_pack: resolved.pack.is_some(),
        })
    }

    /// Checksum of a file's full contents. The position is restored to the
    /// start afterwards.
    pub fn compute_file_checksum(&self, file: &mut VfsFile) -> Result<u32> {
        file.seek(SeekFrom::Start(0))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        file.seek(SeekFrom::Start(0))?;
        Ok(pak_archive::file_checksum(&data))
    }

    // ------------------------------------------------------------------
    // writing

    /// Open a file for writing under the writable save root. Parent
    /// directories are created as needed.
    pub fn open_file_write(&self, relative_path: &str, gamedir: Option<&str>) -> Result<VfsFile> {
        self.open_write_internal(relative_path, gamedir, false)
    }

    /// Open a file for appending under the writable save root.
    pub fn open_file_append(&self, relative_path: &str) -> Result<VfsFile> {
        self.open_write_internal(relative_path, None, true)
    }

    fn open_write_internal(
        &self,
        relative_path: &str,
        gamedir: Option<&str>,
        append: bool,
    ) -> Result<VfsFile> {
        self.chain()?;
        if relative_path.is_empty() {
            return Err(self.misuse(VfsError::InvalidArgument("write: empty path".into())));
        }
        let Some(relative_path) = paths::validate_relative_path(relative_path) else {
            return Err(VfsError::InvalidArgument(format!(
                "unsafe path '{relative_path}'"
            )));
        };
        let gamedir = gamedir.unwrap_or(&self.game_folder);
        let os_path = paths::build_os_path(
            &self.write_root(),
            gamedir,
            relative_path,
            self.config.case_sensitive_os,
        );
        debug!("writing to {}", os_path.display());
        paths::create_parents(&os_path)?;
        self.dir_cache.lock().clear();
        let loose = LooseFile::open_write(os_path, relative_path.to_string(), append)?;
        Ok(VfsFile::Loose(loose))
    }

    /// Write a whole file under the writable save root, replacing any
    /// previous content.
    pub fn write_file(&self, relative_path: &str, data: &[u8]) -> Result<usize> {
        let mut file = self.open_write_internal(relative_path, None, false)?;
        file.write_all_checked(data)?;
        Ok(data.len())
    }

    /// Remove a file from the writable layers. Missing files are not an
    /// error.
    pub fn remove_file(&self, relative_path: &str) -> Result<()> {
        self.chain()?;
        let Some(relative_path) = paths::validate_relative_path(relative_path) else {
            return Ok(());
        };
        let mut targets = vec![paths::build_os_path(
            &self.write_root(),
            &self.game_folder,
            relative_path,
            self.config.case_sensitive_os,
        )];
        let in_save = paths::build_os_path(
            &self.config.save_path,
            &self.game_folder,
            relative_path,
            self.config.case_sensitive_os,
        );
        if !targets.contains(&in_save) {
            targets.push(in_save);
        }
        for os_path in targets {
            debug!("removing {}", os_path.display());
            match std::fs::remove_file(&os_path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.dir_cache.lock().clear();
        Ok(())
    }

    /// The directory root writes resolve against: the per-mod save root
    /// while a mission layer is active, the plain save root otherwise.
    fn write_root(&self) -> PathBuf {
        let mission = &self.config.mission_name;
        if !mission.is_empty() && !mission.eq_ignore_ascii_case(&self.config.mod_name) {
            self.mod_save_path.clone()
        } else {
            self.config.save_path.clone()
        }
    }

    /// Synchronous whole-file copy between OS paths.
    pub fn copy_file(&self, from_os_path: &Path, to_os_path: &Path) -> Result<()> {
        info!(
            "copying {} to {}",
            from_os_path.display(),
            to_os_path.display()
        );
        let data = std::fs::read(from_os_path)?;
        paths::create_parents(to_os_path)?;
        std::fs::write(to_os_path, &data)?;
        self.dir_cache.lock().clear();
        Ok(())
    }

    /// An anonymous temporary file under the writable save root, deleted
    /// when the handle drops.
    pub fn create_temp_file(&self) -> Result<File> {
        std::fs::create_dir_all(&self.config.save_path)?;
        Ok(tempfile::tempfile_in(&self.config.save_path)?)
    }

    /// Open an explicit OS path for reading, bypassing the search order.
    pub fn open_explicit_read(&self, os_path: &Path) -> Result<VfsFile> {
        self.chain()?;
        let name = os_path.to_string_lossy().into_owned();
        match LooseFile::open_read(os_path.to_path_buf(), name)? {
            Some(file) => Ok(VfsFile::Loose(file)),
            None => Err(VfsError::NotFound(os_path.display().to_string())),
        }
    }

    /// Open an explicit OS path for writing, bypassing the search order.
    pub fn open_explicit_write(&self, os_path: &Path) -> Result<VfsFile> {
        self.chain()?;
        paths::create_parents(os_path)?;
        self.dir_cache.lock().clear();
        let name = os_path.to_string_lossy().into_owned();
        let loose = LooseFile::open_write(os_path.to_path_buf(), name, false)?;
        Ok(VfsFile::Loose(loose))
    }

    // ------------------------------------------------------------------
    // listings

    /// Files directly under a directory across every layer, deduplicated
    /// case-insensitively. An `extension` of `""` matches everything, `"/"`
    /// lists subdirectories, and `"|"` separates alternatives.
    pub fn list_files(
        &self,
        relative_path: &str,
        extension: &str,
        sort: bool,
        full_relative: bool,
        gamedir: Option<&str>,
    ) -> Result<Vec<String>> {
        let chain = self.chain()?;
        let Some(relative_path) = paths::validate_relative_path(relative_path) else {
            return Ok(Vec::new());
        };
        let extensions = extension_list(extension);
        let mut names = Vec::new();
        let mut seen = HashSet::new();
        self.collect_files(
            chain,
            relative_path,
            &extensions,
            full_relative,
            gamedir,
            &mut names,
            &mut seen,
        );
        if sort {
            names.sort_unstable_by(|a, b| a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase()));
        }
        Ok(names)
    }

    /// Like [`list_files`](Self::list_files) but recursing into
    /// subdirectories. Names are always full relative paths.
    pub fn list_files_tree(
        &self,
        relative_path: &str,
        extension: &str,
        sort: bool,
        gamedir: Option<&str>,
    ) -> Result<Vec<String>> {
        let chain = self.chain()?;
        let Some(relative_path) = paths::validate_relative_path(relative_path) else {
            return Ok(Vec::new());
        };
        let mut names = Vec::new();
        let mut seen = HashSet::new();
        self.collect_tree(chain, relative_path, extension, gamedir, &mut names, &mut seen);
        if sort {
            names.sort_unstable_by(|a, b| a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase()));
        }
        Ok(names)
    }

    fn collect_tree(
        &self,
        chain: &SearchChain,
        relative_path: &str,
        extension: &str,
        gamedir: Option<&str>,
        names: &mut Vec<String>,
        seen: &mut HashSet<String>,
    ) {
        let extensions = extension_list(extension);
        self.collect_files(chain, relative_path, &extensions, true, gamedir, names, seen);

        let dir_exts = extension_list("/");
        let mut subdirs = Vec::new();
        let mut sub_seen = HashSet::new();
        self.collect_files(
            chain,
            relative_path,
            &dir_exts,
            true,
            gamedir,
            &mut subdirs,
            &mut sub_seen,
        );
        for subdir in subdirs {
            self.collect_tree(chain, &subdir, extension, gamedir, names, seen);
        }
    }

    fn collect_files(
        &self,
        chain: &SearchChain,
        relative_path: &str,
        extensions: &[String],
        full_relative: bool,
        gamedir: Option<&str>,
        names: &mut Vec<String>,
        seen: &mut HashSet<String>,
    ) {
        let restricted = self.restricted.load(Ordering::Relaxed);
        let rel_lower = relative_path.to_ascii_lowercase();
        let path_len = if rel_lower.is_empty() {
            0
        } else {
            rel_lower.len() + 1
        };

        for node in &chain.nodes {
            match node {
                SearchNode::Dir(dir) => {
                    // restricted mode serves listings from packs only
                    if restricted {
                        continue;
                    }
                    if let Some(wanted) = gamedir
                        && dir.gamedir != wanted
                    {
                        continue;
                    }
                    let net_path = paths::build_os_path(
                        &dir.root,
                        &dir.gamedir,
                        relative_path,
                        self.config.case_sensitive_os,
                    );
                    for ext in extensions {
                        let Ok(listed) = self.list_os_files(&net_path, ext) else {
                            continue;
                        };
                        for name in listed {
                            add_unique_listing(relative_path, &name, full_relative, names, seen);
                        }
                    }
                }
                SearchNode::Pack(pack) => {
                    for entry in pack.entries() {
                        let name = &entry.name;
                        if !rel_lower.is_empty() {
                            if name.len() <= path_len
                                || !name.starts_with(&rel_lower)
                                || name.as_bytes()[rel_lower.len()] != b'/'
                            {
                                continue;
                            }
                        }
                        let tail = &name[path_len.min(name.len())..];
                        let stem = tail.strip_suffix('/').unwrap_or(tail);
                        if stem.is_empty() || stem.contains('/') {
                            continue;
                        }
                        if !extensions.iter().any(|ext| ext_matches(name, ext)) {
                            continue;
                        }
                        add_unique_listing(relative_path, stem, full_relative, names, seen);
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // presence and pack queries

    /// Where, if anywhere, a file can be resolved from. A hit inside an
    /// inactive addon reports [`FindResult::NeedsRestart`] and, when
    /// `schedule_addons` is set, schedules that addon for activation.
    pub fn find_file(&self, relative_path: &str, schedule_addons: bool) -> Result<FindResult> {
        match self.resolve(relative_path, SearchFlags::INCLUDE_ADDONS, None) {
            Ok(resolved) => match resolved.pack {
                Some(pack) if pack.is_addon && !pack.searchable => {
                    if schedule_addons {
                        self.schedule_addon_activation(pack.checksum);
                    }
                    Ok(FindResult::NeedsRestart)
                }
                _ => Ok(FindResult::Found),
            },
            Err(VfsError::NotFound(_)) => Ok(FindResult::NotFound),
            Err(e) => Err(e),
        }
    }

    /// Ask for an addon pack to join the search order on the next restart.
    pub fn schedule_addon_activation(&self, checksum: u32) {
        let mut pending = self.pending_addons.lock();
        if !pending.contains(&checksum) {
            info!("scheduling addon pack {checksum:#010x} for activation on restart");
            pending.push(checksum);
        }
    }

    /// Find a loaded pack by content checksum.
    pub fn pack_for_checksum(&self, checksum: u32, include_addons: bool) -> Option<&PakArchive> {
        let chain = self.chain.as_ref()?;
        chain.find_pack(checksum).or_else(|| {
            include_addons
                .then(|| self.addon_packs.iter().find(|p| p.checksum() == checksum))
                .flatten()
        })
    }

    /// Find the pack whose copy of `relative_path` has the given content
    /// checksum. Used to answer pure-server referenced-pack queries.
    pub fn find_pack_for_file_checksum(
        &self,
        relative_path: &str,
        checksum: u32,
    ) -> Option<&PakArchive> {
        let chain = self.chain.as_ref()?;
        for pack in chain.packs() {
            if let Some(entry) = pack.lookup(relative_path)
                && let Ok(reader) = pack.open_entry(entry)
                && pak_archive::file_checksum(&reader.into_bytes()) == checksum
            {
                debug!(
                    "{relative_path} with checksum {checksum:#010x} is in {}",
                    pack.path().display()
                );
                return Some(pack);
            }
        }
        None
    }

    /// Checksums of every pack in the search order, front to back.
    pub fn pack_checksums(&self) -> Vec<u32> {
        match &self.chain {
            Some(chain) => chain.packs().map(PakArchive::checksum).collect(),
            None => Vec::new(),
        }
    }

    /// Whether a pack may be offered to a client for download. Stock
    /// content and packs whose binary flag contradicts the request are
    /// refused. On success, returns the pack's path relative to its search
    /// root and its byte length.
    pub fn validate_download_pack(&self, checksum: u32, is_binary: bool) -> Option<(String, u64)> {
        let pack = self.pack_for_checksum(checksum, false)?;
        if pack.filename().to_ascii_lowercase().starts_with("pak") {
            debug!("{} is not downloadable", pack.path().display());
            return None;
        }
        let pack_is_binary = pack.binary_status() == BinaryStatus::Yes;
        if pack_is_binary != is_binary {
            debug!("{} binary flag mismatch", pack.path().display());
            return None;
        }
        let full = pack.path().to_string_lossy().replace('\\', "/");
        let mut roots = vec![self.config.save_path.clone(), self.config.base_path.clone()];
        if let Some(dev) = &self.config.dev_path {
            roots.insert(1, dev.clone());
        }
        for root in roots {
            let root = root.to_string_lossy().replace('\\', "/");
            let prefix = format!("{}/", root.trim_end_matches('/'));
            if let Some(rel) = full.strip_prefix(&prefix) {
                return Some((rel.to_string(), pack.length()));
            }
        }
        warn!("pack {full} is not under any search root");
        None
    }

    /// Restrict directory layers to the pure-server allow list.
    pub fn set_restricted(&self, restricted: bool) {
        self.restricted.store(restricted, Ordering::Relaxed);
    }

    pub fn is_restricted(&self) -> bool {
        self.restricted.load(Ordering::Relaxed)
    }

    /// Map declarations carried by every addon pack, active or not.
    pub fn addon_map_decls(&self) -> Vec<&MapDecl> {
        let mut decls = Vec::new();
        if let Some(chain) = &self.chain {
            for pack in chain.packs() {
                if let Some(addon) = &pack.addon_info {
                    decls.extend(addon.map_decls.iter());
                }
            }
        }
        for pack in &self.addon_packs {
            if let Some(addon) = &pack.addon_info {
                decls.extend(addon.map_decls.iter());
            }
        }
        decls
    }

    // ------------------------------------------------------------------
    // binary modules

    /// Locate a native-code module, preferring a loose copy unless a copy
    /// inside a binary pack is strictly newer. A packed module is extracted
    /// under the save root so the OS loader can reach it.
    pub fn find_binary_module(&self, module_name: &str) -> Result<Option<ModuleLocation>> {
        self.chain()?;
        let loose = self.resolve(module_name, SearchFlags::DIRS_ONLY, None).ok();
        let packed = self.resolve(module_name, SearchFlags::BINARY_PACKS, None).ok();

        let resolved = match (loose, packed) {
            (None, None) => return Ok(None),
            (Some(loose), None) => loose,
            (None, Some(packed)) => packed,
            (Some(loose), Some(packed)) => {
                if packed.file.timestamp() > loose.file.timestamp() {
                    packed
                } else {
                    loose
                }
            }
        };

        let timestamp = resolved.file.timestamp();
        let pack_checksum = resolved.pack.map(|p| p.checksum);
        match resolved.file {
            VfsFile::Loose(file) => {
                let os_path = file.os_path.clone();
                let data = std::fs::read(&os_path)?;
                Ok(Some(ModuleLocation {
                    os_path,
                    timestamp,
                    file_checksum: pak_archive::file_checksum(&data),
                    pack_checksum,
                }))
            }
            VfsFile::Packed(reader) => {
                let data = reader.into_bytes();
                let os_path = paths::build_os_path(
                    &self.config.save_path,
                    &self.game_folder,
                    module_name,
                    self.config.case_sensitive_os,
                );
                info!("extracting {module_name} to {}", os_path.display());
                paths::create_parents(&os_path)?;
                std::fs::write(&os_path, &data)?;
                self.dir_cache.lock().clear();
                Ok(Some(ModuleLocation {
                    os_path,
                    timestamp,
                    file_checksum: pak_archive::file_checksum(&data),
                    pack_checksum,
                }))
            }
        }
    }

    /// Refresh the per-platform binary pack table from the `binary.conf`
    /// markers of every binary pack in the search order. The first pack in
    /// search order claims each platform slot.
    pub fn update_binary_pack_checksums(&self) -> Result<()> {
        let chain = self.chain()?;
        let mut platforms = self.binary_platforms.lock();
        *platforms = [None; MAX_PLATFORMS];
        for pack in chain.packs() {
            if pack.binary_status() != BinaryStatus::Yes {
                continue;
            }
            let reader = pack.read_entry(BINARY_CONFIG)?;
            let text = String::from_utf8_lossy(&reader.into_bytes()).into_owned();
            for id in parse_binary_marker(&text) {
                let slot = id as usize;
                if slot >= MAX_PLATFORMS {
                    warn!("pack {} names unknown platform {id}", pack.path().display());
                    continue;
                }
                if platforms[slot].is_none() {
                    platforms[slot] = Some(pack.checksum());
                }
            }
        }
        Ok(())
    }

    /// The binary pack claimed for a platform slot, if any.
    pub fn binary_pack_for_platform(&self, platform: usize) -> Option<u32> {
        self.binary_platforms.lock().get(platform).copied().flatten()
    }

    // ------------------------------------------------------------------
    // downloads

    /// Append a freshly downloaded pack to the search order. It is
    /// searchable immediately, at the lowest precedence; the next restart
    /// sorts it into its proper place.
    pub fn add_downloaded_pack(&mut self, relative_path: &str) -> Result<u32> {
        if self.chain.is_none() {
            return Err(self.misuse(VfsError::Uninitialized));
        }
        let Some(relative_path) = paths::validate_relative_path(relative_path) else {
            return Err(VfsError::InvalidArgument(format!(
                "unsafe path '{relative_path}'"
            )));
        };
        let os_path = paths::build_os_path(
            &self.config.save_path,
            "",
            relative_path,
            self.config.case_sensitive_os,
        );
        let mut pack = PakArchive::load(&os_path)?;
        pack.is_new = true;
        pack.searchable = true;
        let checksum = pack.checksum();
        info!(
            "appended downloaded pack {} ({checksum:#010x})",
            pack.path().display()
        );
        if let Some(chain) = self.chain.as_mut() {
            chain.nodes.push(SearchNode::Pack(pack));
        }
        Ok(checksum)
    }

    /// Queue a background copy between two OS paths.
    pub fn queue_copy(&self, from: PathBuf, to: PathBuf) -> TransferHandle {
        self.transfers.submit(TransferJob::Copy { from, to })
    }

    /// Queue a background ranged read of an OS path. The bytes are
    /// retrievable from the handle once the transfer is done.
    pub fn queue_read(&self, os_path: PathBuf, offset: u64, length: usize) -> TransferHandle {
        self.transfers.submit(TransferJob::Read {
            path: os_path,
            offset,
            length,
        })
    }

    /// Queue a background fetch of a URL into a path under the save root.
    pub fn queue_fetch(
        &self,
        fetcher: Arc<dyn Fetcher>,
        url: String,
        dest_relative_path: &str,
    ) -> Result<TransferHandle> {
        self.chain()?;
        let Some(rel) = paths::validate_relative_path(dest_relative_path) else {
            return Err(VfsError::InvalidArgument(format!(
                "unsafe path '{dest_relative_path}'"
            )));
        };
        let dest = paths::build_os_path(
            &self.config.save_path,
            "",
            rel,
            self.config.case_sensitive_os,
        );
        Ok(self.transfers.submit(TransferJob::Fetch { fetcher, url, dest }))
    }

    /// Human-readable dump of the current search order, front to back.
    pub fn describe_search_order(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(chain) = &self.chain {
            for node in &chain.nodes {
                match node {
                    SearchNode::Dir(dir) => {
                        lines.push(format!("{}/{}", dir.root.display(), dir.gamedir));
                    }
                    SearchNode::Pack(pack) => {
                        lines.push(format!(
                            "{} ({:#010x})",
                            pack.path().display(),
                            pack.checksum()
                        ));
                    }
                }
            }
        }
        lines
    }
}

impl std::fmt::Debug for FileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystem")
            .field("initialized", &self.chain.is_some())
            .field("game_folder", &self.game_folder)
            .field("restricted", &self.restricted.load(Ordering::Relaxed))
            .field("inactive_addons", &self.addon_packs.len())
            .finish_non_exhaustive()
    }
}

fn read_full(file: &mut VfsFile, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

fn sys_list_files(directory: &Path, extension: &str) -> std::io::Result<Vec<String>> {
    let want_dirs = extension == "/";
    let mut names = Vec::new();
    for entry in std::fs::read_dir(directory)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() != want_dirs {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if !want_dirs
            && !extension.is_empty()
            && !name.to_ascii_lowercase().ends_with(&extension.to_ascii_lowercase())
        {
            continue;
        }
        names.push(name);
    }
    names.sort_unstable();
    Ok(names)
}

/// Split an extension filter on `|`. An empty element matches every file,
/// `"/"` selects directories.
fn extension_list(extension: &str) -> Vec<String> {
    extension.split('|').map(|s| s.to_ascii_lowercase()).collect()
}

fn ext_matches(name: &str, extension: &str) -> bool {
    if extension == "/" {
        return name.ends_with('/');
    }
    // directory entries only match the "/" pseudo-extension
    if name.ends_with('/') {
        return false;
    }
    extension.is_empty() || name.ends_with(extension)
}

fn add_unique_listing(
    relative_path: &str,
    name: &str,
    full_relative: bool,
    names: &mut Vec<String>,
    seen: &mut HashSet<String>,
) {
    let name = name.strip_suffix('/').unwrap_or(name);
    if name.is_empty() || name == "." || name == ".." {
        return;
    }
    let listed = if full_relative && !relative_path.is_empty() {
        format!("{relative_path}/{name}")
    } else {
        name.to_string()
    };
    if seen.insert(listed.to_ascii_lowercase()) {
        names.push(listed);
    }
}
