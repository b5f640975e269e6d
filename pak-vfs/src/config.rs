//! Filesystem configuration.

use std::path::PathBuf;

/// Static configuration for a [`FileSystem`](crate::FileSystem).
///
/// All values are fixed at initialization; changing the active mission or
/// mod requires a [`restart`](crate::FileSystem::restart) with a new config.
#[derive(Debug, Clone)]
pub struct VfsConfig {
    /// Read-only installation root holding the base content.
    pub base_path: PathBuf,
    /// Writable root; all writes land under this tree.
    pub save_path: PathBuf,
    /// Development override root, searched before `base_path` when set.
    pub dev_path: Option<PathBuf>,
    /// Explicit override for the per-mod writable root. When unset it is
    /// derived as `save_path/<mod_name>/fms`.
    pub mod_save_path: Option<PathBuf>,
    /// Name of the current content folder under the roots.
    pub mod_name: String,
    /// Name of the stock content folder. A `mod_name` equal to this adds no
    /// extra layer.
    pub base_content: String,
    /// Currently installed mission, if any. Adds a top-precedence layer
    /// under the per-mod writable root.
    pub mission_name: String,
    /// File extension identifying content packs, without the dot.
    pub pack_extension: String,
    /// Whether the underlying OS filesystem is case sensitive. Enables the
    /// lowercase-retry fallback for loose files and the portability warning
    /// for mixed-case paths.
    pub case_sensitive_os: bool,
    /// Treat every addon pack as searchable instead of requiring explicit
    /// activation.
    pub search_addons: bool,
    /// Abort the process on API misuse (calls before init, empty paths)
    /// instead of returning an error.
    pub abort_on_misuse: bool,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            save_path: PathBuf::from("."),
            dev_path: None,
            mod_save_path: None,
            mod_name: "base".to_string(),
            base_content: "base".to_string(),
            mission_name: String::new(),
            pack_extension: "pk4".to_string(),
            case_sensitive_os: cfg!(not(windows)),
            search_addons: false,
            abort_on_misuse: true,
        }
    }
}

impl VfsConfig {
    /// The effective per-mod writable root.
    pub fn resolved_mod_save_path(&self) -> PathBuf {
        match &self.mod_save_path {
            Some(path) => path.clone(),
            None => self.save_path.join(&self.mod_name).join("fms"),
        }
    }
}
