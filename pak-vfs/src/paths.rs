//! OS path construction and relative-path validation.

use std::path::{Path, PathBuf};

use tracing::warn;

/// Build an OS path from a search root, a game folder and a relative path.
///
/// Segments are joined with forward slashes and backslashes are normalized
/// away. On case sensitive filesystems a mixed-case directory portion is
/// warned about and lowered, so content authored on case-preserving systems
/// keeps resolving.
pub(crate) fn build_os_path(
    base: &Path,
    gamedir: &str,
    relative_path: &str,
    case_sensitive: bool,
) -> PathBuf {
    let mut rel = String::new();
    for segment in [gamedir, relative_path] {
        if segment.is_empty() {
            continue;
        }
        if !rel.is_empty() {
            rel.push('/');
        }
        rel.push_str(segment);
    }
    rel = rel.replace('\\', "/");

    if case_sensitive
        && let Some(slash) = rel.rfind('/')
    {
        let (dir_part, file_part) = rel.split_at(slash);
        if dir_part.bytes().any(|b| b.is_ascii_uppercase()) {
            warn!("non-portable: mixed-case path '{dir_part}'");
            rel = format!("{}{}", dir_part.to_ascii_lowercase(), file_part);
        }
    }

    let mut os_path = base.to_string_lossy().replace('\\', "/");
    while os_path.ends_with('/') {
        os_path.pop();
    }
    if !rel.is_empty() {
        os_path.push('/');
        os_path.push_str(&rel);
    }
    PathBuf::from(os_path)
}

/// Validate a caller-supplied relative path.
///
/// Leading separators are stripped; paths attempting to escape the search
/// roots (`..`) or smuggle drive syntax (`::`) are rejected outright.
pub(crate) fn validate_relative_path(relative_path: &str) -> Option<&str> {
    let trimmed = relative_path.trim_start_matches(['/', '\\']);
    if trimmed.contains("..") || trimmed.contains("::") {
        warn!("rejected unsafe relative path '{relative_path}'");
        return None;
    }
    Some(trimmed)
}

/// Create every missing parent directory of an OS path about to be written.
pub(crate) fn create_parents(os_path: &Path) -> std::io::Result<()> {
    match os_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Whether a path may be served from a plain directory while the filesystem
/// is restricted to pack content. Pure servers run without the content packs
/// installed, so the handful of file kinds they legitimately produce or read
/// from loose directories are allow-listed here.
pub(crate) fn file_allowed_from_dir(relative_path: &str) -> bool {
    const ALWAYS: &[&str] = &[
        ".cfg",
        ".dat",
        ".dll",
        ".so",
        ".dylib",
        ".scriptcfg",
        ".dds",
    ];
    const SAVEGAMES: &[&str] = &[".tga", ".txt", ".save"];
    const SCREENSHOTS: &[&str] = &[".tga", ".jpg", ".png", ".bmp"];

    let lower = relative_path.to_ascii_lowercase();
    if ALWAYS.iter().any(|ext| lower.ends_with(ext)) {
        return true;
    }
    if lower.starts_with("savegames") && SAVEGAMES.iter().any(|ext| lower.ends_with(ext)) {
        return true;
    }
    if lower.starts_with("screenshots") && SCREENSHOTS.iter().any(|ext| lower.ends_with(ext)) {
        return true;
    }
    false
}
