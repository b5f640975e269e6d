//! Small FIFO cache over OS directory listings.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Number of listings kept. Resolution touches the same handful of
/// directories over and over, so a tiny cache covers the hot set.
const MAX_CACHED_DIRS: usize = 6;

struct CachedListing {
    directory: PathBuf,
    extension: String,
    names: Vec<String>,
}

/// FIFO cache of `(directory, extension) -> names` listings. Insertion past
/// capacity evicts the oldest entry regardless of use.
#[derive(Default)]
pub(crate) struct DirListingCache {
    listings: VecDeque<CachedListing>,
}

impl DirListingCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, directory: &Path, extension: &str) -> Option<Vec<String>> {
        self.listings.iter().rev().find_map(|cached| {
            let dir_matches = cached
                .directory
                .to_string_lossy()
                .eq_ignore_ascii_case(&directory.to_string_lossy());
            (dir_matches && cached.extension.eq_ignore_ascii_case(extension))
                .then(|| cached.names.clone())
        })
    }

    pub(crate) fn insert(&mut self, directory: PathBuf, extension: String, names: Vec<String>) {
        self.listings.push_back(CachedListing {
            directory,
            extension,
            names,
        });
        if self.listings.len() > MAX_CACHED_DIRS {
            self.listings.pop_front();
        }
    }

    /// Drop every cached listing. Called after any write or delete so stale
    /// listings never mask new files.
    pub(crate) fn clear(&mut self) {
        self.listings.clear();
    }
}
