//! The ordered search chain of directories and packs.

use std::path::{Path, PathBuf};

use pak_archive::PakArchive;

/// A plain directory layer: a search root plus the game folder under it.
pub(crate) struct Directory {
    pub(crate) root: PathBuf,
    pub(crate) gamedir: String,
}

/// One layer of the search chain.
pub(crate) enum SearchNode {
    Dir(Directory),
    Pack(PakArchive),
}

/// The resolution order. Index 0 has the highest precedence; resolution
/// walks front to back and the first hit wins.
#[derive(Default)]
pub(crate) struct SearchChain {
    pub(crate) nodes: Vec<SearchNode>,
}

impl SearchChain {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn has_directory(&self, root: &Path, gamedir: &str) -> bool {
        self.nodes.iter().any(|node| match node {
            SearchNode::Dir(dir) => {
                dir.gamedir == gamedir
                    && dir
                        .root
                        .to_string_lossy()
                        .eq_ignore_ascii_case(&root.to_string_lossy())
            }
            SearchNode::Pack(_) => false,
        })
    }

    pub(crate) fn packs(&self) -> impl Iterator<Item = &PakArchive> {
        self.nodes.iter().filter_map(|node| match node {
            SearchNode::Pack(pack) => Some(pack),
            SearchNode::Dir(_) => None,
        })
    }

    pub(crate) fn packs_mut(&mut self) -> impl Iterator<Item = &mut PakArchive> {
        self.nodes.iter_mut().filter_map(|node| match node {
            SearchNode::Pack(pack) => Some(pack),
            SearchNode::Dir(_) => None,
        })
    }

    pub(crate) fn find_pack(&self, checksum: u32) -> Option<&PakArchive> {
        self.packs().find(|pack| pack.checksum() == checksum)
    }

    pub(crate) fn find_pack_mut(&mut self, checksum: u32) -> Option<&mut PakArchive> {
        self.packs_mut().find(|pack| pack.checksum() == checksum)
    }
}
