//! Error types for the virtual filesystem layer.

use std::io;

use pak_archive::PakError;
use thiserror::Error;

/// Errors surfaced by filesystem operations.
///
/// [`VfsError::Uninitialized`] and [`VfsError::InvalidArgument`] mark caller
/// bugs rather than environmental failures. By default the filesystem aborts
/// on them; setting `abort_on_misuse` to false in the config turns them into
/// ordinary returned errors.
#[derive(Debug, Error)]
pub enum VfsError {
    #[error("filesystem used before initialization")]
    Uninitialized,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("base content is missing or unreadable")]
    MissingBaseContent,

    #[error("short {op} on {path}: expected {expected} bytes, got {actual}")]
    ShortIo {
        op: &'static str,
        path: String,
        expected: u64,
        actual: u64,
    },

    #[error("cannot write to a pack entry: {0}")]
    ReadOnly(String),

    #[error("pack error: {0}")]
    Pak(#[from] PakError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, VfsError>;
