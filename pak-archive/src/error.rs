//! Error types for pack catalog operations

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PakError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Corrupt or unreadable pack {path}: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("Entry {0} not found in pack")]
    EntryNotFound(String),

    #[error("Malformed descriptor: {0}")]
    MalformedDescriptor(String),
}

impl From<zip::result::ZipError> for PakError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(io) => Self::Io(io),
            other => Self::Corrupt {
                path: String::new(),
                reason: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, PakError>;
