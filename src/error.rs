//! Error types for each stage of a run.
//!
//! Library code never exits the process; the driver in `main.rs` decides which
//! of these are fatal.

use std::path::PathBuf;
use thiserror::Error;

/// Conflicting or missing command-line flags.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("both -u (update) and -f (freshen) specified")]
    ConflictingPolicies,
}

/// The archive could not be opened or its central directory could not be read.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a zip file (end of central directory not found)")]
    NotAZipFile,

    #[error("zip file is truncated: {0}")]
    Truncated(String),

    #[error("central directory is corrupt: {0}")]
    CentralDirectoryCorrupt(String),

    #[error("read error: {0}")]
    Io(#[from] std::io::Error),
}

/// A source path that could not be inventoried.
#[derive(Debug, Error)]
#[error("{}: {source}", path.display())]
pub struct SourceWalkError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Failure to write a single archive entry.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("{entry}: refusing to write outside the destination")]
    UnsafePath { entry: String },

    #[error("{entry}: unsupported compression method {method}")]
    UnsupportedMethod { entry: String, method: u16 },

    #[error("{entry}: encrypted entries are not supported")]
    Encrypted { entry: String },

    #[error("{entry}: corrupt entry data: {reason}")]
    CorruptData { entry: String, reason: String },

    #[error("{entry}: checksum mismatch (expected {expected:08x}, got {actual:08x})")]
    ChecksumMismatch {
        entry: String,
        expected: u32,
        actual: u32,
    },

    #[error("{entry}: {}: {source}", path.display())]
    Io {
        entry: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExtractionError {
    /// Archive path of the entry that failed.
    pub fn entry(&self) -> &str {
        match self {
            ExtractionError::UnsafePath { entry }
            | ExtractionError::UnsupportedMethod { entry, .. }
            | ExtractionError::Encrypted { entry }
            | ExtractionError::CorruptData { entry, .. }
            | ExtractionError::ChecksumMismatch { entry, .. }
            | ExtractionError::Io { entry, .. } => entry,
        }
    }
}

/// Top-level failure of a synchronization run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("no valid files found")]
    NoValidSources { errors: Vec<SourceWalkError> },

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}
