//! Failure and skip taxonomy for scans and deletions.

use std::path::PathBuf;
use thiserror::Error;

/// Why a delete request could not be carried out. The `Display` text is what
/// the front end shows to the user.
#[derive(Debug, Error)]
pub enum EraseError {
    #[error("Prefix not found in cache")]
    NotFound,

    #[error("Path does not exist")]
    PathGone,

    #[error("Failed to back up {path:?}: {cause:#}")]
    Backup { path: PathBuf, cause: anyhow::Error },

    #[error("Failed to remove {path:?}: {cause:#}")]
    Remove { path: PathBuf, cause: anyhow::Error },
}

/// Result of parsing one manifest: either a value or a reason it was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome<T> {
    Parsed(T),
    Skipped(String),
}

/// Where shortcut decoding stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStop {
    /// No `shortcuts\0` marker in the buffer.
    NoMarker,
    /// Reached the top-level `0x08` terminator.
    Terminator,
    /// Ran out of bytes or string terminators.
    EndOfData,
    /// An integer field was cut short; the entry being parsed is dropped.
    Truncated { offset: usize },
}

impl DecodeStop {
    pub fn is_clean(&self) -> bool {
        !matches!(self, DecodeStop::Truncated { .. })
    }
}
