//! Error types for the disk manager.

use std::io;
use std::path::PathBuf;

use oxbow_common::types::PageId;
use thiserror::Error;

/// Result type for disk manager operations.
pub type DiskResult<T> = Result<T, DiskError>;

/// Errors that can occur during disk I/O.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum DiskError {
    /// Standard I/O error.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Database file could not be opened.
    #[error("failed to open database file {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    /// Operation was given an invalid page id.
    #[error("invalid page id: {page_id}")]
    InvalidPageId { page_id: PageId },

    /// Caller-supplied buffer does not span a whole page.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSize { expected: usize, actual: usize },
}

impl DiskError {
    /// Creates an open error with the offending path attached.
    pub fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid page id error.
    pub fn invalid_page_id(page_id: PageId) -> Self {
        Self::InvalidPageId { page_id }
    }
}
