//! I/O error types for the disk module.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for disk I/O operations.
pub type IoResult<T> = Result<T, IoError>;

/// Errors that can occur during disk I/O operations.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum IoError {
    /// Standard I/O error.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// File not found.
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    /// Permission denied.
    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Short read/write (less data than expected).
    #[error("short {operation}: expected {expected} bytes, got {actual}")]
    ShortIo {
        operation: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl IoError {
    /// Creates a new NotFound error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates a ShortIo error for reads.
    pub fn short_read(expected: usize, actual: usize) -> Self {
        Self::ShortIo {
            operation: "read",
            expected,
            actual,
        }
    }

    /// Creates a ShortIo error for writes.
    pub fn short_write(expected: usize, actual: usize) -> Self {
        Self::ShortIo {
            operation: "write",
            expected,
            actual,
        }
    }

    /// Returns true if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
            || matches!(self, Self::Io { source } if source.kind() == io::ErrorKind::NotFound)
    }

    /// Converts from std::io::Error with path context.
    pub fn from_io_with_path(err: io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { source: err },
        }
    }
}
