//! WAL error types.

use std::io;

use thiserror::Error;

use shale_common::types::Lsn;

/// Result type for WAL operations.
pub type WalResult<T> = Result<T, WalError>;

/// Errors that can occur while flushing the write-ahead log.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum WalError {
    /// I/O error during WAL operations.
    #[error("WAL I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// The requested LSN is not known to the log.
    #[error("LSN {lsn} not found in the log")]
    LsnNotFound { lsn: Lsn },

    /// The log is closed.
    #[error("WAL is closed")]
    Closed,
}

impl WalError {
    /// Creates an LSN-not-found error.
    pub fn lsn_not_found(lsn: Lsn) -> Self {
        Self::LsnNotFound { lsn }
    }
}
