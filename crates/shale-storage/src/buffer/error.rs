//! Buffer pool errors.

use shale_common::types::PageId;
use thiserror::Error;

use crate::disk::IoError;
use crate::wal::WalError;

/// Result type for buffer pool operations.
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer pool operations.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum BufferError {
    /// Every frame is pinned; nothing can be evicted.
    #[error("buffer pool exhausted, all frames are pinned")]
    PoolExhausted,

    /// Page is not resident in the buffer pool.
    #[error("page {page_id} is not resident in the buffer pool")]
    PageNotResident { page_id: PageId },

    /// The page's frame is not pinned (cannot unpin).
    #[error("page {page_id} is not pinned")]
    NotPinned { page_id: PageId },

    /// The page is pinned by someone (cannot delete).
    #[error("page {page_id} is in use (pin count {pin_count})")]
    PagePinned { page_id: PageId, pin_count: u32 },

    /// Invalid page ID.
    #[error("invalid page ID: {page_id}")]
    InvalidPageId { page_id: PageId },

    /// Disk I/O error during page read/write.
    #[error("disk I/O error: {0}")]
    Io(#[from] IoError),

    /// WAL flush failed before a dirty page write.
    #[error("WAL flush error: {0}")]
    Wal(#[from] WalError),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl BufferError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a page-not-resident error.
    pub fn not_resident(page_id: PageId) -> Self {
        Self::PageNotResident { page_id }
    }

    /// Returns true if this is a transient error that can be retried once
    /// pages have been unpinned.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PoolExhausted | Self::PagePinned { .. })
    }
}
