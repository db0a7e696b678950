//! Write-ahead log contract.
//!
//! The buffer pool never writes a dirty data page before the log records
//! describing its changes are durable. It consumes the log through the
//! narrow [`LogManager`] contract; the log's internals (segments, group
//! commit, recovery) live behind it.

mod error;

pub use error::{WalError, WalResult};

use shale_common::types::Lsn;

/// Contract for write-ahead log durability.
///
/// Before the buffer pool writes a dirty page whose metadata carries a
/// valid LSN, it calls [`LogManager::flush_until`] with that LSN. A pool
/// constructed without a log manager writes pages directly.
pub trait LogManager: Send + Sync {
    /// Returns the highest LSN known to be durable.
    fn durable_lsn(&self) -> Lsn;

    /// Blocks until every log record at or below `lsn` is durable.
    ///
    /// Must be idempotent: flushing an already-durable LSN is a no-op.
    fn flush_until(&self, lsn: Lsn) -> WalResult<()>;
}
