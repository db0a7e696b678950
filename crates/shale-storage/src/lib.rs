//! # shale-storage
//!
//! Page storage subsystem for shaledb.
//!
//! This crate implements the buffer pool layer that mediates every read
//! and write between access methods and the on-disk page store:
//!
//! - A fixed set of in-memory frames with pin counting and dirty tracking
//! - LRU eviction of unpinned pages
//! - Write-ahead ordering: log records are made durable before the data
//!   pages they describe

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Buffer pool manager and replacement policy
pub mod buffer;

/// Disk manager contract and file-backed implementation
pub mod disk;

/// Write-ahead log contract
pub mod wal;
