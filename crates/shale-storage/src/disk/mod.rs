//! Disk manager layer for shaledb.
//!
//! The buffer pool consumes the disk through the narrow [`DiskManager`]
//! contract: fixed-size page reads and writes plus page id allocation.
//! [`FileDiskManager`] is the default backend, a single data file addressed
//! as `offset = page_id * PAGE_SIZE` with synchronous positioned I/O.
//!
//! # Usage
//!
//! ```rust,no_run
//! use shale_storage::disk::{DiskManager, FileDiskManager};
//! use shale_common::constants::PAGE_SIZE;
//!
//! fn example() -> shale_storage::disk::IoResult<()> {
//!     let disk = FileDiskManager::open("data.db")?;
//!
//!     let page_id = disk.allocate_page()?;
//!     let buf = [0u8; PAGE_SIZE];
//!     disk.write_page(page_id, &buf)?;
//!
//!     Ok(())
//! }
//! ```

mod error;
mod manager;

pub use error::{IoError, IoResult};
pub use manager::{DiskManager, FileDiskManager};
