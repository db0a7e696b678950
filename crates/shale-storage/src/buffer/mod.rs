//! Buffer pool for shaledb.
//!
//! The buffer pool manages a fixed-size pool of in-memory page frames,
//! mediating every read and write between access methods and the on-disk
//! page store:
//!
//! - **Page Caching**: keep resident pages in memory, one frame per page
//! - **Pin/Unpin**: reference counting that blocks eviction of pages in use
//! - **Dirty Tracking**: modified pages are written back before frame reuse
//! - **Eviction Policy**: least-recently-unpinned replacement
//! - **Write-Ahead Ordering**: log records become durable before the data
//!   pages they describe
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     BufferPoolManager                        │
//! │  ┌────────────────────────────┐  ┌─────────────────────────┐ │
//! │  │         Page Table         │  │        Free List        │ │
//! │  │   HashMap<PageId, FrameId> │  │    VecDeque<FrameId>    │ │
//! │  └────────────────────────────┘  └─────────────────────────┘ │
//! │                │                                             │
//! │                ▼                                             │
//! │  ┌──────────────────────────────────────────────────────────┐│
//! │  │                      Frame Array                         ││
//! │  │  ┌─────────┐ ┌─────────┐ ┌─────────┐     ┌─────────┐    ││
//! │  │  │ Frame 0 │ │ Frame 1 │ │ Frame 2 │ ... │ Frame N │    ││
//! │  │  │ page_id │ │ page_id │ │ page_id │     │ page_id │    ││
//! │  │  │ data[]  │ │ data[]  │ │ data[]  │     │ data[]  │    ││
//! │  │  │ dirty   │ │ dirty   │ │ dirty   │     │ dirty   │    ││
//! │  │  │ pin_cnt │ │ pin_cnt │ │ pin_cnt │     │ pin_cnt │    ││
//! │  │  └─────────┘ └─────────┘ └─────────┘     └─────────┘    ││
//! │  └──────────────────────────────────────────────────────────┘│
//! │                │                                             │
//! │                ▼                                             │
//! │  ┌──────────────────────────────────────────────────────────┐│
//! │  │                     LRU Replacer                         ││
//! │  │          (unpinned frames, oldest evicted first)         ││
//! │  └──────────────────────────────────────────────────────────┘│
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use shale_storage::buffer::{BufferPoolConfig, BufferPoolManager};
//! use shale_storage::disk::FileDiskManager;
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let disk = Arc::new(FileDiskManager::open("data.db")?);
//!     let pool = BufferPoolManager::new(BufferPoolConfig::new(1000), disk)?;
//!
//!     // Create a page, write to it, release the claim.
//!     let page = pool.new_page()?;
//!     let page_id = page.page_id();
//!     page.data_mut()[0] = 1;
//!     pool.unpin_page(page_id, true)?;
//!
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod frame;
mod handle;
mod pool;
mod replacer;

pub use config::BufferPoolConfig;
pub use error::{BufferError, BufferResult};
pub use frame::{BufferFrame, FrameId};
pub use handle::PageHandle;
pub use pool::BufferPoolManager;
pub use replacer::LruReplacer;

/// Statistics for buffer pool monitoring.
#[derive(Debug, Clone, Default)]
pub struct BufferPoolStats {
    /// Total number of page fetches.
    pub fetches: u64,
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses (required a disk read).
    pub misses: u64,
    /// Number of pages evicted.
    pub evictions: u64,
    /// Number of dirty pages written back.
    pub flushes: u64,
    /// Current number of resident pages.
    pub resident_pages: usize,
    /// Current number of pinned frames.
    pub pinned_frames: usize,
    /// Current number of dirty frames.
    pub dirty_frames: usize,
    /// Current number of free frames.
    pub free_frames: usize,
    /// Current number of evictable frames.
    pub evictable_frames: usize,
}

impl BufferPoolStats {
    /// Returns the cache hit ratio (0.0 to 1.0).
    pub fn hit_ratio(&self) -> f64 {
        if self.fetches == 0 {
            0.0
        } else {
            self.hits as f64 / self.fetches as f64
        }
    }
}
