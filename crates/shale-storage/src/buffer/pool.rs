//! Buffer pool manager.
//!
//! The manager owns the frame array, the page table, and the free list,
//! and drives the replacer, the disk manager, and the log manager to
//! satisfy fetch / new / unpin / flush / delete requests.
//!
//! Locking discipline: one coarse latch covers the page table, the free
//! list, frame metadata mutation, and every replacer call, and is held for
//! the full duration of each public operation - including disk I/O, so page
//! loads and write-backs cannot race with page-table mutations. The
//! replacer's own mutex nests strictly inside (lock order: manager, then
//! replacer).

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use shale_common::constants::PAGE_SIZE;
use shale_common::types::PageId;

use super::config::BufferPoolConfig;
use super::error::{BufferError, BufferResult};
use super::frame::{BufferFrame, FrameId};
use super::handle::PageHandle;
use super::replacer::LruReplacer;
use super::BufferPoolStats;
use crate::disk::DiskManager;
use crate::wal::LogManager;

/// Page table and free list, guarded together by the manager latch.
struct PoolState {
    /// Maps resident page ids to the frames holding them.
    page_table: HashMap<PageId, FrameId>,
    /// Frames holding no page, in deterministic FIFO order.
    free_list: VecDeque<FrameId>,
}

/// The buffer pool manager.
///
/// Serves pinned page handles to clients while upholding:
///
/// - at most one frame per page, tracked by the page table
/// - only unpinned frames are evictable
/// - dirty victims are written back (log first) before their frame is
///   reused
pub struct BufferPoolManager {
    /// Configuration.
    config: BufferPoolConfig,
    /// Array of buffer frames, fixed at construction.
    frames: Vec<Arc<BufferFrame>>,
    /// Page table and free list under the manager latch.
    state: Mutex<PoolState>,
    /// LRU replacer over evictable frames.
    replacer: LruReplacer,
    /// Disk manager for page I/O and id allocation.
    disk: Arc<dyn DiskManager>,
    /// Log manager for write-ahead ordering, if any.
    log: Option<Arc<dyn LogManager>>,
    /// Fetch counter for statistics.
    fetch_count: AtomicU64,
    /// Hit counter for statistics.
    hit_count: AtomicU64,
    /// Miss counter for statistics.
    miss_count: AtomicU64,
    /// Eviction counter for statistics.
    eviction_count: AtomicU64,
    /// Write-back counter for statistics.
    flush_count: AtomicU64,
}

impl BufferPoolManager {
    /// Creates a buffer pool over the given disk manager.
    pub fn new(config: BufferPoolConfig, disk: Arc<dyn DiskManager>) -> BufferResult<Self> {
        Self::build(config, disk, None)
    }

    /// Creates a buffer pool that enforces write-ahead ordering through
    /// the given log manager.
    pub fn with_log_manager(
        config: BufferPoolConfig,
        disk: Arc<dyn DiskManager>,
        log: Arc<dyn LogManager>,
    ) -> BufferResult<Self> {
        Self::build(config, disk, Some(log))
    }

    fn build(
        config: BufferPoolConfig,
        disk: Arc<dyn DiskManager>,
        log: Option<Arc<dyn LogManager>>,
    ) -> BufferResult<Self> {
        config.validate().map_err(BufferError::config)?;

        let pool_size = config.pool_size;
        let frames: Vec<Arc<BufferFrame>> = (0..pool_size)
            .map(|i| Arc::new(BufferFrame::new(FrameId::new(i), PAGE_SIZE)))
            .collect();

        // Initially, every frame is on the free list.
        let free_list: VecDeque<FrameId> = (0..pool_size).map(FrameId::new).collect();

        Ok(Self {
            config,
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::with_capacity(pool_size),
                free_list,
            }),
            replacer: LruReplacer::new(pool_size),
            disk,
            log,
            fetch_count: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            eviction_count: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
        })
    }

    /// Fetches a page, pinning its frame.
    ///
    /// On a hit the resident frame is re-pinned. On a miss a frame is
    /// taken from the free list or evicted from the replacer, the page is
    /// read from disk, and the frame is returned pinned once.
    ///
    /// Fails with [`BufferError::PoolExhausted`] when every frame is
    /// pinned. A failed disk read leaves no page-table entry and returns
    /// the frame to the free list.
    pub fn fetch_page(&self, page_id: PageId) -> BufferResult<PageHandle> {
        if !page_id.is_valid() {
            return Err(BufferError::InvalidPageId { page_id });
        }

        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock();

        // Resident: pin and return.
        if let Some(&frame_id) = state.page_table.get(&page_id) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            let frame = &self.frames[frame_id.index()];
            self.replacer.pin(frame_id);
            frame.pin();
            return Ok(PageHandle::new(Arc::clone(frame)));
        }

        // Not resident: load from disk into a fresh frame.
        self.miss_count.fetch_add(1, Ordering::Relaxed);
        let frame_id = self.acquire_frame(&mut state)?;
        let frame = &self.frames[frame_id.index()];

        {
            let mut data = frame.write_data();
            if let Err(e) = self.disk.read_page(page_id, &mut data[..]) {
                drop(data);
                frame.reset();
                state.free_list.push_back(frame_id);
                return Err(e.into());
            }
        }

        frame.set_page_id(page_id);
        frame.pin();
        state.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);
        trace!(page_id = %page_id, frame_id = frame_id.index(), "page loaded");
        Ok(PageHandle::new(Arc::clone(frame)))
    }

    /// Creates a brand-new page, pinning its frame.
    ///
    /// The page id comes from the disk manager; the frame starts zeroed
    /// and clean, and is never read from disk.
    pub fn new_page(&self) -> BufferResult<PageHandle> {
        let mut state = self.state.lock();
        let frame_id = self.acquire_frame(&mut state)?;
        let frame = &self.frames[frame_id.index()];

        let page_id = match self.disk.allocate_page() {
            Ok(page_id) => page_id,
            Err(e) => {
                state.free_list.push_back(frame_id);
                return Err(e.into());
            }
        };

        frame.set_page_id(page_id);
        frame.pin();
        state.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);
        trace!(page_id = %page_id, frame_id = frame_id.index(), "new page");
        Ok(PageHandle::new(Arc::clone(frame)))
    }

    /// Releases one pin on a resident page.
    ///
    /// `is_dirty` declares whether the caller modified the page; the dirty
    /// bit is sticky and only cleared by a write-back. When the pin count
    /// reaches zero the frame becomes evictable.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> BufferResult<()> {
        let state = self.state.lock();
        let &frame_id = state
            .page_table
            .get(&page_id)
            .ok_or_else(|| BufferError::not_resident(page_id))?;
        let frame = &self.frames[frame_id.index()];

        if frame.pin_count() == 0 {
            return Err(BufferError::NotPinned { page_id });
        }

        if is_dirty {
            frame.set_dirty(true);
        }
        if frame.unpin() == 0 {
            self.replacer.unpin(frame_id);
        }
        Ok(())
    }

    /// Writes a resident page to disk if it is dirty.
    ///
    /// Idempotent on clean pages; works on pinned pages.
    pub fn flush_page(&self, page_id: PageId) -> BufferResult<()> {
        let state = self.state.lock();
        let &frame_id = state
            .page_table
            .get(&page_id)
            .ok_or_else(|| BufferError::not_resident(page_id))?;
        let frame = &self.frames[frame_id.index()];

        if frame.is_dirty() {
            self.write_back(frame)?;
        }
        Ok(())
    }

    /// Writes every dirty resident page to disk.
    ///
    /// Returns the number of pages written. Frames holding no page are
    /// skipped.
    pub fn flush_all_pages(&self) -> BufferResult<usize> {
        let _guard = self.state.lock();
        let mut flushed = 0;

        for frame in &self.frames {
            if frame.page_id().is_valid() && frame.is_dirty() {
                self.write_back(frame)?;
                flushed += 1;
            }
        }
        Ok(flushed)
    }

    /// Deletes a page from the pool and deallocates its id.
    ///
    /// A page that is not resident is deallocated directly. A pinned page
    /// cannot be deleted and fails with [`BufferError::PagePinned`].
    pub fn delete_page(&self, page_id: PageId) -> BufferResult<()> {
        let mut state = self.state.lock();

        let Some(&frame_id) = state.page_table.get(&page_id) else {
            self.disk.deallocate_page(page_id)?;
            return Ok(());
        };

        let frame = &self.frames[frame_id.index()];
        let pin_count = frame.pin_count();
        if pin_count > 0 {
            return Err(BufferError::PagePinned { page_id, pin_count });
        }

        state.page_table.remove(&page_id);
        self.replacer.pin(frame_id);
        frame.reset();
        state.free_list.push_back(frame_id);
        self.disk.deallocate_page(page_id)?;
        debug!(page_id = %page_id, frame_id = frame_id.index(), "page deleted");
        Ok(())
    }

    /// Returns the number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        self.config.pool_size
    }

    /// Returns true if the page is resident.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.state.lock().page_table.contains_key(&page_id)
    }

    /// Returns statistics about the buffer pool.
    pub fn stats(&self) -> BufferPoolStats {
        let state = self.state.lock();
        let mut pinned = 0;
        let mut dirty = 0;

        for frame in &self.frames {
            if frame.is_pinned() {
                pinned += 1;
            }
            if frame.is_dirty() {
                dirty += 1;
            }
        }

        BufferPoolStats {
            fetches: self.fetch_count.load(Ordering::Relaxed),
            hits: self.hit_count.load(Ordering::Relaxed),
            misses: self.miss_count.load(Ordering::Relaxed),
            evictions: self.eviction_count.load(Ordering::Relaxed),
            flushes: self.flush_count.load(Ordering::Relaxed),
            resident_pages: state.page_table.len(),
            pinned_frames: pinned,
            dirty_frames: dirty,
            free_frames: state.free_list.len(),
            evictable_frames: self.replacer.len(),
        }
    }

    // -------------------------------------------------------------------------
    // Private helpers
    // -------------------------------------------------------------------------

    /// Obtains a reusable frame: free list first, then the replacer.
    ///
    /// A dirty victim is written back (log first) before its page-table
    /// entry is dropped. On success the frame is reset (free, zeroed). If
    /// the victim's write-back fails the eviction is aborted: the page
    /// stays mapped to its frame and the frame re-enters the evictable
    /// set.
    fn acquire_frame(&self, state: &mut PoolState) -> BufferResult<FrameId> {
        // Free frames carry no I/O cost; always prefer them.
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = self.replacer.victim().ok_or(BufferError::PoolExhausted)?;
        let frame = &self.frames[frame_id.index()];

        if frame.is_dirty() {
            if let Err(e) = self.write_back(frame) {
                warn!(
                    page_id = %frame.page_id(),
                    frame_id = frame_id.index(),
                    error = %e,
                    "write-back failed, eviction aborted"
                );
                self.replacer.unpin(frame_id);
                return Err(e);
            }
        }

        let old_page_id = frame.page_id();
        state.page_table.remove(&old_page_id);
        frame.reset();
        self.eviction_count.fetch_add(1, Ordering::Relaxed);
        debug!(page_id = %old_page_id, frame_id = frame_id.index(), "page evicted");
        Ok(frame_id)
    }

    /// Writes a frame's page to disk and clears the dirty bit.
    ///
    /// Write-ahead rule: log records up to the frame's LSN are made
    /// durable before the page itself is written.
    fn write_back(&self, frame: &BufferFrame) -> BufferResult<()> {
        if let Some(log) = &self.log {
            let lsn = frame.lsn();
            if lsn.is_valid() && log.durable_lsn() < lsn {
                log.flush_until(lsn)?;
            }
        }

        {
            let data = frame.read_data();
            self.disk.write_page(frame.page_id(), &data[..])?;
        }
        frame.set_dirty(false);
        self.flush_count.fetch_add(1, Ordering::Relaxed);
        trace!(page_id = %frame.page_id(), "page written back");
        Ok(())
    }
}

impl std::fmt::Debug for BufferPoolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPoolManager")
            .field("pool_size", &self.config.pool_size)
            .field("stats", &self.stats())
            .finish()
    }
}
