//! Buffer frame - a slot in the buffer pool that holds a page.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use parking_lot::RwLock;
use shale_common::types::{Lsn, PageId};

/// Frame identifier - index into the buffer pool's frame array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub usize);

impl FrameId {
    /// Invalid frame ID.
    pub const INVALID: Self = Self(usize::MAX);

    /// Creates a new frame ID.
    #[inline]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Returns the raw index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }

    /// Checks if this is a valid frame ID.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != usize::MAX
    }
}

impl From<usize> for FrameId {
    fn from(id: usize) -> Self {
        Self::new(id)
    }
}

impl From<FrameId> for usize {
    fn from(id: FrameId) -> Self {
        id.0
    }
}

/// A buffer frame holds a single page in memory.
///
/// Each frame has:
/// - A data buffer for the page contents, behind its own read-write latch
/// - Metadata (page_id, pin count, dirty flag, LSN)
///
/// Metadata lives in atomics so that page handles can read it without the
/// manager latch; it is only *mutated* by the manager while its latch is
/// held.
pub struct BufferFrame {
    /// Frame ID (index in the frame array).
    frame_id: FrameId,
    /// Page data buffer.
    data: RwLock<Vec<u8>>,
    /// Page ID stored in this frame (INVALID if free).
    page_id: AtomicU64,
    /// Pin count (number of active references).
    pin_count: AtomicU32,
    /// Whether the page is dirty (modified since last write-back).
    dirty: AtomicBool,
    /// LSN of the last logged modification.
    lsn: AtomicU64,
}

impl BufferFrame {
    /// Creates a new free buffer frame.
    pub fn new(frame_id: FrameId, page_size: usize) -> Self {
        Self {
            frame_id,
            data: RwLock::new(vec![0u8; page_size]),
            page_id: AtomicU64::new(PageId::INVALID.as_u64()),
            pin_count: AtomicU32::new(0),
            dirty: AtomicBool::new(false),
            lsn: AtomicU64::new(Lsn::INVALID.as_u64()),
        }
    }

    /// Returns the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Returns the page ID stored in this frame.
    #[inline]
    pub fn page_id(&self) -> PageId {
        PageId::new(self.page_id.load(Ordering::Acquire))
    }

    /// Sets the page ID for this frame.
    #[inline]
    pub(crate) fn set_page_id(&self, page_id: PageId) {
        self.page_id.store(page_id.as_u64(), Ordering::Release);
    }

    /// Returns true if this frame is free (no page assigned).
    #[inline]
    pub fn is_free(&self) -> bool {
        !self.page_id().is_valid()
    }

    /// Returns the current pin count.
    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    /// Increments the pin count and returns the new value.
    #[inline]
    pub(crate) fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrements the pin count and returns the new value.
    ///
    /// The manager checks the count before calling; an unpin of an already
    /// unpinned frame saturates at zero rather than wrapping.
    #[inline]
    pub(crate) fn unpin(&self) -> u32 {
        let old = self.pin_count.load(Ordering::Acquire);
        if old == 0 {
            return 0;
        }
        self.pin_count.fetch_sub(1, Ordering::AcqRel) - 1
    }

    /// Returns true if the frame is pinned.
    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    /// Returns true if the frame is dirty.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Marks the frame as dirty or clean.
    #[inline]
    pub(crate) fn set_dirty(&self, dirty: bool) {
        self.dirty.store(dirty, Ordering::Release);
    }

    /// Returns the LSN of the last logged modification.
    #[inline]
    pub fn lsn(&self) -> Lsn {
        Lsn::new(self.lsn.load(Ordering::Acquire))
    }

    /// Sets the LSN.
    #[inline]
    pub fn set_lsn(&self, lsn: Lsn) {
        self.lsn.store(lsn.as_u64(), Ordering::Release);
    }

    /// Returns a read latch on the page data.
    #[inline]
    pub fn read_data(&self) -> parking_lot::RwLockReadGuard<'_, Vec<u8>> {
        self.data.read()
    }

    /// Returns a write latch on the page data.
    #[inline]
    pub fn write_data(&self) -> parking_lot::RwLockWriteGuard<'_, Vec<u8>> {
        self.data.write()
    }

    /// Resets the frame to the free state with zeroed memory.
    pub(crate) fn reset(&self) {
        self.page_id
            .store(PageId::INVALID.as_u64(), Ordering::Release);
        self.pin_count.store(0, Ordering::Release);
        self.dirty.store(false, Ordering::Release);
        self.lsn.store(Lsn::INVALID.as_u64(), Ordering::Release);
        self.data.write().fill(0);
    }
}

impl std::fmt::Debug for BufferFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferFrame")
            .field("frame_id", &self.frame_id)
            .field("page_id", &self.page_id())
            .field("pin_count", &self.pin_count())
            .field("dirty", &self.is_dirty())
            .field("lsn", &self.lsn())
            .finish()
    }
}
