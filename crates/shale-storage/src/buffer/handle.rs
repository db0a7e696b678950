//! Page handles returned by the buffer pool.
//!
//! A handle is the client's view of a pinned frame: read-only metadata plus
//! latched access to the page bytes. Dropping a handle does *not* unpin the
//! page - clients release their claim explicitly through
//! [`unpin_page`](super::BufferPoolManager::unpin_page), declaring at that
//! point whether they dirtied the page.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use shale_common::types::{Lsn, PageId};

use super::frame::{BufferFrame, FrameId};

/// Handle to a pinned page in the buffer pool.
///
/// The frame cannot be evicted or reused while the pin taken out by
/// [`fetch_page`](super::BufferPoolManager::fetch_page) or
/// [`new_page`](super::BufferPoolManager::new_page) is outstanding.
pub struct PageHandle {
    frame: Arc<BufferFrame>,
}

impl PageHandle {
    pub(crate) fn new(frame: Arc<BufferFrame>) -> Self {
        Self { frame }
    }

    /// Returns the page ID.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.frame.page_id()
    }

    /// Returns the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame.frame_id()
    }

    /// Returns the current pin count.
    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.frame.pin_count()
    }

    /// Returns true if the page is dirty.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.frame.is_dirty()
    }

    /// Returns the LSN of the last logged modification.
    #[inline]
    pub fn lsn(&self) -> Lsn {
        self.frame.lsn()
    }

    /// Records the LSN of a logged modification to this page.
    ///
    /// The buffer pool flushes the log up to this LSN before writing the
    /// page back.
    #[inline]
    pub fn set_lsn(&self, lsn: Lsn) {
        self.frame.set_lsn(lsn);
    }

    /// Returns a read latch over the page data.
    #[inline]
    pub fn data(&self) -> impl Deref<Target = [u8]> + '_ {
        PageDataRef {
            guard: self.frame.read_data(),
        }
    }

    /// Returns a write latch over the page data.
    ///
    /// Modifications are reported to the pool at unpin time via the
    /// `is_dirty` flag, not here.
    #[inline]
    pub fn data_mut(&self) -> impl DerefMut<Target = [u8]> + '_ {
        PageDataMut {
            guard: self.frame.write_data(),
        }
    }
}

impl std::fmt::Debug for PageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageHandle")
            .field("page_id", &self.page_id())
            .field("frame_id", &self.frame_id())
            .field("pin_count", &self.pin_count())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

/// Helper struct to provide Deref for page data.
struct PageDataRef<'a> {
    guard: parking_lot::RwLockReadGuard<'a, Vec<u8>>,
}

impl<'a> Deref for PageDataRef<'a> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

/// Helper struct to provide DerefMut for page data.
struct PageDataMut<'a> {
    guard: parking_lot::RwLockWriteGuard<'a, Vec<u8>>,
}

impl<'a> Deref for PageDataMut<'a> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<'a> DerefMut for PageDataMut<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}
