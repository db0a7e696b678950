//! LRU replacement policy for the buffer pool.
//!
//! The replacer tracks the set of *evictable* frames: resident frames whose
//! pin count has dropped to zero. It keeps them ordered by the time they
//! became evictable, using a HashMap for O(1) lookups and a doubly-linked
//! list for ordering.
//!
//! Orientation: [`LruReplacer::unpin`] inserts at the *front* of the list
//! and [`LruReplacer::victim`] pops the *back*, so the back always holds
//! the least-recently-unpinned frame.

use std::collections::HashMap;
use std::ptr::NonNull;

use parking_lot::Mutex;

use super::frame::FrameId;

/// A node in the LRU linked list.
struct Node {
    frame_id: FrameId,
    prev: Option<NonNull<Node>>,
    next: Option<NonNull<Node>>,
}

impl Node {
    fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            prev: None,
            next: None,
        }
    }
}

/// The list half of the replacer: map from frame id to node, plus the
/// ordered list itself.
struct LruList {
    /// Map from frame id to node pointer.
    map: HashMap<FrameId, NonNull<Node>>,
    /// Head of the list (most recently unpinned).
    head: Option<NonNull<Node>>,
    /// Tail of the list (least recently unpinned, the victim end).
    tail: Option<NonNull<Node>>,
}

// Safety: LruList owns its nodes and is only reachable through the
// replacer's mutex.
unsafe impl Send for LruList {}

impl LruList {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn contains(&self, frame_id: FrameId) -> bool {
        self.map.contains_key(&frame_id)
    }

    /// Inserts a frame at the front (most recent).
    fn push_front(&mut self, frame_id: FrameId) {
        let node = Box::new(Node::new(frame_id));
        let node_ptr = NonNull::from(Box::leak(node));

        unsafe {
            (*node_ptr.as_ptr()).next = self.head;
            if let Some(head) = self.head {
                (*head.as_ptr()).prev = Some(node_ptr);
            }
        }
        self.head = Some(node_ptr);
        if self.tail.is_none() {
            self.tail = Some(node_ptr);
        }

        self.map.insert(frame_id, node_ptr);
    }

    /// Unlinks a node from the list without freeing it.
    fn unlink(&mut self, node_ptr: NonNull<Node>) {
        unsafe {
            let prev = (*node_ptr.as_ptr()).prev;
            let next = (*node_ptr.as_ptr()).next;

            if let Some(prev) = prev {
                (*prev.as_ptr()).next = next;
            } else {
                self.head = next;
            }

            if let Some(next) = next {
                (*next.as_ptr()).prev = prev;
            } else {
                self.tail = prev;
            }
        }
    }

    /// Removes a frame from the list, if tracked.
    fn remove(&mut self, frame_id: FrameId) -> bool {
        if let Some(node_ptr) = self.map.remove(&frame_id) {
            self.unlink(node_ptr);
            // Safety: removed from the map, so the list owns it exclusively
            unsafe { drop(Box::from_raw(node_ptr.as_ptr())) };
            true
        } else {
            false
        }
    }

    /// Removes and returns the frame at the tail (least recent).
    fn pop_back(&mut self) -> Option<FrameId> {
        let tail = self.tail?;
        // Safety: tail is a live node owned by this list
        let frame_id = unsafe { (*tail.as_ptr()).frame_id };
        self.unlink(tail);
        self.map.remove(&frame_id);
        unsafe { drop(Box::from_raw(tail.as_ptr())) };
        Some(frame_id)
    }
}

impl Drop for LruList {
    fn drop(&mut self) {
        let mut current = self.head;
        while let Some(node_ptr) = current {
            unsafe {
                current = (*node_ptr.as_ptr()).next;
                drop(Box::from_raw(node_ptr.as_ptr()));
            }
        }
    }
}

/// LRU replacer with O(1) victim selection, pin, and unpin.
///
/// All operations are linearizable under the internal mutex. The manager
/// always calls in while holding its own latch (lock order: manager before
/// replacer); the replacer never calls back out.
pub struct LruReplacer {
    inner: Mutex<LruList>,
}

impl LruReplacer {
    /// Creates a replacer sized for `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruList::with_capacity(capacity)),
        }
    }

    /// Removes and returns the least-recently-unpinned frame, or `None`
    /// if no frame is evictable.
    pub fn victim(&self) -> Option<FrameId> {
        self.inner.lock().pop_back()
    }

    /// Removes a frame from the evictable set.
    ///
    /// Idempotent: pinning an untracked frame is a no-op.
    pub fn pin(&self, frame_id: FrameId) {
        self.inner.lock().remove(frame_id);
    }

    /// Adds a frame to the evictable set as the most recent entry.
    ///
    /// If the frame is already tracked this is a no-op and its position is
    /// preserved: a frame that became evictable once stays in line until
    /// chosen or re-pinned.
    pub fn unpin(&self, frame_id: FrameId) {
        let mut list = self.inner.lock();
        if !list.contains(frame_id) {
            list.push_front(frame_id);
        }
    }

    /// Returns the number of evictable frames.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true if no frame is evictable.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the frame is currently evictable.
    pub fn contains(&self, frame_id: FrameId) -> bool {
        self.inner.lock().contains(frame_id)
    }
}

impl std::fmt::Debug for LruReplacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruReplacer")
            .field("evictable", &self.len())
            .finish()
    }
}
