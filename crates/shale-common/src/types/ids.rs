//! Identifier newtypes for the storage subsystem.
//!
//! Page ids and log sequence numbers are both 64-bit integers at rest;
//! wrapping them keeps a page id from ever landing where an LSN belongs.
//! Both carry a sentinel value so frame metadata can be stored in plain
//! atomics without an `Option`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one fixed-size page in the data file.
///
/// Ids are handed out by the disk manager and never reused. The buffer
/// pool keys its page table on them; [`PageId::INVALID`] marks a frame
/// that holds no page.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PageId(u64);

impl PageId {
    /// Sentinel meaning "no page".
    pub const INVALID: Self = Self(u64::MAX);

    /// Wraps a raw page id.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id, e.g. for computing a file offset.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// False only for the [`PageId::INVALID`] sentinel.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl fmt::Debug for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "PageId({})", self.0)
        } else {
            write!(f, "PageId(INVALID)")
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position in the write-ahead log.
///
/// Each frame remembers the LSN of its last logged change. Before writing
/// a dirty page back, the buffer pool compares that LSN against the log's
/// durable horizon to decide whether the log must be flushed first.
/// [`Lsn::INVALID`] (zero) means the page has no logged changes and may be
/// written directly.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Lsn(u64);

impl Lsn {
    /// Sentinel meaning "never logged".
    pub const INVALID: Self = Self(0);

    /// Wraps a raw sequence number.
    #[inline]
    #[must_use]
    pub const fn new(lsn: u64) -> Self {
        Self(lsn)
    }

    /// Returns the raw sequence number.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// False only for the [`Lsn::INVALID`] sentinel.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl fmt::Debug for Lsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Lsn({})", self.0)
        } else {
            write!(f, "Lsn(INVALID)")
        }
    }
}

impl fmt::Display for Lsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_round_trip() {
        let page = PageId::new(42);
        assert_eq!(page.as_u64(), 42);
        assert!(page.is_valid());
        assert!(!PageId::INVALID.is_valid());
    }

    #[test]
    fn test_sentinels_format_as_such() {
        assert_eq!(format!("{:?}", PageId::new(7)), "PageId(7)");
        assert_eq!(format!("{:?}", PageId::INVALID), "PageId(INVALID)");
        assert_eq!(format!("{:?}", Lsn::new(7)), "Lsn(7)");
        assert_eq!(format!("{:?}", Lsn::INVALID), "Lsn(INVALID)");
    }

    #[test]
    fn test_lsn_ordering() {
        // The write-back path compares the frame LSN against the durable
        // horizon, so ordering must follow the raw integers.
        assert!(Lsn::INVALID < Lsn::new(1));
        assert!(Lsn::new(1) < Lsn::new(2));
    }
}
