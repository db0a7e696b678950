//! Disk manager contract and the file-backed default implementation.

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use shale_common::constants::PAGE_SIZE;
use shale_common::types::PageId;

use super::error::{IoError, IoResult};

/// Contract for synchronous page-granular disk access.
///
/// The buffer pool is the only caller; it always passes buffers of exactly
/// [`PAGE_SIZE`] bytes. Implementations must be safe to share across
/// threads.
pub trait DiskManager: Send + Sync {
    /// Reads the page into `buf`.
    ///
    /// Pages that were allocated but never written read as zeroes.
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> IoResult<()>;

    /// Writes the page from `buf`, all bytes or an error.
    fn write_page(&self, page_id: PageId, buf: &[u8]) -> IoResult<()>;

    /// Allocates a fresh, never-previously-used page id.
    fn allocate_page(&self) -> IoResult<PageId>;

    /// Marks a page id available for future allocation.
    ///
    /// Implementations with bump allocation may treat this as a no-op, but
    /// callers must still invoke it for every deleted page.
    fn deallocate_page(&self, page_id: PageId) -> IoResult<()>;

    /// Syncs all written pages to stable storage.
    fn sync(&self) -> IoResult<()>;
}

/// Single-file disk manager with synchronous positioned I/O.
///
/// Page `n` lives at byte offset `n * PAGE_SIZE`. The next page id to hand
/// out is recovered from the file length at open, so ids stay unique across
/// restarts. Deallocated ids are not reused.
pub struct FileDiskManager {
    /// The underlying data file, wrapped in a mutex for thread-safe access.
    file: Mutex<File>,
    /// The data file path.
    path: PathBuf,
    /// Next page id to allocate.
    next_page_id: AtomicU64,
}

impl FileDiskManager {
    /// Opens (or creates) a data file.
    pub fn open(path: impl AsRef<Path>) -> IoResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(|e| IoError::from_io_with_path(e, &path))?;

        let len = file.metadata().map(|m| m.len())?;
        let next_page_id = len.div_ceil(PAGE_SIZE as u64);

        Ok(Self {
            file: Mutex::new(file),
            path,
            next_page_id: AtomicU64::new(next_page_id),
        })
    }

    /// Returns the data file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of page ids handed out so far.
    pub fn allocated_pages(&self) -> u64 {
        self.next_page_id.load(Ordering::Acquire)
    }

    fn page_offset(page_id: PageId) -> u64 {
        page_id.as_u64() * PAGE_SIZE as u64
    }
}

impl DiskManager for FileDiskManager {
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> IoResult<()> {
        debug_assert_eq!(buf.len(), PAGE_SIZE);

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(Self::page_offset(page_id)))?;

        let mut total = 0;
        while total < buf.len() {
            match file.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(IoError::Io { source: e }),
            }
        }
        // The tail of a page past EOF reads as zeroes: the page was
        // allocated but never written back.
        buf[total..].fill(0);
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> IoResult<()> {
        debug_assert_eq!(buf.len(), PAGE_SIZE);

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(Self::page_offset(page_id)))?;

        let mut total = 0;
        while total < buf.len() {
            match file.write(&buf[total..]) {
                Ok(0) => return Err(IoError::short_write(buf.len(), total)),
                Ok(n) => total += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(IoError::Io { source: e }),
            }
        }
        Ok(())
    }

    fn allocate_page(&self) -> IoResult<PageId> {
        Ok(PageId::new(self.next_page_id.fetch_add(1, Ordering::AcqRel)))
    }

    fn deallocate_page(&self, page_id: PageId) -> IoResult<()> {
        // Bump allocation: the id is retired, not recycled.
        tracing::trace!(page_id = %page_id, "deallocate page");
        Ok(())
    }

    fn sync(&self) -> IoResult<()> {
        let file = self.file.lock();
        file.sync_all().map_err(|e| IoError::Io { source: e })
    }
}

impl std::fmt::Debug for FileDiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDiskManager")
            .field("path", &self.path)
            .field("next_page_id", &self.allocated_pages())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_test_disk(name: &str) -> (tempfile::TempDir, FileDiskManager) {
        let dir = tempdir().unwrap();
        let disk = FileDiskManager::open(dir.path().join(name)).unwrap();
        (dir, disk)
    }

    #[test]
    fn test_allocate_is_monotonic() {
        let (_dir, disk) = open_test_disk("alloc.db");

        let a = disk.allocate_page().unwrap();
        let b = disk.allocate_page().unwrap();
        assert_eq!(a, PageId::new(0));
        assert_eq!(b, PageId::new(1));
        assert_eq!(disk.allocated_pages(), 2);
    }

    #[test]
    fn test_write_and_read_page() {
        let (_dir, disk) = open_test_disk("rw.db");

        let page_id = disk.allocate_page().unwrap();
        let mut data = [0u8; PAGE_SIZE];
        data[0] = 0xAA;
        data[PAGE_SIZE - 1] = 0xBB;
        disk.write_page(page_id, &data).unwrap();

        let mut buf = [0u8; PAGE_SIZE];
        disk.read_page(page_id, &mut buf).unwrap();
        assert_eq!(buf[0], 0xAA);
        assert_eq!(buf[PAGE_SIZE - 1], 0xBB);
    }

    #[test]
    fn test_read_unwritten_page_is_zeroed() {
        let (_dir, disk) = open_test_disk("zero.db");

        let page_id = disk.allocate_page().unwrap();
        let mut buf = [0xFFu8; PAGE_SIZE];
        disk.read_page(page_id, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_pages_do_not_overlap() {
        let (_dir, disk) = open_test_disk("overlap.db");

        let a = disk.allocate_page().unwrap();
        let b = disk.allocate_page().unwrap();
        disk.write_page(a, &[0x11u8; PAGE_SIZE]).unwrap();
        disk.write_page(b, &[0x22u8; PAGE_SIZE]).unwrap();

        let mut buf = [0u8; PAGE_SIZE];
        disk.read_page(a, &mut buf).unwrap();
        assert!(buf.iter().all(|&v| v == 0x11));
        disk.read_page(b, &mut buf).unwrap();
        assert!(buf.iter().all(|&v| v == 0x22));
    }

    #[test]
    fn test_next_page_id_recovered_from_file_length() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reopen.db");

        {
            let disk = FileDiskManager::open(&path).unwrap();
            let page_id = disk.allocate_page().unwrap();
            disk.write_page(page_id, &[0x33u8; PAGE_SIZE]).unwrap();
            disk.sync().unwrap();
        }

        let disk = FileDiskManager::open(&path).unwrap();
        assert_eq!(disk.allocate_page().unwrap(), PageId::new(1));
    }

    #[test]
    fn test_deallocate_is_accepted() {
        let (_dir, disk) = open_test_disk("dealloc.db");

        let page_id = disk.allocate_page().unwrap();
        disk.deallocate_page(page_id).unwrap();
        // Bump allocation never reuses the id.
        assert_eq!(disk.allocate_page().unwrap(), PageId::new(1));
    }
}
