//! End-to-end buffer pool tests against the file-backed disk manager.

use std::sync::Arc;
use std::thread;

use rand::seq::SliceRandom;
use rand::Rng;
use tempfile::tempdir;

use shale_common::constants::PAGE_SIZE;
use shale_common::types::PageId;
use shale_storage::buffer::{BufferError, BufferPoolConfig, BufferPoolManager};
use shale_storage::disk::{DiskManager, FileDiskManager};

fn create_pool(dir: &tempfile::TempDir, pool_size: usize) -> (Arc<FileDiskManager>, BufferPoolManager) {
    let disk = Arc::new(FileDiskManager::open(dir.path().join("data.db")).unwrap());
    let pool = BufferPoolManager::new(
        BufferPoolConfig::new(pool_size),
        Arc::clone(&disk) as Arc<dyn DiskManager>,
    )
    .unwrap();
    (disk, pool)
}

#[test]
fn fetch_miss_reads_page_from_disk() {
    let dir = tempdir().unwrap();
    let (disk, pool) = create_pool(&dir, 3);

    // Seed page 0 directly through the disk manager.
    let page_id = disk.allocate_page().unwrap();
    let mut data = [0u8; PAGE_SIZE];
    data[0] = 0xAA;
    disk.write_page(page_id, &data).unwrap();

    let page = pool.fetch_page(page_id).unwrap();
    assert_eq!(page.page_id(), page_id);
    assert_eq!(page.pin_count(), 1);
    assert!(!page.is_dirty());
    assert_eq!(page.data()[0], 0xAA);
}

#[test]
fn written_pages_survive_eviction_and_refetch() {
    let dir = tempdir().unwrap();
    let (_disk, pool) = create_pool(&dir, 3);

    // Write distinct content to more pages than the pool holds, forcing
    // every page through eviction at least once.
    let mut page_ids = Vec::new();
    for i in 0..10u8 {
        let page = pool.new_page().unwrap();
        page.data_mut()[0] = i;
        page.data_mut()[PAGE_SIZE - 1] = i.wrapping_mul(3);
        page_ids.push(page.page_id());
        pool.unpin_page(page.page_id(), true).unwrap();
    }

    for (i, &page_id) in page_ids.iter().enumerate() {
        let page = pool.fetch_page(page_id).unwrap();
        assert_eq!(page.data()[0], i as u8);
        assert_eq!(page.data()[PAGE_SIZE - 1], (i as u8).wrapping_mul(3));
        pool.unpin_page(page_id, false).unwrap();
    }
}

#[test]
fn pool_exhaustion_recovers_after_unpin() {
    let dir = tempdir().unwrap();
    let (_disk, pool) = create_pool(&dir, 3);

    let mut handles = Vec::new();
    for _ in 0..3 {
        handles.push(pool.new_page().unwrap());
    }

    // Every frame pinned: no new page, no fetch of an absent page.
    assert!(matches!(pool.new_page(), Err(BufferError::PoolExhausted)));

    let first = handles[0].page_id();
    pool.unpin_page(first, false).unwrap();
    let replacement = pool.new_page().unwrap();
    assert!(!pool.contains(first));
    assert!(pool.contains(replacement.page_id()));
}

#[test]
fn lru_evicts_in_unpin_order() {
    let dir = tempdir().unwrap();
    let (_disk, pool) = create_pool(&dir, 3);

    let a = pool.new_page().unwrap().page_id();
    let b = pool.new_page().unwrap().page_id();
    let c = pool.new_page().unwrap().page_id();

    pool.unpin_page(b, false).unwrap();
    pool.unpin_page(a, false).unwrap();
    pool.unpin_page(c, false).unwrap();

    // b was unpinned first, so it goes first.
    let _d = pool.new_page().unwrap();
    assert!(!pool.contains(b));
    assert!(pool.contains(a));
    assert!(pool.contains(c));
}

#[test]
fn delete_page_frees_the_frame() {
    let dir = tempdir().unwrap();
    let (_disk, pool) = create_pool(&dir, 1);

    let p = pool.new_page().unwrap().page_id();
    assert!(pool.delete_page(p).is_err());

    pool.unpin_page(p, false).unwrap();
    pool.delete_page(p).unwrap();
    assert!(!pool.contains(p));

    // The frame is immediately reusable without any eviction.
    let q = pool.new_page().unwrap();
    assert_ne!(q.page_id(), p);
}

#[test]
fn flush_all_makes_state_durable_across_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("durable.db");
    let mut page_ids = Vec::new();

    {
        let disk = Arc::new(FileDiskManager::open(&path).unwrap());
        let pool =
            BufferPoolManager::new(BufferPoolConfig::new(4), disk as Arc<dyn DiskManager>).unwrap();

        for i in 0..4u8 {
            let page = pool.new_page().unwrap();
            page.data_mut()[7] = 0xC0 | i;
            page_ids.push(page.page_id());
            pool.unpin_page(page.page_id(), true).unwrap();
        }
        let flushed = pool.flush_all_pages().unwrap();
        assert_eq!(flushed, 4);
    }

    // A fresh disk manager and pool over the same file see the data.
    let disk = Arc::new(FileDiskManager::open(&path).unwrap());
    let pool =
        BufferPoolManager::new(BufferPoolConfig::new(4), disk as Arc<dyn DiskManager>).unwrap();
    for (i, &page_id) in page_ids.iter().enumerate() {
        let page = pool.fetch_page(page_id).unwrap();
        assert_eq!(page.data()[7], 0xC0 | i as u8);
        pool.unpin_page(page_id, false).unwrap();
    }
}

#[test]
fn concurrent_writers_do_not_corrupt_pages() {
    let dir = tempdir().unwrap();
    let (_disk, pool) = create_pool(&dir, 10);
    let pool = Arc::new(pool);

    let mut threads = Vec::new();
    for _ in 0..5 {
        let pool = Arc::clone(&pool);
        threads.push(thread::spawn(move || {
            let page = pool.new_page().unwrap();
            let page_id = page.page_id();
            page.data_mut()[0] = page_id.as_u64() as u8;
            pool.unpin_page(page_id, true).unwrap();
            page_id
        }));
    }

    let page_ids: Vec<PageId> = threads.into_iter().map(|t| t.join().unwrap()).collect();
    pool.flush_all_pages().unwrap();

    for page_id in page_ids {
        let page = pool.fetch_page(page_id).unwrap();
        assert_eq!(
            page.data()[0],
            page_id.as_u64() as u8,
            "corrupt data in page {}",
            page_id
        );
        pool.unpin_page(page_id, false).unwrap();
    }
}

#[test]
fn concurrent_random_access_stress() {
    let dir = tempdir().unwrap();
    let (_disk, pool) = create_pool(&dir, 8);
    let pool = Arc::new(pool);

    // Twice as many pages as frames, each stamped with its own id.
    let mut page_ids = Vec::new();
    for _ in 0..16 {
        let page = pool.new_page().unwrap();
        let page_id = page.page_id();
        page.data_mut()[0..8].copy_from_slice(&page_id.as_u64().to_be_bytes());
        pool.unpin_page(page_id, true).unwrap();
        page_ids.push(page_id);
    }

    let mut threads = Vec::new();
    for _ in 0..4 {
        let pool = Arc::clone(&pool);
        let page_ids = page_ids.clone();
        threads.push(thread::spawn(move || {
            let mut rng = rand::thread_rng();
            for _ in 0..200 {
                let &page_id = page_ids.choose(&mut rng).unwrap();
                let page = match pool.fetch_page(page_id) {
                    Ok(page) => page,
                    // All frames momentarily pinned by other threads.
                    Err(BufferError::PoolExhausted) => continue,
                    Err(e) => panic!("fetch failed: {e}"),
                };
                assert_eq!(&page.data()[0..8], &page_id.as_u64().to_be_bytes());
                let dirty = rng.gen_bool(0.25);
                if dirty {
                    // Rewrite the same stamp; content stays self-identifying.
                    page.data_mut()[0..8].copy_from_slice(&page_id.as_u64().to_be_bytes());
                }
                pool.unpin_page(page_id, dirty).unwrap();
            }
        }));
    }

    for t in threads {
        t.join().unwrap();
    }

    for &page_id in &page_ids {
        let page = pool.fetch_page(page_id).unwrap();
        assert_eq!(&page.data()[0..8], &page_id.as_u64().to_be_bytes());
        pool.unpin_page(page_id, false).unwrap();
    }
}
