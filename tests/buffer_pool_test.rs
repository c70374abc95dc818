//! Integration tests for the buffer pool

use std::sync::Arc;

use relstore::buffer::BufferPool;
use relstore::catalog;
use relstore::common::{BlockNum, StoreError, BLOCK_SIZE};
use relstore::storage::block::BlockType;
use relstore::storage::disk::{DiskManager, DiskStore, MemoryDisk};
use tempfile::NamedTempFile;

fn create_pool(capacity: usize) -> (BufferPool, Arc<MemoryDisk>) {
    let disk = Arc::new(MemoryDisk::new(64));
    catalog::format(&*disk).unwrap();
    let pool = BufferPool::new(capacity, Box::new(Arc::clone(&disk))).unwrap();
    (pool, disk)
}

fn read_from_disk(disk: &dyn DiskStore, block: u32) -> Vec<u8> {
    let mut data = vec![0u8; BLOCK_SIZE];
    disk.read_block(BlockNum::new(block), &mut data).unwrap();
    data
}

#[test]
fn test_pool_reads_allocation_map() {
    let (pool, _disk) = create_pool(4);
    assert_eq!(pool.block_type(BlockNum::new(0)), Some(BlockType::Bmap));
    assert_eq!(pool.block_type(BlockNum::new(4)), Some(BlockType::Rec));
    assert_eq!(pool.block_type(BlockNum::new(5)), Some(BlockType::Rec));
    assert_eq!(pool.block_type(BlockNum::new(6)), Some(BlockType::Unused));
    assert_eq!(pool.block_type(BlockNum::new(64)), None);
}

#[test]
fn test_unformatted_disk_rejected() {
    let disk = MemoryDisk::new(64);
    assert!(matches!(
        BufferPool::new(4, Box::new(disk)),
        Err(StoreError::InvalidDiskImage)
    ));
}

#[test]
fn test_lru_evicts_least_recently_touched() {
    let (mut pool, _disk) = create_pool(4);
    for block in 10..14 {
        pool.load(BlockNum::new(block)).unwrap();
    }
    // 11 is now the oldest
    pool.load(BlockNum::new(10)).unwrap();
    pool.load(BlockNum::new(14)).unwrap();

    assert!(!pool.is_resident(BlockNum::new(11)));
    for block in [10, 12, 13, 14] {
        assert!(pool.is_resident(BlockNum::new(block)));
    }

    pool.load(BlockNum::new(15)).unwrap();
    assert!(!pool.is_resident(BlockNum::new(12)));
}

#[test]
fn test_dirty_block_written_back_before_reuse() {
    let (mut pool, disk) = create_pool(4);
    pool.load_mut(BlockNum::new(20)).unwrap()[..5].copy_from_slice(b"dirty");
    for block in 21..24 {
        pool.load(BlockNum::new(block)).unwrap();
    }
    assert_eq!(&read_from_disk(&*disk, 20)[..5], &[0u8; 5]);

    let writes = disk.get_num_writes();
    pool.load(BlockNum::new(24)).unwrap();
    assert!(!pool.is_resident(BlockNum::new(20)));
    assert_eq!(disk.get_num_writes(), writes + 1);
    assert_eq!(&read_from_disk(&*disk, 20)[..5], b"dirty");

    // reloading reads the written-back contents
    assert_eq!(&pool.load(BlockNum::new(20)).unwrap()[..5], b"dirty");
}

#[test]
fn test_clean_eviction_does_not_write() {
    let (mut pool, disk) = create_pool(2);
    let writes = disk.get_num_writes();
    for block in 30..40 {
        pool.load(BlockNum::new(block)).unwrap();
    }
    assert_eq!(disk.get_num_writes(), writes);
    assert_eq!(pool.free_frame_count(), 0);
}

#[test]
fn test_release_discards_changes() {
    let (mut pool, disk) = create_pool(4);
    pool.load_mut(BlockNum::new(12)).unwrap()[0] = 0xEE;
    assert!(pool.release(BlockNum::new(12)));
    assert!(!pool.release(BlockNum::new(12)));

    pool.flush_all().unwrap();
    assert_eq!(read_from_disk(&*disk, 12)[0], 0);
}

#[test]
fn test_mark_dirty_requires_resident_block() {
    let (mut pool, _disk) = create_pool(4);
    assert!(matches!(
        pool.mark_dirty(BlockNum::new(7)),
        Err(StoreError::BlockNotInBuffer(_))
    ));
    pool.load(BlockNum::new(7)).unwrap();
    pool.mark_dirty(BlockNum::new(7)).unwrap();
    assert_eq!(pool.is_dirty(BlockNum::new(7)), Some(true));
}

#[test]
fn test_out_of_range_load() {
    let (mut pool, _disk) = create_pool(4);
    assert!(matches!(pool.load(BlockNum::new(64)), Err(StoreError::OutOfBound)));
}

#[test]
fn test_flush_all_persists_to_file() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_path_buf();

    {
        let disk = DiskManager::create(&path, 32).unwrap();
        catalog::format(&disk).unwrap();
        let mut pool = BufferPool::new(4, Box::new(disk)).unwrap();
        pool.load_mut(BlockNum::new(17)).unwrap()[..4].copy_from_slice(b"keep");
        pool.alloc_map_mut().set(BlockNum::new(17), BlockType::Rec);
        pool.flush_all().unwrap();
        assert_eq!(pool.is_dirty(BlockNum::new(17)), Some(false));
    }

    let disk = DiskManager::open(&path).unwrap();
    assert_eq!(&read_from_disk(&disk, 17)[..4], b"keep");
    let pool = BufferPool::new(4, Box::new(disk)).unwrap();
    assert_eq!(pool.block_type(BlockNum::new(17)), Some(BlockType::Rec));
}
