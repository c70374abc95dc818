use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::common::{BlockNum, Result, StoreError, BLOCK_SIZE};

use super::DiskStore;

/// A disk image held entirely in memory. Contents are lost on drop.
pub struct MemoryDisk {
    blocks: Mutex<Vec<u8>>,
    num_blocks: u32,
    num_reads: AtomicU32,
    num_writes: AtomicU32,
}

impl MemoryDisk {
    pub fn new(num_blocks: u32) -> Self {
        Self {
            blocks: Mutex::new(vec![0u8; num_blocks as usize * BLOCK_SIZE]),
            num_blocks,
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        }
    }

    fn range(&self, block: BlockNum) -> Result<std::ops::Range<usize>> {
        if block.as_u32() >= self.num_blocks {
            return Err(StoreError::OutOfBound);
        }
        let start = block.as_usize() * BLOCK_SIZE;
        Ok(start..start + BLOCK_SIZE)
    }

    pub fn get_num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    pub fn get_num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }
}

impl DiskStore for MemoryDisk {
    fn read_block(&self, block: BlockNum, data: &mut [u8]) -> Result<()> {
        assert_eq!(data.len(), BLOCK_SIZE, "Buffer must be BLOCK_SIZE bytes");
        let range = self.range(block)?;
        data.copy_from_slice(&self.blocks.lock()[range]);
        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn write_block(&self, block: BlockNum, data: &[u8]) -> Result<()> {
        assert_eq!(data.len(), BLOCK_SIZE, "Buffer must be BLOCK_SIZE bytes");
        let range = self.range(block)?;
        self.blocks.lock()[range].copy_from_slice(data);
        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn num_blocks(&self) -> u32 {
        self.num_blocks
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }
}
