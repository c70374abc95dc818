use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::common::{BlockNum, Result, StoreError, BLOCK_SIZE};

/// A fixed-size array of fixed-size blocks addressed by block number.
pub trait DiskStore: Send {
    /// Reads a block into `data`, which must be exactly BLOCK_SIZE bytes.
    fn read_block(&self, block: BlockNum, data: &mut [u8]) -> Result<()>;

    /// Writes a block from `data`, which must be exactly BLOCK_SIZE bytes.
    fn write_block(&self, block: BlockNum, data: &[u8]) -> Result<()>;

    /// Number of addressable blocks.
    fn num_blocks(&self) -> u32;

    /// Flushes any buffered writes to stable storage.
    fn sync(&self) -> Result<()>;
}

/// DiskManager stores a disk image in a single file of
/// `num_blocks * BLOCK_SIZE` bytes.
pub struct DiskManager {
    /// The disk image file
    db_file: Mutex<File>,
    /// Number of blocks in the image
    num_blocks: u32,
    /// Number of block reads performed
    num_reads: AtomicU32,
    /// Number of block writes performed
    num_writes: AtomicU32,
}

impl DiskManager {
    /// Creates a new zero-filled disk image of `num_blocks` blocks,
    /// truncating any existing file at `db_path`.
    pub fn create<P: AsRef<Path>>(db_path: P, num_blocks: u32) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&db_path)?;
        file.set_len(num_blocks as u64 * BLOCK_SIZE as u64)?;

        Ok(Self::from_file(file, num_blocks))
    }

    /// Opens an existing disk image. The file must hold a whole number of blocks.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&db_path)?;

        let file_size = file.metadata()?.len();
        if file_size == 0 || file_size % BLOCK_SIZE as u64 != 0 {
            return Err(StoreError::InvalidDiskImage);
        }
        let num_blocks =
            u32::try_from(file_size / BLOCK_SIZE as u64).map_err(|_| StoreError::InvalidDiskImage)?;

        Ok(Self::from_file(file, num_blocks))
    }

    fn from_file(file: File, num_blocks: u32) -> Self {
        Self {
            db_file: Mutex::new(file),
            num_blocks,
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        }
    }

    fn check_bounds(&self, block: BlockNum) -> Result<u64> {
        if block.as_u32() >= self.num_blocks {
            return Err(StoreError::OutOfBound);
        }
        Ok(block.as_u32() as u64 * BLOCK_SIZE as u64)
    }

    /// Returns the number of block reads performed.
    pub fn get_num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of block writes performed.
    pub fn get_num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }
}

impl DiskStore for DiskManager {
    fn read_block(&self, block: BlockNum, data: &mut [u8]) -> Result<()> {
        assert_eq!(data.len(), BLOCK_SIZE, "Buffer must be BLOCK_SIZE bytes");
        let offset = self.check_bounds(block)?;

        let mut file = self.db_file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(data)?;

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn write_block(&self, block: BlockNum, data: &[u8]) -> Result<()> {
        assert_eq!(data.len(), BLOCK_SIZE, "Buffer must be BLOCK_SIZE bytes");
        let offset = self.check_bounds(block)?;

        let mut file = self.db_file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn num_blocks(&self) -> u32 {
        self.num_blocks
    }

    fn sync(&self) -> Result<()> {
        let mut file = self.db_file.lock();
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        let file = self.db_file.get_mut();
        let _ = file.sync_all();
    }
}
