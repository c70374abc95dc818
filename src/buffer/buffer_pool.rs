use tracing::{debug, trace};

use crate::common::{
    BlockNum, Result, StoreError, BLOCK_ALLOCATION_MAP_SIZE, BLOCK_SIZE,
};
use crate::storage::block::{BlockAllocMap, BlockType};
use crate::storage::disk::DiskStore;

use super::{BufferFrame, FrameId};

/// BufferPool caches disk blocks in a fixed number of block-sized slots.
///
/// Every access ages all occupied slots by one and resets the accessed slot
/// to zero, so the slot with the largest timestamp is the least recently
/// used one. When no slot is free that slot is evicted, after writing it
/// back if it is dirty.
///
/// The pool also owns the block allocation map, which is loaded from the
/// map blocks when the pool is created and written back by `flush_all`.
pub struct BufferPool {
    /// The buffer slots
    frames: Vec<BufferFrame>,
    /// The disk image behind the pool
    disk: Box<dyn DiskStore>,
    /// Type of every block on the disk
    alloc_map: BlockAllocMap,
}

impl BufferPool {
    /// Creates a pool of `capacity` slots over a formatted disk.
    pub fn new(capacity: usize, disk: Box<dyn DiskStore>) -> Result<Self> {
        let disk_blocks = disk.num_blocks();
        BlockAllocMap::check_disk_blocks(disk_blocks)?;
        if capacity == 0 {
            return Err(StoreError::InvalidConfig(
                "buffer pool needs at least one slot".to_string(),
            ));
        }

        let mut map_bytes = vec![0u8; BLOCK_ALLOCATION_MAP_SIZE as usize * BLOCK_SIZE];
        for (i, chunk) in map_bytes.chunks_mut(BLOCK_SIZE).enumerate() {
            disk.read_block(BlockNum::new(i as u32), chunk)?;
        }
        let alloc_map = BlockAllocMap::from_bytes(&map_bytes, disk_blocks)?;

        Ok(Self {
            frames: (0..capacity).map(|_| BufferFrame::new()).collect(),
            disk,
            alloc_map,
        })
    }

    /// Returns the number of slots.
    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    /// Returns the number of blocks on the disk.
    pub fn disk_blocks(&self) -> u32 {
        self.alloc_map.len() as u32
    }

    /// Returns the disk behind the pool.
    pub fn disk(&self) -> &dyn DiskStore {
        self.disk.as_ref()
    }

    pub fn alloc_map(&self) -> &BlockAllocMap {
        &self.alloc_map
    }

    pub fn alloc_map_mut(&mut self) -> &mut BlockAllocMap {
        &mut self.alloc_map
    }

    /// Type of `block` according to the allocation map.
    pub fn block_type(&self, block: BlockNum) -> Option<BlockType> {
        self.alloc_map.get(block)
    }

    /// Returns the slot currently holding `block`, if any.
    pub fn frame_of(&self, block: BlockNum) -> Option<FrameId> {
        self.frames
            .iter()
            .position(|f| f.block() == Some(block))
            .map(FrameId)
    }

    pub fn is_resident(&self, block: BlockNum) -> bool {
        self.frame_of(block).is_some()
    }

    /// Dirty flag of a resident block.
    pub fn is_dirty(&self, block: BlockNum) -> Option<bool> {
        self.frame_of(block)
            .map(|id| self.frames[id.as_usize()].is_dirty())
    }

    /// Timestamp of a resident block.
    pub fn timestamp(&self, block: BlockNum) -> Option<u32> {
        self.frame_of(block)
            .map(|id| self.frames[id.as_usize()].timestamp())
    }

    /// Number of free slots.
    pub fn free_frame_count(&self) -> usize {
        self.frames.iter().filter(|f| f.is_free()).count()
    }

    /// Brings `block` into the pool and returns its contents.
    pub fn load(&mut self, block: BlockNum) -> Result<&[u8]> {
        let frame_id = self.pin(block)?;
        Ok(self.frames[frame_id.as_usize()].data())
    }

    /// Brings `block` into the pool, marks it dirty and returns its contents.
    pub fn load_mut(&mut self, block: BlockNum) -> Result<&mut [u8]> {
        let frame_id = self.pin(block)?;
        let frame = &mut self.frames[frame_id.as_usize()];
        frame.set_dirty(true);
        Ok(frame.data_mut())
    }

    /// Gives `block` a zeroed dirty slot without reading it from disk.
    /// Used for blocks that are being allocated and will be overwritten.
    pub fn load_new(&mut self, block: BlockNum) -> Result<&mut [u8]> {
        let frame_id = match self.frame_of(block) {
            Some(frame_id) => {
                self.access(frame_id);
                frame_id
            }
            None => {
                self.check_bounds(block)?;
                let frame_id = self.get_free_frame()?;
                self.frames[frame_id.as_usize()].assign(block);
                frame_id
            }
        };
        let frame = &mut self.frames[frame_id.as_usize()];
        frame.data_mut().fill(0);
        frame.set_dirty(true);
        Ok(frame.data_mut())
    }

    /// Sets the dirty flag of a resident block.
    pub fn mark_dirty(&mut self, block: BlockNum) -> Result<()> {
        let frame_id = self
            .frame_of(block)
            .ok_or(StoreError::BlockNotInBuffer(block))?;
        self.frames[frame_id.as_usize()].set_dirty(true);
        Ok(())
    }

    /// Drops `block` from the pool without writing it back.
    /// Returns whether the block was resident.
    pub fn release(&mut self, block: BlockNum) -> bool {
        match self.frame_of(block) {
            Some(frame_id) => {
                self.frames[frame_id.as_usize()].reset();
                true
            }
            None => false,
        }
    }

    /// Writes every dirty slot and the allocation map back to disk.
    pub fn flush_all(&mut self) -> Result<()> {
        for frame in self.frames.iter_mut() {
            if let Some(block) = frame.block() {
                if frame.is_dirty() {
                    self.disk.write_block(block, frame.data())?;
                    frame.set_dirty(false);
                    trace!(%block, "flushed dirty block");
                }
            }
        }

        let map_bytes = self.alloc_map.to_bytes();
        for (i, chunk) in map_bytes.chunks(BLOCK_SIZE).enumerate() {
            self.disk.write_block(BlockNum::new(i as u32), chunk)?;
        }

        self.disk.sync()
    }

    fn check_bounds(&self, block: BlockNum) -> Result<()> {
        if block.as_u32() >= self.disk_blocks() {
            return Err(StoreError::OutOfBound);
        }
        Ok(())
    }

    /// Ages every occupied slot, then makes `frame_id` the most recent.
    fn access(&mut self, frame_id: FrameId) {
        for frame in self.frames.iter_mut() {
            frame.age();
        }
        self.frames[frame_id.as_usize()].touch();
    }

    /// Returns the slot holding `block`, reading it from disk on a miss.
    fn pin(&mut self, block: BlockNum) -> Result<FrameId> {
        if let Some(frame_id) = self.frame_of(block) {
            self.access(frame_id);
            return Ok(frame_id);
        }

        self.check_bounds(block)?;
        let frame_id = self.get_free_frame()?;
        let frame = &mut self.frames[frame_id.as_usize()];
        self.disk.read_block(block, frame.data_mut())?;
        frame.assign(block);

        Ok(frame_id)
    }

    /// Finds a slot for a new block: the first free slot, or else the
    /// least recently used one after writing it back if dirty.
    fn get_free_frame(&mut self) -> Result<FrameId> {
        for frame in self.frames.iter_mut() {
            frame.age();
        }

        if let Some(i) = self.frames.iter().position(|f| f.is_free()) {
            return Ok(FrameId(i));
        }

        let mut victim = 0;
        for (i, frame) in self.frames.iter().enumerate() {
            if frame.timestamp() > self.frames[victim].timestamp() {
                victim = i;
            }
        }

        let frame = &mut self.frames[victim];
        if let Some(old_block) = frame.block() {
            if frame.is_dirty() {
                self.disk.write_block(old_block, frame.data())?;
                debug!(block = %old_block, "wrote back dirty block on eviction");
            } else {
                trace!(block = %old_block, "evicted clean block");
            }
        }
        frame.reset();

        Ok(FrameId(victim))
    }
}
