//! Typed views over blocks held in the buffer pool.
//!
//! A block is either a record block or an index block (internal or leaf).
//! Handles only carry a block number; every accessor goes through the
//! buffer pool so the block is pinned and aged on each use.

mod alloc_map;
mod header;
mod index_block;
mod record_block;

use tracing::debug;

use crate::buffer::BufferPool;
use crate::common::{BlockNum, Result, StoreError};

pub use alloc_map::*;
pub use header::*;
pub use index_block::*;
pub use record_block::*;

/// A block selected by the type tag in its header.
#[derive(Debug, PartialEq, Eq)]
pub enum BlockBuffer {
    Record(RecBuffer),
    Internal(IndInternal),
    Leaf(IndLeaf),
}

impl BlockBuffer {
    /// Binds to an existing block, choosing the variant from its header.
    pub fn load(pool: &mut BufferPool, block: BlockNum) -> Result<Self> {
        if block.as_u32() >= pool.disk_blocks() {
            return Err(StoreError::OutOfBound);
        }
        let head = HeadInfo::read(block, pool.load(block)?)?;
        match head.block_type {
            BlockType::Rec => Ok(BlockBuffer::Record(RecBuffer::open(pool, block)?)),
            BlockType::IndInternal => Ok(BlockBuffer::Internal(IndInternal::open(pool, block)?)),
            BlockType::IndLeaf => Ok(BlockBuffer::Leaf(IndLeaf::open(pool, block)?)),
            BlockType::Unused | BlockType::Bmap => Err(StoreError::InvalidBlock(block)),
        }
    }

    pub fn block_num(&self) -> BlockNum {
        match self {
            BlockBuffer::Record(b) => b.block_num(),
            BlockBuffer::Internal(b) => b.block_num(),
            BlockBuffer::Leaf(b) => b.block_num(),
        }
    }

    pub fn header(&self, pool: &mut BufferPool) -> Result<HeadInfo> {
        HeadInfo::read(self.block_num(), pool.load(self.block_num())?)
    }

    pub fn set_header(&self, pool: &mut BufferPool, head: &HeadInfo) -> Result<()> {
        head.write(pool.load_mut(self.block_num())?);
        Ok(())
    }

    pub fn release(self, pool: &mut BufferPool) {
        release_block(pool, self.block_num());
    }
}

/// Allocates the first unused block on the disk and gives it a blank
/// header of type `ty`, tagging the allocation map to match.
pub fn get_free_block(pool: &mut BufferPool, ty: BlockType) -> Result<BlockNum> {
    let block = pool.alloc_map().find_unused().ok_or(StoreError::DiskFull)?;

    HeadInfo::new(ty).write(pool.load_new(block)?);
    pool.alloc_map_mut().set(block, ty);

    debug!(%block, ?ty, "allocated block");
    Ok(block)
}

/// Frees `block`: drops it from the buffer pool and marks it unused.
/// Blocks that are out of range or already unused are left alone.
pub fn release_block(pool: &mut BufferPool, block: BlockNum) {
    match pool.block_type(block) {
        None | Some(BlockType::Unused) => {}
        Some(ty) => {
            pool.release(block);
            pool.alloc_map_mut().set(block, BlockType::Unused);
            debug!(%block, ?ty, "released block");
        }
    }
}
