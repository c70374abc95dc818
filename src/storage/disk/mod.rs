mod disk_manager;
mod memory_disk;

use std::sync::Arc;

use crate::common::{BlockNum, Result};

pub use disk_manager::*;
pub use memory_disk::*;

/// Lets a caller keep a handle on a disk that the buffer pool owns.
impl<D: DiskStore + Sync> DiskStore for Arc<D> {
    fn read_block(&self, block: BlockNum, data: &mut [u8]) -> Result<()> {
        (**self).read_block(block, data)
    }

    fn write_block(&self, block: BlockNum, data: &[u8]) -> Result<()> {
        (**self).write_block(block, data)
    }

    fn num_blocks(&self) -> u32 {
        (**self).num_blocks()
    }

    fn sync(&self) -> Result<()> {
        (**self).sync()
    }
}
