use bytes::{Buf, BufMut};

use crate::buffer::BufferPool;
use crate::common::{
    AttrType, Attribute, BlockNum, RecId, Result, StoreError, ATTR_SIZE, HEADER_SIZE,
    INTERNAL_ENTRY_SIZE, LEAF_ENTRY_SIZE, MAX_KEYS_INTERNAL, MAX_KEYS_LEAF,
};

use super::{get_free_block, release_block, BlockType, HeadInfo};

/// Internal index entry. Entries are packed so that the right child of
/// entry i occupies the same bytes as the left child of entry i + 1:
///
/// | lChild 0 | key 0 | lChild 1 = rChild 0 | key 1 | ... | rChild n-1 |
#[derive(Debug, Clone, PartialEq)]
pub struct InternalEntry {
    pub lchild: BlockNum,
    pub key: Attribute,
    pub rchild: BlockNum,
}

/// Leaf index entry: key, record block, record slot and 8 unused bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafEntry {
    pub key: Attribute,
    pub rec_id: RecId,
}

fn internal_offset(index: usize) -> usize {
    HEADER_SIZE + index * INTERNAL_ENTRY_SIZE
}

fn leaf_offset(index: usize) -> usize {
    HEADER_SIZE + index * LEAF_ENTRY_SIZE
}

impl InternalEntry {
    fn read(block: BlockNum, data: &[u8], index: usize, ty: AttrType) -> Result<Self> {
        let mut buf = &data[internal_offset(index)..];
        let lchild = BlockNum::from_link(buf.get_i32_le()).ok_or(StoreError::InvalidBlock(block))?;
        let key = Attribute::decode(&buf[..ATTR_SIZE], ty);
        buf.advance(ATTR_SIZE);
        let rchild = BlockNum::from_link(buf.get_i32_le()).ok_or(StoreError::InvalidBlock(block))?;
        Ok(Self { lchild, key, rchild })
    }

    fn write(&self, data: &mut [u8], index: usize) {
        let mut key = [0u8; ATTR_SIZE];
        self.key.encode(&mut key);
        let mut buf = &mut data[internal_offset(index)..];
        buf.put_i32_le(self.lchild.as_u32() as i32);
        buf.put_slice(&key);
        buf.put_i32_le(self.rchild.as_u32() as i32);
    }
}

impl LeafEntry {
    fn read(block: BlockNum, data: &[u8], index: usize, ty: AttrType) -> Result<Self> {
        let mut buf = &data[leaf_offset(index)..];
        let key = Attribute::decode(&buf[..ATTR_SIZE], ty);
        buf.advance(ATTR_SIZE);
        let rec_block =
            BlockNum::from_link(buf.get_i32_le()).ok_or(StoreError::InvalidBlock(block))?;
        let slot = usize::try_from(buf.get_i32_le()).map_err(|_| StoreError::InvalidBlock(block))?;
        Ok(Self {
            key,
            rec_id: RecId::new(rec_block, slot),
        })
    }

    fn write(&self, data: &mut [u8], index: usize) {
        let mut key = [0u8; ATTR_SIZE];
        self.key.encode(&mut key);
        let mut buf = &mut data[leaf_offset(index)..leaf_offset(index + 1)];
        buf.put_slice(&key);
        buf.put_i32_le(self.rec_id.block.as_u32() as i32);
        buf.put_i32_le(self.rec_id.slot as i32);
        buf.put_bytes(0, LEAF_ENTRY_SIZE - ATTR_SIZE - 8);
    }
}

fn check_block(pool: &BufferPool, block: BlockNum) -> Result<()> {
    if block.as_u32() >= pool.disk_blocks() {
        return Err(StoreError::OutOfBound);
    }
    Ok(())
}

/// Handle on an internal index block in the buffer pool.
#[derive(Debug, PartialEq, Eq)]
pub struct IndInternal {
    block: BlockNum,
}

impl IndInternal {
    /// Allocates a fresh internal index block.
    pub fn new(pool: &mut BufferPool) -> Result<Self> {
        let block = get_free_block(pool, BlockType::IndInternal)?;
        Ok(Self { block })
    }

    pub fn open(pool: &BufferPool, block: BlockNum) -> Result<Self> {
        check_block(pool, block)?;
        Ok(Self { block })
    }

    pub fn block_num(&self) -> BlockNum {
        self.block
    }

    pub fn header(&self, pool: &mut BufferPool) -> Result<HeadInfo> {
        HeadInfo::read(self.block, pool.load(self.block)?)
    }

    pub fn set_header(&self, pool: &mut BufferPool, head: &HeadInfo) -> Result<()> {
        head.write(pool.load_mut(self.block)?);
        Ok(())
    }

    pub fn entry(&self, pool: &mut BufferPool, index: usize, ty: AttrType) -> Result<InternalEntry> {
        if index >= MAX_KEYS_INTERNAL {
            return Err(StoreError::OutOfBound);
        }
        InternalEntry::read(self.block, pool.load(self.block)?, index, ty)
    }

    pub fn set_entry(&self, pool: &mut BufferPool, index: usize, entry: &InternalEntry) -> Result<()> {
        if index >= MAX_KEYS_INTERNAL {
            return Err(StoreError::OutOfBound);
        }
        entry.write(pool.load_mut(self.block)?, index);
        Ok(())
    }

    /// Reads every live entry of the block.
    pub fn entries(&self, pool: &mut BufferPool, ty: AttrType) -> Result<Vec<InternalEntry>> {
        let data = pool.load(self.block)?;
        let head = HeadInfo::read(self.block, data)?;
        (0..head.num_entries)
            .map(|i| InternalEntry::read(self.block, data, i, ty))
            .collect()
    }

    /// Child blocks in key order: the left child of the first entry, then
    /// the right child of every entry. Key bytes are not decoded.
    pub fn children(&self, pool: &mut BufferPool) -> Result<Vec<BlockNum>> {
        let data = pool.load(self.block)?;
        let head = HeadInfo::read(self.block, data)?;
        if head.num_entries == 0 {
            return Ok(Vec::new());
        }
        (0..=head.num_entries)
            .map(|i| {
                let mut buf = &data[internal_offset(i)..];
                BlockNum::from_link(buf.get_i32_le()).ok_or(StoreError::InvalidBlock(self.block))
            })
            .collect()
    }

    pub fn release(self, pool: &mut BufferPool) {
        release_block(pool, self.block);
    }
}

/// Handle on a leaf index block in the buffer pool.
#[derive(Debug, PartialEq, Eq)]
pub struct IndLeaf {
    block: BlockNum,
}

impl IndLeaf {
    /// Allocates a fresh leaf index block.
    pub fn new(pool: &mut BufferPool) -> Result<Self> {
        let block = get_free_block(pool, BlockType::IndLeaf)?;
        Ok(Self { block })
    }

    pub fn open(pool: &BufferPool, block: BlockNum) -> Result<Self> {
        check_block(pool, block)?;
        Ok(Self { block })
    }

    pub fn block_num(&self) -> BlockNum {
        self.block
    }

    pub fn header(&self, pool: &mut BufferPool) -> Result<HeadInfo> {
        HeadInfo::read(self.block, pool.load(self.block)?)
    }

    pub fn set_header(&self, pool: &mut BufferPool, head: &HeadInfo) -> Result<()> {
        head.write(pool.load_mut(self.block)?);
        Ok(())
    }

    pub fn entry(&self, pool: &mut BufferPool, index: usize, ty: AttrType) -> Result<LeafEntry> {
        if index >= MAX_KEYS_LEAF {
            return Err(StoreError::OutOfBound);
        }
        LeafEntry::read(self.block, pool.load(self.block)?, index, ty)
    }

    pub fn set_entry(&self, pool: &mut BufferPool, index: usize, entry: &LeafEntry) -> Result<()> {
        if index >= MAX_KEYS_LEAF {
            return Err(StoreError::OutOfBound);
        }
        entry.write(pool.load_mut(self.block)?, index);
        Ok(())
    }

    /// Reads every live entry of the block.
    pub fn entries(&self, pool: &mut BufferPool, ty: AttrType) -> Result<Vec<LeafEntry>> {
        let data = pool.load(self.block)?;
        let head = HeadInfo::read(self.block, data)?;
        (0..head.num_entries)
            .map(|i| LeafEntry::read(self.block, data, i, ty))
            .collect()
    }

    pub fn release(self, pool: &mut BufferPool) {
        release_block(pool, self.block);
    }
}
