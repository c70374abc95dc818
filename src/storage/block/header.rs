use bytes::{Buf, BufMut};

use crate::common::{BlockNum, Result, StoreError, HEADER_SIZE};

/// Block type tag shared by the block header and the allocation map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    Rec,
    IndInternal,
    IndLeaf,
    Unused,
    Bmap,
}

impl BlockType {
    pub fn code(&self) -> u8 {
        match self {
            BlockType::Rec => 0,
            BlockType::IndInternal => 1,
            BlockType::IndLeaf => 2,
            BlockType::Unused => 3,
            BlockType::Bmap => 4,
        }
    }

    pub fn from_code(code: i32) -> Option<BlockType> {
        match code {
            0 => Some(BlockType::Rec),
            1 => Some(BlockType::IndInternal),
            2 => Some(BlockType::IndLeaf),
            3 => Some(BlockType::Unused),
            4 => Some(BlockType::Bmap),
            _ => None,
        }
    }

    pub fn is_index(&self) -> bool {
        matches!(self, BlockType::IndInternal | BlockType::IndLeaf)
    }
}

/// The fixed 32-byte header at the start of every used block:
/// blockType, pblock, lblock, rblock, numEntries, numAttrs, numSlots, reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadInfo {
    pub block_type: BlockType,
    pub pblock: Option<BlockNum>,
    pub lblock: Option<BlockNum>,
    pub rblock: Option<BlockNum>,
    pub num_entries: usize,
    pub num_attrs: usize,
    pub num_slots: usize,
}

impl HeadInfo {
    /// A header with every link unset and every count zero.
    pub fn new(block_type: BlockType) -> Self {
        Self {
            block_type,
            pblock: None,
            lblock: None,
            rblock: None,
            num_entries: 0,
            num_attrs: 0,
            num_slots: 0,
        }
    }

    /// Decodes the header of `block` from its raw bytes.
    pub fn read(block: BlockNum, data: &[u8]) -> Result<Self> {
        let mut buf = &data[..HEADER_SIZE];
        let block_type =
            BlockType::from_code(buf.get_i32_le()).ok_or(StoreError::InvalidBlock(block))?;
        let pblock = BlockNum::from_link(buf.get_i32_le());
        let lblock = BlockNum::from_link(buf.get_i32_le());
        let rblock = BlockNum::from_link(buf.get_i32_le());
        let count = |v: i32| usize::try_from(v).map_err(|_| StoreError::InvalidBlock(block));
        let num_entries = count(buf.get_i32_le())?;
        let num_attrs = count(buf.get_i32_le())?;
        let num_slots = count(buf.get_i32_le())?;

        Ok(Self {
            block_type,
            pblock,
            lblock,
            rblock,
            num_entries,
            num_attrs,
            num_slots,
        })
    }

    /// Encodes the header into the first HEADER_SIZE bytes of `data`.
    pub fn write(&self, data: &mut [u8]) {
        let mut buf = &mut data[..HEADER_SIZE];
        buf.put_i32_le(self.block_type.code() as i32);
        buf.put_i32_le(BlockNum::to_link(self.pblock));
        buf.put_i32_le(BlockNum::to_link(self.lblock));
        buf.put_i32_le(BlockNum::to_link(self.rblock));
        buf.put_i32_le(self.num_entries as i32);
        buf.put_i32_le(self.num_attrs as i32);
        buf.put_i32_le(self.num_slots as i32);
        buf.put_i32_le(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::BLOCK_SIZE;

    #[test]
    fn test_header_layout() {
        let mut data = [0u8; BLOCK_SIZE];
        let head = HeadInfo {
            block_type: BlockType::IndLeaf,
            pblock: Some(BlockNum::new(9)),
            lblock: None,
            rblock: Some(BlockNum::new(11)),
            num_entries: 5,
            num_attrs: 0,
            num_slots: 0,
        };
        head.write(&mut data);

        assert_eq!(&data[0..4], &2i32.to_le_bytes());
        assert_eq!(&data[4..8], &9i32.to_le_bytes());
        assert_eq!(&data[8..12], &(-1i32).to_le_bytes());
        assert_eq!(&data[12..16], &11i32.to_le_bytes());
        assert_eq!(&data[16..20], &5i32.to_le_bytes());
        assert_eq!(HeadInfo::read(BlockNum::new(10), &data).unwrap(), head);
    }

    #[test]
    fn test_header_rejects_unknown_type() {
        let mut data = [0u8; BLOCK_SIZE];
        data[0] = 77;
        assert!(matches!(
            HeadInfo::read(BlockNum::new(3), &data),
            Err(StoreError::InvalidBlock(b)) if b == BlockNum::new(3)
        ));
    }
}
