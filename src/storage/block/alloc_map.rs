use crate::common::{
    BlockNum, Result, StoreError, ATTRCAT_BLOCK, BLOCK_ALLOCATION_MAP_SIZE, BLOCK_SIZE,
    RELCAT_BLOCK,
};

use super::BlockType;

/// In-memory copy of the block allocation map: the type of every block on
/// the disk, persisted one byte per block in the first map blocks.
#[derive(Debug, Clone)]
pub struct BlockAllocMap {
    entries: Vec<BlockType>,
}

impl BlockAllocMap {
    /// Rejects disks too small to hold the map and catalog blocks, and
    /// disks with more blocks than the map can describe.
    pub fn check_disk_blocks(disk_blocks: u32) -> Result<()> {
        let describable = BLOCK_ALLOCATION_MAP_SIZE as usize * BLOCK_SIZE;
        if disk_blocks <= ATTRCAT_BLOCK || disk_blocks as usize > describable {
            return Err(StoreError::InvalidDiskImage);
        }
        Ok(())
    }

    /// Map of a freshly formatted disk: map blocks, the two catalog blocks,
    /// everything else unused.
    pub fn formatted(disk_blocks: u32) -> Self {
        let mut entries = vec![BlockType::Unused; disk_blocks as usize];
        for entry in entries.iter_mut().take(BLOCK_ALLOCATION_MAP_SIZE as usize) {
            *entry = BlockType::Bmap;
        }
        entries[RELCAT_BLOCK as usize] = BlockType::Rec;
        entries[ATTRCAT_BLOCK as usize] = BlockType::Rec;
        Self { entries }
    }

    /// Decodes the first `disk_blocks` entries of the persisted map and
    /// checks that the reserved blocks carry the expected tags.
    pub fn from_bytes(bytes: &[u8], disk_blocks: u32) -> Result<Self> {
        let entries = bytes[..disk_blocks as usize]
            .iter()
            .map(|&code| BlockType::from_code(code as i32).ok_or(StoreError::InvalidDiskImage))
            .collect::<Result<Vec<_>>>()?;

        let map_ok = entries[..BLOCK_ALLOCATION_MAP_SIZE as usize]
            .iter()
            .all(|&t| t == BlockType::Bmap);
        let catalogs_ok = entries[RELCAT_BLOCK as usize] == BlockType::Rec
            && entries[ATTRCAT_BLOCK as usize] == BlockType::Rec;
        if !map_ok || !catalogs_ok {
            return Err(StoreError::InvalidDiskImage);
        }

        Ok(Self { entries })
    }

    /// Encodes the map into the bytes of all map blocks. Entries past the
    /// end of the disk are written as unused.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes =
            vec![BlockType::Unused.code(); BLOCK_ALLOCATION_MAP_SIZE as usize * BLOCK_SIZE];
        for (byte, ty) in bytes.iter_mut().zip(&self.entries) {
            *byte = ty.code();
        }
        bytes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, block: BlockNum) -> Option<BlockType> {
        self.entries.get(block.as_usize()).copied()
    }

    pub fn set(&mut self, block: BlockNum, ty: BlockType) {
        if let Some(entry) = self.entries.get_mut(block.as_usize()) {
            *entry = ty;
        }
    }

    /// First unused block, scanning from the start of the disk.
    pub fn find_unused(&self) -> Option<BlockNum> {
        self.entries
            .iter()
            .position(|&t| t == BlockType::Unused)
            .map(|i| BlockNum::new(i as u32))
    }

    /// Number of blocks tagged `ty`.
    pub fn count(&self, ty: BlockType) -> usize {
        self.entries.iter().filter(|&&t| t == ty).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatted_map() {
        let map = BlockAllocMap::formatted(16);
        assert_eq!(map.len(), 16);
        assert_eq!(map.count(BlockType::Bmap), 4);
        assert_eq!(map.count(BlockType::Rec), 2);
        assert_eq!(map.find_unused(), Some(BlockNum::new(6)));
    }

    #[test]
    fn test_map_bytes_round_trip() {
        let mut map = BlockAllocMap::formatted(32);
        map.set(BlockNum::new(7), BlockType::IndLeaf);
        let bytes = map.to_bytes();
        assert_eq!(bytes.len(), BLOCK_ALLOCATION_MAP_SIZE as usize * BLOCK_SIZE);
        assert_eq!(bytes[7], BlockType::IndLeaf.code());
        assert_eq!(bytes[100], BlockType::Unused.code());

        let decoded = BlockAllocMap::from_bytes(&bytes, 32).unwrap();
        assert_eq!(decoded.get(BlockNum::new(7)), Some(BlockType::IndLeaf));
        assert_eq!(decoded.find_unused(), Some(BlockNum::new(6)));
    }

    #[test]
    fn test_unformatted_bytes_rejected() {
        let bytes = vec![0u8; BLOCK_ALLOCATION_MAP_SIZE as usize * BLOCK_SIZE];
        assert!(matches!(
            BlockAllocMap::from_bytes(&bytes, 16),
            Err(StoreError::InvalidDiskImage)
        ));
    }

    #[test]
    fn test_full_map_has_no_unused() {
        let mut map = BlockAllocMap::formatted(8);
        map.set(BlockNum::new(6), BlockType::Rec);
        map.set(BlockNum::new(7), BlockType::IndLeaf);
        assert_eq!(map.find_unused(), None);
    }
}
