use super::error::{Result, StoreError};

/// Size of a disk block in bytes
pub const BLOCK_SIZE: usize = 2048;

/// Default number of blocks on a disk image
pub const DISK_BLOCKS: u32 = 8192;

/// Number of blocks holding the block allocation map (one byte per block)
pub const BLOCK_ALLOCATION_MAP_SIZE: u32 = 4;

/// Default number of buffer slots in the buffer pool
pub const BUFFER_CAPACITY: usize = 32;

/// Fixed width of every attribute value on disk
pub const ATTR_SIZE: usize = 16;

/// Size of the common block header
pub const HEADER_SIZE: usize = 32;

/// Size of the open relation table
pub const MAX_OPEN: usize = 12;

pub const RELCAT_BLOCK: u32 = 4;
pub const ATTRCAT_BLOCK: u32 = 5;

pub const RELCAT_RELID: usize = 0;
pub const ATTRCAT_RELID: usize = 1;

pub const RELCAT_RELNAME: &str = "RELATIONCAT";
pub const ATTRCAT_RELNAME: &str = "ATTRIBUTECAT";

// Relation catalog attribute names and offsets
pub const RELCAT_ATTR_RELNAME: &str = "RelName";
pub const RELCAT_ATTR_NO_ATTRIBUTES: &str = "#Attributes";
pub const RELCAT_ATTR_NO_RECORDS: &str = "#Records";
pub const RELCAT_ATTR_FIRST_BLOCK: &str = "FirstBlock";
pub const RELCAT_ATTR_LAST_BLOCK: &str = "LastBlock";
pub const RELCAT_ATTR_NO_SLOTS: &str = "#Slots";

pub const RELCAT_REL_NAME_INDEX: usize = 0;
pub const RELCAT_NO_ATTRIBUTES_INDEX: usize = 1;
pub const RELCAT_NO_RECORDS_INDEX: usize = 2;
pub const RELCAT_FIRST_BLOCK_INDEX: usize = 3;
pub const RELCAT_LAST_BLOCK_INDEX: usize = 4;
pub const RELCAT_NO_SLOTS_INDEX: usize = 5;

// Attribute catalog attribute names and offsets
pub const ATTRCAT_ATTR_RELNAME: &str = "RelName";
pub const ATTRCAT_ATTR_ATTRIBUTE_NAME: &str = "AttributeName";
pub const ATTRCAT_ATTR_ATTRIBUTE_TYPE: &str = "AttributeType";
pub const ATTRCAT_ATTR_PRIMARY_FLAG: &str = "PrimaryFlag";
pub const ATTRCAT_ATTR_ROOT_BLOCK: &str = "RootBlock";
pub const ATTRCAT_ATTR_OFFSET: &str = "Offset";

pub const ATTRCAT_REL_NAME_INDEX: usize = 0;
pub const ATTRCAT_ATTR_NAME_INDEX: usize = 1;
pub const ATTRCAT_ATTR_TYPE_INDEX: usize = 2;
pub const ATTRCAT_PRIMARY_FLAG_INDEX: usize = 3;
pub const ATTRCAT_ROOT_BLOCK_INDEX: usize = 4;
pub const ATTRCAT_OFFSET_INDEX: usize = 5;

/// Number of attributes of both catalog relations
pub const CATALOG_NO_ATTRS: usize = 6;

/// Size of a leaf index entry: key, record block, record slot and 8 unused bytes
pub const LEAF_ENTRY_SIZE: usize = 32;

/// Stride of an internal index entry: left child, key (right child shared with the next entry)
pub const INTERNAL_ENTRY_SIZE: usize = 20;

pub const MAX_KEYS_LEAF: usize = 63;
pub const MAX_KEYS_INTERNAL: usize = 100;
pub const MIDDLE_INDEX_LEAF: usize = 31;
pub const MIDDLE_INDEX_INTERNAL: usize = 50;

/// Number of record slots in a record block for a relation with `num_attrs` attributes.
pub const fn slots_per_block(num_attrs: usize) -> usize {
    (BLOCK_SIZE - HEADER_SIZE) / (ATTR_SIZE * num_attrs + 1)
}

/// Largest attribute count that still leaves room for one record per block
pub const MAX_ATTRS: usize = (BLOCK_SIZE - HEADER_SIZE - 1) / ATTR_SIZE;

/// Runtime configuration of a storage engine session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of blocks on the disk image
    pub disk_blocks: u32,
    /// Number of slots in the buffer pool
    pub buffer_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            disk_blocks: DISK_BLOCKS,
            buffer_capacity: BUFFER_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn with_disk_blocks(mut self, disk_blocks: u32) -> Self {
        self.disk_blocks = disk_blocks;
        self
    }

    pub fn with_buffer_capacity(mut self, buffer_capacity: usize) -> Self {
        self.buffer_capacity = buffer_capacity;
        self
    }

    /// Checks that the configuration describes a usable disk and buffer pool.
    pub fn validate(&self) -> Result<()> {
        if self.disk_blocks <= ATTRCAT_BLOCK {
            return Err(StoreError::InvalidConfig(format!(
                "disk of {} blocks cannot hold the allocation map and catalogs",
                self.disk_blocks
            )));
        }
        let describable = BLOCK_ALLOCATION_MAP_SIZE as usize * BLOCK_SIZE;
        if self.disk_blocks as usize > describable {
            return Err(StoreError::InvalidConfig(format!(
                "disk of {} blocks exceeds the {} blocks the allocation map can describe",
                self.disk_blocks, describable
            )));
        }
        if self.buffer_capacity == 0 {
            return Err(StoreError::InvalidConfig(
                "buffer pool needs at least one slot".to_string(),
            ));
        }
        Ok(())
    }
}
