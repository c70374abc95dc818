use crate::buffer::BufferPool;
use crate::common::{
    AttrType, Attribute, BlockNum, Result, StoreError, ATTR_SIZE, HEADER_SIZE,
};

use super::{get_free_block, release_block, BlockType, HeadInfo};

/// Record block layout:
///
/// +------------------+
/// | Header           |  (HEADER_SIZE bytes)
/// +------------------+
/// | Slot map         |  (numSlots bytes, one per slot)
/// +------------------+
/// | Record 0         |  (numAttrs * ATTR_SIZE bytes)
/// | Record 1         |
/// | ...              |
/// +------------------+
const SLOT_MAP_OFFSET: usize = HEADER_SIZE;

/// Occupancy of a record slot as stored in the slot map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Unoccupied,
    Occupied,
}

impl SlotState {
    pub fn code(&self) -> u8 {
        match self {
            SlotState::Unoccupied => 0,
            SlotState::Occupied => 1,
        }
    }

    pub fn from_code(code: u8) -> Self {
        if code == 0 {
            SlotState::Unoccupied
        } else {
            SlotState::Occupied
        }
    }

    pub fn is_occupied(&self) -> bool {
        *self == SlotState::Occupied
    }
}

fn record_offset(head: &HeadInfo, slot: usize) -> usize {
    SLOT_MAP_OFFSET + head.num_slots + slot * head.num_attrs * ATTR_SIZE
}

/// RecordPageRef reads the slot map and records of a record block.
pub struct RecordPageRef<'a> {
    data: &'a [u8],
    head: HeadInfo,
}

impl<'a> RecordPageRef<'a> {
    pub fn new(block: BlockNum, data: &'a [u8]) -> Result<Self> {
        let head = HeadInfo::read(block, data)?;
        Ok(Self { data, head })
    }

    pub fn header(&self) -> &HeadInfo {
        &self.head
    }

    pub fn slot_map(&self) -> Vec<SlotState> {
        self.data[SLOT_MAP_OFFSET..SLOT_MAP_OFFSET + self.head.num_slots]
            .iter()
            .map(|&b| SlotState::from_code(b))
            .collect()
    }

    pub fn slot(&self, slot: usize) -> Result<SlotState> {
        if slot >= self.head.num_slots {
            return Err(StoreError::OutOfBound);
        }
        Ok(SlotState::from_code(self.data[SLOT_MAP_OFFSET + slot]))
    }

    /// Decodes the record in `slot`, one value per entry of `types`.
    pub fn record(&self, slot: usize, types: &[AttrType]) -> Result<Vec<Attribute>> {
        if slot >= self.head.num_slots {
            return Err(StoreError::OutOfBound);
        }
        if types.len() != self.head.num_attrs {
            return Err(StoreError::AttrCountMismatch {
                expected: self.head.num_attrs,
                actual: types.len(),
            });
        }
        let start = record_offset(&self.head, slot);
        Ok(types
            .iter()
            .enumerate()
            .map(|(i, &ty)| {
                let at = start + i * ATTR_SIZE;
                Attribute::decode(&self.data[at..at + ATTR_SIZE], ty)
            })
            .collect())
    }
}

/// RecordPage updates the slot map and records of a record block.
pub struct RecordPage<'a> {
    data: &'a mut [u8],
    head: HeadInfo,
}

impl<'a> RecordPage<'a> {
    pub fn new(block: BlockNum, data: &'a mut [u8]) -> Result<Self> {
        let head = HeadInfo::read(block, data)?;
        Ok(Self { data, head })
    }

    pub fn set_slot(&mut self, slot: usize, state: SlotState) -> Result<()> {
        if slot >= self.head.num_slots {
            return Err(StoreError::OutOfBound);
        }
        self.data[SLOT_MAP_OFFSET + slot] = state.code();
        Ok(())
    }

    pub fn set_slot_map(&mut self, slot_map: &[SlotState]) -> Result<()> {
        if slot_map.len() != self.head.num_slots {
            return Err(StoreError::OutOfBound);
        }
        for (byte, state) in self.data[SLOT_MAP_OFFSET..].iter_mut().zip(slot_map) {
            *byte = state.code();
        }
        Ok(())
    }

    pub fn set_record(&mut self, slot: usize, record: &[Attribute]) -> Result<()> {
        if slot >= self.head.num_slots {
            return Err(StoreError::OutOfBound);
        }
        if record.len() != self.head.num_attrs {
            return Err(StoreError::AttrCountMismatch {
                expected: self.head.num_attrs,
                actual: record.len(),
            });
        }
        let start = record_offset(&self.head, slot);
        for (i, value) in record.iter().enumerate() {
            let at = start + i * ATTR_SIZE;
            value.encode(&mut self.data[at..at + ATTR_SIZE]);
        }
        Ok(())
    }
}

/// Handle on a record block in the buffer pool.
#[derive(Debug, PartialEq, Eq)]
pub struct RecBuffer {
    block: BlockNum,
}

impl RecBuffer {
    /// Allocates a fresh record block.
    pub fn new(pool: &mut BufferPool) -> Result<Self> {
        let block = get_free_block(pool, BlockType::Rec)?;
        Ok(Self { block })
    }

    /// Binds to an existing block.
    pub fn open(pool: &BufferPool, block: BlockNum) -> Result<Self> {
        if block.as_u32() >= pool.disk_blocks() {
            return Err(StoreError::OutOfBound);
        }
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

    pub fn slot_map(&self, pool: &mut BufferPool) -> Result<Vec<SlotState>> {
        Ok(RecordPageRef::new(self.block, pool.load(self.block)?)?.slot_map())
    }

    pub fn set_slot_map(&self, pool: &mut BufferPool, slot_map: &[SlotState]) -> Result<()> {
        RecordPage::new(self.block, pool.load_mut(self.block)?)?.set_slot_map(slot_map)
    }

    pub fn set_slot(&self, pool: &mut BufferPool, slot: usize, state: SlotState) -> Result<()> {
        RecordPage::new(self.block, pool.load_mut(self.block)?)?.set_slot(slot, state)
    }

    pub fn record(
        &self,
        pool: &mut BufferPool,
        slot: usize,
        types: &[AttrType],
    ) -> Result<Vec<Attribute>> {
        RecordPageRef::new(self.block, pool.load(self.block)?)?.record(slot, types)
    }

    pub fn set_record(
        &self,
        pool: &mut BufferPool,
        slot: usize,
        record: &[Attribute],
    ) -> Result<()> {
        RecordPage::new(self.block, pool.load_mut(self.block)?)?.set_record(slot, record)
    }

    /// Frees the block. The handle is consumed so it cannot be used again.
    pub fn release(self, pool: &mut BufferPool) {
        release_block(pool, self.block);
    }
}
