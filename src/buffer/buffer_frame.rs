use crate::common::{BlockNum, BLOCK_SIZE};

/// Index of a slot in the buffer pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub usize);

impl FrameId {
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

/// BufferFrame is a single block-sized slot of the buffer pool together
/// with its metadata.
pub struct BufferFrame {
    /// The block held in this slot (None if the slot is free)
    block: Option<BlockNum>,
    /// Whether the block has been modified since it was read from disk
    dirty: bool,
    /// Number of pool accesses since this slot was last used
    timestamp: u32,
    /// The block contents
    data: Box<[u8; BLOCK_SIZE]>,
}

impl BufferFrame {
    pub fn new() -> Self {
        Self {
            block: None,
            dirty: false,
            timestamp: 0,
            data: Box::new([0u8; BLOCK_SIZE]),
        }
    }

    pub fn is_free(&self) -> bool {
        self.block.is_none()
    }

    pub fn block(&self) -> Option<BlockNum> {
        self.block
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    /// Ages an occupied slot by one access.
    pub fn age(&mut self) {
        if !self.is_free() {
            self.timestamp = self.timestamp.saturating_add(1);
        }
    }

    /// Marks the slot as the most recently used.
    pub fn touch(&mut self) {
        self.timestamp = 0;
    }

    /// Binds the slot to `block` as a clean, most recently used slot.
    pub fn assign(&mut self, block: BlockNum) {
        self.block = Some(block);
        self.dirty = false;
        self.timestamp = 0;
    }

    /// Returns the slot to the free state. Contents are left in place
    /// and overwritten by the next assignment.
    pub fn reset(&mut self) {
        self.block = None;
        self.dirty = false;
        self.timestamp = 0;
    }

    pub fn data(&self) -> &[u8] {
        &self.data[..]
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data[..]
    }
}

impl Default for BufferFrame {
    fn default() -> Self {
        Self::new()
    }
}
