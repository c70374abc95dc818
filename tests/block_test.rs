//! Integration tests for record and index block views

use std::sync::Arc;

use relstore::buffer::BufferPool;
use relstore::catalog;
use relstore::common::{slots_per_block, AttrType, Attribute, BlockNum, RecId, StoreError};
use relstore::storage::block::{
    get_free_block, release_block, BlockBuffer, BlockType, IndInternal, IndLeaf, InternalEntry,
    LeafEntry, RecBuffer, SlotState,
};
use relstore::storage::disk::MemoryDisk;

fn create_pool(disk_blocks: u32) -> BufferPool {
    let disk = Arc::new(MemoryDisk::new(disk_blocks));
    catalog::format(&*disk).unwrap();
    BufferPool::new(8, Box::new(disk)).unwrap()
}

fn record_block(pool: &mut BufferPool, types: &[AttrType]) -> RecBuffer {
    let block = RecBuffer::new(pool).unwrap();
    let num_slots = slots_per_block(types.len());
    let mut head = block.header(pool).unwrap();
    head.num_attrs = types.len();
    head.num_slots = num_slots;
    block.set_header(pool, &head).unwrap();
    block
        .set_slot_map(pool, &vec![SlotState::Unoccupied; num_slots])
        .unwrap();
    block
}

#[test]
fn test_record_round_trip() {
    let mut pool = create_pool(32);
    let types = [AttrType::Number, AttrType::Text, AttrType::Number];
    let block = record_block(&mut pool, &types);

    let records = [
        vec![
            Attribute::from(-12.5),
            Attribute::text("fifteen chars!!").unwrap(),
            Attribute::from(f64::MAX),
        ],
        vec![
            Attribute::from(0.0),
            Attribute::text("").unwrap(),
            Attribute::from(1e-300),
        ],
    ];
    let last = slots_per_block(types.len()) - 1;
    block.set_record(&mut pool, 0, &records[0]).unwrap();
    block.set_record(&mut pool, last, &records[1]).unwrap();

    assert_eq!(block.record(&mut pool, 0, &types).unwrap(), records[0]);
    assert_eq!(block.record(&mut pool, last, &types).unwrap(), records[1]);
    assert!(matches!(
        block.record(&mut pool, last + 1, &types),
        Err(StoreError::OutOfBound)
    ));
}

#[test]
fn test_text_longer_than_attribute_rejected() {
    assert!(matches!(
        Attribute::text("sixteen chars!!!"),
        Err(StoreError::ValueTooLong { .. })
    ));
}

#[test]
fn test_slot_map_updates() {
    let mut pool = create_pool(32);
    let block = record_block(&mut pool, &[AttrType::Number]);
    assert_eq!(block.slot_map(&mut pool).unwrap().len(), 118);

    block.set_slot(&mut pool, 3, SlotState::Occupied).unwrap();
    block.set_slot(&mut pool, 117, SlotState::Occupied).unwrap();
    let slot_map = block.slot_map(&mut pool).unwrap();
    let occupied: Vec<usize> = slot_map
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_occupied())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(occupied, vec![3, 117]);
}

#[test]
fn test_block_buffer_dispatch() {
    let mut pool = create_pool(32);
    let rec = RecBuffer::new(&mut pool).unwrap().block_num();
    let leaf = IndLeaf::new(&mut pool).unwrap().block_num();
    let internal = IndInternal::new(&mut pool).unwrap().block_num();

    assert!(matches!(BlockBuffer::load(&mut pool, rec).unwrap(), BlockBuffer::Record(_)));
    assert!(matches!(BlockBuffer::load(&mut pool, leaf).unwrap(), BlockBuffer::Leaf(_)));
    assert!(matches!(
        BlockBuffer::load(&mut pool, internal).unwrap(),
        BlockBuffer::Internal(_)
    ));
    assert!(matches!(
        BlockBuffer::load(&mut pool, BlockNum::new(32)),
        Err(StoreError::OutOfBound)
    ));

    assert_eq!(pool.block_type(leaf), Some(BlockType::IndLeaf));
    BlockBuffer::load(&mut pool, leaf).unwrap().release(&mut pool);
    assert_eq!(pool.block_type(leaf), Some(BlockType::Unused));
    assert!(!pool.is_resident(leaf));
}

#[test]
fn test_allocation_until_disk_full() {
    let mut pool = create_pool(10);
    let blocks: Vec<BlockNum> = (0..4)
        .map(|_| get_free_block(&mut pool, BlockType::Rec).unwrap())
        .collect();
    assert_eq!(
        blocks,
        (6..10).map(BlockNum::new).collect::<Vec<_>>()
    );
    assert!(matches!(
        get_free_block(&mut pool, BlockType::IndLeaf),
        Err(StoreError::DiskFull)
    ));

    release_block(&mut pool, BlockNum::new(8));
    assert_eq!(
        get_free_block(&mut pool, BlockType::IndLeaf).unwrap(),
        BlockNum::new(8)
    );
}

#[test]
fn test_fresh_block_header_is_blank() {
    let mut pool = create_pool(16);
    let leaf = IndLeaf::new(&mut pool).unwrap();
    let head = leaf.header(&mut pool).unwrap();
    assert_eq!(head.block_type, BlockType::IndLeaf);
    assert_eq!(head.pblock, None);
    assert_eq!(head.lblock, None);
    assert_eq!(head.rblock, None);
    assert_eq!(head.num_entries, 0);
}

#[test]
fn test_index_entries() {
    let mut pool = create_pool(16);
    let leaf = IndLeaf::new(&mut pool).unwrap();
    let entries: Vec<LeafEntry> = ["ant", "bee", "cat"]
        .iter()
        .enumerate()
        .map(|(i, key)| LeafEntry {
            key: Attribute::text(key).unwrap(),
            rec_id: RecId::new(BlockNum::new(6), i),
        })
        .collect();
    for (i, entry) in entries.iter().enumerate() {
        leaf.set_entry(&mut pool, i, entry).unwrap();
    }
    let mut head = leaf.header(&mut pool).unwrap();
    head.num_entries = entries.len();
    leaf.set_header(&mut pool, &head).unwrap();

    assert_eq!(leaf.entries(&mut pool, AttrType::Text).unwrap(), entries);
    assert!(matches!(
        leaf.entry(&mut pool, 63, AttrType::Text),
        Err(StoreError::OutOfBound)
    ));

    let node = IndInternal::new(&mut pool).unwrap();
    let entry = InternalEntry {
        lchild: leaf.block_num(),
        key: Attribute::text("bee").unwrap(),
        rchild: BlockNum::new(12),
    };
    node.set_entry(&mut pool, 0, &entry).unwrap();
    assert_eq!(node.entry(&mut pool, 0, AttrType::Text).unwrap(), entry);
    assert!(matches!(
        node.set_entry(&mut pool, 100, &entry),
        Err(StoreError::OutOfBound)
    ));
}
