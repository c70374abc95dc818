//! Formatting a blank disk image and loading the two catalog relations.
//!
//! Both catalogs are ordinary relations, but opening a relation needs a
//! scan of the catalogs, so their own rows live at fixed slots and are
//! read directly instead of being searched for.

use tracing::info;

use crate::buffer::BufferPool;
use crate::common::{
    slots_per_block, Attribute, BlockNum, RecId, Result, ATTRCAT_ATTR_ATTRIBUTE_NAME,
    ATTRCAT_ATTR_ATTRIBUTE_TYPE, ATTRCAT_ATTR_OFFSET, ATTRCAT_ATTR_PRIMARY_FLAG,
    ATTRCAT_ATTR_RELNAME, ATTRCAT_ATTR_ROOT_BLOCK, ATTRCAT_BLOCK, ATTRCAT_RELID, ATTRCAT_RELNAME,
    BLOCK_SIZE, CATALOG_NO_ATTRS, RELCAT_ATTR_FIRST_BLOCK, RELCAT_ATTR_LAST_BLOCK,
    RELCAT_ATTR_NO_ATTRIBUTES, RELCAT_ATTR_NO_RECORDS, RELCAT_ATTR_NO_SLOTS,
    RELCAT_ATTR_RELNAME, RELCAT_BLOCK, RELCAT_RELID, RELCAT_RELNAME,
};
use crate::storage::block::{BlockAllocMap, BlockType, HeadInfo, RecBuffer, RecordPage, SlotState};
use crate::storage::disk::DiskStore;

use super::{
    AttrCacheEntry, AttrCatEntry, OpenRelTable, OpenRelation, RelCacheEntry, RelCatEntry,
    ATTRCAT_ATTR_TYPES, RELCAT_ATTR_TYPES,
};

/// Relation catalog slot describing the relation catalog
const RELCAT_SELF_SLOT: usize = 0;
/// Relation catalog slot describing the attribute catalog
const RELCAT_ATTRCAT_SLOT: usize = 1;
/// First attribute catalog slot describing the relation catalog's attributes
const ATTRCAT_RELCAT_SLOT: usize = 0;
/// First attribute catalog slot describing the attribute catalog's attributes
const ATTRCAT_SELF_SLOT: usize = CATALOG_NO_ATTRS;

const RELCAT_ATTRS: [&str; CATALOG_NO_ATTRS] = [
    RELCAT_ATTR_RELNAME,
    RELCAT_ATTR_NO_ATTRIBUTES,
    RELCAT_ATTR_NO_RECORDS,
    RELCAT_ATTR_FIRST_BLOCK,
    RELCAT_ATTR_LAST_BLOCK,
    RELCAT_ATTR_NO_SLOTS,
];

const ATTRCAT_ATTRS: [&str; CATALOG_NO_ATTRS] = [
    ATTRCAT_ATTR_RELNAME,
    ATTRCAT_ATTR_ATTRIBUTE_NAME,
    ATTRCAT_ATTR_ATTRIBUTE_TYPE,
    ATTRCAT_ATTR_PRIMARY_FLAG,
    ATTRCAT_ATTR_ROOT_BLOCK,
    ATTRCAT_ATTR_OFFSET,
];

fn catalog_rel_entry(name: &str, num_recs: usize, block: u32) -> RelCatEntry {
    let mut entry = RelCatEntry::new(name, CATALOG_NO_ATTRS);
    entry.num_recs = num_recs;
    entry.first_blk = Some(BlockNum::new(block));
    entry.last_blk = Some(BlockNum::new(block));
    entry
}

fn catalog_attr_entries(rel_name: &str) -> Vec<AttrCatEntry> {
    let (names, types) = if rel_name == RELCAT_RELNAME {
        (RELCAT_ATTRS, RELCAT_ATTR_TYPES)
    } else {
        (ATTRCAT_ATTRS, ATTRCAT_ATTR_TYPES)
    };
    names
        .iter()
        .zip(types)
        .enumerate()
        .map(|(offset, (name, ty))| AttrCatEntry::new(rel_name, name, ty, offset))
        .collect()
}

/// Writes a catalog block holding `records` in its first slots.
fn write_catalog_block(
    disk: &dyn DiskStore,
    block: u32,
    records: &[Vec<Attribute>],
) -> Result<()> {
    let block = BlockNum::new(block);
    let mut data = vec![0u8; BLOCK_SIZE];

    let mut head = HeadInfo::new(BlockType::Rec);
    head.num_entries = records.len();
    head.num_attrs = CATALOG_NO_ATTRS;
    head.num_slots = slots_per_block(CATALOG_NO_ATTRS);
    head.write(&mut data);

    let mut page = RecordPage::new(block, &mut data)?;
    for (slot, record) in records.iter().enumerate() {
        page.set_record(slot, record)?;
        page.set_slot(slot, SlotState::Occupied)?;
    }
    disk.write_block(block, &data)
}

/// Formats `disk` as an empty database: the allocation map plus the two
/// catalog blocks describing themselves.
pub fn format(disk: &dyn DiskStore) -> Result<()> {
    let disk_blocks = disk.num_blocks();
    BlockAllocMap::check_disk_blocks(disk_blocks)?;
    let map = BlockAllocMap::formatted(disk_blocks).to_bytes();
    for (i, chunk) in map.chunks(BLOCK_SIZE).enumerate() {
        disk.write_block(BlockNum::new(i as u32), chunk)?;
    }

    let rel_rows = vec![
        catalog_rel_entry(RELCAT_RELNAME, 2, RELCAT_BLOCK).to_record(),
        catalog_rel_entry(ATTRCAT_RELNAME, 2 * CATALOG_NO_ATTRS, ATTRCAT_BLOCK).to_record(),
    ];
    write_catalog_block(disk, RELCAT_BLOCK, &rel_rows)?;

    let attr_rows: Vec<_> = catalog_attr_entries(RELCAT_RELNAME)
        .into_iter()
        .chain(catalog_attr_entries(ATTRCAT_RELNAME))
        .map(|entry| entry.to_record())
        .collect();
    write_catalog_block(disk, ATTRCAT_BLOCK, &attr_rows)?;

    disk.sync()?;
    info!(disk_blocks, "formatted disk image");
    Ok(())
}

fn load_catalog(pool: &mut BufferPool, rel_slot: usize, first_attr_slot: usize) -> Result<OpenRelation> {
    let relcat = RecBuffer::open(pool, BlockNum::new(RELCAT_BLOCK))?;
    let record = relcat.record(pool, rel_slot, &RELCAT_ATTR_TYPES)?;
    let rel = RelCacheEntry {
        entry: RelCatEntry::from_record(&record)?,
        dirty: false,
        rec_id: RecId::new(relcat.block_num(), rel_slot),
        search_index: None,
    };

    let attrcat = RecBuffer::open(pool, BlockNum::new(ATTRCAT_BLOCK))?;
    let mut attrs = Vec::with_capacity(CATALOG_NO_ATTRS);
    for slot in first_attr_slot..first_attr_slot + CATALOG_NO_ATTRS {
        let record = attrcat.record(pool, slot, &ATTRCAT_ATTR_TYPES)?;
        attrs.push(AttrCacheEntry {
            entry: AttrCatEntry::from_record(&record)?,
            dirty: false,
            rec_id: RecId::new(attrcat.block_num(), slot),
            search_index: None,
        });
    }
    attrs.sort_by_key(|a| a.entry.offset);

    Ok(OpenRelation { rel, attrs })
}

/// Installs both catalogs in the open relation table from their fixed slots.
pub fn load_catalogs(pool: &mut BufferPool, table: &mut OpenRelTable) -> Result<()> {
    let relcat = load_catalog(pool, RELCAT_SELF_SLOT, ATTRCAT_RELCAT_SLOT)?;
    let attrcat = load_catalog(pool, RELCAT_ATTRCAT_SLOT, ATTRCAT_SELF_SLOT)?;
    table.install(RELCAT_RELID, relcat)?;
    table.install(ATTRCAT_RELID, attrcat)?;
    Ok(())
}
