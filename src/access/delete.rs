use tracing::debug;

use crate::catalog::{AttrCatEntry, RelCatEntry, ATTRCAT_ATTR_TYPES, RELCAT_ATTR_TYPES};
use crate::common::{
    Attribute, BlockNum, Op, RelId, Result, StoreError, ATTRCAT_ATTR_RELNAME, ATTRCAT_RELID,
    ATTRCAT_RELNAME, RELCAT_ATTR_RELNAME, RELCAT_RELID, RELCAT_RELNAME,
};
use crate::engine::StorageEngine;
use crate::storage::block::{HeadInfo, RecBuffer, SlotState};

impl StorageEngine {
    /// Deletes a relation: its record blocks, its attribute catalog rows,
    /// every index on its attributes, and its relation catalog row.
    pub fn delete_relation(&mut self, rel_name: &str) -> Result<()> {
        if rel_name == RELCAT_RELNAME || rel_name == ATTRCAT_RELNAME {
            return Err(StoreError::NotPermitted);
        }
        let name = Attribute::Text(rel_name.to_string());

        self.open_rels.reset_rel_search_index(RELCAT_RELID)?;
        let rel_rec = self
            .linear_search(RELCAT_RELID, RELCAT_ATTR_RELNAME, &name, Op::Eq)?
            .ok_or(StoreError::RelNotExist)?;
        let rel = RelCatEntry::from_record(&self.read_record(rel_rec, &RELCAT_ATTR_TYPES)?)?;

        let mut block = rel.first_blk;
        while let Some(current) = block {
            let buffer = RecBuffer::open(&self.pool, current)?;
            block = buffer.header(&mut self.pool)?.rblock;
            buffer.release(&mut self.pool);
        }

        self.open_rels.reset_rel_search_index(ATTRCAT_RELID)?;
        let mut num_deleted = 0;
        while let Some(attr_rec) =
            self.linear_search(ATTRCAT_RELID, ATTRCAT_ATTR_RELNAME, &name, Op::Eq)?
        {
            let attr = AttrCatEntry::from_record(&self.read_record(attr_rec, &ATTRCAT_ATTR_TYPES)?)?;

            let buffer = RecBuffer::open(&self.pool, attr_rec.block)?;
            buffer.set_slot(&mut self.pool, attr_rec.slot, SlotState::Unoccupied)?;
            let mut head = buffer.header(&mut self.pool)?;
            head.num_entries = head.num_entries.saturating_sub(1);
            buffer.set_header(&mut self.pool, &head)?;
            num_deleted += 1;

            if head.num_entries == 0 {
                self.unlink_block(ATTRCAT_RELID, &head)?;
                buffer.release(&mut self.pool);
                self.open_rels.reset_rel_search_index(ATTRCAT_RELID)?;
            }

            if let Some(root) = attr.root_block {
                self.bplus_destroy(root)?;
            }
        }

        let relcat = RecBuffer::open(&self.pool, rel_rec.block)?;
        relcat.set_slot(&mut self.pool, rel_rec.slot, SlotState::Unoccupied)?;
        let mut head = relcat.header(&mut self.pool)?;
        head.num_entries = head.num_entries.saturating_sub(1);
        relcat.set_header(&mut self.pool, &head)?;

        let mut relcat_entry = self.open_rels.rel_cat_entry(RELCAT_RELID)?.clone();
        relcat_entry.num_recs = relcat_entry.num_recs.saturating_sub(1);
        self.open_rels.set_rel_cat_entry(RELCAT_RELID, relcat_entry)?;

        let mut attrcat_entry = self.open_rels.rel_cat_entry(ATTRCAT_RELID)?.clone();
        attrcat_entry.num_recs = attrcat_entry.num_recs.saturating_sub(num_deleted);
        self.open_rels.set_rel_cat_entry(ATTRCAT_RELID, attrcat_entry)?;

        debug!(rel = rel_name, attrs = num_deleted, "deleted relation");
        Ok(())
    }

    /// Removes an emptied record block, described by `head`, from the
    /// relation's block chain.
    fn unlink_block(&mut self, rel_id: RelId, head: &HeadInfo) -> Result<()> {
        let mut rel = self.open_rels.rel_cat_entry(rel_id)?.clone();
        match head.lblock {
            Some(left) => self.set_sibling(left, |h| h.rblock = head.rblock)?,
            None => rel.first_blk = head.rblock,
        }
        match head.rblock {
            Some(right) => self.set_sibling(right, |h| h.lblock = head.lblock)?,
            None => rel.last_blk = head.lblock,
        }
        self.open_rels.set_rel_cat_entry(rel_id, rel)
    }

    fn set_sibling<F>(&mut self, block: BlockNum, update: F) -> Result<()>
    where
        F: FnOnce(&mut HeadInfo),
    {
        let buffer = RecBuffer::open(&self.pool, block)?;
        let mut head = buffer.header(&mut self.pool)?;
        update(&mut head);
        buffer.set_header(&mut self.pool, &head)
    }
}
