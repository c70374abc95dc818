use tracing::{debug, warn};

use crate::common::{
    Attribute, RecId, RelId, Result, StoreError, ATTRCAT_RELID, RELCAT_RELID,
};
use crate::engine::StorageEngine;
use crate::storage::block::{BlockType, HeadInfo, RecBuffer, SlotState};

impl StorageEngine {
    /// Inserts a validated record into a user relation and into every
    /// index on it.
    ///
    /// An index that runs out of disk space while taking the new key is
    /// dropped; the record insert itself still succeeds.
    pub fn insert(&mut self, rel_id: RelId, record: &[Attribute]) -> Result<RecId> {
        if rel_id == RELCAT_RELID || rel_id == ATTRCAT_RELID {
            return Err(StoreError::NotPermitted);
        }
        let relation = self.open_rels.get(rel_id)?;
        if record.len() != relation.attrs.len() {
            return Err(StoreError::AttrCountMismatch {
                expected: relation.attrs.len(),
                actual: record.len(),
            });
        }
        for (value, attr) in record.iter().zip(&relation.attrs) {
            value.check(attr.entry.attr_type)?;
        }
        let indexed: Vec<(String, usize)> = relation
            .attrs
            .iter()
            .filter(|a| a.entry.root_block.is_some())
            .map(|a| (a.entry.attr_name.clone(), a.entry.offset))
            .collect();

        let rec_id = self.insert_record(rel_id, record)?;

        for (attr_name, offset) in indexed {
            match self.bplus_insert(rel_id, &attr_name, &record[offset], rec_id) {
                Ok(()) => {}
                Err(StoreError::DiskFull) => {
                    warn!(rel_id, attr = %attr_name, "disk full, index dropped");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(rec_id)
    }

    /// Stores `record` in the first free slot of the relation, extending
    /// the block chain when every block is full. Catalog relations are
    /// accepted; the relation catalog never grows past its single block.
    pub(crate) fn insert_record(&mut self, rel_id: RelId, record: &[Attribute]) -> Result<RecId> {
        let mut rel = self.open_rels.rel_cat_entry(rel_id)?.clone();

        let mut free = None;
        let mut prev_block = None;
        let mut block = rel.first_blk;
        while let Some(current) = block {
            let buffer = RecBuffer::open(&self.pool, current)?;
            let slot_map = buffer.slot_map(&mut self.pool)?;
            if let Some(slot) = slot_map.iter().position(|s| !s.is_occupied()) {
                free = Some(RecId::new(current, slot));
                break;
            }
            prev_block = Some(current);
            block = buffer.header(&mut self.pool)?.rblock;
        }

        let rec_id = match free {
            Some(rec_id) => rec_id,
            None => {
                if rel_id == RELCAT_RELID {
                    return Err(StoreError::MaxRelations);
                }
                let buffer = RecBuffer::new(&mut self.pool)?;
                let new_block = buffer.block_num();

                let mut head = HeadInfo::new(BlockType::Rec);
                head.lblock = prev_block;
                head.num_attrs = rel.num_attrs;
                head.num_slots = rel.num_slots_per_blk;
                buffer.set_header(&mut self.pool, &head)?;
                buffer.set_slot_map(
                    &mut self.pool,
                    &vec![SlotState::Unoccupied; head.num_slots],
                )?;

                match prev_block {
                    Some(prev) => {
                        let prev_buffer = RecBuffer::open(&self.pool, prev)?;
                        let mut prev_head = prev_buffer.header(&mut self.pool)?;
                        prev_head.rblock = Some(new_block);
                        prev_buffer.set_header(&mut self.pool, &prev_head)?;
                    }
                    None => rel.first_blk = Some(new_block),
                }
                rel.last_blk = Some(new_block);

                debug!(rel = %rel.rel_name, block = %new_block, "extended relation");
                RecId::new(new_block, 0)
            }
        };

        let buffer = RecBuffer::open(&self.pool, rec_id.block)?;
        buffer.set_record(&mut self.pool, rec_id.slot, record)?;
        buffer.set_slot(&mut self.pool, rec_id.slot, SlotState::Occupied)?;
        let mut head = buffer.header(&mut self.pool)?;
        head.num_entries += 1;
        buffer.set_header(&mut self.pool, &head)?;

        rel.num_recs += 1;
        self.open_rels.set_rel_cat_entry(rel_id, rel)?;
        Ok(rec_id)
    }
}
