use crate::common::{
    compare_attrs, AttrType, Attribute, BlockNum, Op, RecId, RelId, Result, StoreError,
};
use crate::engine::StorageEngine;
use crate::storage::block::RecBuffer;

impl StorageEngine {
    /// Walks the block chain from `(block, slot)` and returns the first
    /// occupied record accepted by `accept`.
    pub(crate) fn scan_from<F>(
        &mut self,
        mut block: Option<BlockNum>,
        mut slot: usize,
        types: &[AttrType],
        mut accept: F,
    ) -> Result<Option<(RecId, Vec<Attribute>)>>
    where
        F: FnMut(&[Attribute]) -> bool,
    {
        while let Some(current) = block {
            let buffer = RecBuffer::open(&self.pool, current)?;
            let head = buffer.header(&mut self.pool)?;
            let slot_map = buffer.slot_map(&mut self.pool)?;

            for (s, state) in slot_map.iter().enumerate().skip(slot) {
                if !state.is_occupied() {
                    continue;
                }
                let record = buffer.record(&mut self.pool, s, types)?;
                if accept(&record) {
                    return Ok(Some((RecId::new(current, s), record)));
                }
            }

            block = head.rblock;
            slot = 0;
        }
        Ok(None)
    }

    /// Position the relation's scan resumes from.
    fn scan_start(&self, rel_id: RelId) -> Result<(Option<BlockNum>, usize)> {
        Ok(match self.open_rels.rel_search_index(rel_id)? {
            None => (self.open_rels.rel_cat_entry(rel_id)?.first_blk, 0),
            Some(prev) => (Some(prev.block), prev.slot + 1),
        })
    }

    /// Returns the next record after the relation's search cursor whose
    /// `attr_name` value satisfies `op` against `value`, and moves the
    /// cursor onto it. `None` means the scan is exhausted; the cursor is
    /// then left where it was.
    pub fn linear_search(
        &mut self,
        rel_id: RelId,
        attr_name: &str,
        value: &Attribute,
        op: Op,
    ) -> Result<Option<RecId>> {
        let offset = self.open_rels.attr_cat_entry(rel_id, attr_name)?.offset;
        let types = self.open_rels.get(rel_id)?.attr_types();
        let (block, slot) = self.scan_start(rel_id)?;

        let found = self.scan_from(block, slot, &types, |record| {
            op.matches(compare_attrs(&record[offset], value))
        })?;
        match found {
            Some((rec_id, _)) => {
                self.open_rels.set_rel_search_index(rel_id, Some(rec_id))?;
                Ok(Some(rec_id))
            }
            None => Ok(None),
        }
    }

    /// Finds one record whose `attr_name` value satisfies `op`. Uses the
    /// attribute's B+ tree when it has one, otherwise a linear scan; both
    /// resume from the cursor left by the previous call.
    pub fn search(
        &mut self,
        rel_id: RelId,
        attr_name: &str,
        value: &Attribute,
        op: Op,
    ) -> Result<Vec<Attribute>> {
        let attr = self.open_rels.attr_cat_entry(rel_id, attr_name)?;
        let indexed = attr.root_block.is_some();
        value.check(attr.attr_type)?;

        let rec_id = if indexed {
            self.bplus_search(rel_id, attr_name, value, op)?
        } else {
            self.linear_search(rel_id, attr_name, value, op)?
        };
        let rec_id = rec_id.ok_or(StoreError::NotFound)?;

        let types = self.open_rels.get(rel_id)?.attr_types();
        self.read_record(rec_id, &types)
    }

    /// Returns the next live record of the relation in block-then-slot
    /// order, or `NotFound` once every record has been returned. Reset the
    /// relation's search cursor to start over.
    pub fn project(&mut self, rel_id: RelId) -> Result<Vec<Attribute>> {
        let types = self.open_rels.get(rel_id)?.attr_types();
        let (block, slot) = self.scan_start(rel_id)?;

        let (rec_id, record) = self
            .scan_from(block, slot, &types, |_| true)?
            .ok_or(StoreError::NotFound)?;
        self.open_rels.set_rel_search_index(rel_id, Some(rec_id))?;
        Ok(record)
    }
}
