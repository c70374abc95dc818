use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::common::{
    compare_attrs, AttrType, Attribute, BlockNum, IndexId, Op, RecId, RelId, Result, StoreError,
    ATTRCAT_RELID, RELCAT_RELID,
};
use crate::engine::StorageEngine;
use crate::storage::block::{BlockBuffer, BlockType, IndInternal, IndLeaf, LeafEntry, RecBuffer};

impl StorageEngine {
    /// Returns the next indexed record after the attribute's search cursor
    /// whose key satisfies `op` against `value`, moving the cursor onto its
    /// leaf entry. `None` when no further entry matches.
    pub fn bplus_search(
        &mut self,
        rel_id: RelId,
        attr_name: &str,
        value: &Attribute,
        op: Op,
    ) -> Result<Option<RecId>> {
        let attr = self.open_rels.attr_cat_entry(rel_id, attr_name)?;
        let ty = attr.attr_type;
        let root = attr.root_block;

        let (mut block, mut index) = match self.open_rels.attr_search_index(rel_id, attr_name)? {
            Some(prev) => (Some(prev.block), prev.index + 1),
            None => match root {
                Some(root) => (Some(self.descend(root, value, op, ty)?), 0),
                None => return Ok(None),
            },
        };

        while let Some(current) = block {
            let leaf = IndLeaf::open(&self.pool, current)?;
            let head = leaf.header(&mut self.pool)?;
            let entries = leaf.entries(&mut self.pool, ty)?;

            for (i, entry) in entries.iter().enumerate().skip(index) {
                let ord = compare_attrs(&entry.key, value);
                if op.matches(ord) {
                    self.open_rels.set_attr_search_index(
                        rel_id,
                        attr_name,
                        Some(IndexId::new(current, i)),
                    )?;
                    return Ok(Some(entry.rec_id));
                }
                // keys only grow from here
                if matches!(op, Op::Eq | Op::Le | Op::Lt) && ord == Ordering::Greater {
                    return Ok(None);
                }
            }

            block = head.rblock;
            index = 0;
        }
        Ok(None)
    }

    /// Walks from `root` to the leaf where a search for `value` under `op`
    /// has to start.
    fn descend(&mut self, root: BlockNum, value: &Attribute, op: Op, ty: AttrType) -> Result<BlockNum> {
        let mut block = root;
        loop {
            let node = match BlockBuffer::load(&mut self.pool, block)? {
                BlockBuffer::Leaf(_) => return Ok(block),
                BlockBuffer::Internal(node) => node,
                BlockBuffer::Record(_) => return Err(StoreError::InvalidBlock(block)),
            };
            let entries = node.entries(&mut self.pool, ty)?;
            let (first, last) = match (entries.first(), entries.last()) {
                (Some(first), Some(last)) => (first, last),
                _ => return Err(StoreError::InvalidBlock(block)),
            };

            block = match op {
                Op::Ne | Op::Lt | Op::Le => first.lchild,
                Op::Eq | Op::Ge | Op::Gt => entries
                    .iter()
                    .find(|e| {
                        let ord = compare_attrs(&e.key, value);
                        if op == Op::Gt {
                            ord == Ordering::Greater
                        } else {
                            ord != Ordering::Less
                        }
                    })
                    .map_or(last.rchild, |e| e.lchild),
            };
        }
    }

    /// Leaf that a new entry with key `value` belongs in. Equal keys go left.
    pub(crate) fn find_leaf_to_insert(
        &mut self,
        root: BlockNum,
        value: &Attribute,
        ty: AttrType,
    ) -> Result<BlockNum> {
        let mut block = root;
        loop {
            let node = match BlockBuffer::load(&mut self.pool, block)? {
                BlockBuffer::Leaf(_) => return Ok(block),
                BlockBuffer::Internal(node) => node,
                BlockBuffer::Record(_) => return Err(StoreError::InvalidBlock(block)),
            };
            let entries = node.entries(&mut self.pool, ty)?;
            block = entries
                .iter()
                .find(|e| compare_attrs(&e.key, value) != Ordering::Less)
                .map(|e| e.lchild)
                .or_else(|| entries.last().map(|e| e.rchild))
                .ok_or(StoreError::InvalidBlock(block))?;
        }
    }

    /// Builds a B+ tree over every existing record of the relation.
    /// Does nothing if the attribute is already indexed.
    pub fn bplus_create(&mut self, rel_id: RelId, attr_name: &str) -> Result<()> {
        if rel_id == RELCAT_RELID || rel_id == ATTRCAT_RELID {
            return Err(StoreError::NotPermitted);
        }
        let mut attr = self.open_rels.attr_cat_entry(rel_id, attr_name)?.clone();
        if attr.root_block.is_some() {
            return Ok(());
        }

        let root = IndLeaf::new(&mut self.pool)?;
        attr.root_block = Some(root.block_num());
        self.open_rels.set_attr_cat_entry(rel_id, attr_name, attr.clone())?;
        self.open_rels.reset_attr_search_index(rel_id, attr_name)?;

        let types = self.open_rels.get(rel_id)?.attr_types();
        let mut block = self.open_rels.rel_cat_entry(rel_id)?.first_blk;
        let mut num_keys = 0;
        while let Some(current) = block {
            let buffer = RecBuffer::open(&self.pool, current)?;
            let head = buffer.header(&mut self.pool)?;
            let slot_map = buffer.slot_map(&mut self.pool)?;

            for (slot, state) in slot_map.iter().enumerate() {
                if !state.is_occupied() {
                    continue;
                }
                let record = buffer.record(&mut self.pool, slot, &types)?;
                self.bplus_insert(rel_id, attr_name, &record[attr.offset], RecId::new(current, slot))?;
                num_keys += 1;
            }
            block = head.rblock;
        }

        debug!(rel_id, attr = attr_name, root = %root.block_num(), num_keys, "created index");
        Ok(())
    }

    /// Adds `(value, rec_id)` to the attribute's tree.
    ///
    /// If the tree cannot grow because the disk is full, the whole tree is
    /// destroyed, the attribute is left unindexed and `DiskFull` returned.
    pub fn bplus_insert(
        &mut self,
        rel_id: RelId,
        attr_name: &str,
        value: &Attribute,
        rec_id: RecId,
    ) -> Result<()> {
        let attr = self.open_rels.attr_cat_entry(rel_id, attr_name)?;
        let ty = attr.attr_type;
        let root = attr.root_block.ok_or(StoreError::NoIndex)?;

        let leaf = self.find_leaf_to_insert(root, value, ty)?;
        let entry = LeafEntry {
            key: value.clone(),
            rec_id,
        };
        match self.insert_into_leaf(rel_id, attr_name, leaf, entry, ty) {
            Err(StoreError::DiskFull) => {
                warn!(rel_id, attr = attr_name, "disk full while growing index, destroying it");
                self.bplus_destroy(root)?;
                let mut attr = self.open_rels.attr_cat_entry(rel_id, attr_name)?.clone();
                attr.root_block = None;
                self.open_rels.set_attr_cat_entry(rel_id, attr_name, attr)?;
                self.open_rels.reset_attr_search_index(rel_id, attr_name)?;
                Err(StoreError::DiskFull)
            }
            other => other,
        }
    }

    /// Releases every block of the tree rooted at `block`.
    pub fn bplus_destroy(&mut self, block: BlockNum) -> Result<()> {
        if block.as_u32() >= self.pool.disk_blocks() {
            return Err(StoreError::OutOfBound);
        }
        match self.pool.block_type(block) {
            Some(BlockType::IndLeaf) => {
                IndLeaf::open(&self.pool, block)?.release(&mut self.pool);
            }
            Some(BlockType::IndInternal) => {
                let node = IndInternal::open(&self.pool, block)?;
                for child in node.children(&mut self.pool)? {
                    self.bplus_destroy(child)?;
                }
                node.release(&mut self.pool);
            }
            _ => return Err(StoreError::InvalidBlock(block)),
        }
        Ok(())
    }
}
