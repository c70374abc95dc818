use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::common::{
    compare_attrs, AttrType, BlockNum, RelId, Result, StoreError, MAX_KEYS_INTERNAL,
    MAX_KEYS_LEAF, MIDDLE_INDEX_INTERNAL, MIDDLE_INDEX_LEAF,
};
use crate::engine::StorageEngine;
use crate::storage::block::{BlockBuffer, IndInternal, IndLeaf, InternalEntry, LeafEntry};

impl StorageEngine {
    /// Places `entry` into `leaf`, splitting it and pushing a separator up
    /// the tree when the leaf is already full.
    pub(crate) fn insert_into_leaf(
        &mut self,
        rel_id: RelId,
        attr_name: &str,
        leaf: BlockNum,
        entry: LeafEntry,
        ty: AttrType,
    ) -> Result<()> {
        let node = IndLeaf::open(&self.pool, leaf)?;
        let mut head = node.header(&mut self.pool)?;
        let mut entries = node.entries(&mut self.pool, ty)?;

        let pos = entries
            .iter()
            .position(|e| compare_attrs(&e.key, &entry.key) != Ordering::Less)
            .unwrap_or(entries.len());
        entries.insert(pos, entry);

        if entries.len() <= MAX_KEYS_LEAF {
            for (i, e) in entries.iter().enumerate().skip(pos) {
                node.set_entry(&mut self.pool, i, e)?;
            }
            head.num_entries = entries.len();
            return node.set_header(&mut self.pool, &head);
        }

        let right = self.split_leaf(&node, &entries)?;
        let separator = InternalEntry {
            lchild: leaf,
            key: entries[MIDDLE_INDEX_LEAF].key.clone(),
            rchild: right.block_num(),
        };
        match head.pblock {
            Some(parent) => self.insert_into_internal(rel_id, attr_name, parent, separator, ty),
            None => self.create_new_root(rel_id, attr_name, separator),
        }
    }

    /// Moves the upper half of `entries` into a new right sibling of `left`.
    fn split_leaf(&mut self, left: &IndLeaf, entries: &[LeafEntry]) -> Result<IndLeaf> {
        let right = IndLeaf::new(&mut self.pool)?;
        let mut left_head = left.header(&mut self.pool)?;
        let mut right_head = right.header(&mut self.pool)?;
        let split = MIDDLE_INDEX_LEAF + 1;

        right_head.pblock = left_head.pblock;
        right_head.lblock = Some(left.block_num());
        right_head.rblock = left_head.rblock;
        right_head.num_entries = entries.len() - split;
        right.set_header(&mut self.pool, &right_head)?;

        if let Some(next) = left_head.rblock {
            let next = IndLeaf::open(&self.pool, next)?;
            let mut next_head = next.header(&mut self.pool)?;
            next_head.lblock = Some(right.block_num());
            next.set_header(&mut self.pool, &next_head)?;
        }

        left_head.rblock = Some(right.block_num());
        left_head.num_entries = split;
        left.set_header(&mut self.pool, &left_head)?;

        for (i, e) in entries[..split].iter().enumerate() {
            left.set_entry(&mut self.pool, i, e)?;
        }
        for (i, e) in entries[split..].iter().enumerate() {
            right.set_entry(&mut self.pool, i, e)?;
        }

        debug!(left = %left.block_num(), right = %right.block_num(), "split leaf");
        Ok(right)
    }

    /// Adds a separator produced by splitting one of `block`'s children.
    /// `entry.lchild` is the child that split and `entry.rchild` its new
    /// right half.
    pub(crate) fn insert_into_internal(
        &mut self,
        rel_id: RelId,
        attr_name: &str,
        block: BlockNum,
        entry: InternalEntry,
        ty: AttrType,
    ) -> Result<()> {
        let node = IndInternal::open(&self.pool, block)?;
        let mut head = node.header(&mut self.pool)?;
        let mut entries = node.entries(&mut self.pool, ty)?;
        let new_child = entry.rchild;

        // the split child is some entry's left child, or the last right child
        let pos = entries
            .iter()
            .position(|e| e.lchild == entry.lchild)
            .unwrap_or(entries.len());
        if let Some(next) = entries.get_mut(pos) {
            next.lchild = entry.rchild;
        }
        entries.insert(pos, entry);

        if entries.len() <= MAX_KEYS_INTERNAL {
            for (i, e) in entries.iter().enumerate().skip(pos) {
                node.set_entry(&mut self.pool, i, e)?;
            }
            head.num_entries = entries.len();
            return node.set_header(&mut self.pool, &head);
        }

        let right = match self.split_internal(&node, &entries) {
            Ok(right) => right,
            Err(StoreError::DiskFull) => {
                warn!(%block, "no block left to split internal node");
                self.bplus_destroy(new_child)?;
                return Err(StoreError::DiskFull);
            }
            Err(e) => return Err(e),
        };
        let separator = InternalEntry {
            lchild: block,
            key: entries[MIDDLE_INDEX_INTERNAL].key.clone(),
            rchild: right.block_num(),
        };
        match head.pblock {
            Some(parent) => self.insert_into_internal(rel_id, attr_name, parent, separator, ty),
            None => self.create_new_root(rel_id, attr_name, separator),
        }
    }

    /// Keeps the entries left of the middle in `left`, moves the ones right
    /// of it into a new node and reparents that node's children. The middle
    /// entry belongs to neither half.
    fn split_internal(&mut self, left: &IndInternal, entries: &[InternalEntry]) -> Result<IndInternal> {
        let right = IndInternal::new(&mut self.pool)?;
        let mut left_head = left.header(&mut self.pool)?;
        let mut right_head = right.header(&mut self.pool)?;

        right_head.pblock = left_head.pblock;
        right_head.num_entries = entries.len() - MIDDLE_INDEX_INTERNAL - 1;
        right.set_header(&mut self.pool, &right_head)?;
        left_head.num_entries = MIDDLE_INDEX_INTERNAL;
        left.set_header(&mut self.pool, &left_head)?;

        for (i, e) in entries[..MIDDLE_INDEX_INTERNAL].iter().enumerate() {
            left.set_entry(&mut self.pool, i, e)?;
        }
        for (i, e) in entries[MIDDLE_INDEX_INTERNAL + 1..].iter().enumerate() {
            right.set_entry(&mut self.pool, i, e)?;
        }

        for child in right.children(&mut self.pool)? {
            self.set_parent(child, right.block_num())?;
        }

        debug!(left = %left.block_num(), right = %right.block_num(), "split internal node");
        Ok(right)
    }

    /// Grows the tree by one level with `entry` as the only separator.
    fn create_new_root(&mut self, rel_id: RelId, attr_name: &str, entry: InternalEntry) -> Result<()> {
        let root = match IndInternal::new(&mut self.pool) {
            Ok(root) => root,
            Err(StoreError::DiskFull) => {
                warn!(rel_id, attr = attr_name, "no block left for a new root");
                self.bplus_destroy(entry.rchild)?;
                return Err(StoreError::DiskFull);
            }
            Err(e) => return Err(e),
        };

        root.set_entry(&mut self.pool, 0, &entry)?;
        let mut head = root.header(&mut self.pool)?;
        head.num_entries = 1;
        root.set_header(&mut self.pool, &head)?;

        self.set_parent(entry.lchild, root.block_num())?;
        self.set_parent(entry.rchild, root.block_num())?;

        let mut attr = self.open_rels.attr_cat_entry(rel_id, attr_name)?.clone();
        attr.root_block = Some(root.block_num());
        self.open_rels.set_attr_cat_entry(rel_id, attr_name, attr)?;

        debug!(rel_id, attr = attr_name, root = %root.block_num(), "new index root");
        Ok(())
    }

    fn set_parent(&mut self, child: BlockNum, parent: BlockNum) -> Result<()> {
        let node = BlockBuffer::load(&mut self.pool, child)?;
        let mut head = node.header(&mut self.pool)?;
        head.pblock = Some(parent);
        node.set_header(&mut self.pool, &head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Attribute, EngineConfig, RecId};
    use crate::storage::block::{BlockType, HeadInfo};

    /// Opens an empty relation `K(k NUM)` with an index on `k`.
    fn engine(disk_blocks: u32) -> (StorageEngine, RelId) {
        let mut engine =
            StorageEngine::in_memory(EngineConfig::default().with_disk_blocks(disk_blocks)).unwrap();
        engine.create_rel("K", &[("k", AttrType::Number)]).unwrap();
        let rel_id = engine.open_rel("K").unwrap();
        engine.create_index("K", "k").unwrap();
        (engine, rel_id)
    }

    fn insert_keys(engine: &mut StorageEngine, rel_id: RelId, keys: impl Iterator<Item = f64>) {
        for (i, key) in keys.enumerate() {
            let rec_id = RecId::new(BlockNum::new(6), i);
            engine.bplus_insert(rel_id, "k", &Attribute::from(key), rec_id).unwrap();
        }
    }

    fn root(engine: &StorageEngine, rel_id: RelId) -> BlockNum {
        engine.open_rels().attr_cat_entry(rel_id, "k").unwrap().root_block.unwrap()
    }

    fn header(engine: &mut StorageEngine, block: BlockNum) -> HeadInfo {
        BlockBuffer::load(engine.pool_mut(), block)
            .unwrap()
            .header(engine.pool_mut())
            .unwrap()
    }

    /// Checks parent links below `block` and returns its depth.
    fn check_parents(engine: &mut StorageEngine, block: BlockNum) -> usize {
        match BlockBuffer::load(engine.pool_mut(), block).unwrap() {
            BlockBuffer::Leaf(_) => 1,
            BlockBuffer::Internal(node) => {
                let children = node.children(engine.pool_mut()).unwrap();
                let depths: Vec<usize> = children
                    .iter()
                    .map(|child| {
                        assert_eq!(header(engine, *child).pblock, Some(block));
                        check_parents(engine, *child)
                    })
                    .collect();
                assert!(depths.windows(2).all(|w| w[0] == w[1]));
                depths[0] + 1
            }
            BlockBuffer::Record(_) => panic!("record block inside index"),
        }
    }

    /// Walks the leaf chain from the leftmost leaf, checking the back links.
    fn leaf_keys(engine: &mut StorageEngine, root: BlockNum) -> Vec<f64> {
        let mut block = root;
        while let BlockBuffer::Internal(node) = BlockBuffer::load(engine.pool_mut(), block).unwrap() {
            block = node.children(engine.pool_mut()).unwrap()[0];
        }

        let mut keys = Vec::new();
        let mut prev = None;
        let mut next = Some(block);
        while let Some(current) = next {
            let leaf = IndLeaf::open(engine.pool(), current).unwrap();
            let head = leaf.header(engine.pool_mut()).unwrap();
            assert_eq!(head.lblock, prev);
            for e in leaf.entries(engine.pool_mut(), AttrType::Number).unwrap() {
                keys.push(e.key.as_number().unwrap());
            }
            prev = Some(current);
            next = head.rblock;
        }
        keys
    }

    #[test]
    fn test_leaf_split_on_64th_key() {
        let (mut engine, rel_id) = engine(64);
        let first_leaf = root(&engine, rel_id);
        insert_keys(&mut engine, rel_id, (0..63).map(f64::from));
        assert_eq!(root(&engine, rel_id), first_leaf);

        insert_keys(&mut engine, rel_id, std::iter::once(63.0));
        let new_root = root(&engine, rel_id);
        assert_ne!(new_root, first_leaf);

        let node = IndInternal::open(engine.pool(), new_root).unwrap();
        let entries = node.entries(engine.pool_mut(), AttrType::Number).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, Attribute::from(31.0));
        assert_eq!(entries[0].lchild, first_leaf);

        let left = header(&mut engine, entries[0].lchild);
        let right = header(&mut engine, entries[0].rchild);
        assert_eq!(left.num_entries, 32);
        assert_eq!(right.num_entries, 32);
        assert_eq!(left.rblock, Some(entries[0].rchild));
        assert_eq!(right.lblock, Some(first_leaf));
        assert_eq!(right.rblock, None);

        assert_eq!(check_parents(&mut engine, new_root), 2);
        let keys = leaf_keys(&mut engine, new_root);
        assert_eq!(keys, (0..64).map(f64::from).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_in_middle_relinks_neighbour() {
        let (mut engine, rel_id) = engine(64);
        // two leaves, then fill the left one until it splits again
        insert_keys(&mut engine, rel_id, (0..64).map(|k| f64::from(k) * 10.0));
        insert_keys(&mut engine, rel_id, (0..32).map(|k| f64::from(k) + 0.5));

        let root = root(&engine, rel_id);
        let node = IndInternal::open(engine.pool(), root).unwrap();
        assert_eq!(node.header(engine.pool_mut()).unwrap().num_entries, 2);
        assert_eq!(check_parents(&mut engine, root), 2);

        let keys = leaf_keys(&mut engine, root);
        assert_eq!(keys.len(), 96);
        assert!(keys.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_internal_split_keeps_tree_balanced() {
        let (mut engine, rel_id) = engine(512);
        let n = 4000;
        insert_keys(&mut engine, rel_id, (0..n).map(f64::from));

        let root = root(&engine, rel_id);
        assert_eq!(check_parents(&mut engine, root), 3);
        let keys = leaf_keys(&mut engine, root);
        assert_eq!(keys, (0..n).map(f64::from).collect::<Vec<_>>());

        let internal = engine.pool().alloc_map().count(BlockType::IndInternal);
        assert!(internal >= 3);
    }

    #[test]
    fn test_duplicates_stay_ordered() {
        let (mut engine, rel_id) = engine(64);
        insert_keys(&mut engine, rel_id, (0..150).map(|k| f64::from(k % 3)));

        let root = root(&engine, rel_id);
        let keys = leaf_keys(&mut engine, root);
        assert_eq!(keys.len(), 150);
        assert!(keys.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(check_parents(&mut engine, root), 2);
    }

    #[test]
    fn test_split_failure_destroys_index() {
        // map, catalogs, one record block and the root leaf
        let (mut engine, rel_id) = engine(8);
        engine.insert(rel_id, &[Attribute::from(0.0)]).unwrap();
        assert_eq!(engine.pool().alloc_map().find_unused(), None);

        insert_keys(&mut engine, rel_id, (1..63).map(f64::from));
        let err = engine
            .bplus_insert(rel_id, "k", &Attribute::from(63.0), RecId::new(BlockNum::new(6), 0))
            .unwrap_err();
        assert!(matches!(err, StoreError::DiskFull));
        assert_eq!(engine.open_rels().attr_cat_entry(rel_id, "k").unwrap().root_block, None);
        assert_eq!(engine.pool().alloc_map().count(BlockType::IndLeaf), 0);
    }

    #[test]
    fn test_root_failure_destroys_both_halves() {
        let (mut engine, rel_id) = engine(9);
        engine.insert(rel_id, &[Attribute::from(0.0)]).unwrap();
        insert_keys(&mut engine, rel_id, (1..63).map(f64::from));

        let err = engine
            .bplus_insert(rel_id, "k", &Attribute::from(63.0), RecId::new(BlockNum::new(6), 0))
            .unwrap_err();
        assert!(matches!(err, StoreError::DiskFull));
        assert_eq!(engine.open_rels().attr_cat_entry(rel_id, "k").unwrap().root_block, None);
        assert_eq!(engine.pool().alloc_map().count(BlockType::IndLeaf), 0);
        assert_eq!(engine.pool().alloc_map().count(BlockType::IndInternal), 0);
        assert_eq!(engine.pool().alloc_map().count(BlockType::Unused), 2);
    }

    #[test]
    fn test_internal_split_failure_destroys_index() {
        // 101 leaves under a full root, plus one spare block for the next leaf
        let (mut engine, rel_id) = engine(6 + 102 + 1);
        let n = 64 + 32 * 99 + 31;
        insert_keys(&mut engine, rel_id, (0..n).map(f64::from));

        let root_block = root(&engine, rel_id);
        let node = IndInternal::open(engine.pool(), root_block).unwrap();
        let entries = node.entries(engine.pool_mut(), AttrType::Number).unwrap();
        assert_eq!(entries.len(), MAX_KEYS_INTERNAL);
        let last = entries[entries.len() - 1].rchild;
        assert_eq!(header(&mut engine, last).num_entries, MAX_KEYS_LEAF);
        assert_eq!(engine.pool().alloc_map().count(BlockType::Unused), 1);

        let err = engine
            .bplus_insert(rel_id, "k", &Attribute::from(f64::from(n)), RecId::new(BlockNum::new(6), 0))
            .unwrap_err();
        assert!(matches!(err, StoreError::DiskFull));
        assert_eq!(engine.open_rels().attr_cat_entry(rel_id, "k").unwrap().root_block, None);
        assert_eq!(engine.pool().alloc_map().count(BlockType::IndLeaf), 0);
        assert_eq!(engine.pool().alloc_map().count(BlockType::IndInternal), 0);
        assert_eq!(engine.pool().alloc_map().count(BlockType::Unused), 103);
    }
}
