use crate::buffer::BufferPool;
use crate::common::{
    AttrType, IndexId, RecId, RelId, Result, StoreError, ATTRCAT_RELID, MAX_OPEN,
};
use crate::storage::block::RecBuffer;

use super::{AttrCatEntry, RelCatEntry};

/// Cached relation catalog row of an open relation
#[derive(Debug, Clone)]
pub struct RelCacheEntry {
    pub entry: RelCatEntry,
    /// Set when `entry` differs from the row on disk
    pub dirty: bool,
    /// Location of the row in the relation catalog
    pub rec_id: RecId,
    /// Position of the last record returned by a linear scan or projection
    pub search_index: Option<RecId>,
}

/// Cached attribute catalog row of an open relation
#[derive(Debug, Clone)]
pub struct AttrCacheEntry {
    pub entry: AttrCatEntry,
    pub dirty: bool,
    pub rec_id: RecId,
    /// Position of the last leaf entry returned by an index search
    pub search_index: Option<IndexId>,
}

/// Everything cached for one open relation. Attributes are kept in
/// record-offset order.
#[derive(Debug, Clone)]
pub struct OpenRelation {
    pub rel: RelCacheEntry,
    pub attrs: Vec<AttrCacheEntry>,
}

impl OpenRelation {
    pub fn name(&self) -> &str {
        &self.rel.entry.rel_name
    }

    pub fn attr_types(&self) -> Vec<AttrType> {
        self.attrs.iter().map(|a| a.entry.attr_type).collect()
    }

    fn attr(&self, attr_name: &str) -> Result<&AttrCacheEntry> {
        self.attrs
            .iter()
            .find(|a| a.entry.attr_name == attr_name)
            .ok_or(StoreError::AttrNotExist)
    }

    fn attr_mut(&mut self, attr_name: &str) -> Result<&mut AttrCacheEntry> {
        self.attrs
            .iter_mut()
            .find(|a| a.entry.attr_name == attr_name)
            .ok_or(StoreError::AttrNotExist)
    }

    /// Writes every dirty cached row back to its catalog slot.
    pub(crate) fn write_back(&mut self, pool: &mut BufferPool) -> Result<()> {
        if self.rel.dirty {
            let rec_id = self.rel.rec_id;
            RecBuffer::open(pool, rec_id.block)?.set_record(
                pool,
                rec_id.slot,
                &self.rel.entry.to_record(),
            )?;
            self.rel.dirty = false;
        }
        for attr in self.attrs.iter_mut().filter(|a| a.dirty) {
            let rec_id = attr.rec_id;
            RecBuffer::open(pool, rec_id.block)?.set_record(
                pool,
                rec_id.slot,
                &attr.entry.to_record(),
            )?;
            attr.dirty = false;
        }
        Ok(())
    }
}

/// The bounded table of open relations. Ids 0 and 1 hold the relation and
/// attribute catalogs for the whole session.
#[derive(Debug)]
pub struct OpenRelTable {
    slots: Vec<Option<OpenRelation>>,
}

impl OpenRelTable {
    pub fn new() -> Self {
        Self {
            slots: vec![None; MAX_OPEN],
        }
    }

    /// Id of the open relation called `rel_name`.
    pub fn get_rel_id(&self, rel_name: &str) -> Result<RelId> {
        self.slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|r| r.name() == rel_name))
            .ok_or(StoreError::RelNotOpen)
    }

    /// First free id for a user relation.
    pub fn get_free_slot(&self) -> Result<RelId> {
        self.slots
            .iter()
            .enumerate()
            .skip(ATTRCAT_RELID + 1)
            .find(|(_, s)| s.is_none())
            .map(|(i, _)| i)
            .ok_or(StoreError::CacheFull)
    }

    pub fn is_open(&self, rel_id: RelId) -> bool {
        matches!(self.slots.get(rel_id), Some(Some(_)))
    }

    /// Ids of all open relations, catalogs included.
    pub fn open_ids(&self) -> Vec<RelId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn get(&self, rel_id: RelId) -> Result<&OpenRelation> {
        self.slots
            .get(rel_id)
            .ok_or(StoreError::OutOfBound)?
            .as_ref()
            .ok_or(StoreError::RelNotOpen)
    }

    pub fn get_mut(&mut self, rel_id: RelId) -> Result<&mut OpenRelation> {
        self.slots
            .get_mut(rel_id)
            .ok_or(StoreError::OutOfBound)?
            .as_mut()
            .ok_or(StoreError::RelNotOpen)
    }

    pub(crate) fn install(&mut self, rel_id: RelId, relation: OpenRelation) -> Result<()> {
        let slot = self.slots.get_mut(rel_id).ok_or(StoreError::OutOfBound)?;
        *slot = Some(relation);
        Ok(())
    }

    pub(crate) fn remove(&mut self, rel_id: RelId) -> Result<OpenRelation> {
        self.slots
            .get_mut(rel_id)
            .ok_or(StoreError::OutOfBound)?
            .take()
            .ok_or(StoreError::RelNotOpen)
    }

    // Relation cache

    pub fn rel_cat_entry(&self, rel_id: RelId) -> Result<&RelCatEntry> {
        Ok(&self.get(rel_id)?.rel.entry)
    }

    /// Replaces the cached relation row and marks it dirty.
    pub fn set_rel_cat_entry(&mut self, rel_id: RelId, entry: RelCatEntry) -> Result<()> {
        let rel = &mut self.get_mut(rel_id)?.rel;
        rel.entry = entry;
        rel.dirty = true;
        Ok(())
    }

    pub fn rel_search_index(&self, rel_id: RelId) -> Result<Option<RecId>> {
        Ok(self.get(rel_id)?.rel.search_index)
    }

    pub fn set_rel_search_index(&mut self, rel_id: RelId, index: Option<RecId>) -> Result<()> {
        self.get_mut(rel_id)?.rel.search_index = index;
        Ok(())
    }

    pub fn reset_rel_search_index(&mut self, rel_id: RelId) -> Result<()> {
        self.set_rel_search_index(rel_id, None)
    }

    // Attribute cache

    pub fn attr_cat_entry(&self, rel_id: RelId, attr_name: &str) -> Result<&AttrCatEntry> {
        Ok(&self.get(rel_id)?.attr(attr_name)?.entry)
    }

    pub fn attr_cat_entry_at(&self, rel_id: RelId, offset: usize) -> Result<&AttrCatEntry> {
        self.get(rel_id)?
            .attrs
            .get(offset)
            .map(|a| &a.entry)
            .ok_or(StoreError::AttrNotExist)
    }

    /// Replaces a cached attribute row and marks it dirty.
    pub fn set_attr_cat_entry(
        &mut self,
        rel_id: RelId,
        attr_name: &str,
        entry: AttrCatEntry,
    ) -> Result<()> {
        let attr = self.get_mut(rel_id)?.attr_mut(attr_name)?;
        attr.entry = entry;
        attr.dirty = true;
        Ok(())
    }

    pub fn attr_search_index(&self, rel_id: RelId, attr_name: &str) -> Result<Option<IndexId>> {
        Ok(self.get(rel_id)?.attr(attr_name)?.search_index)
    }

    pub fn set_attr_search_index(
        &mut self,
        rel_id: RelId,
        attr_name: &str,
        index: Option<IndexId>,
    ) -> Result<()> {
        self.get_mut(rel_id)?.attr_mut(attr_name)?.search_index = index;
        Ok(())
    }

    pub fn reset_attr_search_index(&mut self, rel_id: RelId, attr_name: &str) -> Result<()> {
        self.set_attr_search_index(rel_id, attr_name, None)
    }
}

impl Default for OpenRelTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::BlockNum;

    fn relation(name: &str) -> OpenRelation {
        let rec_id = RecId::new(BlockNum::new(4), 2);
        OpenRelation {
            rel: RelCacheEntry {
                entry: RelCatEntry::new(name, 2),
                dirty: false,
                rec_id,
                search_index: None,
            },
            attrs: vec![
                AttrCacheEntry {
                    entry: AttrCatEntry::new(name, "id", AttrType::Number, 0),
                    dirty: false,
                    rec_id: RecId::new(BlockNum::new(5), 12),
                    search_index: None,
                },
                AttrCacheEntry {
                    entry: AttrCatEntry::new(name, "name", AttrType::Text, 1),
                    dirty: false,
                    rec_id: RecId::new(BlockNum::new(5), 13),
                    search_index: None,
                },
            ],
        }
    }

    #[test]
    fn test_free_slot_skips_catalogs() {
        let mut table = OpenRelTable::new();
        assert_eq!(table.get_free_slot().unwrap(), 2);
        table.install(2, relation("A")).unwrap();
        assert_eq!(table.get_free_slot().unwrap(), 3);
        assert_eq!(table.get_rel_id("A").unwrap(), 2);
        assert!(matches!(table.get_rel_id("B"), Err(StoreError::RelNotOpen)));
    }

    #[test]
    fn test_cache_full() {
        let mut table = OpenRelTable::new();
        for id in 2..MAX_OPEN {
            table.install(id, relation(&format!("R{}", id))).unwrap();
        }
        assert!(matches!(table.get_free_slot(), Err(StoreError::CacheFull)));
    }

    #[test]
    fn test_get_errors() {
        let table = OpenRelTable::new();
        assert!(matches!(table.get(MAX_OPEN), Err(StoreError::OutOfBound)));
        assert!(matches!(table.get(3), Err(StoreError::RelNotOpen)));
    }

    #[test]
    fn test_set_entries_mark_dirty() {
        let mut table = OpenRelTable::new();
        table.install(2, relation("A")).unwrap();

        let mut rel = table.rel_cat_entry(2).unwrap().clone();
        rel.num_recs = 4;
        table.set_rel_cat_entry(2, rel).unwrap();
        assert!(table.get(2).unwrap().rel.dirty);

        let mut attr = table.attr_cat_entry(2, "name").unwrap().clone();
        attr.root_block = Some(BlockNum::new(90));
        table.set_attr_cat_entry(2, "name", attr).unwrap();
        assert!(table.get(2).unwrap().attrs[1].dirty);
        assert!(!table.get(2).unwrap().attrs[0].dirty);
        assert_eq!(table.attr_cat_entry_at(2, 1).unwrap().root_block, Some(BlockNum::new(90)));
        assert!(matches!(
            table.attr_cat_entry(2, "missing"),
            Err(StoreError::AttrNotExist)
        ));
    }

    #[test]
    fn test_search_indexes() {
        let mut table = OpenRelTable::new();
        table.install(2, relation("A")).unwrap();

        let rec = RecId::new(BlockNum::new(7), 3);
        table.set_rel_search_index(2, Some(rec)).unwrap();
        assert_eq!(table.rel_search_index(2).unwrap(), Some(rec));
        table.reset_rel_search_index(2).unwrap();
        assert_eq!(table.rel_search_index(2).unwrap(), None);

        let idx = IndexId::new(BlockNum::new(20), 5);
        table.set_attr_search_index(2, "id", Some(idx)).unwrap();
        assert_eq!(table.attr_search_index(2, "id").unwrap(), Some(idx));
        table.reset_attr_search_index(2, "id").unwrap();
        assert_eq!(table.attr_search_index(2, "id").unwrap(), None);
    }

    #[test]
    fn test_remove() {
        let mut table = OpenRelTable::new();
        table.install(4, relation("A")).unwrap();
        assert_eq!(table.open_ids(), vec![4]);
        assert_eq!(table.remove(4).unwrap().name(), "A");
        assert!(matches!(table.remove(4), Err(StoreError::RelNotOpen)));
    }
}
