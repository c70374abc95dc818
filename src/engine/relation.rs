use tracing::debug;

use crate::catalog::{
    AttrCacheEntry, AttrCatEntry, OpenRelation, RelCacheEntry, RelCatEntry, ATTRCAT_ATTR_TYPES,
    RELCAT_ATTR_TYPES,
};
use crate::common::{
    Attribute, Op, RelId, Result, StoreError, ATTRCAT_ATTR_RELNAME, ATTRCAT_RELID, MAX_OPEN,
    RELCAT_ATTR_RELNAME, RELCAT_RELID,
};

use super::StorageEngine;

impl StorageEngine {
    /// Opens the relation called `rel_name` and returns its id. Opening an
    /// already open relation returns the id it already has.
    pub fn open_rel(&mut self, rel_name: &str) -> Result<RelId> {
        if let Ok(rel_id) = self.open_rels.get_rel_id(rel_name) {
            return Ok(rel_id);
        }
        let rel_id = self.open_rels.get_free_slot()?;
        let name = Attribute::Text(rel_name.to_string());

        self.open_rels.reset_rel_search_index(RELCAT_RELID)?;
        let rel_rec = self
            .linear_search(RELCAT_RELID, RELCAT_ATTR_RELNAME, &name, Op::Eq)?
            .ok_or(StoreError::RelNotExist)?;
        let record = self.read_record(rel_rec, &RELCAT_ATTR_TYPES)?;
        let rel = RelCacheEntry {
            entry: RelCatEntry::from_record(&record)?,
            dirty: false,
            rec_id: rel_rec,
            search_index: None,
        };

        self.open_rels.reset_rel_search_index(ATTRCAT_RELID)?;
        let mut attrs = Vec::with_capacity(rel.entry.num_attrs);
        for _ in 0..rel.entry.num_attrs {
            let attr_rec = self
                .linear_search(ATTRCAT_RELID, ATTRCAT_ATTR_RELNAME, &name, Op::Eq)?
                .ok_or_else(|| {
                    StoreError::CatalogCorrupted(format!("missing attribute rows for {}", rel_name))
                })?;
            let record = self.read_record(attr_rec, &ATTRCAT_ATTR_TYPES)?;
            attrs.push(AttrCacheEntry {
                entry: AttrCatEntry::from_record(&record)?,
                dirty: false,
                rec_id: attr_rec,
                search_index: None,
            });
        }
        attrs.sort_by_key(|a| a.entry.offset);

        self.open_rels.install(rel_id, OpenRelation { rel, attrs })?;
        debug!(rel = rel_name, rel_id, "opened relation");
        Ok(rel_id)
    }

    /// Closes a user relation, writing its dirty catalog rows back.
    pub fn close_rel(&mut self, rel_id: RelId) -> Result<()> {
        if rel_id == RELCAT_RELID || rel_id == ATTRCAT_RELID {
            return Err(StoreError::NotPermitted);
        }
        if rel_id >= MAX_OPEN {
            return Err(StoreError::OutOfBound);
        }
        if !self.open_rels.is_open(rel_id) {
            return Err(StoreError::RelNotOpen);
        }

        self.open_rels.get_mut(rel_id)?.write_back(&mut self.pool)?;
        let relation = self.open_rels.remove(rel_id)?;
        debug!(rel = relation.name(), rel_id, "closed relation");
        Ok(())
    }

    pub fn close_rel_by_name(&mut self, rel_name: &str) -> Result<()> {
        let rel_id = self.open_rels.get_rel_id(rel_name)?;
        self.close_rel(rel_id)
    }
}
