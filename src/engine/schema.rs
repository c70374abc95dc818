use std::collections::HashSet;

use tracing::{debug, warn};

use crate::catalog::{AttrCatEntry, RelCatEntry};
use crate::common::{
    AttrType, Attribute, Op, Result, StoreError, ATTRCAT_RELID, ATTRCAT_RELNAME, MAX_ATTRS,
    RELCAT_ATTR_RELNAME, RELCAT_RELID, RELCAT_RELNAME,
};

use super::StorageEngine;

fn is_catalog(rel_name: &str) -> bool {
    rel_name == RELCAT_RELNAME || rel_name == ATTRCAT_RELNAME
}

impl StorageEngine {
    /// Creates an empty relation with the given attributes, in record order.
    pub fn create_rel(&mut self, rel_name: &str, attrs: &[(&str, AttrType)]) -> Result<()> {
        let name = Attribute::text(rel_name)?;
        self.open_rels.reset_rel_search_index(RELCAT_RELID)?;
        if self
            .linear_search(RELCAT_RELID, RELCAT_ATTR_RELNAME, &name, Op::Eq)?
            .is_some()
        {
            return Err(StoreError::RelExist);
        }

        if attrs.is_empty() || attrs.len() > MAX_ATTRS {
            return Err(StoreError::AttrCountMismatch {
                expected: attrs.len().clamp(1, MAX_ATTRS),
                actual: attrs.len(),
            });
        }
        let mut seen = HashSet::new();
        for (attr_name, _) in attrs {
            Attribute::text(attr_name)?;
            if !seen.insert(*attr_name) {
                return Err(StoreError::DuplicateAttr);
            }
        }

        let rel = RelCatEntry::new(rel_name, attrs.len());
        self.insert_record(RELCAT_RELID, &rel.to_record())?;

        for (offset, (attr_name, attr_type)) in attrs.iter().enumerate() {
            let attr = AttrCatEntry::new(rel_name, attr_name, *attr_type, offset);
            if let Err(e) = self.insert_record(ATTRCAT_RELID, &attr.to_record()) {
                warn!(rel = rel_name, error = %e, "could not store attribute rows, undoing create");
                self.delete_relation(rel_name)?;
                return Err(StoreError::DiskFull);
            }
        }

        debug!(rel = rel_name, attrs = attrs.len(), "created relation");
        Ok(())
    }

    /// Deletes a closed user relation together with its indexes.
    pub fn delete_rel(&mut self, rel_name: &str) -> Result<()> {
        if is_catalog(rel_name) {
            return Err(StoreError::NotPermitted);
        }
        if self.open_rels.get_rel_id(rel_name).is_ok() {
            return Err(StoreError::RelOpen);
        }
        self.delete_relation(rel_name)
    }

    pub fn rename_rel(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        if is_catalog(old_name) || is_catalog(new_name) {
            return Err(StoreError::NotPermitted);
        }
        if self.open_rels.get_rel_id(old_name).is_ok() {
            return Err(StoreError::RelOpen);
        }
        self.rename_relation(old_name, new_name)
    }

    pub fn rename_attr(&mut self, rel_name: &str, old_name: &str, new_name: &str) -> Result<()> {
        if is_catalog(rel_name) {
            return Err(StoreError::NotPermitted);
        }
        if self.open_rels.get_rel_id(rel_name).is_ok() {
            return Err(StoreError::RelOpen);
        }
        self.rename_attribute(rel_name, old_name, new_name)
    }

    /// Builds a B+ tree on an attribute of an open relation.
    pub fn create_index(&mut self, rel_name: &str, attr_name: &str) -> Result<()> {
        if is_catalog(rel_name) {
            return Err(StoreError::NotPermitted);
        }
        let rel_id = self.open_rels.get_rel_id(rel_name)?;
        self.bplus_create(rel_id, attr_name)
    }

    /// Tears down the B+ tree on an attribute of an open relation.
    pub fn drop_index(&mut self, rel_name: &str, attr_name: &str) -> Result<()> {
        if is_catalog(rel_name) {
            return Err(StoreError::NotPermitted);
        }
        let rel_id = self.open_rels.get_rel_id(rel_name)?;
        let mut attr = self.open_rels.attr_cat_entry(rel_id, attr_name)?.clone();
        let root = attr.root_block.ok_or(StoreError::NoIndex)?;

        self.bplus_destroy(root)?;
        attr.root_block = None;
        self.open_rels.set_attr_cat_entry(rel_id, attr_name, attr)?;
        self.open_rels.reset_attr_search_index(rel_id, attr_name)?;

        debug!(rel = rel_name, attr = attr_name, "dropped index");
        Ok(())
    }
}
