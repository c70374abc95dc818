use tracing::debug;

use crate::catalog::{AttrCatEntry, RelCatEntry, ATTRCAT_ATTR_TYPES, RELCAT_ATTR_TYPES};
use crate::common::{
    Attribute, Op, RecId, Result, StoreError, ATTRCAT_ATTR_RELNAME, ATTRCAT_RELID,
    RELCAT_ATTR_RELNAME, RELCAT_RELID,
};
use crate::engine::StorageEngine;

impl StorageEngine {
    /// Location of the relation catalog row for `rel_name`.
    fn find_relation(&mut self, rel_name: &Attribute) -> Result<Option<RecId>> {
        self.open_rels.reset_rel_search_index(RELCAT_RELID)?;
        self.linear_search(RELCAT_RELID, RELCAT_ATTR_RELNAME, rel_name, Op::Eq)
    }

    /// Renames a relation in the relation catalog and in every attribute
    /// catalog row that belongs to it.
    pub fn rename_relation(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        let old = Attribute::Text(old_name.to_string());
        let new = Attribute::text(new_name)?;

        if self.find_relation(&new)?.is_some() {
            return Err(StoreError::RelExist);
        }
        let rel_rec = self.find_relation(&old)?.ok_or(StoreError::RelNotExist)?;

        let mut rel = RelCatEntry::from_record(&self.read_record(rel_rec, &RELCAT_ATTR_TYPES)?)?;
        rel.rel_name = new_name.to_string();
        self.write_record(rel_rec, &rel.to_record())?;

        self.open_rels.reset_rel_search_index(ATTRCAT_RELID)?;
        for _ in 0..rel.num_attrs {
            let attr_rec = self
                .linear_search(ATTRCAT_RELID, ATTRCAT_ATTR_RELNAME, &old, Op::Eq)?
                .ok_or_else(|| {
                    StoreError::CatalogCorrupted(format!("missing attribute rows for {}", old_name))
                })?;
            let mut attr =
                AttrCatEntry::from_record(&self.read_record(attr_rec, &ATTRCAT_ATTR_TYPES)?)?;
            attr.rel_name = new_name.to_string();
            self.write_record(attr_rec, &attr.to_record())?;
        }

        debug!(old = old_name, new = new_name, "renamed relation");
        Ok(())
    }

    /// Renames one attribute of a relation.
    pub fn rename_attribute(&mut self, rel_name: &str, old_name: &str, new_name: &str) -> Result<()> {
        let rel = Attribute::Text(rel_name.to_string());
        Attribute::text(new_name)?;

        if self.find_relation(&rel)?.is_none() {
            return Err(StoreError::RelNotExist);
        }

        self.open_rels.reset_rel_search_index(ATTRCAT_RELID)?;
        let mut target = None;
        while let Some(attr_rec) =
            self.linear_search(ATTRCAT_RELID, ATTRCAT_ATTR_RELNAME, &rel, Op::Eq)?
        {
            let attr = AttrCatEntry::from_record(&self.read_record(attr_rec, &ATTRCAT_ATTR_TYPES)?)?;
            if attr.attr_name == new_name {
                return Err(StoreError::AttrExist);
            }
            if attr.attr_name == old_name {
                target = Some((attr_rec, attr));
            }
        }

        let (attr_rec, mut attr) = target.ok_or(StoreError::AttrNotExist)?;
        attr.attr_name = new_name.to_string();
        self.write_record(attr_rec, &attr.to_record())?;

        debug!(rel = rel_name, old = old_name, new = new_name, "renamed attribute");
        Ok(())
    }
}
