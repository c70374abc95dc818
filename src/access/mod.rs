//! Record-level access to relations: resumable linear scans, insertion,
//! projection, searches and whole-relation maintenance.
//!
//! A relation is a right-linked chain of record blocks. Scans walk the
//! chain in block-then-slot order and remember the last match in the
//! relation's search cursor so the next call resumes after it.

mod delete;
mod insert;
mod rename;
mod scan;

use crate::common::{AttrType, Attribute, RecId, Result};
use crate::engine::StorageEngine;
use crate::storage::block::RecBuffer;

impl StorageEngine {
    /// Reads the record at `rec_id` as values of `types`.
    pub(crate) fn read_record(&mut self, rec_id: RecId, types: &[AttrType]) -> Result<Vec<Attribute>> {
        RecBuffer::open(&self.pool, rec_id.block)?.record(&mut self.pool, rec_id.slot, types)
    }

    /// Overwrites the record at `rec_id` in place.
    pub(crate) fn write_record(&mut self, rec_id: RecId, record: &[Attribute]) -> Result<()> {
        RecBuffer::open(&self.pool, rec_id.block)?.set_record(&mut self.pool, rec_id.slot, record)
    }
}
