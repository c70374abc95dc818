//! The storage engine session: one buffer pool, one open relation table,
//! and the operations that tie them together.
//!
//! Access-layer, index and schema operations are implemented as methods on
//! [`StorageEngine`] in their own modules.

mod relation;
mod schema;

use std::path::Path;

use tracing::{info, warn};

use crate::buffer::BufferPool;
use crate::catalog::{self, OpenRelTable, OpenRelation};
use crate::common::{EngineConfig, RelId, Result, ATTRCAT_RELID, RELCAT_RELID};
use crate::storage::disk::{DiskManager, DiskStore, MemoryDisk};

/// An open database session.
///
/// The session is shut down exactly once: either explicitly with
/// [`StorageEngine::close`], or on drop, where errors can only be logged.
pub struct StorageEngine {
    pub(crate) pool: BufferPool,
    pub(crate) open_rels: OpenRelTable,
    closed: bool,
}

impl StorageEngine {
    /// Creates and formats a new disk image at `path`, replacing any file there.
    pub fn create<P: AsRef<Path>>(path: P, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        info!(path = %path.as_ref().display(), "creating disk image");
        let disk = DiskManager::create(path, config.disk_blocks)?;
        catalog::format(&disk)?;
        Self::with_disk(Box::new(disk), config.buffer_capacity)
    }

    /// Opens an existing disk image. The image size decides the block
    /// count, so only the buffer capacity of `config` applies.
    pub fn open<P: AsRef<Path>>(path: P, config: EngineConfig) -> Result<Self> {
        info!(path = %path.as_ref().display(), "opening disk image");
        let disk = DiskManager::open(path)?;
        Self::with_disk(Box::new(disk), config.buffer_capacity)
    }

    /// Creates a session over a freshly formatted in-memory disk.
    pub fn in_memory(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let disk = MemoryDisk::new(config.disk_blocks);
        catalog::format(&disk)?;
        Self::with_disk(Box::new(disk), config.buffer_capacity)
    }

    /// Starts a session over an already formatted disk.
    pub fn with_disk(disk: Box<dyn DiskStore>, buffer_capacity: usize) -> Result<Self> {
        let mut pool = BufferPool::new(buffer_capacity, disk)?;
        let mut open_rels = OpenRelTable::new();
        catalog::load_catalogs(&mut pool, &mut open_rels)?;

        info!(
            disk_blocks = pool.disk_blocks(),
            buffer_capacity,
            "storage engine opened"
        );
        Ok(Self {
            pool,
            open_rels,
            closed: false,
        })
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut BufferPool {
        &mut self.pool
    }

    pub fn open_rels(&self) -> &OpenRelTable {
        &self.open_rels
    }

    pub fn open_rels_mut(&mut self) -> &mut OpenRelTable {
        &mut self.open_rels
    }

    /// Cached metadata of an open relation.
    pub fn relation(&self, rel_id: RelId) -> Result<&OpenRelation> {
        self.open_rels.get(rel_id)
    }

    /// Closes every user relation, persists the catalog caches and flushes
    /// the buffer pool.
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        for rel_id in self.open_rels.open_ids() {
            if rel_id > ATTRCAT_RELID {
                self.close_rel(rel_id)?;
            }
        }
        for rel_id in [RELCAT_RELID, ATTRCAT_RELID] {
            self.open_rels.get_mut(rel_id)?.write_back(&mut self.pool)?;
        }
        self.pool.flush_all()?;

        info!("storage engine closed");
        Ok(())
    }
}

impl Drop for StorageEngine {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "storage engine shutdown failed");
        }
    }
}
