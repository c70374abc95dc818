//! Relstore - a block-oriented relational storage engine in Rust
//!
//! Relations live in fixed-size blocks on a disk image. Their metadata is
//! kept in two catalog relations that describe themselves, and any
//! attribute can carry a B+ tree index.
//!
//! # Architecture
//!
//! The system is organized into several layers:
//!
//! - **Storage Layer** (`storage`): raw blocks and their typed views
//!   - `DiskStore`: reads and writes whole blocks, backed by a file
//!     (`DiskManager`) or by memory (`MemoryDisk`)
//!   - `RecBuffer`: header, slot map and fixed-size records of a record block
//!   - `IndInternal`/`IndLeaf`: entries of B+ tree blocks
//!   - `BlockAllocMap`: one type byte per block, persisted in blocks 0..4
//!
//! - **Buffer Pool** (`buffer`): fixed set of in-memory block slots
//!   - `BufferPool`: loads blocks on demand, evicts by least recent use and
//!     writes dirty blocks back before reuse
//!
//! - **Catalog** (`catalog`): relation and attribute metadata
//!   - `OpenRelTable`: cached catalog rows and search cursors of open relations
//!   - `format`/`load_catalogs`: image bootstrap
//!
//! - **Access** (`access`): linear search, insert, projection, whole-relation
//!   delete and renames
//!
//! - **Index** (`index`): B+ tree search, insert with splits, bulk creation
//!   and teardown
//!
//! - **Engine** (`engine`): `StorageEngine` session tying the layers together,
//!   plus the schema operations on top of them
//!
//! # Example
//!
//! ```rust,no_run
//! use relstore::{AttrType, Attribute, EngineConfig, Op, StorageEngine};
//!
//! let mut engine = StorageEngine::create("test.disk", EngineConfig::default()).unwrap();
//! engine
//!     .create_rel("Students", &[("roll", AttrType::Number), ("name", AttrType::Text)])
//!     .unwrap();
//!
//! let rel_id = engine.open_rel("Students").unwrap();
//! engine
//!     .insert(rel_id, &[Attribute::from(1.0), Attribute::text("ada").unwrap()])
//!     .unwrap();
//!
//! let row = engine.search(rel_id, "roll", &Attribute::from(1.0), Op::Eq).unwrap();
//! assert_eq!(row[1], Attribute::text("ada").unwrap());
//!
//! // Write everything back to the image
//! engine.close().unwrap();
//! ```

pub mod access;
pub mod buffer;
pub mod catalog;
pub mod common;
pub mod engine;
pub mod index;
pub mod storage;

// Re-export commonly used types at the crate root
pub use common::{
    AttrType, Attribute, BlockNum, EngineConfig, Op, RecId, RelId, Result, StoreError,
};
pub use engine::StorageEngine;
