use thiserror::Error;

use super::types::BlockNum;

/// Storage engine error types
#[derive(Error, Debug)]
pub enum StoreError {
    // ========== Storage Errors ==========
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Index out of bound")]
    OutOfBound,

    #[error("Block {0} is not resident in the buffer pool")]
    BlockNotInBuffer(BlockNum),

    #[error("Disk is full, no unused block available")]
    DiskFull,

    #[error("Block {0} has an unexpected block type")]
    InvalidBlock(BlockNum),

    #[error("Invalid disk image")]
    InvalidDiskImage,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ========== Catalog Errors ==========
    #[error("Open relation table is full")]
    CacheFull,

    #[error("Relation is not open")]
    RelNotOpen,

    #[error("Relation is open")]
    RelOpen,

    #[error("Relation does not exist")]
    RelNotExist,

    #[error("Relation already exists")]
    RelExist,

    #[error("Attribute does not exist")]
    AttrNotExist,

    #[error("Attribute already exists")]
    AttrExist,

    #[error("Duplicate attribute name")]
    DuplicateAttr,

    #[error("Maximum number of relations reached")]
    MaxRelations,

    #[error("Catalog corrupted: {0}")]
    CatalogCorrupted(String),

    // ========== Access Errors ==========
    #[error("Operation not permitted")]
    NotPermitted,

    #[error("Search found no matching record")]
    NotFound,

    #[error("Attribute count mismatch: expected {expected}, got {actual}")]
    AttrCountMismatch { expected: usize, actual: usize },

    #[error("Attribute type mismatch")]
    AttrTypeMismatch,

    #[error("Value exceeds the {max} byte attribute limit")]
    ValueTooLong { max: usize },

    #[error("Attribute has no index")]
    NoIndex,
}

pub type Result<T> = std::result::Result<T, StoreError>;
