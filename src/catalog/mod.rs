//! The relation and attribute catalogs and the open relation table that
//! caches their rows for open relations.

mod bootstrap;
mod entry;
mod open_rel_table;

pub use bootstrap::*;
pub use entry::*;
pub use open_rel_table::*;
