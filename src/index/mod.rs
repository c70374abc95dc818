//! B+ tree indexes over single attributes.
//!
//! A tree is rooted at the block stored in the attribute's catalog row.
//! Leaves hold `(key, record id)` pairs in ascending key order and are
//! right-linked; internal nodes hold separators whose left subtree keys
//! are `<=` the separator and right subtree keys `>=` it. Equal keys go to
//! the left on insertion.
//!
//! A failed allocation while growing the tree tears the whole tree down
//! and leaves the attribute unindexed.

mod bplus_tree;
mod split;
