//! Subtree algorithms: recursive walks over the trie.
//!
//! Every mutating walk goes through `SharedPointer::make_mut` level by
//! level, so nodes shared with other trees are copied exactly along the
//! touched path and nowhere else.

pub mod algebra;
pub mod get;
pub mod insert;
pub mod remove;
pub mod update;
