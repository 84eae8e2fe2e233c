//! Persistent hash map and set based on a canonical-form HAMT.
//!
//! A hash-array-mapped trie routes each key by successive 5-bit slices
//! of its 64-bit hash through bitmap-compressed nodes. This
//! implementation keeps the trie in **canonical form**: the same set
//! of entries always produces the same structure, regardless of the
//! order of insertions and removals. Canonical form is what makes the
//! structural operations cheap — equality, subset and disjointness
//! tests, union, intersection and difference all walk two trees node
//! pair by node pair and short-circuit on shared subtrees.
//!
//! # Key properties
//!
//! - **Structural sharing**: `clone` is O(1); a mutation copies at
//!   most one node per level (≤ 14 for a 64-bit hash), leaving every
//!   other node shared with the clones.
//! - **Canonical form**: insertion order never shows in the structure;
//!   equality is a structural walk with pointer-identity fast paths.
//! - **Adversarial hashes tolerated**: keys with fully equal hashes
//!   live in collision nodes and degrade only those keys to linear
//!   scans.
//! - **`Rc` or `Arc`**: the `*Sync` aliases switch the node reference
//!   counts to atomic ones so snapshots can cross threads.
//!
//! # Example
//!
//! ```
//! use hamt_map::HamtMap;
//!
//! let base: HamtMap<&str, u32> = HamtMap::new()
//!     .insert("a", 1)
//!     .insert("b", 2);
//!
//! // Persistent update: `base` is untouched, the trees share nodes.
//! let bumped = base.insert("c", 3);
//! assert_eq!(base.len(), 2);
//! assert_eq!(bumped.len(), 3);
//!
//! // Equality ignores construction history.
//! let rebuilt: HamtMap<&str, u32> = [("c", 3), ("b", 2), ("a", 1)]
//!     .into_iter()
//!     .collect();
//! assert_eq!(bumped, rebuilt);
//! ```
//!
//! # References
//!
//! - Bagwell, 2001 — "Ideal Hash Trees"
//! - Steindorfer & Vinju, 2015 — "Optimizing Hash-Array Mapped Tries
//!   for Fast and Lean Immutable JVM Collections", OOPSLA 2015

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod bitmap;
mod cursor;
mod hash;
mod map;
mod node;
mod ops;
mod set;

pub mod iter;

#[cfg(test)]
mod tests;

pub use archery::{ArcK, RcK, SharedPointerKind};

pub use crate::cursor::Cursor;
pub use crate::hash::DefaultHashBuilder;
pub use crate::map::{HamtMap, HamtMapSync};
pub use crate::set::{HamtSet, HamtSetSync};
