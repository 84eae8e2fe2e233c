//! Trie node types and single-node mutations.
//!
//! Two variants maintain the canonical form invariant:
//! - [`Inner`](Node::Inner): bitmap-compressed node; `item_map` and
//!   `child_map` are disjoint, payloads live in dense slot order.
//! - [`Collision`](Node::Collision): linear node for two or more keys
//!   sharing one full 64-bit hash, created at the level where the
//!   conflict arises.
//!
//! Nodes are reference counted and shared between trees. A write
//! requires a unique reference; the walkers in `ops` obtain one with
//! `SharedPointer::make_mut`, which clones a shared node shallowly
//! before handing out `&mut Node`.

use archery::{SharedPointer, SharedPointerKind};

use crate::bitmap::Bitmap;
use crate::hash::{HashValue, bucket};

#[cfg(any(test, feature = "internal-checks"))]
use crate::hash::BITS_PER_LEVEL;

/// Reference-counted handle to a node, shared between trees.
pub(crate) type NodeRef<K, V, P> = SharedPointer<Node<K, V, P>, P>;

/// Inline entry storing a key-value pair with its precomputed hash.
#[derive(Clone)]
pub(crate) struct Entry<K, V> {
    /// Precomputed 64-bit hash of the key.
    pub hash: HashValue,
    /// The key.
    pub key: K,
    /// The value.
    pub value: V,
}

/// Trie node.
pub(crate) enum Node<K, V, P>
where
    P: SharedPointerKind,
{
    /// Bitmap-compressed inner node.
    Inner {
        /// Buckets occupied by inline items.
        item_map: Bitmap,
        /// Buckets occupied by child subtrees.
        child_map: Bitmap,
        /// Inline items in ascending bucket order.
        items: Vec<Entry<K, V>>,
        /// Child subtrees in ascending bucket order.
        children: Vec<NodeRef<K, V, P>>,
        /// Number of entries in the whole subtree.
        size: usize,
    },
    /// Collision node for keys sharing the same 64-bit hash.
    Collision {
        /// The shared hash value.
        hash: HashValue,
        /// The colliding entries, at least two.
        items: Vec<Entry<K, V>>,
    },
}

// ---------------------------------------------------------------------------
// Construction and accessors
// ---------------------------------------------------------------------------

impl<K, V, P> Node<K, V, P>
where
    P: SharedPointerKind,
{
    /// Builds an inner node, deriving the subtree count from the
    /// payloads.
    #[must_use]
    pub fn inner(
        item_map: Bitmap,
        child_map: Bitmap,
        items: Vec<Entry<K, V>>,
        children: Vec<NodeRef<K, V, P>>,
    ) -> Self {
        debug_assert_eq!(items.len(), item_map.len());
        debug_assert_eq!(children.len(), child_map.len());
        let size = items.len() + children.iter().map(|c| c.size()).sum::<usize>();
        Self::Inner {
            item_map,
            child_map,
            items,
            children,
            size,
        }
    }

    /// Builds a root-level node holding a single entry.
    #[must_use]
    pub fn with_single_item(entry: Entry<K, V>) -> Self {
        let b = bucket(entry.hash, 0);
        Self::Inner {
            item_map: Bitmap::single(b),
            child_map: Bitmap::EMPTY,
            items: vec![entry],
            children: Vec::new(),
            size: 1,
        }
    }

    /// Returns the number of entries in the whole subtree.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::Inner { size, .. } => *size,
            Self::Collision { items, .. } => items.len(),
        }
    }

    /// Returns the number of inline items.
    #[must_use]
    pub fn item_count(&self) -> usize {
        match self {
            Self::Inner { items, .. } | Self::Collision { items, .. } => items.len(),
        }
    }

    /// Returns the number of child subtrees (always 0 for collision
    /// nodes).
    #[must_use]
    pub fn child_count(&self) -> usize {
        match self {
            Self::Inner { children, .. } => children.len(),
            Self::Collision { .. } => 0,
        }
    }

    /// Returns `true` for collision nodes.
    #[must_use]
    pub const fn is_collision(&self) -> bool {
        matches!(self, Self::Collision { .. })
    }

    /// Returns `true` if this node holds nothing but a single collision
    /// child. Such a node is redundant: the collision child routes by
    /// its own stored hash and can take this node's place.
    #[must_use]
    pub fn is_atrophied(&self) -> bool {
        match self {
            Self::Inner {
                items, children, ..
            } => items.is_empty() && children.len() == 1 && children[0].is_collision(),
            Self::Collision { .. } => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Slot access
//
// Buckets translate to dense slots through the bitmaps; these are only
// meaningful on inner nodes.
// ---------------------------------------------------------------------------

impl<K, V, P> Node<K, V, P>
where
    P: SharedPointerKind,
{
    /// Returns `true` if bucket `b` holds an inline item.
    #[must_use]
    pub fn has_item(&self, b: u32) -> bool {
        match self {
            Self::Inner { item_map, .. } => item_map.contains(b),
            Self::Collision { .. } => unreachable!("bucket query on a collision node"),
        }
    }

    /// Returns `true` if bucket `b` holds a child subtree.
    #[must_use]
    pub fn has_child(&self, b: u32) -> bool {
        match self {
            Self::Inner { child_map, .. } => child_map.contains(b),
            Self::Collision { .. } => unreachable!("bucket query on a collision node"),
        }
    }

    /// Returns the inline item at bucket `b`.
    #[must_use]
    pub fn item_at(&self, b: u32) -> &Entry<K, V> {
        match self {
            Self::Inner {
                item_map, items, ..
            } => &items[item_map.rank(b)],
            Self::Collision { .. } => unreachable!("bucket access on a collision node"),
        }
    }

    /// Returns the inline item at bucket `b`, mutably.
    pub fn item_at_mut(&mut self, b: u32) -> &mut Entry<K, V> {
        match self {
            Self::Inner {
                item_map, items, ..
            } => &mut items[item_map.rank(b)],
            Self::Collision { .. } => unreachable!("bucket access on a collision node"),
        }
    }

    /// Returns the child subtree at bucket `b`, mutably.
    pub fn child_at_mut(&mut self, b: u32) -> &mut NodeRef<K, V, P> {
        match self {
            Self::Inner {
                child_map,
                children,
                ..
            } => &mut children[child_map.rank(b)],
            Self::Collision { .. } => unreachable!("bucket access on a collision node"),
        }
    }

    /// Settles the cached subtree count after a recursive walk changed
    /// the number of entries below this node.
    pub fn update_size(&mut self, delta: isize) {
        match self {
            Self::Inner { size, .. } => {
                *size = size
                    .checked_add_signed(delta)
                    .expect("subtree count stays in range");
            }
            Self::Collision { .. } => unreachable!("cached count on a collision node"),
        }
    }
}

// ---------------------------------------------------------------------------
// Single-node mutations
//
// All of these require a write handle (`&mut self` from `make_mut`)
// and keep the subtree count in step with the edit.
// ---------------------------------------------------------------------------

impl<K, V, P> Node<K, V, P>
where
    P: SharedPointerKind,
{
    /// Inserts `entry` as an inline item at bucket `b`.
    pub fn insert_item(&mut self, b: u32, entry: Entry<K, V>) {
        match self {
            Self::Inner {
                item_map,
                child_map,
                items,
                size,
                ..
            } => {
                debug_assert!(!item_map.contains(b) && !child_map.contains(b));
                item_map.insert(b);
                items.insert(item_map.rank(b), entry);
                *size += 1;
            }
            Self::Collision { .. } => unreachable!("item insertion on a collision node"),
        }
    }

    /// Removes and returns the inline item at bucket `b`.
    pub fn remove_item(&mut self, b: u32) -> Entry<K, V> {
        match self {
            Self::Inner {
                item_map,
                items,
                size,
                ..
            } => {
                debug_assert!(item_map.contains(b));
                let slot = item_map.rank(b);
                item_map.remove(b);
                *size -= 1;
                items.remove(slot)
            }
            Self::Collision { .. } => unreachable!("item removal on a collision node"),
        }
    }

    /// Inserts `child` as a subtree at bucket `b`.
    pub fn insert_child(&mut self, b: u32, child: NodeRef<K, V, P>) {
        match self {
            Self::Inner {
                item_map,
                child_map,
                children,
                size,
                ..
            } => {
                debug_assert!(!item_map.contains(b) && !child_map.contains(b));
                child_map.insert(b);
                *size += child.size();
                children.insert(child_map.rank(b), child);
            }
            Self::Collision { .. } => unreachable!("child insertion on a collision node"),
        }
    }

    /// Removes and returns the child subtree at bucket `b`.
    pub fn remove_child(&mut self, b: u32) -> NodeRef<K, V, P> {
        match self {
            Self::Inner {
                child_map,
                children,
                size,
                ..
            } => {
                debug_assert!(child_map.contains(b));
                let slot = child_map.rank(b);
                child_map.remove(b);
                let child = children.remove(slot);
                *size -= child.size();
                child
            }
            Self::Collision { .. } => unreachable!("child removal on a collision node"),
        }
    }

    /// Replaces the inline item at bucket `b` with the subtree `spawn`
    /// builds from it, in one fused step.
    pub fn replace_item_with_child(
        &mut self,
        b: u32,
        spawn: impl FnOnce(Entry<K, V>) -> NodeRef<K, V, P>,
    ) {
        let existing = self.remove_item(b);
        let child = spawn(existing);
        self.insert_child(b, child);
    }

    /// Removes and returns the only remaining item, leaving an empty
    /// husk for the caller to discard.
    pub fn take_single_item(&mut self) -> Entry<K, V> {
        match self {
            Self::Inner {
                item_map,
                items,
                children,
                size,
                ..
            } => {
                debug_assert!(items.len() == 1 && children.is_empty());
                *item_map = Bitmap::EMPTY;
                *size = 0;
                items.pop().expect("exactly one item")
            }
            Self::Collision { .. } => unreachable!("single-item take on a collision node"),
        }
    }

    /// Appends an entry to a collision node.
    pub fn push_collision_item(&mut self, entry: Entry<K, V>) {
        match self {
            Self::Collision { hash, items } => {
                debug_assert_eq!(entry.hash, *hash);
                items.push(entry);
            }
            Self::Inner { .. } => unreachable!("collision append on an inner node"),
        }
    }
}

// ---------------------------------------------------------------------------
// Canonical-form repair and identity
// ---------------------------------------------------------------------------

/// Replaces a node that holds nothing but a single collision child with
/// that child.
///
/// Collision nodes route by their stored hash, so hoisting one to a
/// higher level preserves every lookup path while restoring the
/// canonical form.
pub(crate) fn hoist_lone_collision<K, V, P>(node: &mut NodeRef<K, V, P>)
where
    P: SharedPointerKind,
{
    let replacement = match &**node {
        Node::Inner {
            items, children, ..
        } if items.is_empty() && children.len() == 1 && children[0].is_collision() => {
            children[0].clone()
        }
        _ => return,
    };
    *node = replacement;
}

/// Returns `true` if the two handles refer to the same allocation.
pub(crate) fn same_node<K, V, P>(a: &NodeRef<K, V, P>, b: &NodeRef<K, V, P>) -> bool
where
    P: SharedPointerKind,
{
    std::ptr::eq::<Node<K, V, P>>(&**a, &**b)
}

// ---------------------------------------------------------------------------
// Invariant verification
// ---------------------------------------------------------------------------

#[cfg(any(test, feature = "internal-checks"))]
impl<K, V, P> Node<K, V, P>
where
    K: Eq,
    P: SharedPointerKind,
{
    /// Verifies the structural invariants of the subtree rooted here.
    ///
    /// Panics on the first violation.
    pub fn check_invariants(&self, shift: u32, is_root: bool) {
        match self {
            Self::Inner {
                item_map,
                child_map,
                items,
                children,
                size,
            } => {
                assert!(
                    (*item_map & *child_map).is_empty(),
                    "item and child maps must be disjoint"
                );
                assert_eq!(items.len(), item_map.len(), "items must match the item map");
                assert_eq!(
                    children.len(),
                    child_map.len(),
                    "children must match the child map"
                );
                assert!(
                    !items.is_empty() || !children.is_empty(),
                    "empty nodes must not exist"
                );
                assert!(
                    !self.is_atrophied(),
                    "no node may hold only a collision child"
                );
                if !is_root {
                    assert!(
                        self.size() >= 2,
                        "a non-root node must cover at least two entries"
                    );
                }
                for (slot, entry) in items.iter().enumerate() {
                    assert_eq!(
                        bucket(entry.hash, shift),
                        item_map.select(slot),
                        "an item's bucket must match its hash at the node's level"
                    );
                }
                let mut total = items.len();
                for (slot, child) in children.iter().enumerate() {
                    let b = child_map.select(slot);
                    child.assert_bucket_prefix(shift, b);
                    child.check_invariants(shift + BITS_PER_LEVEL, false);
                    total += child.size();
                }
                assert_eq!(
                    *size, total,
                    "subtree count must equal items plus child counts"
                );
            }
            Self::Collision { hash, items } => {
                assert!(items.len() >= 2, "collision nodes hold at least two items");
                for entry in items {
                    assert_eq!(entry.hash, *hash, "collision items share one hash");
                }
                for (i, a) in items.iter().enumerate() {
                    for b in &items[i + 1..] {
                        assert!(a.key != b.key, "keys must be unique");
                    }
                }
            }
        }
    }

    /// Asserts that every hash in this subtree has bucket `b` at the
    /// parent's `shift`.
    fn assert_bucket_prefix(&self, shift: u32, b: u32) {
        match self {
            Self::Inner {
                items, children, ..
            } => {
                for entry in items {
                    assert_eq!(
                        bucket(entry.hash, shift),
                        b,
                        "a subtree's hashes must agree with its bucket"
                    );
                }
                for child in children {
                    child.assert_bucket_prefix(shift, b);
                }
            }
            Self::Collision { hash, .. } => {
                assert_eq!(
                    bucket(*hash, shift),
                    b,
                    "a collision subtree's hash must agree with its bucket"
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Manual trait impls — avoid a false `P: Clone` bound.
// ---------------------------------------------------------------------------

impl<K, V, P> Clone for Node<K, V, P>
where
    K: Clone,
    V: Clone,
    P: SharedPointerKind,
{
    fn clone(&self) -> Self {
        match self {
            Self::Inner {
                item_map,
                child_map,
                items,
                children,
                size,
            } => Self::Inner {
                item_map: *item_map,
                child_map: *child_map,
                items: items.clone(),
                children: children.clone(),
                size: *size,
            },
            Self::Collision { hash, items } => Self::Collision {
                hash: *hash,
                items: items.clone(),
            },
        }
    }
}
