//! Insertion walk: copy-on-write descent with canonical subtree
//! spawning.

use std::mem;

use archery::{SharedPointer, SharedPointerKind};

use crate::bitmap::Bitmap;
use crate::hash::{BITS_PER_LEVEL, HashValue, bucket, is_exhausted};
use crate::node::{Entry, Node, NodeRef};

/// Inserts `entry` into the subtree rooted at `node`.
///
/// Returns the previous value if the key was already present. Every
/// node on the path is made unique before it is written.
pub(crate) fn insert_recursive<K, V, P>(
    node: &mut NodeRef<K, V, P>,
    entry: Entry<K, V>,
    shift: u32,
) -> Option<V>
where
    K: Eq + Clone,
    V: Clone,
    P: SharedPointerKind,
{
    // A collision node for a different hash gets wrapped before any
    // write handle is taken; the wrapper shares the collision node.
    if let Node::Collision { hash, .. } = &**node {
        if *hash != entry.hash {
            let existing_hash = *hash;
            let existing = node.clone();
            *node = expand_collision(existing, existing_hash, entry, shift);
            return None;
        }
    }

    let n = SharedPointer::make_mut(node);
    if n.is_collision() {
        return insert_into_collision(n, entry);
    }

    let b = bucket(entry.hash, shift);
    if n.has_item(b) {
        let existing = n.item_at_mut(b);
        if existing.hash == entry.hash && existing.key == entry.key {
            return Some(mem::replace(&mut existing.value, entry.value));
        }
        // Same bucket, different key: both entries move into a spawned
        // subtree one level down.
        n.replace_item_with_child(b, |old| spawn_subtree(old, entry, shift + BITS_PER_LEVEL));
        None
    } else if n.has_child(b) {
        let old = insert_recursive(n.child_at_mut(b), entry, shift + BITS_PER_LEVEL);
        if old.is_none() {
            n.update_size(1);
        }
        old
    } else {
        n.insert_item(b, entry);
        None
    }
}

/// Inserts into a collision node whose hash matches `entry.hash`.
fn insert_into_collision<K, V, P>(n: &mut Node<K, V, P>, entry: Entry<K, V>) -> Option<V>
where
    K: Eq,
    P: SharedPointerKind,
{
    match n {
        Node::Collision { items, .. } => {
            if let Some(existing) = items.iter_mut().find(|e| e.key == entry.key) {
                return Some(mem::replace(&mut existing.value, entry.value));
            }
            items.push(entry);
            None
        }
        Node::Inner { .. } => unreachable!("collision insert on an inner node"),
    }
}

/// Builds the canonical subtree holding two entries that collide at the
/// parent's bucket.
///
/// Equal hashes produce a collision node at this level. Otherwise the
/// chain of single-child nodes descends while the buckets still agree
/// and ends in a two-item node at the first level that separates them.
pub(crate) fn spawn_subtree<K, V, P>(
    e1: Entry<K, V>,
    e2: Entry<K, V>,
    shift: u32,
) -> NodeRef<K, V, P>
where
    P: SharedPointerKind,
{
    if e1.hash == e2.hash {
        return SharedPointer::new(Node::Collision {
            hash: e1.hash,
            items: vec![e1, e2],
        });
    }
    debug_assert!(!is_exhausted(shift), "distinct hashes separate in range");

    let b1 = bucket(e1.hash, shift);
    let b2 = bucket(e2.hash, shift);
    let node = if b1 == b2 {
        let child = spawn_subtree(e1, e2, shift + BITS_PER_LEVEL);
        Node::inner(Bitmap::EMPTY, Bitmap::single(b1), Vec::new(), vec![child])
    } else {
        let items = if b1 < b2 { vec![e1, e2] } else { vec![e2, e1] };
        Node::inner(
            Bitmap::single(b1) | Bitmap::single(b2),
            Bitmap::EMPTY,
            items,
            Vec::new(),
        )
    };
    SharedPointer::new(node)
}

/// Wraps a collision node under fresh normal nodes so a key whose hash
/// diverges from the collision hash can live beside it.
pub(crate) fn expand_collision<K, V, P>(
    existing: NodeRef<K, V, P>,
    existing_hash: HashValue,
    entry: Entry<K, V>,
    shift: u32,
) -> NodeRef<K, V, P>
where
    P: SharedPointerKind,
{
    debug_assert_ne!(existing_hash, entry.hash);
    debug_assert!(!is_exhausted(shift), "distinct hashes separate in range");

    let bc = bucket(existing_hash, shift);
    let bn = bucket(entry.hash, shift);
    let node = if bc == bn {
        let child = expand_collision(existing, existing_hash, entry, shift + BITS_PER_LEVEL);
        Node::inner(Bitmap::EMPTY, Bitmap::single(bc), Vec::new(), vec![child])
    } else {
        Node::inner(
            Bitmap::single(bn),
            Bitmap::single(bc),
            vec![entry],
            vec![existing],
        )
    };
    SharedPointer::new(node)
}
