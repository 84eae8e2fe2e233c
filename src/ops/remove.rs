//! Removal walk: copy-on-write delete with canonical collapse.

use std::borrow::Borrow;

use archery::{SharedPointer, SharedPointerKind};

use crate::hash::{BITS_PER_LEVEL, HashValue, bucket};
use crate::node::{Entry, Node, NodeRef, hoist_lone_collision};

/// Outcome of a recursive remove.
pub(crate) enum RemoveOutcome<K, V> {
    /// Key was not found; the subtree is unchanged.
    NotFound,
    /// Entry removed; the node remains structurally valid.
    Removed(V),
    /// Entry removed and the subtree dissolved into its last remaining
    /// entry, which the caller inlines one level up.
    Collapsed(V, Entry<K, V>),
    /// Entry removed and the subtree is empty. Only the root ever
    /// reaches this state; deeper nodes collapse first.
    Emptied(V),
}

/// What the bucket of the sought hash holds at the current node.
enum Hit {
    Item,
    Child,
    Collision,
}

/// Removes `key` from the subtree rooted at `node`.
pub(crate) fn remove_recursive<K, V, P, Q>(
    node: &mut NodeRef<K, V, P>,
    hash: HashValue,
    key: &Q,
    shift: u32,
) -> RemoveOutcome<K, V>
where
    K: Borrow<Q> + Clone,
    V: Clone,
    Q: Eq + ?Sized,
    P: SharedPointerKind,
{
    // Resolve misses at this level before taking a write handle, so a
    // missing key does not copy a shared node.
    let hit = match &**node {
        Node::Inner {
            item_map,
            child_map,
            items,
            ..
        } => {
            let b = bucket(hash, shift);
            if item_map.contains(b) {
                let entry = &items[item_map.rank(b)];
                if entry.hash == hash && entry.key.borrow() == key {
                    Hit::Item
                } else {
                    return RemoveOutcome::NotFound;
                }
            } else if child_map.contains(b) {
                Hit::Child
            } else {
                return RemoveOutcome::NotFound;
            }
        }
        Node::Collision {
            hash: node_hash,
            items,
        } => {
            if *node_hash == hash && items.iter().any(|e| e.key.borrow() == key) {
                Hit::Collision
            } else {
                return RemoveOutcome::NotFound;
            }
        }
    };

    match hit {
        Hit::Collision => remove_from_collision(SharedPointer::make_mut(node), key),
        Hit::Item => {
            let b = bucket(hash, shift);
            let n = SharedPointer::make_mut(node);
            let removed = n.remove_item(b);
            let outcome = if n.item_count() == 0 && n.child_count() == 0 {
                RemoveOutcome::Emptied(removed.value)
            } else if n.item_count() == 1 && n.child_count() == 0 {
                RemoveOutcome::Collapsed(removed.value, n.take_single_item())
            } else {
                RemoveOutcome::Removed(removed.value)
            };
            // Removing the last item may leave only a collision child
            // behind; hoist it into this slot.
            if matches!(outcome, RemoveOutcome::Removed(_)) {
                hoist_lone_collision(node);
            }
            outcome
        }
        Hit::Child => {
            let b = bucket(hash, shift);
            let n = SharedPointer::make_mut(node);
            match remove_recursive(n.child_at_mut(b), hash, key, shift + BITS_PER_LEVEL) {
                RemoveOutcome::NotFound => RemoveOutcome::NotFound,
                RemoveOutcome::Removed(value) => {
                    n.update_size(-1);
                    // The child's own repair may have turned it into a
                    // raw collision node; if it is now this node's only
                    // payload, the hoist must cascade here as well.
                    hoist_lone_collision(node);
                    RemoveOutcome::Removed(value)
                }
                RemoveOutcome::Collapsed(value, entry) => {
                    // The child dissolved into its last entry: delete
                    // the child slot and inline the entry at the same
                    // bucket. The husk reports size zero, so settle the
                    // count to a net loss of one entry.
                    let husk = n.remove_child(b);
                    debug_assert_eq!(husk.size(), 0);
                    drop(husk);
                    n.insert_item(b, entry);
                    n.update_size(-2);
                    if n.item_count() == 1 && n.child_count() == 0 {
                        return RemoveOutcome::Collapsed(value, n.take_single_item());
                    }
                    RemoveOutcome::Removed(value)
                }
                RemoveOutcome::Emptied(_) => {
                    unreachable!("a child subtree never empties; it collapses first")
                }
            }
        }
    }
}

/// Removes `key` from a collision node known to contain it.
fn remove_from_collision<K, V, P, Q>(n: &mut Node<K, V, P>, key: &Q) -> RemoveOutcome<K, V>
where
    K: Borrow<Q>,
    Q: Eq + ?Sized,
    P: SharedPointerKind,
{
    match n {
        Node::Collision { items, .. } => {
            let idx = items
                .iter()
                .position(|e| e.key.borrow() == key)
                .expect("presence checked before the write handle");
            let removed = items.remove(idx);
            if items.len() == 1 {
                let remaining = items.pop().expect("one remaining entry");
                RemoveOutcome::Collapsed(removed.value, remaining)
            } else {
                RemoveOutcome::Removed(removed.value)
            }
        }
        Node::Inner { .. } => unreachable!("collision removal on an inner node"),
    }
}
