//! Two-phase defaulted update.
//!
//! Phase 1 ([`prepare_upsert_recursive`]) walks once, makes the path
//! unique, and inserts the default value exactly when the key is
//! absent. Phase 2 ([`get_mut_recursive`]) hands out `&mut V` at the
//! now-known slot. The split keeps a single hash computation while the
//! facade restores the canonical root between the phases.

use std::borrow::Borrow;

use archery::{SharedPointer, SharedPointerKind};

use crate::hash::{BITS_PER_LEVEL, HashValue, bucket};
use crate::node::{Entry, Node, NodeRef};
use crate::ops::insert::{expand_collision, spawn_subtree};

/// Ensures `key` is present, inserting `default()` if it is not.
///
/// Returns `true` when an insertion happened. The default closure is
/// evaluated at most once, and only on insertion.
pub(crate) fn prepare_upsert_recursive<K, V, P, F>(
    node: &mut NodeRef<K, V, P>,
    hash: HashValue,
    key: &K,
    shift: u32,
    default: &mut Option<F>,
) -> bool
where
    K: Eq + Clone,
    V: Clone,
    F: FnOnce() -> V,
    P: SharedPointerKind,
{
    if let Node::Collision {
        hash: node_hash, ..
    } = &**node
    {
        if *node_hash != hash {
            let existing_hash = *node_hash;
            let existing = node.clone();
            let entry = Entry {
                hash,
                key: key.clone(),
                value: take_default(default),
            };
            *node = expand_collision(existing, existing_hash, entry, shift);
            return true;
        }
    }

    let n = SharedPointer::make_mut(node);
    if n.is_collision() {
        if collision_contains(n, key) {
            return false;
        }
        n.push_collision_item(Entry {
            hash,
            key: key.clone(),
            value: take_default(default),
        });
        return true;
    }

    let b = bucket(hash, shift);
    if n.has_item(b) {
        let existing = n.item_at(b);
        if existing.hash == hash && existing.key == *key {
            return false;
        }
        let entry = Entry {
            hash,
            key: key.clone(),
            value: take_default(default),
        };
        n.replace_item_with_child(b, |old| spawn_subtree(old, entry, shift + BITS_PER_LEVEL));
        true
    } else if n.has_child(b) {
        let inserted =
            prepare_upsert_recursive(n.child_at_mut(b), hash, key, shift + BITS_PER_LEVEL, default);
        if inserted {
            n.update_size(1);
        }
        inserted
    } else {
        n.insert_item(
            b,
            Entry {
                hash,
                key: key.clone(),
                value: take_default(default),
            },
        );
        true
    }
}

/// Returns a mutable reference to the value for `key`, copying shared
/// nodes along the path.
pub(crate) fn get_mut_recursive<'a, K, V, P, Q>(
    node: &'a mut NodeRef<K, V, P>,
    hash: HashValue,
    key: &Q,
    shift: u32,
) -> Option<&'a mut V>
where
    K: Borrow<Q> + Clone,
    V: Clone,
    Q: Eq + ?Sized,
    P: SharedPointerKind,
{
    let n = SharedPointer::make_mut(node);
    match n {
        Node::Inner {
            item_map,
            child_map,
            items,
            children,
            ..
        } => {
            let b = bucket(hash, shift);
            if item_map.contains(b) {
                let entry = &mut items[item_map.rank(b)];
                if entry.hash == hash && entry.key.borrow() == key {
                    Some(&mut entry.value)
                } else {
                    None
                }
            } else if child_map.contains(b) {
                let slot = child_map.rank(b);
                get_mut_recursive(&mut children[slot], hash, key, shift + BITS_PER_LEVEL)
            } else {
                None
            }
        }
        Node::Collision {
            hash: node_hash,
            items,
        } => {
            if *node_hash != hash {
                return None;
            }
            items
                .iter_mut()
                .find(|e| e.key.borrow() == key)
                .map(|e| &mut e.value)
        }
    }
}

fn take_default<V, F: FnOnce() -> V>(default: &mut Option<F>) -> V {
    (default.take().expect("default evaluated at most once"))()
}

fn collision_contains<K, V, P>(n: &Node<K, V, P>, key: &K) -> bool
where
    K: Eq,
    P: SharedPointerKind,
{
    match n {
        Node::Collision { items, .. } => items.iter().any(|e| e.key == *key),
        Node::Inner { .. } => unreachable!("collision scan on an inner node"),
    }
}
