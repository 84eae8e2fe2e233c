//! Lookup walk.

use std::borrow::Borrow;

use archery::SharedPointerKind;

use crate::hash::{BITS_PER_LEVEL, HashValue, bucket};
use crate::node::{Entry, Node};

/// Searches for `key` in the subtree rooted at `node`.
///
/// At each level the bucket of `hash` selects an inline item (compare
/// and stop), a child (descend), or nothing. A collision node matches
/// only when the full hash agrees, then scans its entries linearly.
pub(crate) fn get_recursive<'a, K, V, P, Q>(
    node: &'a Node<K, V, P>,
    hash: HashValue,
    key: &Q,
    shift: u32,
) -> Option<&'a Entry<K, V>>
where
    K: Borrow<Q>,
    Q: Eq + ?Sized,
    P: SharedPointerKind,
{
    match node {
        Node::Inner {
            item_map,
            child_map,
            items,
            children,
            ..
        } => {
            let b = bucket(hash, shift);
            if item_map.contains(b) {
                let entry = &items[item_map.rank(b)];
                if entry.hash == hash && entry.key.borrow() == key {
                    Some(entry)
                } else {
                    None
                }
            } else if child_map.contains(b) {
                get_recursive(
                    &children[child_map.rank(b)],
                    hash,
                    key,
                    shift + BITS_PER_LEVEL,
                )
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
            items.iter().find(|entry| entry.key.borrow() == key)
        }
    }
}
