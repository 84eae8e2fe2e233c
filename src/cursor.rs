//! Index cursors: lightweight paths to one item of one tree snapshot.

use std::borrow::Borrow;

use archery::SharedPointerKind;

use crate::hash::{BITS_PER_LEVEL, HashValue, MAX_DEPTH, bucket};
use crate::node::{Node, NodeRef};

/// Identifies one item of the tree it was derived from by its slot
/// path.
///
/// A cursor stays valid only against that exact tree value: any
/// mutation invalidates all outstanding cursors. Resolving a cursor
/// against a mutated tree panics when the staleness is detectable
/// (root identity or length changed); a mutation that restores both is
/// indistinguishable and yields whichever item now occupies the path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cursor {
    path: [u8; MAX_DEPTH],
    depth: u8,
    item_slot: usize,
    root_id: usize,
    tree_len: usize,
}

/// Address of the root allocation, used to pin cursors to a tree.
pub(crate) fn root_id<K, V, P>(root: &NodeRef<K, V, P>) -> usize
where
    P: SharedPointerKind,
{
    std::ptr::from_ref::<Node<K, V, P>>(root) as usize
}

/// Walks to `key` and records the slot path.
pub(crate) fn locate<K, V, P, Q>(
    root: &NodeRef<K, V, P>,
    hash: HashValue,
    key: &Q,
    tree_len: usize,
) -> Option<Cursor>
where
    K: Borrow<Q>,
    Q: Eq + ?Sized,
    P: SharedPointerKind,
{
    let mut path = [0u8; MAX_DEPTH];
    let mut depth = 0usize;
    let mut node = root;
    let mut shift = 0u32;
    loop {
        match &**node {
            Node::Inner {
                item_map,
                child_map,
                items,
                children,
                ..
            } => {
                let b = bucket(hash, shift);
                if item_map.contains(b) {
                    let slot = item_map.rank(b);
                    let entry = &items[slot];
                    if entry.hash == hash && entry.key.borrow() == key {
                        return Some(Cursor {
                            path,
                            depth: depth as u8,
                            item_slot: slot,
                            root_id: root_id(root),
                            tree_len,
                        });
                    }
                    return None;
                }
                if child_map.contains(b) {
                    let slot = child_map.rank(b);
                    path[depth] = slot as u8;
                    depth += 1;
                    node = &children[slot];
                    shift += BITS_PER_LEVEL;
                    continue;
                }
                return None;
            }
            Node::Collision {
                hash: node_hash,
                items,
            } => {
                if *node_hash != hash {
                    return None;
                }
                let slot = items.iter().position(|e| e.key.borrow() == key)?;
                return Some(Cursor {
                    path,
                    depth: depth as u8,
                    item_slot: slot,
                    root_id: root_id(root),
                    tree_len,
                });
            }
        }
    }
}

/// Follows a cursor's path. Returns `None` when the cursor does not
/// belong to this tree or its path no longer resolves.
pub(crate) fn resolve<'a, K, V, P>(
    root: &'a NodeRef<K, V, P>,
    cursor: &Cursor,
    tree_len: usize,
) -> Option<(&'a K, &'a V)>
where
    P: SharedPointerKind,
{
    if cursor.root_id != root_id(root) || cursor.tree_len != tree_len {
        return None;
    }
    let mut node = root;
    for step in &cursor.path[..cursor.depth as usize] {
        match &**node {
            Node::Inner { children, .. } => node = children.get(*step as usize)?,
            Node::Collision { .. } => return None,
        }
    }
    let entry = match &**node {
        Node::Inner { items, .. } | Node::Collision { items, .. } => items.get(cursor.item_slot)?,
    };
    Some((&entry.key, &entry.value))
}
