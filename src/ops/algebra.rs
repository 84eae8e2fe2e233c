//! Set algebra and equality by node-pair traversal.
//!
//! Both trees are walked at the same level; bitmap set operations
//! classify every occupied bucket into item/item, item/child,
//! child/item, child/child, and single-sided cases. Subtrees present
//! on one side only are reused by reference, and identical handles
//! short-circuit every operation, so results share as much structure
//! with their inputs as the canonical form allows.
//!
//! All of this relies on both trees hashing keys identically; the
//! facade guarantees that through the hash-builder contract.

use archery::{SharedPointer, SharedPointerKind};

use crate::bitmap::Bitmap;
use crate::hash::{BITS_PER_LEVEL, HashValue, bucket};
use crate::node::{Entry, Node, NodeRef, same_node};
use crate::ops::get::get_recursive;
use crate::ops::insert::{expand_collision, spawn_subtree};
use crate::ops::remove::{RemoveOutcome, remove_recursive};

/// A canonicalized partial result: whatever survived a shrinking
/// node-pair operation.
pub(crate) enum Pruned<K, V, P>
where
    P: SharedPointerKind,
{
    /// Nothing survived.
    Empty,
    /// A single entry survived; the caller inlines it one level up or
    /// rebuilds a one-item root from it.
    Single(Entry<K, V>),
    /// A whole node survived.
    Node(NodeRef<K, V, P>),
}

// ---------------------------------------------------------------------------
// Union
// ---------------------------------------------------------------------------

/// Unites two subtrees. `combine(key, left, right)` resolves each
/// duplicate key exactly once.
pub(crate) fn union_nodes<K, V, P, F>(
    a: &NodeRef<K, V, P>,
    b: &NodeRef<K, V, P>,
    shift: u32,
    combine: &mut F,
) -> NodeRef<K, V, P>
where
    K: Eq + Clone,
    V: Clone,
    F: FnMut(&K, &V, &V) -> V,
    P: SharedPointerKind,
{
    if same_node(a, b) {
        return a.clone();
    }
    match (&**a, &**b) {
        (Node::Inner { .. }, Node::Inner { .. }) => union_inners(a, b, shift, combine),
        (
            Node::Collision {
                hash: a_hash,
                items: a_items,
            },
            Node::Collision {
                hash: b_hash,
                items: b_items,
            },
        ) => {
            if a_hash == b_hash {
                let mut items = a_items.clone();
                for eb in b_items {
                    if let Some(existing) = items.iter_mut().find(|e| e.key == eb.key) {
                        existing.value = combine(&existing.key, &existing.value, &eb.value);
                    } else {
                        items.push(eb.clone());
                    }
                }
                SharedPointer::new(Node::Collision {
                    hash: *a_hash,
                    items,
                })
            } else {
                join_hash_subtrees(a.clone(), *a_hash, b.clone(), *b_hash, shift)
            }
        }
        (Node::Inner { .. }, Node::Collision { items, .. }) => {
            let mut out = a.clone();
            for entry in items {
                union_insert(&mut out, entry.clone(), shift, combine, false);
            }
            out
        }
        (Node::Collision { items, .. }, Node::Inner { .. }) => {
            let mut out = b.clone();
            for entry in items {
                union_insert(&mut out, entry.clone(), shift, combine, true);
            }
            out
        }
    }
}

fn union_inners<K, V, P, F>(
    a: &NodeRef<K, V, P>,
    b: &NodeRef<K, V, P>,
    shift: u32,
    combine: &mut F,
) -> NodeRef<K, V, P>
where
    K: Eq + Clone,
    V: Clone,
    F: FnMut(&K, &V, &V) -> V,
    P: SharedPointerKind,
{
    let (
        Node::Inner {
            item_map: a_item_map,
            child_map: a_child_map,
            items: a_items,
            children: a_children,
            ..
        },
        Node::Inner {
            item_map: b_item_map,
            child_map: b_child_map,
            items: b_items,
            children: b_children,
            ..
        },
    ) = (&**a, &**b)
    else {
        unreachable!("both nodes are inner")
    };

    let mut item_map = Bitmap::EMPTY;
    let mut child_map = Bitmap::EMPTY;
    let mut items = Vec::new();
    let mut children = Vec::new();

    let occupied = (*a_item_map | *a_child_map) | (*b_item_map | *b_child_map);
    for bkt in occupied.buckets() {
        let sides = (
            a_item_map.contains(bkt),
            a_child_map.contains(bkt),
            b_item_map.contains(bkt),
            b_child_map.contains(bkt),
        );
        match sides {
            // item / item
            (true, _, true, _) => {
                let ea = &a_items[a_item_map.rank(bkt)];
                let eb = &b_items[b_item_map.rank(bkt)];
                if ea.hash == eb.hash && ea.key == eb.key {
                    let value = combine(&ea.key, &ea.value, &eb.value);
                    item_map.insert(bkt);
                    items.push(Entry {
                        hash: ea.hash,
                        key: ea.key.clone(),
                        value,
                    });
                } else {
                    child_map.insert(bkt);
                    children.push(spawn_subtree(
                        ea.clone(),
                        eb.clone(),
                        shift + BITS_PER_LEVEL,
                    ));
                }
            }
            // item / child
            (true, _, false, true) => {
                let ea = &a_items[a_item_map.rank(bkt)];
                let mut child = b_children[b_child_map.rank(bkt)].clone();
                union_insert(&mut child, ea.clone(), shift + BITS_PER_LEVEL, combine, true);
                child_map.insert(bkt);
                children.push(child);
            }
            // child / item
            (false, true, true, _) => {
                let eb = &b_items[b_item_map.rank(bkt)];
                let mut child = a_children[a_child_map.rank(bkt)].clone();
                union_insert(
                    &mut child,
                    eb.clone(),
                    shift + BITS_PER_LEVEL,
                    combine,
                    false,
                );
                child_map.insert(bkt);
                children.push(child);
            }
            // child / child
            (false, true, false, true) => {
                let ac = &a_children[a_child_map.rank(bkt)];
                let bc = &b_children[b_child_map.rank(bkt)];
                child_map.insert(bkt);
                children.push(union_nodes(ac, bc, shift + BITS_PER_LEVEL, combine));
            }
            // left only
            (true, _, false, false) => {
                item_map.insert(bkt);
                items.push(a_items[a_item_map.rank(bkt)].clone());
            }
            (false, true, false, false) => {
                child_map.insert(bkt);
                children.push(a_children[a_child_map.rank(bkt)].clone());
            }
            // right only
            (false, false, true, _) => {
                item_map.insert(bkt);
                items.push(b_items[b_item_map.rank(bkt)].clone());
            }
            (false, false, false, true) => {
                child_map.insert(bkt);
                children.push(b_children[b_child_map.rank(bkt)].clone());
            }
            (false, false, false, false) => unreachable!("bucket came from the occupied set"),
        }
    }

    SharedPointer::new(Node::inner(item_map, child_map, items, children))
}

/// Inserts one entry during a union. `entry_is_left` tells `combine`
/// which operand the entry came from.
fn union_insert<K, V, P, F>(
    node: &mut NodeRef<K, V, P>,
    entry: Entry<K, V>,
    shift: u32,
    combine: &mut F,
    entry_is_left: bool,
) -> bool
where
    K: Eq + Clone,
    V: Clone,
    F: FnMut(&K, &V, &V) -> V,
    P: SharedPointerKind,
{
    if let Node::Collision {
        hash: node_hash, ..
    } = &**node
    {
        if *node_hash != entry.hash {
            let existing_hash = *node_hash;
            let existing = node.clone();
            *node = expand_collision(existing, existing_hash, entry, shift);
            return true;
        }
    }

    let n = SharedPointer::make_mut(node);
    if n.is_collision() {
        return union_insert_collision(n, entry, combine, entry_is_left);
    }

    let b = bucket(entry.hash, shift);
    if n.has_item(b) {
        let existing = n.item_at_mut(b);
        if existing.hash == entry.hash && existing.key == entry.key {
            existing.value = if entry_is_left {
                combine(&existing.key, &entry.value, &existing.value)
            } else {
                combine(&existing.key, &existing.value, &entry.value)
            };
            return false;
        }
        n.replace_item_with_child(b, |old| spawn_subtree(old, entry, shift + BITS_PER_LEVEL));
        true
    } else if n.has_child(b) {
        let added = union_insert(
            n.child_at_mut(b),
            entry,
            shift + BITS_PER_LEVEL,
            combine,
            entry_is_left,
        );
        if added {
            n.update_size(1);
        }
        added
    } else {
        n.insert_item(b, entry);
        true
    }
}

fn union_insert_collision<K, V, P, F>(
    n: &mut Node<K, V, P>,
    entry: Entry<K, V>,
    combine: &mut F,
    entry_is_left: bool,
) -> bool
where
    K: Eq,
    F: FnMut(&K, &V, &V) -> V,
    P: SharedPointerKind,
{
    match n {
        Node::Collision { items, .. } => {
            if let Some(existing) = items.iter_mut().find(|e| e.key == entry.key) {
                existing.value = if entry_is_left {
                    combine(&existing.key, &entry.value, &existing.value)
                } else {
                    combine(&existing.key, &existing.value, &entry.value)
                };
                false
            } else {
                items.push(entry);
                true
            }
        }
        Node::Inner { .. } => unreachable!("collision union on an inner node"),
    }
}

/// Joins two hash-homogeneous subtrees with distinct hashes under
/// fresh normal nodes, descending while their buckets still agree.
fn join_hash_subtrees<K, V, P>(
    x: NodeRef<K, V, P>,
    x_hash: HashValue,
    y: NodeRef<K, V, P>,
    y_hash: HashValue,
    shift: u32,
) -> NodeRef<K, V, P>
where
    P: SharedPointerKind,
{
    debug_assert_ne!(x_hash, y_hash);
    let bx = bucket(x_hash, shift);
    let by = bucket(y_hash, shift);
    let node = if bx == by {
        let child = join_hash_subtrees(x, x_hash, y, y_hash, shift + BITS_PER_LEVEL);
        Node::inner(Bitmap::EMPTY, Bitmap::single(bx), Vec::new(), vec![child])
    } else {
        let children = if bx < by { vec![x, y] } else { vec![y, x] };
        Node::inner(
            Bitmap::EMPTY,
            Bitmap::single(bx) | Bitmap::single(by),
            Vec::new(),
            children,
        )
    };
    SharedPointer::new(node)
}

// ---------------------------------------------------------------------------
// Intersection
// ---------------------------------------------------------------------------

/// Intersects two subtrees, keeping the left side's entries.
pub(crate) fn intersect_nodes<K, V, P>(
    a: &NodeRef<K, V, P>,
    b: &NodeRef<K, V, P>,
    shift: u32,
) -> Pruned<K, V, P>
where
    K: Eq + Clone,
    V: Clone,
    P: SharedPointerKind,
{
    if same_node(a, b) {
        return Pruned::Node(a.clone());
    }
    match (&**a, &**b) {
        (Node::Inner { .. }, Node::Inner { .. }) => intersect_inners(a, b, shift),
        (
            Node::Collision {
                hash: a_hash,
                items: a_items,
            },
            Node::Collision {
                hash: b_hash,
                items: b_items,
            },
        ) => {
            if a_hash != b_hash {
                return Pruned::Empty;
            }
            let kept: Vec<Entry<K, V>> = a_items
                .iter()
                .filter(|e| b_items.iter().any(|x| x.key == e.key))
                .cloned()
                .collect();
            if kept.len() == a_items.len() {
                Pruned::Node(a.clone())
            } else {
                prune_collision(*a_hash, kept)
            }
        }
        (Node::Collision { hash, items }, Node::Inner { .. }) => {
            let kept: Vec<Entry<K, V>> = items
                .iter()
                .filter(|e| get_recursive(b, *hash, &e.key, shift).is_some())
                .cloned()
                .collect();
            if kept.len() == items.len() {
                Pruned::Node(a.clone())
            } else {
                prune_collision(*hash, kept)
            }
        }
        (Node::Inner { .. }, Node::Collision { hash, items }) => {
            // Keep the left side's entries for the keys b holds.
            let mut kept = Vec::new();
            for eb in items {
                if let Some(found) = get_recursive(a, *hash, &eb.key, shift) {
                    kept.push(found.clone());
                }
            }
            if kept.len() == a.size() {
                Pruned::Node(a.clone())
            } else {
                prune_collision(*hash, kept)
            }
        }
    }
}

fn intersect_inners<K, V, P>(
    a: &NodeRef<K, V, P>,
    b: &NodeRef<K, V, P>,
    shift: u32,
) -> Pruned<K, V, P>
where
    K: Eq + Clone,
    V: Clone,
    P: SharedPointerKind,
{
    let (
        Node::Inner {
            item_map: a_item_map,
            child_map: a_child_map,
            items: a_items,
            children: a_children,
            ..
        },
        Node::Inner {
            item_map: b_item_map,
            child_map: b_child_map,
            items: b_items,
            children: b_children,
            ..
        },
    ) = (&**a, &**b)
    else {
        unreachable!("both nodes are inner")
    };

    let mut item_map = Bitmap::EMPTY;
    let mut child_map = Bitmap::EMPTY;
    let mut items = Vec::new();
    let mut children = Vec::new();
    let mut changed = false;

    let a_occupied = *a_item_map | *a_child_map;
    let common = a_occupied & (*b_item_map | *b_child_map);
    if common != a_occupied {
        changed = true;
    }

    for bkt in common.buckets() {
        match (a_item_map.contains(bkt), b_item_map.contains(bkt)) {
            (true, true) => {
                let ea = &a_items[a_item_map.rank(bkt)];
                let eb = &b_items[b_item_map.rank(bkt)];
                if ea.hash == eb.hash && ea.key == eb.key {
                    item_map.insert(bkt);
                    items.push(ea.clone());
                } else {
                    changed = true;
                }
            }
            (true, false) => {
                let ea = &a_items[a_item_map.rank(bkt)];
                let bc = &b_children[b_child_map.rank(bkt)];
                if get_recursive(bc, ea.hash, &ea.key, shift + BITS_PER_LEVEL).is_some() {
                    item_map.insert(bkt);
                    items.push(ea.clone());
                } else {
                    changed = true;
                }
            }
            (false, true) => {
                let eb = &b_items[b_item_map.rank(bkt)];
                let ac = &a_children[a_child_map.rank(bkt)];
                // A child covers at least two keys, so surviving alone
                // always shrinks it.
                changed = true;
                if let Some(found) = get_recursive(ac, eb.hash, &eb.key, shift + BITS_PER_LEVEL) {
                    item_map.insert(bkt);
                    items.push(found.clone());
                }
            }
            (false, false) => {
                let ac = &a_children[a_child_map.rank(bkt)];
                let bc = &b_children[b_child_map.rank(bkt)];
                match intersect_nodes(ac, bc, shift + BITS_PER_LEVEL) {
                    Pruned::Empty => changed = true,
                    Pruned::Single(entry) => {
                        changed = true;
                        item_map.insert(bkt);
                        items.push(entry);
                    }
                    Pruned::Node(node) => {
                        if !same_node(&node, ac) {
                            changed = true;
                        }
                        child_map.insert(bkt);
                        children.push(node);
                    }
                }
            }
        }
    }

    if changed {
        finalize_pruned(item_map, child_map, items, children)
    } else {
        Pruned::Node(a.clone())
    }
}

// ---------------------------------------------------------------------------
// Difference
// ---------------------------------------------------------------------------

/// Subtracts `b`'s keys from `a`. Returns the left node by reference
/// when nothing was removed.
pub(crate) fn difference_nodes<K, V, P>(
    a: &NodeRef<K, V, P>,
    b: &NodeRef<K, V, P>,
    shift: u32,
) -> Pruned<K, V, P>
where
    K: Eq + Clone,
    V: Clone,
    P: SharedPointerKind,
{
    if same_node(a, b) {
        return Pruned::Empty;
    }
    match (&**a, &**b) {
        (Node::Inner { .. }, Node::Inner { .. }) => difference_inners(a, b, shift),
        (
            Node::Collision {
                hash: a_hash,
                items: a_items,
            },
            Node::Collision {
                hash: b_hash,
                items: b_items,
            },
        ) => {
            if a_hash != b_hash {
                return Pruned::Node(a.clone());
            }
            let kept: Vec<Entry<K, V>> = a_items
                .iter()
                .filter(|e| !b_items.iter().any(|x| x.key == e.key))
                .cloned()
                .collect();
            if kept.len() == a_items.len() {
                Pruned::Node(a.clone())
            } else {
                prune_collision(*a_hash, kept)
            }
        }
        (Node::Collision { hash, items }, Node::Inner { .. }) => {
            let kept: Vec<Entry<K, V>> = items
                .iter()
                .filter(|e| get_recursive(b, *hash, &e.key, shift).is_none())
                .cloned()
                .collect();
            if kept.len() == items.len() {
                Pruned::Node(a.clone())
            } else {
                prune_collision(*hash, kept)
            }
        }
        (
            Node::Inner { .. },
            Node::Collision {
                hash: b_hash,
                items: b_items,
            },
        ) => {
            // Remove each of b's keys from a copy of a; all of them
            // share one hash, so they route along one path.
            let mut out = a.clone();
            let mut changed = false;
            for eb in b_items {
                match remove_recursive(&mut out, *b_hash, &eb.key, shift) {
                    RemoveOutcome::NotFound => {}
                    RemoveOutcome::Removed(_) => changed = true,
                    RemoveOutcome::Collapsed(_, remaining) => {
                        let dead = b_items.iter().any(|x| x.key == remaining.key);
                        return if dead {
                            Pruned::Empty
                        } else {
                            Pruned::Single(remaining)
                        };
                    }
                    RemoveOutcome::Emptied(_) => return Pruned::Empty,
                }
            }
            if changed {
                Pruned::Node(out)
            } else {
                Pruned::Node(a.clone())
            }
        }
    }
}

fn difference_inners<K, V, P>(
    a: &NodeRef<K, V, P>,
    b: &NodeRef<K, V, P>,
    shift: u32,
) -> Pruned<K, V, P>
where
    K: Eq + Clone,
    V: Clone,
    P: SharedPointerKind,
{
    let (
        Node::Inner {
            item_map: a_item_map,
            child_map: a_child_map,
            items: a_items,
            children: a_children,
            ..
        },
        Node::Inner {
            item_map: b_item_map,
            child_map: b_child_map,
            items: b_items,
            children: b_children,
            ..
        },
    ) = (&**a, &**b)
    else {
        unreachable!("both nodes are inner")
    };

    let mut item_map = Bitmap::EMPTY;
    let mut child_map = Bitmap::EMPTY;
    let mut items = Vec::new();
    let mut children = Vec::new();
    let mut changed = false;

    for bkt in (*a_item_map | *a_child_map).buckets() {
        if a_item_map.contains(bkt) {
            let ea = &a_items[a_item_map.rank(bkt)];
            let keep = if b_item_map.contains(bkt) {
                let eb = &b_items[b_item_map.rank(bkt)];
                !(ea.hash == eb.hash && ea.key == eb.key)
            } else if b_child_map.contains(bkt) {
                let bc = &b_children[b_child_map.rank(bkt)];
                get_recursive(bc, ea.hash, &ea.key, shift + BITS_PER_LEVEL).is_none()
            } else {
                true
            };
            if keep {
                item_map.insert(bkt);
                items.push(ea.clone());
            } else {
                changed = true;
            }
        } else {
            let ac = &a_children[a_child_map.rank(bkt)];
            if b_child_map.contains(bkt) {
                let bc = &b_children[b_child_map.rank(bkt)];
                match difference_nodes(ac, bc, shift + BITS_PER_LEVEL) {
                    Pruned::Empty => changed = true,
                    Pruned::Single(entry) => {
                        changed = true;
                        item_map.insert(bkt);
                        items.push(entry);
                    }
                    Pruned::Node(node) => {
                        if !same_node(&node, ac) {
                            changed = true;
                        }
                        child_map.insert(bkt);
                        children.push(node);
                    }
                }
            } else if b_item_map.contains(bkt) {
                let eb = &b_items[b_item_map.rank(bkt)];
                let mut pruned = ac.clone();
                match remove_recursive(&mut pruned, eb.hash, &eb.key, shift + BITS_PER_LEVEL) {
                    RemoveOutcome::NotFound => {
                        // Discard the possibly-copied walk and keep the
                        // shared original.
                        child_map.insert(bkt);
                        children.push(ac.clone());
                    }
                    RemoveOutcome::Removed(_) => {
                        changed = true;
                        child_map.insert(bkt);
                        children.push(pruned);
                    }
                    RemoveOutcome::Collapsed(_, remaining) => {
                        changed = true;
                        item_map.insert(bkt);
                        items.push(remaining);
                    }
                    RemoveOutcome::Emptied(_) => {
                        unreachable!("a child subtree never empties on a single removal")
                    }
                }
            } else {
                child_map.insert(bkt);
                children.push(ac.clone());
            }
        }
    }

    if changed {
        finalize_pruned(item_map, child_map, items, children)
    } else {
        Pruned::Node(a.clone())
    }
}

// ---------------------------------------------------------------------------
// Subset and disjointness
// ---------------------------------------------------------------------------

/// Returns `true` if every key of `a` is present in `b`.
pub(crate) fn subset_nodes<K, V, P>(
    a: &NodeRef<K, V, P>,
    b: &NodeRef<K, V, P>,
    shift: u32,
) -> bool
where
    K: Eq,
    P: SharedPointerKind,
{
    if same_node(a, b) {
        return true;
    }
    if a.size() > b.size() {
        return false;
    }
    let (
        Node::Inner {
            item_map: a_item_map,
            child_map: a_child_map,
            items: a_items,
            children: a_children,
            ..
        },
        Node::Inner {
            item_map: b_item_map,
            child_map: b_child_map,
            items: b_items,
            children: b_children,
            ..
        },
    ) = (&**a, &**b)
    else {
        // At least one side is a collision node; fall back to per-entry
        // lookups (the hash routes them regardless of level).
        return subset_via_lookup(a, b, shift);
    };

    for bkt in (*a_item_map | *a_child_map).buckets() {
        if a_item_map.contains(bkt) {
            let ea = &a_items[a_item_map.rank(bkt)];
            let covered = if b_item_map.contains(bkt) {
                let eb = &b_items[b_item_map.rank(bkt)];
                ea.hash == eb.hash && ea.key == eb.key
            } else if b_child_map.contains(bkt) {
                let bc = &b_children[b_child_map.rank(bkt)];
                get_recursive(bc, ea.hash, &ea.key, shift + BITS_PER_LEVEL).is_some()
            } else {
                false
            };
            if !covered {
                return false;
            }
        } else {
            // A child covers at least two keys; only a child on the
            // other side can contain them all.
            if !b_child_map.contains(bkt) {
                return false;
            }
            let ac = &a_children[a_child_map.rank(bkt)];
            let bc = &b_children[b_child_map.rank(bkt)];
            if !subset_nodes(ac, bc, shift + BITS_PER_LEVEL) {
                return false;
            }
        }
    }
    true
}

fn subset_via_lookup<K, V, P>(a: &NodeRef<K, V, P>, b: &NodeRef<K, V, P>, shift: u32) -> bool
where
    K: Eq,
    P: SharedPointerKind,
{
    match &**a {
        Node::Inner {
            items, children, ..
        } => {
            items
                .iter()
                .all(|e| get_recursive(b, e.hash, &e.key, shift).is_some())
                && children.iter().all(|c| subset_via_lookup(c, b, shift))
        }
        Node::Collision { hash, items } => items
            .iter()
            .all(|e| get_recursive(b, *hash, &e.key, shift).is_some()),
    }
}

/// Returns `true` if the two subtrees share no key.
pub(crate) fn disjoint_nodes<K, V, P>(
    a: &NodeRef<K, V, P>,
    b: &NodeRef<K, V, P>,
    shift: u32,
) -> bool
where
    K: Eq,
    P: SharedPointerKind,
{
    if same_node(a, b) {
        return false;
    }
    match (&**a, &**b) {
        (Node::Collision { hash, items }, _) => items
            .iter()
            .all(|e| get_recursive(b, *hash, &e.key, shift).is_none()),
        (_, Node::Collision { hash, items }) => items
            .iter()
            .all(|e| get_recursive(a, *hash, &e.key, shift).is_none()),
        (
            Node::Inner {
                item_map: a_item_map,
                child_map: a_child_map,
                items: a_items,
                children: a_children,
                ..
            },
            Node::Inner {
                item_map: b_item_map,
                child_map: b_child_map,
                items: b_items,
                children: b_children,
                ..
            },
        ) => {
            let common = (*a_item_map | *a_child_map) & (*b_item_map | *b_child_map);
            for bkt in common.buckets() {
                let overlap = match (a_item_map.contains(bkt), b_item_map.contains(bkt)) {
                    (true, true) => {
                        let ea = &a_items[a_item_map.rank(bkt)];
                        let eb = &b_items[b_item_map.rank(bkt)];
                        ea.hash == eb.hash && ea.key == eb.key
                    }
                    (true, false) => {
                        let ea = &a_items[a_item_map.rank(bkt)];
                        let bc = &b_children[b_child_map.rank(bkt)];
                        get_recursive(bc, ea.hash, &ea.key, shift + BITS_PER_LEVEL).is_some()
                    }
                    (false, true) => {
                        let eb = &b_items[b_item_map.rank(bkt)];
                        let ac = &a_children[a_child_map.rank(bkt)];
                        get_recursive(ac, eb.hash, &eb.key, shift + BITS_PER_LEVEL).is_some()
                    }
                    (false, false) => {
                        let ac = &a_children[a_child_map.rank(bkt)];
                        let bc = &b_children[b_child_map.rank(bkt)];
                        !disjoint_nodes(ac, bc, shift + BITS_PER_LEVEL)
                    }
                };
                if overlap {
                    return false;
                }
            }
            true
        }
    }
}

// ---------------------------------------------------------------------------
// Equality
// ---------------------------------------------------------------------------

/// Structural equality over canonical trees.
///
/// Canonical form guarantees that equal contents produce equal
/// structure, so a slot-by-slot compare suffices; shared handles
/// short-circuit whole subtrees. Only collision nodes need an
/// order-insensitive compare, because their entries keep insertion
/// order.
pub(crate) fn eq_nodes<K, V, P>(a: &NodeRef<K, V, P>, b: &NodeRef<K, V, P>) -> bool
where
    K: Eq,
    V: PartialEq,
    P: SharedPointerKind,
{
    if same_node(a, b) {
        return true;
    }
    match (&**a, &**b) {
        (
            Node::Inner {
                item_map: a_item_map,
                child_map: a_child_map,
                items: a_items,
                children: a_children,
                size: a_size,
            },
            Node::Inner {
                item_map: b_item_map,
                child_map: b_child_map,
                items: b_items,
                children: b_children,
                size: b_size,
            },
        ) => {
            a_item_map == b_item_map
                && a_child_map == b_child_map
                && a_size == b_size
                && a_items
                    .iter()
                    .zip(b_items)
                    .all(|(x, y)| x.hash == y.hash && x.key == y.key && x.value == y.value)
                && a_children.iter().zip(b_children).all(|(x, y)| eq_nodes(x, y))
        }
        (
            Node::Collision {
                hash: a_hash,
                items: a_items,
            },
            Node::Collision {
                hash: b_hash,
                items: b_items,
            },
        ) => {
            a_hash == b_hash
                && a_items.len() == b_items.len()
                && a_items
                    .iter()
                    .all(|x| b_items.iter().any(|y| y.key == x.key && y.value == x.value))
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Result canonicalization
// ---------------------------------------------------------------------------

fn finalize_pruned<K, V, P>(
    item_map: Bitmap,
    child_map: Bitmap,
    mut items: Vec<Entry<K, V>>,
    mut children: Vec<NodeRef<K, V, P>>,
) -> Pruned<K, V, P>
where
    P: SharedPointerKind,
{
    if items.is_empty() && children.is_empty() {
        return Pruned::Empty;
    }
    if items.len() == 1 && children.is_empty() {
        return Pruned::Single(items.pop().expect("one item"));
    }
    if items.is_empty() && children.len() == 1 && children[0].is_collision() {
        return Pruned::Node(children.pop().expect("one child"));
    }
    Pruned::Node(SharedPointer::new(Node::inner(
        item_map, child_map, items, children,
    )))
}

fn prune_collision<K, V, P>(hash: HashValue, mut kept: Vec<Entry<K, V>>) -> Pruned<K, V, P>
where
    P: SharedPointerKind,
{
    match kept.len() {
        0 => Pruned::Empty,
        1 => Pruned::Single(kept.pop().expect("one entry")),
        _ => Pruned::Node(SharedPointer::new(Node::Collision { hash, items: kept })),
    }
}
