//! Structural sharing: clones are O(1), mutations copy only their
//! path, and snapshots never observe later changes.

use super::collect_node_ids;
use crate::HamtMap;

#[test]
fn snapshot_survives_insert() {
    let mut map: HamtMap<i32, i32> = (0..100).map(|i| (i, i)).collect();
    let snapshot = map.clone();

    map.insert_mut(1000, 1000);
    map.insert_mut(50, -50);

    assert_eq!(snapshot.len(), 100);
    assert_eq!(snapshot.get(&1000), None);
    assert_eq!(snapshot.get(&50), Some(&50));
    assert_eq!(map.get(&50), Some(&-50));
    snapshot.check_invariants();
    map.check_invariants();
}

#[test]
fn snapshot_survives_remove() {
    let mut map: HamtMap<i32, i32> = (0..100).map(|i| (i, i)).collect();
    let snapshot = map.clone();

    for i in 0..50 {
        map.remove_mut(&i);
    }

    assert_eq!(map.len(), 50);
    assert_eq!(snapshot.len(), 100);
    for i in 0..100 {
        assert_eq!(snapshot.get(&i), Some(&i));
    }
}

#[test]
fn snapshot_survives_get_mut() {
    let mut map: HamtMap<&str, i32> = HamtMap::new();
    map.insert_mut("k", 1);
    let snapshot = map.clone();

    *map.get_mut(&"k").expect("present") = 99;

    assert_eq!(map.get(&"k"), Some(&99));
    assert_eq!(snapshot.get(&"k"), Some(&1));
}

#[test]
fn clone_shares_the_root() {
    let map: HamtMap<i32, i32> = (0..100).map(|i| (i, i)).collect();
    let clone = map.clone();
    let (a, b) = (map.root().expect("root"), clone.root().expect("root"));
    assert!(crate::node::same_node(a, b));
}

/// A single insertion into a 1000-entry tree creates at most one node
/// per level: the two trees differ in ≤ 14 nodes.
#[test]
fn single_insert_copies_at_most_one_path() {
    let base: HamtMap<u64, u64> = (0..1000).map(|i| (i, i)).collect();
    let grown = base.insert(123_456_789, 1);

    let mut base_ids = Vec::new();
    collect_node_ids(base.root(), &mut base_ids);
    let mut grown_ids = Vec::new();
    collect_node_ids(grown.root(), &mut grown_ids);

    let base_set: std::collections::HashSet<usize> = base_ids.into_iter().collect();
    let fresh = grown_ids
        .iter()
        .filter(|id| !base_set.contains(id))
        .count();
    assert!(fresh <= 14, "insert copied {fresh} nodes");
}

/// Removal likewise touches only its path.
#[test]
fn single_remove_copies_at_most_one_path() {
    let base: HamtMap<u64, u64> = (0..1000).map(|i| (i, i)).collect();
    let shrunk = base.remove(&500);
    assert_eq!(shrunk.len(), 999);

    let mut base_ids = Vec::new();
    collect_node_ids(base.root(), &mut base_ids);
    let base_set: std::collections::HashSet<usize> = base_ids.into_iter().collect();

    let mut shrunk_ids = Vec::new();
    collect_node_ids(shrunk.root(), &mut shrunk_ids);
    let fresh = shrunk_ids
        .iter()
        .filter(|id| !base_set.contains(id))
        .count();
    assert!(fresh <= 14, "remove copied {fresh} nodes");
}

/// Removing a missing key returns a tree sharing everything.
#[test]
fn failed_remove_shares_everything() {
    let base: HamtMap<i32, i32> = (0..100).map(|i| (i, i)).collect();
    let same = base.remove(&1000);
    let (a, b) = (base.root().expect("root"), same.root().expect("root"));
    assert!(crate::node::same_node(a, b));
    assert_eq!(base, same);
}

/// Many snapshots of a growing map all stay intact.
#[test]
fn snapshot_chain() {
    let mut map: HamtMap<u32, u32> = HamtMap::new();
    let mut snapshots = Vec::new();
    for i in 0..200 {
        snapshots.push(map.clone());
        map.insert_mut(i, i);
    }
    for (i, snapshot) in snapshots.iter().enumerate() {
        assert_eq!(snapshot.len(), i);
        if i > 0 {
            assert_eq!(snapshot.get(&(i as u32 - 1)), Some(&(i as u32 - 1)));
        }
        assert_eq!(snapshot.get(&(i as u32)), None);
    }
}
