//! Collision-node behavior: keys whose 64-bit hashes fully agree.

use super::{CollidingKey, Passthrough};
use crate::{HamtMap, RcK};

type CollisionMap<V> = HamtMap<CollidingKey, V, RcK, Passthrough>;

/// Two keys with the same hash create a collision node.
#[test]
fn two_colliding_keys() {
    let k1 = CollidingKey::new(1, 0xDEAD_BEEF);
    let k2 = CollidingKey::new(2, 0xDEAD_BEEF);

    let mut map: CollisionMap<&str> = HamtMap::with_hasher(Passthrough);
    map.insert_mut(k1.clone(), "first");
    map.insert_mut(k2.clone(), "second");
    map.check_invariants();

    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&k1), Some(&"first"));
    assert_eq!(map.get(&k2), Some(&"second"));
}

/// With every hash equal, the root itself is the collision node.
#[test]
fn full_collision_root() {
    let keys: Vec<CollidingKey> = (0..3).map(|i| CollidingKey::new(i, 0xCAFE)).collect();

    let mut map: CollisionMap<usize> = HamtMap::with_hasher(Passthrough);
    for (i, key) in keys.iter().enumerate() {
        map.insert_mut(key.clone(), i);
    }
    map.check_invariants();

    let root = map.root().expect("root");
    assert!(root.is_collision());
    assert_eq!(root.item_count(), 3);
    for (i, key) in keys.iter().enumerate() {
        assert_eq!(map.get(key), Some(&i));
    }
}

/// Overwriting inside a collision node replaces the value in place.
#[test]
fn overwrite_in_collision() {
    let k1 = CollidingKey::new(1, 0xBBBB);
    let k2 = CollidingKey::new(2, 0xBBBB);

    let mut map: CollisionMap<i32> = HamtMap::with_hasher(Passthrough);
    map.insert_mut(k1.clone(), 10);
    map.insert_mut(k2.clone(), 20);
    assert_eq!(map.insert_mut(k1.clone(), 11), Some(10));
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&k1), Some(&11));
}

/// Removing from a collision node keeps the others intact.
#[test]
fn remove_from_collision() {
    let keys: Vec<CollidingKey> = (0..5).map(|i| CollidingKey::new(i, 0xAAAA)).collect();

    let mut map: CollisionMap<u32> = HamtMap::with_hasher(Passthrough);
    for (i, key) in keys.iter().enumerate() {
        map.insert_mut(key.clone(), i as u32 * 10);
    }

    assert_eq!(map.remove_mut(&keys[2]), Some(20));
    map.check_invariants();
    assert_eq!(map.len(), 4);
    assert_eq!(map.get(&keys[2]), None);
    assert_eq!(map.get(&keys[4]), Some(&40));
}

/// A collision node reduced to one entry dissolves into a plain item.
#[test]
fn collision_collapses_to_item() {
    let k1 = CollidingKey::new(1, 0x1234);
    let k2 = CollidingKey::new(2, 0x1234);

    let mut map: CollisionMap<&str> = HamtMap::with_hasher(Passthrough);
    map.insert_mut(k1.clone(), "one");
    map.insert_mut(k2.clone(), "two");
    assert!(map.root().expect("root").is_collision());

    assert_eq!(map.remove_mut(&k1), Some("one"));
    map.check_invariants();

    let root = map.root().expect("root");
    assert!(!root.is_collision());
    assert_eq!((root.item_count(), root.child_count()), (1, 0));
    assert_eq!(map.get(&k2), Some(&"two"));
}

/// A key whose hash diverges from the collision hash expands the
/// collision node under a fresh normal node.
#[test]
fn divergent_key_expands_collision() {
    // Collision hash has bucket 1 at level 0; the new key bucket 2.
    let c1 = CollidingKey::new(1, 0b00001);
    let c2 = CollidingKey::new(2, 0b00001);
    let lone = CollidingKey::new(3, 0b00010);

    let mut map: CollisionMap<u32> = HamtMap::with_hasher(Passthrough);
    map.insert_mut(c1.clone(), 1);
    map.insert_mut(c2.clone(), 2);
    assert!(map.root().expect("root").is_collision());

    map.insert_mut(lone.clone(), 3);
    map.check_invariants();

    let root = map.root().expect("root");
    assert!(!root.is_collision());
    assert_eq!((root.item_count(), root.child_count()), (1, 1));
    assert_eq!(map.get(&c1), Some(&1));
    assert_eq!(map.get(&c2), Some(&2));
    assert_eq!(map.get(&lone), Some(&3));
}

/// Expansion descends while the hashes still agree bucket by bucket.
#[test]
fn expansion_builds_chain_on_shared_prefix() {
    // Shared bucket 1 at level 0, divergence at level 1.
    let c1 = CollidingKey::new(1, (1 << 5) | 1);
    let c2 = CollidingKey::new(2, (1 << 5) | 1);
    let lone = CollidingKey::new(3, (2 << 5) | 1);

    let mut map: CollisionMap<u32> = HamtMap::with_hasher(Passthrough);
    map.insert_mut(c1.clone(), 1);
    map.insert_mut(c2.clone(), 2);
    map.insert_mut(lone.clone(), 3);
    map.check_invariants();

    let root = map.root().expect("root");
    assert_eq!((root.item_count(), root.child_count()), (0, 1));
    assert_eq!(map.len(), 3);
    assert_eq!(map.get(&lone), Some(&3));
}

/// Removing the last normal item hoists a lone collision child back
/// to the root.
#[test]
fn lone_collision_child_is_hoisted() {
    let c1 = CollidingKey::new(1, 0b00001);
    let c2 = CollidingKey::new(2, 0b00001);
    let lone = CollidingKey::new(3, 0b00010);

    let mut map: CollisionMap<u32> = HamtMap::with_hasher(Passthrough);
    map.insert_mut(c1.clone(), 1);
    map.insert_mut(c2.clone(), 2);
    map.insert_mut(lone.clone(), 3);

    assert_eq!(map.remove_mut(&lone), Some(3));
    map.check_invariants();

    let root = map.root().expect("root");
    assert!(root.is_collision());
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&c1), Some(&1));
}

/// A collision node buried under chain links: removing the plain
/// sibling must hoist the collision upward level by level, not leave
/// an ancestor holding nothing but the collision child.
#[test]
fn buried_collision_hoists_through_chain() {
    // All three share buckets 2 and 3; the decoy parts ways at the
    // third level, the other two collide fully.
    let decoy = CollidingKey::new(1, 2 | (3 << 5) | (5 << 10));
    let c1 = CollidingKey::new(2, 2 | (3 << 5) | (6 << 10));
    let c2 = CollidingKey::new(3, 2 | (3 << 5) | (6 << 10));

    let mut map: CollisionMap<u32> = HamtMap::with_hasher(Passthrough);
    map.insert_mut(decoy.clone(), 1);
    map.insert_mut(c1.clone(), 2);
    map.insert_mut(c2.clone(), 3);
    map.check_invariants();

    assert_eq!(map.remove_mut(&decoy), Some(1));
    map.check_invariants();

    let root = map.root().expect("root");
    assert!(root.is_collision());
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&c1), Some(&2));
    assert_eq!(map.get(&c2), Some(&3));
}

/// The cascade stops at the first ancestor that still holds payload of
/// its own.
#[test]
fn hoist_stops_at_an_occupied_ancestor() {
    let keeper = CollidingKey::new(0, 1);
    let decoy = CollidingKey::new(1, 2 | (3 << 5) | (5 << 10));
    let c1 = CollidingKey::new(2, 2 | (3 << 5) | (6 << 10));
    let c2 = CollidingKey::new(3, 2 | (3 << 5) | (6 << 10));

    let mut map: CollisionMap<u32> = HamtMap::with_hasher(Passthrough);
    map.insert_mut(keeper.clone(), 0);
    map.insert_mut(decoy.clone(), 1);
    map.insert_mut(c1.clone(), 2);
    map.insert_mut(c2.clone(), 3);

    assert_eq!(map.remove_mut(&decoy), Some(1));
    map.check_invariants();

    let root = map.root().expect("root");
    assert!(!root.is_collision());
    assert_eq!((root.item_count(), root.child_count()), (1, 1));
    assert_eq!(map.get(&keeper), Some(&0));
    assert_eq!(map.get(&c1), Some(&2));
    assert_eq!(map.get(&c2), Some(&3));
}

/// Adversarial input: every hash equal. Inserting n keys stays linear
/// and produces a single collision node holding all of them.
#[test]
fn adversarial_collisions_stay_linear() {
    let n = 200;
    let mut map: CollisionMap<u32> = HamtMap::with_hasher(Passthrough);
    for i in 0..n {
        map.insert_mut(CollidingKey::new(i, 0x5EED), i);
    }
    map.check_invariants();

    let root = map.root().expect("root");
    assert!(root.is_collision());
    assert_eq!(root.item_count(), n as usize);
    assert_eq!(map.len(), n as usize);

    for i in 0..n {
        assert_eq!(map.remove_mut(&CollidingKey::new(i, 0x5EED)), Some(i));
    }
    assert!(map.is_empty());
}

/// Collisions also behave with the default hasher, which maps equal
/// forced hashes to equal real hashes.
#[test]
fn collisions_under_default_hasher() {
    let k1 = CollidingKey::new(1, 77);
    let k2 = CollidingKey::new(2, 77);

    let mut map = HamtMap::new();
    map.insert_mut(k1.clone(), "a");
    map.insert_mut(k2.clone(), "b");
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&k1), Some(&"a"));
    assert_eq!(map.get(&k2), Some(&"b"));
    map.check_invariants();
}
