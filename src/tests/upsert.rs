//! Defaulted updates: `get_mut_or_insert_with` and `get_mut`.

use super::{CollidingKey, Passthrough};
use crate::{HamtMap, RcK};

#[test]
fn counts_without_double_hashing() {
    let mut map: HamtMap<&str, u32> = HamtMap::new();
    for word in ["a", "b", "a", "c", "a", "b"] {
        *map.get_mut_or_insert_with(word, || 0) += 1;
    }
    assert_eq!(map.get(&"a"), Some(&3));
    assert_eq!(map.get(&"b"), Some(&2));
    assert_eq!(map.get(&"c"), Some(&1));
    map.check_invariants();
}

#[test]
fn default_runs_only_on_insertion() {
    let mut map: HamtMap<&str, i32> = HamtMap::new();
    map.insert_mut("present", 5);

    let mut evaluations = 0;
    let value = map.get_mut_or_insert_with("present", || {
        evaluations += 1;
        0
    });
    assert_eq!(*value, 5);
    assert_eq!(evaluations, 0);

    let value = map.get_mut_or_insert_with("absent", || {
        evaluations += 1;
        42
    });
    assert_eq!(*value, 42);
    assert_eq!(evaluations, 1);
    assert_eq!(map.len(), 2);
}

#[test]
fn upsert_into_empty_map() {
    let mut map: HamtMap<i32, i32> = HamtMap::new();
    *map.get_mut_or_insert_with(1, || 10) += 5;
    assert_eq!(map.get(&1), Some(&15));
    assert_eq!(map.len(), 1);
}

#[test]
fn upsert_through_collisions() {
    let mut map: HamtMap<CollidingKey, u32, RcK, Passthrough> = HamtMap::with_hasher(Passthrough);
    let keys: Vec<CollidingKey> = (0..3).map(|i| CollidingKey::new(i, 0xE0)).collect();

    for _ in 0..2 {
        for key in &keys {
            *map.get_mut_or_insert_with(key.clone(), || 0) += 1;
        }
    }
    assert_eq!(map.len(), 3);
    for key in &keys {
        assert_eq!(map.get(key), Some(&2));
    }
    assert!(map.root().expect("root").is_collision());
    map.check_invariants();
}

#[test]
fn upsert_expands_a_divergent_collision() {
    let mut map: HamtMap<CollidingKey, u32, RcK, Passthrough> = HamtMap::with_hasher(Passthrough);
    map.insert_mut(CollidingKey::new(1, 0b00001), 1);
    map.insert_mut(CollidingKey::new(2, 0b00001), 2);
    assert!(map.root().expect("root").is_collision());

    let lone = CollidingKey::new(3, 0b00010);
    *map.get_mut_or_insert_with(lone.clone(), || 30) += 1;

    assert_eq!(map.len(), 3);
    assert_eq!(map.get(&lone), Some(&31));
    map.check_invariants();
}

#[test]
fn get_mut_rewrites_in_place() {
    let mut map: HamtMap<i32, String> = HamtMap::new();
    map.insert_mut(1, "one".to_string());

    map.get_mut(&1).expect("present").push('!');
    assert_eq!(map.get(&1).map(String::as_str), Some("one!"));
    assert_eq!(map.get_mut(&2), None);
    map.check_invariants();
}

#[test]
fn upsert_on_snapshot_does_not_leak() {
    let mut map: HamtMap<i32, i32> = (0..100).map(|i| (i, 0)).collect();
    let snapshot = map.clone();

    for i in 0..100 {
        *map.get_mut_or_insert_with(i, || 0) += 1;
    }

    assert!(snapshot.values().all(|v| *v == 0));
    assert!(map.values().all(|v| *v == 1));
}
