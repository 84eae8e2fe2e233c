//! Set algebra, merge, and the identity fast paths.

use std::collections::HashSet;

use super::{CollidingKey, Passthrough};
use crate::node::same_node;
use crate::{HamtMap, HamtSet, RcK};

fn set_of(range: impl IntoIterator<Item = i32>) -> HamtSet<i32> {
    range.into_iter().collect()
}

fn std_set(set: &HamtSet<i32>) -> HashSet<i32> {
    set.iter().copied().collect()
}

#[test]
fn union_contains_both_sides() {
    let a = set_of(0..60);
    let b = set_of(40..100);
    let union = a.union(&b);

    assert_eq!(union.len(), 100);
    for i in 0..100 {
        assert!(union.contains(&i));
    }
    assert!(a.is_subset(&union));
    assert!(b.is_subset(&union));
    union.as_map().check_invariants();
}

#[test]
fn intersection_is_contained_in_both() {
    let a = set_of(0..60);
    let b = set_of(40..100);
    let both = a.intersection(&b);

    assert_eq!(std_set(&both), (40..60).collect::<HashSet<i32>>());
    assert!(both.is_subset(&a));
    assert!(both.is_subset(&b));
    both.as_map().check_invariants();
}

#[test]
fn difference_removes_the_other_side() {
    let a = set_of(0..60);
    let b = set_of(40..100);

    assert_eq!(std_set(&a.difference(&b)), (0..40).collect::<HashSet<i32>>());
    assert_eq!(std_set(&b.difference(&a)), (60..100).collect::<HashSet<i32>>());
    a.difference(&b).as_map().check_invariants();
}

#[test]
fn symmetric_difference_is_union_minus_intersection() {
    let a = set_of(0..60);
    let b = set_of(40..100);

    let direct = a.symmetric_difference(&b);
    let via_identity = a.union(&b).difference(&a.intersection(&b));
    assert_eq!(direct, via_identity);

    let mut expected: HashSet<i32> = (0..40).collect();
    expected.extend(60..100);
    assert_eq!(std_set(&direct), expected);
}

#[test]
fn algebra_against_std_model() {
    let a = set_of((0..200).filter(|i| i % 3 == 0));
    let b = set_of((0..200).filter(|i| i % 5 == 0));
    let (sa, sb) = (std_set(&a), std_set(&b));

    assert_eq!(std_set(&a.union(&b)), sa.union(&sb).copied().collect::<HashSet<i32>>());
    assert_eq!(
        std_set(&a.intersection(&b)),
        sa.intersection(&sb).copied().collect::<HashSet<i32>>()
    );
    assert_eq!(
        std_set(&a.difference(&b)),
        sa.difference(&sb).copied().collect::<HashSet<i32>>()
    );
    assert_eq!(
        std_set(&a.symmetric_difference(&b)),
        sa.symmetric_difference(&sb).copied().collect::<HashSet<i32>>()
    );
    assert_eq!(a.is_disjoint(&b), sa.is_disjoint(&sb));
}

/// Identical roots short-circuit every operation.
#[test]
fn identity_fast_paths() {
    let a = set_of(0..100);
    let same = a.clone();

    let union = a.union(&same);
    assert!(same_node(
        union.as_map().root().expect("root"),
        a.as_map().root().expect("root"),
    ));

    let intersection = a.intersection(&same);
    assert!(same_node(
        intersection.as_map().root().expect("root"),
        a.as_map().root().expect("root"),
    ));

    assert!(a.difference(&same).is_empty());
    assert!(a.symmetric_difference(&same).is_empty());
    assert!(a.is_subset(&same));
    assert!(!a.is_disjoint(&same));
    assert_eq!(a, same);
}

/// A difference that removes nothing returns the left tree by
/// reference.
#[test]
fn unchanged_difference_shares_the_left_tree() {
    let a = set_of(0..100);
    let b = set_of(1000..1100);
    let diff = a.difference(&b);
    assert!(same_node(
        diff.as_map().root().expect("root"),
        a.as_map().root().expect("root"),
    ));
}

#[test]
fn subset_and_superset() {
    let small = set_of(10..20);
    let big = set_of(0..50);
    let other = set_of(45..55);

    assert!(small.is_subset(&big));
    assert!(big.is_superset(&small));
    assert!(!big.is_subset(&small));
    assert!(!other.is_subset(&big));
    assert!(set_of(0..0).is_subset(&small));
    assert!(small.is_subset(&small.clone()));
}

#[test]
fn disjointness() {
    let a = set_of(0..10);
    let b = set_of(10..20);
    let c = set_of(5..15);

    assert!(a.is_disjoint(&b));
    assert!(!a.is_disjoint(&c));
    assert!(a.is_disjoint(&set_of(0..0)));
}

/// Merge resolves each duplicate key exactly once, in left-right
/// order.
#[test]
fn merge_combines_duplicates_once() {
    let a: HamtMap<i32, i32> = (0..60).map(|i| (i, 1)).collect();
    let b: HamtMap<i32, i32> = (40..100).map(|i| (i, 2)).collect();

    let mut calls = 0;
    let merged = a.merge(&b, |_key, left, right| {
        calls += 1;
        left + right
    });

    assert_eq!(calls, 20);
    assert_eq!(merged.len(), 100);
    assert_eq!(merged.get(&10), Some(&1));
    assert_eq!(merged.get(&50), Some(&3));
    assert_eq!(merged.get(&90), Some(&2));
    merged.check_invariants();
}

#[test]
fn merge_with_empty_sides() {
    let a: HamtMap<i32, i32> = (0..10).map(|i| (i, i)).collect();
    let empty: HamtMap<i32, i32> = HamtMap::new();

    assert_eq!(a.merge(&empty, |_, l, _| *l), a);
    assert_eq!(empty.merge(&a, |_, l, _| *l), a);
    assert!(empty.merge(&empty, |_, l, _| *l).is_empty());
}

/// Algebra over colliding elements goes through the collision-node
/// paths.
#[test]
fn algebra_with_collisions() {
    type CSet = HamtSet<CollidingKey, RcK, Passthrough>;

    let colliding: Vec<CollidingKey> = (0..6).map(|i| CollidingKey::new(i, 0x77)).collect();
    let a: CSet = colliding[..4].iter().cloned().collect();
    let b: CSet = colliding[2..].iter().cloned().collect();

    let union = a.union(&b);
    assert_eq!(union.len(), 6);
    union.as_map().check_invariants();

    let both = a.intersection(&b);
    assert_eq!(both.len(), 2);
    assert!(both.contains(&colliding[2]) && both.contains(&colliding[3]));

    let only_a = a.difference(&b);
    assert_eq!(only_a.len(), 2);
    assert!(only_a.contains(&colliding[0]) && only_a.contains(&colliding[1]));

    assert!(!a.is_disjoint(&b));
    assert!(only_a.is_disjoint(&b));
    assert!(both.is_subset(&a) && both.is_subset(&b));
}

/// Mixed case: one side holds a collision node where the other holds
/// plain items.
#[test]
fn algebra_with_mixed_collision_and_items() {
    type CSet = HamtSet<CollidingKey, RcK, Passthrough>;

    let c1 = CollidingKey::new(1, 0b00001);
    let c2 = CollidingKey::new(2, 0b00001);
    let lone = CollidingKey::new(3, 0b00010);

    let collisions: CSet = [c1.clone(), c2.clone()].into_iter().collect();
    let plain: CSet = [c1.clone(), lone.clone()].into_iter().collect();

    let union = collisions.union(&plain);
    assert_eq!(union.len(), 3);
    union.as_map().check_invariants();

    let both = collisions.intersection(&plain);
    assert_eq!(both.len(), 1);
    assert!(both.contains(&c1));

    let diff = collisions.difference(&plain);
    assert_eq!(diff.len(), 1);
    assert!(diff.contains(&c2));
    diff.as_map().check_invariants();
}

#[test]
fn set_equality_is_order_independent() {
    let forward: HamtSet<i32> = (0..100).collect();
    let backward: HamtSet<i32> = (0..100).rev().collect();
    assert_eq!(forward, backward);
}
