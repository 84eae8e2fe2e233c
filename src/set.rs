//! Persistent hash set facade.
//!
//! The set is the map with unit values; every trie mechanism (lookup,
//! canonical mutation, sharing, node-pair algebra) is shared with
//! [`HamtMap`].

use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};

use archery::{ArcK, RcK, SharedPointer, SharedPointerKind};

use crate::hash::DefaultHashBuilder;
use crate::iter::Keys;
use crate::map::HamtMap;
use crate::node::{Node, NodeRef};
use crate::ops::algebra::{
    Pruned, difference_nodes, disjoint_nodes, intersect_nodes, subset_nodes, union_nodes,
};

/// Persistent hash set backed by a canonical-form HAMT.
///
/// # Example
///
/// ```
/// use hamt_map::HamtSet;
///
/// let a: HamtSet<i32> = (1..=4).collect();
/// let b: HamtSet<i32> = (3..=6).collect();
///
/// let both = a.intersection(&b);
/// assert_eq!(both.len(), 2);
/// assert!(both.contains(&3) && both.contains(&4));
/// ```
pub struct HamtSet<T, P = RcK, H = DefaultHashBuilder>
where
    P: SharedPointerKind,
    H: BuildHasher,
{
    map: HamtMap<T, (), P, H>,
}

/// [`HamtSet`] whose nodes use atomic reference counts, so snapshots
/// can cross threads.
pub type HamtSetSync<T, H = DefaultHashBuilder> = HamtSet<T, ArcK, H>;

// ---------------------------------------------------------------------------
// Construction and accessors
// ---------------------------------------------------------------------------

impl<T> HamtSet<T> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder)
    }
}

impl<T> HamtSetSync<T> {
    /// Creates an empty set whose nodes use atomic reference counts.
    #[must_use]
    pub fn new_sync() -> Self {
        Self::with_hasher(DefaultHashBuilder)
    }
}

impl<T, P, H> HamtSet<T, P, H>
where
    P: SharedPointerKind,
    H: BuildHasher,
{
    /// Creates an empty set with the given hash builder.
    #[must_use]
    pub fn with_hasher(hasher_builder: H) -> Self {
        Self {
            map: HamtMap::with_hasher(hasher_builder),
        }
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the set contains no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns an iterator over the elements in an unspecified but
    /// deterministic-per-tree order.
    #[must_use]
    pub fn iter(&self) -> Keys<'_, T, (), P> {
        self.map.keys()
    }

    #[cfg(test)]
    pub(crate) fn as_map(&self) -> &HamtMap<T, (), P, H> {
        &self.map
    }

    fn from_root(&self, root: Option<NodeRef<T, (), P>>) -> Self
    where
        H: Clone,
    {
        Self {
            map: HamtMap::from_parts(root, self.map.hasher_builder().clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Read operations
// ---------------------------------------------------------------------------

impl<T, P, H> HamtSet<T, P, H>
where
    T: Hash + Eq,
    P: SharedPointerKind,
    H: BuildHasher,
{
    /// Returns `true` if the set contains `value`.
    #[must_use]
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.map.contains_key(value)
    }

    /// Returns the stored element equal to `value`.
    #[must_use]
    pub fn get<Q>(&self, value: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.map.get_key_value(value).map(|(element, _)| element)
    }

    /// Returns `true` if every element of `self` is in `other`.
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        match (self.map.root(), other.map.root()) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(a), Some(b)) => subset_nodes(a, b, 0),
        }
    }

    /// Returns `true` if every element of `other` is in `self`.
    #[must_use]
    pub fn is_superset(&self, other: &Self) -> bool {
        other.is_subset(self)
    }

    /// Returns `true` if the sets share no element.
    #[must_use]
    pub fn is_disjoint(&self, other: &Self) -> bool {
        match (self.map.root(), other.map.root()) {
            (Some(a), Some(b)) => disjoint_nodes(a, b, 0),
            _ => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Write operations
// ---------------------------------------------------------------------------

impl<T, P, H> HamtSet<T, P, H>
where
    T: Hash + Eq + Clone,
    P: SharedPointerKind,
    H: BuildHasher,
{
    /// Adds `value` in place. Returns `true` if it was not yet
    /// present.
    pub fn insert_mut(&mut self, value: T) -> bool {
        self.map.insert_mut(value, ()).is_none()
    }

    /// Removes `value` in place. Returns `true` if it was present.
    pub fn remove_mut<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.map.remove_mut(value).is_some()
    }

    /// Returns a new set with `value` added; `self` is untouched.
    #[must_use]
    pub fn insert(&self, value: T) -> Self
    where
        H: Clone,
    {
        Self {
            map: self.map.insert(value, ()),
        }
    }

    /// Returns a new set without `value`; `self` is untouched.
    #[must_use]
    pub fn remove<Q>(&self, value: &Q) -> Self
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        H: Clone,
    {
        Self {
            map: self.map.remove(value),
        }
    }

    /// Returns the union of the two sets, keeping `self`'s elements
    /// for duplicates and sharing single-sided subtrees.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self
    where
        H: Clone,
    {
        let root = match (self.map.root(), other.map.root()) {
            (None, None) => None,
            (Some(node), None) | (None, Some(node)) => Some(node.clone()),
            (Some(a), Some(b)) => Some(union_nodes(a, b, 0, &mut |_key, _left, _right| ())),
        };
        self.from_root(root)
    }

    /// Returns the elements present in both sets.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self
    where
        H: Clone,
    {
        let root = match (self.map.root(), other.map.root()) {
            (Some(a), Some(b)) => pruned_root(intersect_nodes(a, b, 0)),
            _ => None,
        };
        self.from_root(root)
    }

    /// Returns the elements of `self` that are not in `other`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self
    where
        H: Clone,
    {
        let root = match (self.map.root(), other.map.root()) {
            (Some(a), Some(b)) => pruned_root(difference_nodes(a, b, 0)),
            (Some(node), None) => Some(node.clone()),
            (None, _) => None,
        };
        self.from_root(root)
    }

    /// Returns the elements present in exactly one of the sets.
    ///
    /// Equals the union minus the intersection.
    #[must_use]
    pub fn symmetric_difference(&self, other: &Self) -> Self
    where
        H: Clone,
    {
        self.difference(other).union(&other.difference(self))
    }
}

/// Rebuilds a tree root from a shrinking operation's outcome.
fn pruned_root<K, V, P>(pruned: Pruned<K, V, P>) -> Option<NodeRef<K, V, P>>
where
    P: SharedPointerKind,
{
    match pruned {
        Pruned::Empty => None,
        Pruned::Single(entry) => Some(SharedPointer::new(Node::with_single_item(entry))),
        Pruned::Node(node) => Some(node),
    }
}

// ---------------------------------------------------------------------------
// Trait impls
// ---------------------------------------------------------------------------

impl<T, P, H> Clone for HamtSet<T, P, H>
where
    P: SharedPointerKind,
    H: BuildHasher + Clone,
{
    fn clone(&self) -> Self {
        Self {
            map: self.map.clone(),
        }
    }
}

impl<T, P, H> Default for HamtSet<T, P, H>
where
    P: SharedPointerKind,
    H: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(H::default())
    }
}

impl<T, P, H> fmt::Debug for HamtSet<T, P, H>
where
    T: fmt::Debug,
    P: SharedPointerKind,
    H: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, P, H> PartialEq for HamtSet<T, P, H>
where
    T: Eq,
    P: SharedPointerKind,
    H: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.map == other.map
    }
}

impl<T, P, H> Eq for HamtSet<T, P, H>
where
    T: Eq,
    P: SharedPointerKind,
    H: BuildHasher,
{
}

impl<T, P, H> Extend<T> for HamtSet<T, P, H>
where
    T: Hash + Eq + Clone,
    P: SharedPointerKind,
    H: BuildHasher,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert_mut(value);
        }
    }
}

impl<T, P, H> FromIterator<T> for HamtSet<T, P, H>
where
    T: Hash + Eq + Clone,
    P: SharedPointerKind,
    H: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::with_hasher(H::default());
        set.extend(iter);
        set
    }
}

impl<'a, T, P, H> IntoIterator for &'a HamtSet<T, P, H>
where
    P: SharedPointerKind,
    H: BuildHasher,
{
    type Item = &'a T;
    type IntoIter = Keys<'a, T, (), P>;

    fn into_iter(self) -> Keys<'a, T, (), P> {
        self.iter()
    }
}
