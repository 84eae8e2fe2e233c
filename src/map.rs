//! Persistent hash map facade.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::ops;

use archery::{ArcK, RcK, SharedPointer, SharedPointerKind};

use crate::cursor::{self, Cursor};
use crate::hash::{DefaultHashBuilder, HashValue, hash_one};
use crate::iter::{Iter, Keys, Values};
use crate::node::{Entry, Node, NodeRef, hoist_lone_collision};
use crate::ops::algebra::{eq_nodes, union_nodes};
use crate::ops::get::get_recursive;
use crate::ops::insert::insert_recursive;
use crate::ops::remove::{RemoveOutcome, remove_recursive};
use crate::ops::update::{get_mut_recursive, prepare_upsert_recursive};

/// Persistent hash map backed by a canonical-form HAMT.
///
/// `clone` is O(1) and shares the whole tree; a mutation copies only
/// the nodes on its path, so clones stay logically independent at
/// O(log₃₂ n) cost per update. The same set of entries always produces
/// the same trie structure, which makes equality a structural walk
/// with a pointer-identity fast path.
///
/// Mutating methods come in pairs: `insert`/`remove` return a new map
/// and leave `self` untouched, while `insert_mut`/`remove_mut` update
/// in place (copying shared nodes as needed) and return the displaced
/// value.
///
/// # Example
///
/// ```
/// use hamt_map::HamtMap;
///
/// let a: HamtMap<&str, i32> = HamtMap::new().insert("one", 1).insert("two", 2);
/// let b = a.insert("three", 3);
///
/// assert_eq!(a.len(), 2);
/// assert_eq!(b.len(), 3);
/// assert_eq!(b.get(&"one"), Some(&1));
/// ```
pub struct HamtMap<K, V, P = RcK, H = DefaultHashBuilder>
where
    P: SharedPointerKind,
    H: BuildHasher,
{
    root: Option<NodeRef<K, V, P>>,
    size: usize,
    hasher_builder: H,
}

/// [`HamtMap`] whose nodes use atomic reference counts, so snapshots
/// can cross threads.
pub type HamtMapSync<K, V, H = DefaultHashBuilder> = HamtMap<K, V, ArcK, H>;

// ---------------------------------------------------------------------------
// Construction and accessors
// ---------------------------------------------------------------------------

impl<K, V> HamtMap<K, V> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder)
    }
}

impl<K, V> HamtMapSync<K, V> {
    /// Creates an empty map whose nodes use atomic reference counts.
    #[must_use]
    pub fn new_sync() -> Self {
        Self::with_hasher(DefaultHashBuilder)
    }
}

impl<K, V, P, H> HamtMap<K, V, P, H>
where
    P: SharedPointerKind,
    H: BuildHasher,
{
    /// Creates an empty map with the given hash builder.
    ///
    /// Structural operations between two maps (equality, `merge`, the
    /// set algebra) require their builders to assign every key the
    /// same hash; [`DefaultHashBuilder`] guarantees that process-wide.
    #[must_use]
    pub fn with_hasher(hasher_builder: H) -> Self {
        Self {
            root: None,
            size: 0,
            hasher_builder,
        }
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if the map contains no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns an iterator over `(&K, &V)` pairs in an unspecified but
    /// deterministic-per-tree order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V, P> {
        Iter::new(self.root.as_ref(), self.size)
    }

    /// Returns an iterator over the keys.
    #[must_use]
    pub fn keys(&self) -> Keys<'_, K, V, P> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over the values.
    #[must_use]
    pub fn values(&self) -> Values<'_, K, V, P> {
        self.iter().map(|(_, value)| value)
    }

    pub(crate) fn root(&self) -> Option<&NodeRef<K, V, P>> {
        self.root.as_ref()
    }

    pub(crate) fn hasher_builder(&self) -> &H {
        &self.hasher_builder
    }

    /// Assembles a map around an already-canonical root, restoring the
    /// one repair a set-algebra result may still need at the top.
    pub(crate) fn from_parts(mut root: Option<NodeRef<K, V, P>>, hasher_builder: H) -> Self {
        if let Some(node) = root.as_mut() {
            hoist_lone_collision(node);
        }
        let size = root.as_ref().map_or(0, |node| node.size());
        Self {
            root,
            size,
            hasher_builder,
        }
    }

    fn hash_key<Q>(&self, key: &Q) -> HashValue
    where
        Q: ?Sized + Hash,
    {
        hash_one(key, &self.hasher_builder)
    }

    fn after_mutation(&self)
    where
        K: Eq,
    {
        #[cfg(feature = "internal-checks")]
        self.check_invariants();
    }

    /// Re-verifies every structural invariant of the tree.
    #[cfg(any(test, feature = "internal-checks"))]
    pub(crate) fn check_invariants(&self)
    where
        K: Eq,
    {
        match &self.root {
            Some(root) => {
                root.check_invariants(0, true);
                assert_eq!(self.size, root.size(), "map length must match the root");
            }
            None => assert_eq!(self.size, 0, "an empty map has length zero"),
        }
    }
}

// ---------------------------------------------------------------------------
// Read operations
// ---------------------------------------------------------------------------

impl<K, V, P, H> HamtMap<K, V, P, H>
where
    K: Hash + Eq,
    P: SharedPointerKind,
    H: BuildHasher,
{
    /// Returns a reference to the value associated with `key`.
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_key_value(key).map(|(_, value)| value)
    }

    /// Returns the stored key and value for `key`.
    #[must_use]
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let root = self.root.as_ref()?;
        let hash = self.hash_key(key);
        get_recursive(root, hash, key, 0).map(|entry| (&entry.key, &entry.value))
    }

    /// Returns `true` if the map contains `key`.
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_key_value(key).is_some()
    }

    /// Returns a cursor to the item for `key`, valid until the next
    /// mutation of this map.
    #[must_use]
    pub fn find<Q>(&self, key: &Q) -> Option<Cursor>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let root = self.root.as_ref()?;
        let hash = self.hash_key(key);
        cursor::locate(root, hash, key, self.size)
    }

    /// Returns the item a cursor points at.
    ///
    /// # Panics
    ///
    /// Panics if the cursor was derived from a different map value or
    /// the map has been mutated since.
    #[must_use]
    pub fn entry_at(&self, cursor: &Cursor) -> (&K, &V) {
        self.root
            .as_ref()
            .and_then(|root| cursor::resolve(root, cursor, self.size))
            .expect("cursor used after mutation of its map")
    }
}

// ---------------------------------------------------------------------------
// Write operations
// ---------------------------------------------------------------------------

impl<K, V, P, H> HamtMap<K, V, P, H>
where
    K: Hash + Eq + Clone,
    V: Clone,
    P: SharedPointerKind,
    H: BuildHasher,
{
    /// Inserts a key-value pair in place.
    ///
    /// Returns the previous value if the key was already present.
    pub fn insert_mut(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.hash_key(&key);
        let entry = Entry { hash, key, value };
        let old = match self.root.as_mut() {
            Some(root) => insert_recursive(root, entry, 0),
            None => {
                self.root = Some(SharedPointer::new(Node::with_single_item(entry)));
                None
            }
        };
        if old.is_none() {
            self.size += 1;
            // Spawning a collision subtree under a one-item root can
            // leave the root atrophied; restore the canonical form.
            if let Some(root) = self.root.as_mut() {
                hoist_lone_collision(root);
            }
        }
        self.after_mutation();
        old
    }

    /// Removes `key` in place. Removing a missing key is a no-op.
    ///
    /// Returns the removed value if the key was present.
    pub fn remove_mut<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.hash_key(key);
        let outcome = {
            let root = self.root.as_mut()?;
            remove_recursive(root, hash, key, 0)
        };
        let removed = match outcome {
            RemoveOutcome::NotFound => return None,
            RemoveOutcome::Removed(value) => {
                // A root left holding only a collision child becomes
                // that collision node, as on the insert path.
                if let Some(root) = self.root.as_mut() {
                    hoist_lone_collision(root);
                }
                value
            }
            RemoveOutcome::Collapsed(value, entry) => {
                self.root = Some(SharedPointer::new(Node::with_single_item(entry)));
                value
            }
            RemoveOutcome::Emptied(value) => {
                self.root = None;
                value
            }
        };
        self.size -= 1;
        self.after_mutation();
        Some(removed)
    }

    /// Returns a new map with the pair inserted; `self` is untouched.
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> Self
    where
        H: Clone,
    {
        let mut out = self.clone();
        out.insert_mut(key, value);
        out
    }

    /// Returns a new map without `key`; `self` is untouched.
    #[must_use]
    pub fn remove<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        H: Clone,
    {
        let mut out = self.clone();
        if out.remove_mut(key).is_some() {
            out
        } else {
            // Nothing was removed; keep maximum sharing.
            self.clone()
        }
    }

    /// Returns a mutable reference to the value for `key`, copying
    /// shared nodes along the path.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.hash_key(key);
        let root = self.root.as_mut()?;
        get_mut_recursive(root, hash, key, 0)
    }

    /// Returns a mutable reference to the value for `key`, inserting
    /// `default()` first if the key is absent.
    ///
    /// The default closure is evaluated at most once, and only on
    /// insertion, so `*map.get_mut_or_insert_with(k, || 0) += 1`
    /// counts without double hashing.
    pub fn get_mut_or_insert_with<F>(&mut self, key: K, default: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        let hash = self.hash_key(&key);
        let mut default = Some(default);
        let inserted = match self.root.as_mut() {
            Some(root) => prepare_upsert_recursive(root, hash, &key, 0, &mut default),
            None => {
                let value = (default.take().expect("default evaluated at most once"))();
                self.root = Some(SharedPointer::new(Node::with_single_item(Entry {
                    hash,
                    key: key.clone(),
                    value,
                })));
                true
            }
        };
        if inserted {
            self.size += 1;
            if let Some(root) = self.root.as_mut() {
                hoist_lone_collision(root);
            }
        }
        self.after_mutation();
        let root = self.root.as_mut().expect("root exists after upsert");
        get_mut_recursive(root, hash, &key, 0).expect("entry present after upsert")
    }

    /// Unites two maps. `combine(key, self_value, other_value)` is
    /// invoked exactly once per duplicate key; single-sided subtrees
    /// are shared with the inputs, not rebuilt.
    #[must_use]
    pub fn merge<F>(&self, other: &Self, mut combine: F) -> Self
    where
        F: FnMut(&K, &V, &V) -> V,
        H: Clone,
    {
        let root = match (&self.root, &other.root) {
            (None, None) => None,
            (Some(node), None) | (None, Some(node)) => Some(node.clone()),
            (Some(a), Some(b)) => Some(union_nodes(a, b, 0, &mut combine)),
        };
        let out = Self::from_parts(root, self.hasher_builder.clone());
        out.after_mutation();
        out
    }

    /// Returns a new map with the entries `keep` accepts.
    #[must_use]
    pub fn filter<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&K, &V) -> bool,
        H: Clone,
    {
        let mut out = Self::with_hasher(self.hasher_builder.clone());
        for (key, value) in self {
            if keep(key, value) {
                out.insert_mut(key.clone(), value.clone());
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Value transformation
// ---------------------------------------------------------------------------

impl<K, V, P, H> HamtMap<K, V, P, H>
where
    K: Clone,
    P: SharedPointerKind,
    H: BuildHasher,
{
    /// Returns a map with the same keys and structure whose values are
    /// `transform` of the originals.
    #[must_use]
    pub fn map_values<W, F>(&self, mut transform: F) -> HamtMap<K, W, P, H>
    where
        F: FnMut(&V) -> W,
        H: Clone,
    {
        let root = self
            .root
            .as_ref()
            .map(|node| SharedPointer::new(map_node(node, &mut transform)));
        HamtMap::from_parts(root, self.hasher_builder.clone())
    }
}

/// Rebuilds a subtree with transformed values, preserving its shape.
fn map_node<K, V, W, P, F>(node: &Node<K, V, P>, transform: &mut F) -> Node<K, W, P>
where
    K: Clone,
    F: FnMut(&V) -> W,
    P: SharedPointerKind,
{
    let map_entry = |entry: &Entry<K, V>, transform: &mut F| Entry {
        hash: entry.hash,
        key: entry.key.clone(),
        value: transform(&entry.value),
    };
    match node {
        Node::Inner {
            item_map,
            child_map,
            items,
            children,
            size,
        } => Node::Inner {
            item_map: *item_map,
            child_map: *child_map,
            items: items.iter().map(|e| map_entry(e, transform)).collect(),
            children: children
                .iter()
                .map(|child| SharedPointer::new(map_node(child, transform)))
                .collect(),
            size: *size,
        },
        Node::Collision { hash, items } => Node::Collision {
            hash: *hash,
            items: items.iter().map(|e| map_entry(e, transform)).collect(),
        },
    }
}

// ---------------------------------------------------------------------------
// Trait impls
// ---------------------------------------------------------------------------

impl<K, V, P, H> Clone for HamtMap<K, V, P, H>
where
    P: SharedPointerKind,
    H: BuildHasher + Clone,
{
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            size: self.size,
            hasher_builder: self.hasher_builder.clone(),
        }
    }
}

impl<K, V, P, H> Default for HamtMap<K, V, P, H>
where
    P: SharedPointerKind,
    H: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(H::default())
    }
}

impl<K, V, P, H> fmt::Debug for HamtMap<K, V, P, H>
where
    K: fmt::Debug,
    V: fmt::Debug,
    P: SharedPointerKind,
    H: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, P, H> PartialEq for HamtMap<K, V, P, H>
where
    K: Eq,
    V: PartialEq,
    P: SharedPointerKind,
    H: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        if self.size != other.size {
            return false;
        }
        match (&self.root, &other.root) {
            (None, None) => true,
            (Some(a), Some(b)) => eq_nodes(a, b),
            _ => false,
        }
    }
}

impl<K, V, P, H> Eq for HamtMap<K, V, P, H>
where
    K: Eq,
    V: Eq,
    P: SharedPointerKind,
    H: BuildHasher,
{
}

impl<'a, K, V, P, H, Q> ops::Index<&'a Q> for HamtMap<K, V, P, H>
where
    K: Hash + Eq + Borrow<Q>,
    Q: ?Sized + Hash + Eq,
    P: SharedPointerKind,
    H: BuildHasher,
{
    type Output = V;

    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

impl<K, V, P, H> Extend<(K, V)> for HamtMap<K, V, P, H>
where
    K: Hash + Eq + Clone,
    V: Clone,
    P: SharedPointerKind,
    H: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert_mut(key, value);
        }
    }
}

impl<K, V, P, H> FromIterator<(K, V)> for HamtMap<K, V, P, H>
where
    K: Hash + Eq + Clone,
    V: Clone,
    P: SharedPointerKind,
    H: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_hasher(H::default());
        map.extend(iter);
        map
    }
}

impl<'a, K, V, P, H> IntoIterator for &'a HamtMap<K, V, P, H>
where
    P: SharedPointerKind,
    H: BuildHasher,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, P>;

    fn into_iter(self) -> Iter<'a, K, V, P> {
        self.iter()
    }
}
