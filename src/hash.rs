//! Hash path: slicing a 64-bit hash into level-indexed 5-bit buckets.
//!
//! The trie consumes the hash least-significant-bits first. A walk
//! starts at shift 0 (the root level) and descends by
//! [`BITS_PER_LEVEL`] per level; past [`MAX_SHIFT`] the hash is
//! exhausted and only collision nodes can distinguish keys.

use std::collections::hash_map::DefaultHasher;
use std::hash::{BuildHasher, Hash, Hasher};

/// Width of the hash consumed by the trie, in bits.
pub(crate) type HashValue = u64;

/// Bits per trie level (5 → 32-way branching).
pub(crate) const BITS_PER_LEVEL: u32 = 5;

/// Maximum bit-shift value (depth 12, last level uses 4 bits).
pub(crate) const MAX_SHIFT: u32 = 60;

/// Deepest possible node chain: one inner node per level plus one
/// collision node below the last.
pub(crate) const MAX_DEPTH: usize = (MAX_SHIFT / BITS_PER_LEVEL) as usize + 2;

/// Extracts the bucket of `hash` at the given bit-shift depth.
#[inline]
#[must_use]
pub(crate) const fn bucket(hash: HashValue, shift: u32) -> u32 {
    ((hash >> shift) & 0x1F) as u32
}

/// Returns `true` if `shift` is past the last level that still has
/// hash bits.
#[inline]
#[must_use]
pub(crate) const fn is_exhausted(shift: u32) -> bool {
    shift > MAX_SHIFT
}

/// Computes the 64-bit hash of a value with the given builder.
#[must_use]
pub(crate) fn hash_one<T, H>(value: &T, builder: &H) -> HashValue
where
    T: ?Sized + Hash,
    H: BuildHasher,
{
    let mut hasher = builder.build_hasher();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Default hash builder for [`HamtMap`](crate::HamtMap) and
/// [`HamtSet`](crate::HamtSet).
///
/// All instances share one per-process random seed, so two maps built
/// independently assign every key the same hash. The trie's canonical
/// form makes structural operations (equality, set algebra, merge)
/// compare stored hashes across trees; a builder whose instances hash
/// differently would break them.
///
/// With the `deterministic-hashing` feature the seed is fixed, which
/// makes iteration order reproducible across processes.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultHashBuilder;

#[cfg(not(feature = "deterministic-hashing"))]
fn process_state() -> &'static std::collections::hash_map::RandomState {
    use std::collections::hash_map::RandomState;
    use std::sync::OnceLock;

    static STATE: OnceLock<RandomState> = OnceLock::new();
    STATE.get_or_init(RandomState::new)
}

impl BuildHasher for DefaultHashBuilder {
    type Hasher = DefaultHasher;

    #[cfg(not(feature = "deterministic-hashing"))]
    fn build_hasher(&self) -> DefaultHasher {
        process_state().build_hasher()
    }

    #[cfg(feature = "deterministic-hashing")]
    fn build_hasher(&self) -> DefaultHasher {
        DefaultHasher::new()
    }
}
