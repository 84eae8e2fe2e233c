mod algebra;
mod collision;
mod persistence;
mod upsert;

use std::hash::{BuildHasher, Hash, Hasher};

use archery::SharedPointerKind;

use crate::node::{Node, NodeRef};

/// A key type with a controllable hash value for collision scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CollidingKey {
    pub id: u32,
    pub forced_hash: u64,
}

impl CollidingKey {
    pub const fn new(id: u32, hash: u64) -> Self {
        Self {
            id,
            forced_hash: hash,
        }
    }
}

impl Hash for CollidingKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.forced_hash.hash(state);
    }
}

/// Hasher that passes the last written integer straight through,
/// giving tests exact control over bucket paths.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct PassthroughHasher(u64);

impl Hasher for PassthroughHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        let mut buf = [0u8; 8];
        let len = bytes.len().min(8);
        buf[..len].copy_from_slice(&bytes[..len]);
        self.0 = u64::from_le_bytes(buf);
    }

    fn write_u64(&mut self, value: u64) {
        self.0 = value;
    }

    fn write_u32(&mut self, value: u32) {
        self.0 = u64::from(value);
    }
}

/// Builder for [`PassthroughHasher`].
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Passthrough;

impl BuildHasher for Passthrough {
    type Hasher = PassthroughHasher;

    fn build_hasher(&self) -> PassthroughHasher {
        PassthroughHasher::default()
    }
}

/// Map with fully controlled hashes: a `u64` key is its own hash.
pub(crate) type TestMap<K, V> = crate::HamtMap<K, V, crate::RcK, Passthrough>;

/// Collects the address of every node in the subtree.
pub(crate) fn collect_node_ids<K, V, P>(root: Option<&NodeRef<K, V, P>>, out: &mut Vec<usize>)
where
    P: SharedPointerKind,
{
    if let Some(node) = root {
        out.push(std::ptr::from_ref::<Node<K, V, P>>(node) as usize);
        if let Node::Inner { children, .. } = &**node {
            for child in children {
                collect_node_ids(Some(child), out);
            }
        }
    }
}
