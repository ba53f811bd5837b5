// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

use std::{num::NonZeroUsize, sync::Arc, sync::Mutex};

use lru::LruCache;
use skein_types::MerkleNodeID;

use crate::node::Node;

/// Default node LRU capacity, per `spec.md` §4.A.
pub const DEFAULT_CACHE_SIZE: usize = 1 << 16;

/// A bounded, mutex-guarded cache of deserialized nodes keyed by content
/// address. Mirrors `avl/lru.node.go`'s `nodeLRU`: `Load` bumps recency,
/// `Put`/admission on a miss evicts the least-recently-used entry once the
/// cache is over capacity.
pub struct NodeCache {
    inner: Mutex<LruCache<MerkleNodeID, Arc<Node>>>,
}

impl NodeCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity clamped to at least 1");
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn load(&self, id: &MerkleNodeID) -> Option<Arc<Node>> {
        self.inner.lock().unwrap().get(id).cloned()
    }

    pub fn admit(&self, id: MerkleNodeID, node: Arc<Node>) {
        self.inner.lock().unwrap().put(id, node);
    }

    pub fn remove(&self, id: &MerkleNodeID) {
        self.inner.lock().unwrap().pop(id);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NodeCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used() {
        let cache = NodeCache::new(2);
        let a = MerkleNodeID([1; 16]);
        let b = MerkleNodeID([2; 16]);
        let c = MerkleNodeID([3; 16]);

        cache.admit(a, Arc::new(Node::new_leaf(vec![1], vec![1])));
        cache.admit(b, Arc::new(Node::new_leaf(vec![2], vec![2])));
        // touch `a` so `b` becomes least-recently-used
        assert!(cache.load(&a).is_some());
        cache.admit(c, Arc::new(Node::new_leaf(vec![3], vec![3])));

        assert!(cache.load(&b).is_none());
        assert!(cache.load(&a).is_some());
        assert!(cache.load(&c).is_some());
    }
}
