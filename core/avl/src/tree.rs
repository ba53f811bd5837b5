// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

use std::{cmp::Ordering, sync::Arc};

use log::error;
use skein_types::MerkleNodeID;

use crate::{
    cache::NodeCache,
    node::{Node, NodeKind},
    store::NodeStore,
    AvlError,
};

const LOG_TARGET: &str = "skein::avl::tree";

/// A node slot: `None` denotes an empty subtree, matching the convention
/// that the zero id is never a real content address.
type Slot = Option<MerkleNodeID>;

fn height_of(node: &Option<Arc<Node>>) -> i32 {
    node.as_ref().map(|n| n.height).unwrap_or(0)
}

fn size_of(node: &Option<Arc<Node>>) -> u64 {
    node.as_ref().map(|n| n.size).unwrap_or(0)
}

/// A single mutation to apply atomically via [`Tree::commit`].
#[derive(Debug, Clone)]
pub enum Op {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    pub ops: Vec<Op>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(Op::Put(key.into(), value.into()));
        self
    }

    pub fn delete(&mut self, key: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(Op::Delete(key.into()));
        self
    }
}

/// An immutable, read-only view of the tree at a fixed root. Cheap to
/// clone: it shares the backing store and node cache with its tree and any
/// sibling snapshots.
#[derive(Clone)]
pub struct Snapshot {
    store: Arc<dyn NodeStore>,
    cache: Arc<NodeCache>,
    root: Slot,
}

impl Snapshot {
    pub fn root_id(&self) -> MerkleNodeID {
        self.root.unwrap_or(MerkleNodeID::ZERO)
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, AvlError> {
        get(&self.store, &self.cache, self.root, key)
    }

    /// Forks a mutable, path-copying [`Tree`] rooted at this snapshot so a
    /// caller can speculatively apply writes without touching the live
    /// tree. Discarding the returned tree discards the writes entirely.
    pub fn fork(&self) -> Tree {
        Tree {
            store: self.store.clone(),
            cache: self.cache.clone(),
            root: self.root,
        }
    }
}

/// A persistent, versioned Merkle-AVL key-value tree. Every mutation
/// path-copies from the touched leaf back to the root; untouched subtrees
/// keep their existing content-addressed ids, so two trees with identical
/// logical content always converge on the same root id (§8 property 5).
pub struct Tree {
    store: Arc<dyn NodeStore>,
    cache: Arc<NodeCache>,
    root: Slot,
}

impl Tree {
    pub fn new(store: Arc<dyn NodeStore>, cache: Arc<NodeCache>) -> Self {
        Self { store, cache, root: None }
    }

    /// Re-opens a tree at a previously produced root id.
    pub fn load(store: Arc<dyn NodeStore>, cache: Arc<NodeCache>, root_id: MerkleNodeID) -> Self {
        let root = if root_id.is_zero() { None } else { Some(root_id) };
        Self { store, cache, root }
    }

    pub fn root_id(&self) -> MerkleNodeID {
        self.root.unwrap_or(MerkleNodeID::ZERO)
    }

    pub fn len(&self) -> Result<u64, AvlError> {
        Ok(size_of(&self.load_opt(self.root)?))
    }

    pub fn is_empty(&self) -> Result<bool, AvlError> {
        Ok(self.len()? == 0)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            store: self.store.clone(),
            cache: self.cache.clone(),
            root: self.root,
        }
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, AvlError> {
        get(&self.store, &self.cache, self.root, key)
    }

    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Result<MerkleNodeID, AvlError> {
        let new_root = put(&self.store, &self.cache, self.root, key.into(), value.into())?;
        self.root = Some(new_root);
        Ok(new_root)
    }

    /// Returns `true` if the key was present and removed.
    pub fn delete(&mut self, key: &[u8]) -> Result<bool, AvlError> {
        let (new_root, removed) = delete(&self.store, &self.cache, self.root, key)?;
        let existed = removed.is_some();
        self.root = new_root;
        Ok(existed)
    }

    /// Atomically applies every operation in `batch`, returning the
    /// resulting root id. On any error the tree's root is left unchanged.
    pub fn commit(&mut self, batch: WriteBatch) -> Result<MerkleNodeID, AvlError> {
        let mut root = self.root;
        for op in batch.ops {
            root = match op {
                Op::Put(k, v) => Some(put(&self.store, &self.cache, root, k, v)?),
                Op::Delete(k) => delete(&self.store, &self.cache, root, &k)?.0,
            };
        }
        self.root = root;
        Ok(self.root_id())
    }

    fn load_opt(&self, slot: Slot) -> Result<Option<Arc<Node>>, AvlError> {
        load_opt(&self.store, &self.cache, slot)
    }
}

fn load_opt(store: &Arc<dyn NodeStore>, cache: &NodeCache, slot: Slot) -> Result<Option<Arc<Node>>, AvlError> {
    match slot {
        None => Ok(None),
        Some(id) => Ok(Some(load(store, cache, id)?)),
    }
}

fn load(store: &Arc<dyn NodeStore>, cache: &NodeCache, id: MerkleNodeID) -> Result<Arc<Node>, AvlError> {
    if let Some(cached) = cache.load(&id) {
        return Ok(cached);
    }

    let raw = store.load_raw(&id)?.ok_or_else(|| {
        error!(target: LOG_TARGET, "missing node {} referenced by tree", id);
        AvlError::MissingNode(id)
    })?;

    let node = Node::decode(&raw).map_err(|_| AvlError::CorruptedStore(id))?;
    if node.compute_id() != id {
        error!(target: LOG_TARGET, "hash mismatch loading node {}", id);
        return Err(AvlError::CorruptedStore(id));
    }

    let node = Arc::new(node);
    cache.admit(id, node.clone());
    Ok(node)
}

fn persist(store: &Arc<dyn NodeStore>, cache: &NodeCache, node: Node) -> Result<MerkleNodeID, AvlError> {
    let id = node.compute_id();
    store.store_raw(id, node.encode())?;
    cache.admit(id, Arc::new(node));
    Ok(id)
}

fn get(store: &Arc<dyn NodeStore>, cache: &NodeCache, slot: Slot, key: &[u8]) -> Result<Option<Vec<u8>>, AvlError> {
    let Some(id) = slot else {
        return Ok(None);
    };
    let node = load(store, cache, id)?;
    match &node.kind {
        NodeKind::Leaf { value } => {
            if node.key == key {
                Ok(Some(value.clone()))
            } else {
                Ok(None)
            }
        },
        NodeKind::Internal { left, right } => {
            if key.cmp(node.key.as_slice()) == Ordering::Less {
                get(store, cache, Some(*left), key)
            } else {
                get(store, cache, Some(*right), key)
            }
        },
    }
}

fn put(
    store: &Arc<dyn NodeStore>,
    cache: &NodeCache,
    slot: Slot,
    key: Vec<u8>,
    value: Vec<u8>,
) -> Result<MerkleNodeID, AvlError> {
    let Some(id) = slot else {
        return persist(store, cache, Node::new_leaf(key, value));
    };

    let node = load(store, cache, id)?;

    match &node.kind {
        NodeKind::Leaf { .. } => match key.cmp(&node.key) {
            Ordering::Equal => persist(store, cache, Node::new_leaf(key, value)),
            Ordering::Less => {
                let left_id = persist(store, cache, Node::new_leaf(key, value))?;
                let left = load(store, cache, left_id)?;
                let right = node;
                let height = 1 + left.height.max(right.height);
                let size = left.size + right.size;
                persist(store, cache, Node::new_internal(right.key.clone(), left_id, id, height, size))
            },
            Ordering::Greater => {
                let right_id = persist(store, cache, Node::new_leaf(key, value))?;
                let right = load(store, cache, right_id)?;
                let left = node;
                let height = 1 + left.height.max(right.height);
                let size = left.size + right.size;
                persist(store, cache, Node::new_internal(right.key.clone(), id, right_id, height, size))
            },
        },
        NodeKind::Internal { left, right } => {
            let (new_left, new_right) = if key.cmp(node.key.as_slice()) == Ordering::Less {
                (put(store, cache, Some(*left), key, value)?, *right)
            } else {
                (*left, put(store, cache, Some(*right), key, value)?)
            };

            let left_node = load(store, cache, new_left)?;
            let right_node = load(store, cache, new_right)?;
            let routing_key = min_key_deep(store, cache, new_right)?;
            let height = 1 + left_node.height.max(right_node.height);
            let size = left_node.size + right_node.size;
            let rebuilt = Node::new_internal(routing_key, new_left, new_right, height, size);

            rebalance(store, cache, rebuilt)
        },
    }
}

/// Descends to the leftmost leaf under `id` to find the true minimum key.
fn min_key_deep(store: &Arc<dyn NodeStore>, cache: &NodeCache, id: MerkleNodeID) -> Result<Vec<u8>, AvlError> {
    let mut current = load(store, cache, id)?;
    loop {
        match &current.kind {
            NodeKind::Leaf { .. } => return Ok(current.key.clone()),
            NodeKind::Internal { left, .. } => {
                current = load(store, cache, *left)?;
            },
        }
    }
}

fn balance_factor_of(left: &Node, right: &Node) -> i32 {
    right.height - left.height
}

fn rebuild_internal(
    store: &Arc<dyn NodeStore>,
    cache: &NodeCache,
    left_id: MerkleNodeID,
    left_node: Arc<Node>,
    right_id: MerkleNodeID,
    right_node: Arc<Node>,
) -> Result<(MerkleNodeID, Arc<Node>), AvlError> {
    let routing_key = min_key_deep(store, cache, right_id)?;
    let height = 1 + left_node.height.max(right_node.height);
    let size = left_node.size + right_node.size;
    let node = Node::new_internal(routing_key, left_id, right_id, height, size);
    let id = persist(store, cache, node.clone())?;
    Ok((id, Arc::new(node)))
}

/// Rebalances `node` (already rebuilt with fresh children) using the
/// standard LL/LR/RR/RL rotations, decomposed on the four grandchild
/// subtrees `A`,`B`,`C`,`D` keyed on the balance factor.
fn rebalance(store: &Arc<dyn NodeStore>, cache: &NodeCache, node: Node) -> Result<MerkleNodeID, AvlError> {
    let NodeKind::Internal { left, right } = node.kind else {
        return persist(store, cache, node);
    };

    let left_node = load(store, cache, left)?;
    let right_node = load(store, cache, right)?;
    let balance = balance_factor_of(&left_node, &right_node);

    if balance.abs() <= 1 {
        return persist(store, cache, node);
    }

    if balance < -1 {
        // Left-heavy: Z = left_node, A = Z.left, Y = Z.right.
        let NodeKind::Internal { left: a_id, right: y_id } = left_node.kind else {
            return persist(store, cache, node);
        };
        let a_node = load(store, cache, a_id)?;
        let y_node = load(store, cache, y_id)?;

        if balance_factor_of(&a_node, &y_node) <= 0 {
            // LL: Internal(A, Internal(Y, D))
            let (right_side, right_side_node) = rebuild_internal(store, cache, y_id, y_node, right, right_node)?;
            Ok(rebuild_internal(store, cache, a_id, a_node, right_side, right_side_node)?.0)
        } else {
            // LR: Y = Internal(B, C) -> Internal(Internal(A,B), Internal(C,D))
            let NodeKind::Internal { left: b_id, right: c_id } = y_node.kind else {
                return persist(store, cache, node);
            };
            let b_node = load(store, cache, b_id)?;
            let c_node = load(store, cache, c_id)?;
            let (left_side, left_side_node) = rebuild_internal(store, cache, a_id, a_node, b_id, b_node)?;
            let (right_side, right_side_node) = rebuild_internal(store, cache, c_id, c_node, right, right_node)?;
            Ok(rebuild_internal(store, cache, left_side, left_side_node, right_side, right_side_node)?.0)
        }
    } else {
        // Right-heavy: Z = right_node, Y = Z.left, D = Z.right.
        let NodeKind::Internal { left: y_id, right: d_id } = right_node.kind else {
            return persist(store, cache, node);
        };
        let y_node = load(store, cache, y_id)?;
        let d_node = load(store, cache, d_id)?;

        if balance_factor_of(&y_node, &d_node) >= 0 {
            // RR: Internal(Internal(A, Y), D)
            let (left_side, left_side_node) = rebuild_internal(store, cache, left, left_node, y_id, y_node)?;
            Ok(rebuild_internal(store, cache, left_side, left_side_node, d_id, d_node)?.0)
        } else {
            // RL: Y = Internal(B, C) -> Internal(Internal(A,B), Internal(C,D))
            let NodeKind::Internal { left: b_id, right: c_id } = y_node.kind else {
                return persist(store, cache, node);
            };
            let b_node = load(store, cache, b_id)?;
            let c_node = load(store, cache, c_id)?;
            let (left_side, left_side_node) = rebuild_internal(store, cache, left, left_node, b_id, b_node)?;
            let (right_side, right_side_node) = rebuild_internal(store, cache, c_id, c_node, d_id, d_node)?;
            Ok(rebuild_internal(store, cache, left_side, left_side_node, right_side, right_side_node)?.0)
        }
    }
}

fn delete(
    store: &Arc<dyn NodeStore>,
    cache: &NodeCache,
    slot: Slot,
    key: &[u8],
) -> Result<(Slot, Option<Vec<u8>>), AvlError> {
    let Some(id) = slot else {
        return Ok((None, None));
    };

    let node = load(store, cache, id)?;

    match &node.kind {
        NodeKind::Leaf { value } => {
            if node.key == key {
                Ok((None, Some(value.clone())))
            } else {
                Ok((Some(id), None))
            }
        },
        NodeKind::Internal { left, right } => {
            if key.cmp(node.key.as_slice()) == Ordering::Less {
                let (new_left, removed) = delete(store, cache, Some(*left), key)?;
                if removed.is_none() {
                    return Ok((Some(id), None));
                }
                let joined = join(store, cache, new_left, Some(*right))?;
                Ok((joined, removed))
            } else {
                let (new_right, removed) = delete(store, cache, Some(*right), key)?;
                if removed.is_none() {
                    return Ok((Some(id), None));
                }
                let joined = join(store, cache, Some(*left), new_right)?;
                Ok((joined, removed))
            }
        },
    }
}

/// Joins two possibly-empty subtrees into one, rebalancing on the way.
fn join(store: &Arc<dyn NodeStore>, cache: &NodeCache, left: Slot, right: Slot) -> Result<Slot, AvlError> {
    match (left, right) {
        (None, None) => Ok(None),
        (Some(id), None) => Ok(Some(id)),
        (None, Some(id)) => Ok(Some(id)),
        (Some(left_id), Some(right_id)) => {
            let left_node = load(store, cache, left_id)?;
            let right_node = load(store, cache, right_id)?;
            let routing_key = min_key_deep(store, cache, right_id)?;
            let height = 1 + left_node.height.max(right_node.height);
            let size = left_node.size + right_node.size;
            let rebuilt = Node::new_internal(routing_key, left_id, right_id, height, size);
            Ok(Some(rebalance(store, cache, rebuilt)?))
        },
    }
}
