// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

use borsh::{BorshDeserialize, BorshSerialize};
use skein_types::{blake2b_128, MerkleNodeID};

/// A node in the Merkle-AVL tree.
///
/// Internal nodes hold only child pointers plus a routing key (the smallest
/// key reachable through their right subtree); leaves hold the full
/// `(key, value)` pair. `node_id` is never stored on the node itself — it is
/// recomputed from the serialized fields, which is what gives two nodes with
/// identical content the same id (structural sharing).
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Node {
    /// Leaf: the stored key. Internal: the smallest key in the right subtree.
    pub key: Vec<u8>,
    pub kind: NodeKind,
    pub height: i32,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum NodeKind {
    Leaf { value: Vec<u8> },
    Internal { left: MerkleNodeID, right: MerkleNodeID },
}

impl Node {
    pub fn new_leaf(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self {
            key,
            kind: NodeKind::Leaf { value },
            height: 1,
            size: 1,
        }
    }

    pub fn new_internal(key: Vec<u8>, left: MerkleNodeID, right: MerkleNodeID, height: i32, size: u64) -> Self {
        Self {
            key,
            kind: NodeKind::Internal { left, right },
            height,
            size,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    pub fn left(&self) -> Option<MerkleNodeID> {
        match self.kind {
            NodeKind::Internal { left, .. } => Some(left),
            NodeKind::Leaf { .. } => None,
        }
    }

    pub fn right(&self) -> Option<MerkleNodeID> {
        match self.kind {
            NodeKind::Internal { right, .. } => Some(right),
            NodeKind::Leaf { .. } => None,
        }
    }

    /// Serializes the node's fields and hashes them with BLAKE2b-128 to
    /// derive its content-address.
    pub fn compute_id(&self) -> MerkleNodeID {
        let bytes = self.try_to_vec().expect("Node serialization is infallible");
        MerkleNodeID(blake2b_128(&bytes))
    }

    pub fn encode(&self) -> Vec<u8> {
        self.try_to_vec().expect("Node serialization is infallible")
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, std::io::Error> {
        Self::try_from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_content_yields_equal_id() {
        let a = Node::new_leaf(b"k".to_vec(), b"v".to_vec());
        let b = Node::new_leaf(b"k".to_vec(), b"v".to_vec());
        assert_eq!(a.compute_id(), b.compute_id());
    }

    #[test]
    fn different_content_yields_different_id() {
        let a = Node::new_leaf(b"k".to_vec(), b"v".to_vec());
        let b = Node::new_leaf(b"k".to_vec(), b"v2".to_vec());
        assert_ne!(a.compute_id(), b.compute_id());
    }

    #[test]
    fn round_trips_through_encode_decode() {
        let node = Node::new_internal(b"k".to_vec(), MerkleNodeID([1; 16]), MerkleNodeID([2; 16]), 3, 5);
        let decoded = Node::decode(&node.encode()).unwrap();
        assert_eq!(node, decoded);
    }
}
