// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

//! Persistent, content-addressed Merkle-AVL key-value tree.
//!
//! Every node is identified by the BLAKE2b-128 hash of its encoded form, so
//! structurally identical subtrees always collapse to the same
//! [`skein_types::MerkleNodeID`] regardless of how they were reached. Writes
//! path-copy from the touched leaf back to the root and leave the old root
//! intact, which is what makes [`tree::Snapshot`] and [`tree::Tree::fork`]
//! cheap.

mod cache;
mod node;
mod store;
mod tree;

pub use cache::{NodeCache, DEFAULT_CACHE_SIZE};
pub use node::{Node, NodeKind};
pub use skein_types::MerkleNodeID;
pub use store::{InMemoryNodeStore, NodeStore};
pub use tree::{Op, Snapshot, Tree, WriteBatch};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AvlError {
    #[error("node {0} referenced by the tree is missing from the store")]
    MissingNode(MerkleNodeID),

    #[error("node {0} failed to decode, or its content hash does not match its id")]
    CorruptedStore(MerkleNodeID),

    #[error("underlying store I/O error: {0}")]
    Io(#[from] std::io::Error),
}
