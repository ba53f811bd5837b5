// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

use std::{collections::HashMap, sync::Mutex};

use skein_types::MerkleNodeID;

use crate::AvlError;

/// Backing storage for raw (encoded) node bytes, keyed by content address.
/// The tree module owns deserialization and hash verification; a store only
/// needs to persist and retrieve opaque blobs.
pub trait NodeStore: Send + Sync {
    fn load_raw(&self, id: &MerkleNodeID) -> Result<Option<Vec<u8>>, AvlError>;
    fn store_raw(&self, id: MerkleNodeID, bytes: Vec<u8>) -> Result<(), AvlError>;
}

/// An in-memory append-only node store, suitable for tests and for a
/// node that keeps its whole working set resident. A durable store would
/// implement the same trait over an append-log (see `spec.md` §6).
#[derive(Default)]
pub struct InMemoryNodeStore {
    nodes: Mutex<HashMap<MerkleNodeID, Vec<u8>>>,
}

impl InMemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NodeStore for InMemoryNodeStore {
    fn load_raw(&self, id: &MerkleNodeID) -> Result<Option<Vec<u8>>, AvlError> {
        Ok(self.nodes.lock().unwrap().get(id).cloned())
    }

    fn store_raw(&self, id: MerkleNodeID, bytes: Vec<u8>) -> Result<(), AvlError> {
        self.nodes.lock().unwrap().insert(id, bytes);
        Ok(())
    }
}
