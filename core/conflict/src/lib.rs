// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

//! Per-`(sender, nonce)` conflict-set tracking used to decide which of two
//! transactions spending the same nonce is strongly preferred.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Mutex,
};

use skein_graph::Graph;
use skein_types::{AccountID, TransactionID};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictSet {
    pub preferred: TransactionID,
    pub last: TransactionID,
    pub count: u32,
}

impl Default for ConflictSet {
    fn default() -> Self {
        Self { preferred: TransactionID::ZERO, last: TransactionID::ZERO, count: 0 }
    }
}

impl ConflictSet {
    /// A set is decided once its `count` has reached `beta2` with `last ==
    /// preferred`.
    pub fn is_decided(&self, beta2: u32) -> bool {
        self.last == self.preferred && self.count >= beta2
    }
}

/// A bounded, mutex-guarded table of conflict sets keyed by `(sender,
/// nonce)`.
#[derive(Default)]
pub struct ConflictSetStore {
    sets: Mutex<HashMap<(AccountID, u64), ConflictSet>>,
}

impl ConflictSetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, sender: AccountID, nonce: u64) -> ConflictSet {
        self.sets.lock().unwrap().get(&(sender, nonce)).copied().unwrap_or_default()
    }

    pub fn put(&self, sender: AccountID, nonce: u64, set: ConflictSet) {
        self.sets.lock().unwrap().insert((sender, nonce), set);
    }

    pub fn len(&self) -> usize {
        self.sets.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// BFS over `tx`'s ancestors (via the graph's recorded parent ids),
    /// deduplicated, capped at `cap` visits.
    pub fn count_ascendants(&self, graph: &Graph, tx: TransactionID, cap: u32) -> u32 {
        if tx.is_zero() {
            return 0;
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([tx]);
        let mut count = 0u32;

        while let Some(id) = queue.pop_front() {
            if count >= cap || !visited.insert(id) {
                continue;
            }
            count += 1;

            let Some(current) = graph.find(&id) else { continue };
            for parent in &current.parent_ids {
                if !visited.contains(parent) {
                    queue.push_back(*parent);
                }
            }
        }

        count
    }

    /// Applies the §4.D update rule for a successful query response on
    /// `tx`: recomputes `preferred` by ascendant-count comparison, resets
    /// or bumps `count` depending on whether `tx` matches `last`.
    pub fn update_on_successful_query(&self, graph: &Graph, sender: AccountID, nonce: u64, tx: TransactionID, beta2: u32) {
        let mut set = self.get(sender, nonce);

        let score = self.count_ascendants(graph, tx, beta2);
        let preferred_score = self.count_ascendants(graph, set.preferred, beta2);

        if score > preferred_score {
            set.preferred = tx;
        }

        if tx != set.last {
            set.last = tx;
            set.count = 0;
        } else {
            set.count += 1;
        }

        self.put(sender, nonce, set);
    }
}
