// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

//! The transaction DAG. Validated, complete transactions live in
//! `transactions`; transactions still waiting on at least one parent live
//! in `incomplete`, indexed by the parent(s) they're waiting on via
//! `missing`. `children` records every parent → child edge a transaction
//! has ever declared, whether or not the parent itself has arrived yet, so
//! a late-arriving parent can immediately look up its children.

mod error;

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use log::{error, warn};
use skein_tx::{Batch, Contract, Stake, Tag, Transaction, Transfer};
use skein_types::{AccountID, TransactionID};

pub use error::GraphError;

const LOG_TARGET: &str = "skein::graph";

pub struct Graph {
    transactions: BTreeMap<TransactionID, Transaction>,
    children: BTreeMap<TransactionID, BTreeSet<TransactionID>>,
    incomplete: BTreeMap<TransactionID, Transaction>,
    missing: BTreeMap<TransactionID, BTreeSet<TransactionID>>,
    root: TransactionID,
    height: u64,
    root_depth: u64,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        let genesis = Transaction::genesis();
        let mut transactions = BTreeMap::new();
        transactions.insert(genesis.id, genesis);
        Self {
            transactions,
            children: BTreeMap::new(),
            incomplete: BTreeMap::new(),
            missing: BTreeMap::new(),
            root: TransactionID::ZERO,
            height: 1,
            root_depth: 0,
        }
    }

    pub fn root(&self) -> TransactionID {
        self.root
    }

    pub fn root_depth(&self) -> u64 {
        self.root_depth
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn find(&self, id: &TransactionID) -> Option<&Transaction> {
        self.transactions.get(id).or_else(|| self.incomplete.get(id))
    }

    pub fn is_complete(&self, id: &TransactionID) -> bool {
        self.transactions.contains_key(id)
    }

    pub fn incomplete_len(&self) -> usize {
        self.incomplete.len()
    }

    pub fn missing_len(&self) -> usize {
        self.missing.len()
    }

    pub fn list(
        &self,
        offset: usize,
        limit: usize,
        sender_filter: Option<AccountID>,
        creator_filter: Option<AccountID>,
    ) -> Vec<&Transaction> {
        self.transactions
            .values()
            .filter(|tx| sender_filter.map_or(true, |s| tx.sender == s))
            .filter(|tx| creator_filter.map_or(true, |c| tx.creator == c))
            .skip(offset)
            .take(limit)
            .collect()
    }

    /// Inserts `tx`. `MissingParents` is not a fatal error: the transaction
    /// is parked in `incomplete` and promoted later once its parents
    /// arrive.
    pub fn add_transaction(&mut self, tx: Transaction) -> Result<(), GraphError> {
        if self.transactions.contains_key(&tx.id) || self.incomplete.contains_key(&tx.id) {
            return Err(GraphError::AlreadyExists(tx.id));
        }

        if let Err(err) = validate_payload(tx.tag, &tx.payload) {
            return Err(GraphError::Malformed(tx.id, err.to_string()));
        }

        for parent in &tx.parent_ids {
            self.children.entry(*parent).or_default().insert(tx.id);
        }

        let missing_parents: Vec<TransactionID> =
            tx.parent_ids.iter().filter(|p| !self.transactions.contains_key(*p)).copied().collect();

        if missing_parents.is_empty() {
            self.insert_complete(tx)?;
            return Ok(());
        }

        let id = tx.id;
        for parent in &missing_parents {
            self.missing.entry(*parent).or_default().insert(id);
        }
        self.incomplete.insert(id, tx);
        Err(GraphError::MissingParents(id))
    }

    /// Validates depth/confidence against already-complete parents, inserts
    /// into `transactions`, and cascades promotion to any dependents.
    fn insert_complete(&mut self, tx: Transaction) -> Result<(), GraphError> {
        if !tx.is_genesis() && !tx.parent_ids.is_empty() {
            let (expected_depth, expected_confidence) = self.expected_depth_and_confidence(&tx.parent_ids);
            if tx.depth != expected_depth || tx.confidence != expected_confidence {
                return Err(GraphError::InvalidParents(tx.id));
            }
        }

        let id = tx.id;
        self.transactions.insert(id, tx);
        self.promote_waiters(id);
        Ok(())
    }

    fn expected_depth_and_confidence(&self, parent_ids: &[TransactionID]) -> (u64, u64) {
        let mut max_depth = 0u64;
        let mut confidence_sum = 0u64;
        for parent in parent_ids {
            if let Some(parent_tx) = self.transactions.get(parent) {
                max_depth = max_depth.max(parent_tx.depth);
                confidence_sum += parent_tx.confidence;
            }
        }
        (1 + max_depth, confidence_sum + parent_ids.len() as u64)
    }

    /// Worklist-driven cascading promotion seeded from a newly-completed
    /// transaction id. A visited-set both avoids re-processing the same
    /// dependent twice in one cascade and rejects cycles among incomplete
    /// transactions (only reachable via adversarial input).
    fn promote_waiters(&mut self, newly_present: TransactionID) {
        let mut worklist = VecDeque::from([newly_present]);
        let mut visited = HashSet::new();

        while let Some(id) = worklist.pop_front() {
            let Some(waiters) = self.missing.remove(&id) else { continue };

            for waiter_id in waiters {
                if !visited.insert(waiter_id) {
                    continue;
                }

                let Some(waiter) = self.incomplete.get(&waiter_id) else { continue };
                if waiter.parent_ids.iter().any(|p| !self.transactions.contains_key(p)) {
                    continue;
                }

                let waiter = self.incomplete.remove(&waiter_id).expect("checked present above");
                match self.insert_complete(waiter) {
                    Ok(()) => worklist.push_back(waiter_id),
                    Err(err) => {
                        error!(target: LOG_TARGET, "discarding promoted transaction {waiter_id}: {err}");
                    },
                }
            }
        }
    }

    /// Leaves (no children) with depth in `[root_depth, root_depth +
    /// max_parent_depth_diff]`, ordered by descending seed then ascending
    /// id.
    pub fn find_eligible_parents(&self, max_parent_depth_diff: u64) -> Vec<TransactionID> {
        let max_depth = self.root_depth + max_parent_depth_diff;
        let mut eligible: Vec<&Transaction> = self
            .transactions
            .values()
            .filter(|tx| self.children.get(&tx.id).map(|c| c.is_empty()).unwrap_or(true))
            .filter(|tx| tx.depth >= self.root_depth && tx.depth <= max_depth)
            .collect();

        eligible.sort_by(|a, b| b.seed.cmp(&a.seed).then_with(|| a.id.cmp(&b.id)));
        eligible.into_iter().map(|tx| tx.id).collect()
    }

    /// Advances the graph's root and discards transactions whose depth has
    /// fallen below `root_depth - pruning_horizon`.
    pub fn prune(&mut self, new_root: TransactionID, pruning_horizon: u64) {
        let Some(new_root_tx) = self.transactions.get(&new_root) else {
            warn!(target: LOG_TARGET, "prune requested for unknown root {new_root}");
            return;
        };

        self.root = new_root;
        self.root_depth = new_root_tx.depth;
        self.height += 1;

        let floor = self.root_depth.saturating_sub(pruning_horizon);
        let stale: Vec<TransactionID> =
            self.transactions.values().filter(|tx| tx.depth < floor && !tx.is_genesis()).map(|tx| tx.id).collect();

        for id in stale {
            self.transactions.remove(&id);
            self.children.remove(&id);
        }
    }
}

/// Dispatches to the tag's codec so a transaction whose payload doesn't
/// parse is rejected here rather than silently dropped later during block
/// application.
fn validate_payload(tag: Tag, payload: &[u8]) -> Result<(), skein_tx::CodecError> {
    match tag {
        Tag::Transfer => Transfer::parse(payload).map(|_| ()),
        Tag::Stake => Stake::parse(payload).map(|_| ()),
        Tag::Contract => Contract::parse(payload).map(|_| ()),
        Tag::Batch => Batch::parse(payload).map(|_| ()),
    }
}

#[cfg(test)]
mod tests {
    use rand::{seq::SliceRandom, thread_rng};

    use super::*;

    fn valid_transfer_payload() -> Vec<u8> {
        Transfer { recipient: AccountID([2; 32]), amount: 1, gas_limit: 0, gas_deposit: 0, func_name: None, func_params: None }
            .marshal()
    }

    fn child_of(parents: &[&Transaction]) -> Transaction {
        let parent_ids = parents.iter().map(|p| p.id).collect::<Vec<_>>();
        let depths: Vec<u64> = parents.iter().map(|p| p.depth).collect();
        let confidences: Vec<u64> = parents.iter().map(|p| p.confidence).collect();
        Transaction::new(
            AccountID([1; 32]),
            AccountID([1; 32]),
            0,
            Tag::Transfer,
            valid_transfer_payload(),
            parent_ids,
            &depths,
            &confidences,
            [0; 64],
            [0; 64],
        )
    }

    fn genesis_ref(g: &Graph) -> Transaction {
        g.find(&TransactionID::ZERO).unwrap().clone()
    }

    #[test]
    fn complete_chain_inserts_cleanly() {
        let mut g = Graph::new();
        let genesis = genesis_ref(&g);

        let tx1 = child_of(&[&genesis]);
        let tx2 = child_of(&[&tx1]);
        let tx3 = child_of(&[&tx1, &tx2]);

        g.add_transaction(tx1.clone()).unwrap();
        g.add_transaction(tx2.clone()).unwrap();
        g.add_transaction(tx3.clone()).unwrap();

        assert_eq!(g.len(), 4);
        assert_eq!(g.incomplete_len(), 0);
        assert_eq!(g.missing_len(), 0);
        assert!(g.is_complete(&tx3.id));
    }

    #[test]
    fn missing_parent_parks_as_incomplete_then_promotes() {
        let mut g = Graph::new();
        let genesis = genesis_ref(&g);
        let parent = child_of(&[&genesis]);
        let child = child_of(&[&parent]);

        assert_eq!(g.add_transaction(child.clone()), Err(GraphError::MissingParents(child.id)));
        assert_eq!(g.incomplete_len(), 1);
        assert_eq!(g.missing_len(), 1);
        assert!(!g.is_complete(&child.id));

        g.add_transaction(parent.clone()).unwrap();

        assert_eq!(g.incomplete_len(), 0);
        assert_eq!(g.missing_len(), 0);
        assert!(g.is_complete(&child.id));
        assert!(g.is_complete(&parent.id));
    }

    #[test]
    fn malformed_payload_is_rejected_before_insertion() {
        let mut g = Graph::new();
        let genesis = genesis_ref(&g);
        let mut tx = child_of(&[&genesis]);
        tx.tag = Tag::Stake;
        tx.payload = vec![0u8; 3]; // Stake payloads are exactly 9 bytes.

        let err = g.add_transaction(tx.clone()).unwrap_err();
        assert!(matches!(err, GraphError::Malformed(id, _) if id == tx.id));
        assert_eq!(g.len(), 1);
        assert_eq!(g.incomplete_len(), 0);
    }

    #[test]
    fn duplicate_insert_is_rejected_without_mutation() {
        let mut g = Graph::new();
        let genesis = genesis_ref(&g);
        let tx1 = child_of(&[&genesis]);
        g.add_transaction(tx1.clone()).unwrap();

        assert_eq!(g.add_transaction(tx1.clone()), Err(GraphError::AlreadyExists(tx1.id)));
        assert_eq!(g.len(), 2);
    }

    #[test]
    fn insertion_order_is_independent_of_final_state() {
        let mut rng = thread_rng();

        for _ in 0..20 {
            let mut g1 = Graph::new();
            let genesis = genesis_ref(&g1);

            let mut chain = vec![genesis.clone()];
            for _ in 0..30 {
                let parent = chain.last().unwrap().clone();
                chain.push(child_of(&[&parent]));
            }
            let transactions: Vec<Transaction> = chain[1..].to_vec();

            for tx in &transactions {
                let _ = g1.add_transaction(tx.clone());
            }

            let mut shuffled = transactions.clone();
            shuffled.shuffle(&mut rng);

            let mut g2 = Graph::new();
            for tx in &shuffled {
                let _ = g2.add_transaction(tx.clone());
            }

            assert_eq!(g1.len(), g2.len());
            assert_eq!(g1.incomplete_len(), 0);
            assert_eq!(g2.incomplete_len(), 0);
            assert_eq!(g1.missing_len(), 0);
            assert_eq!(g2.missing_len(), 0);
        }
    }

    #[test]
    fn eligible_parents_are_leaves_within_depth_window() {
        let mut g = Graph::new();
        let genesis = genesis_ref(&g);
        let tx1 = child_of(&[&genesis]);
        let tx2 = child_of(&[&tx1]);
        g.add_transaction(tx1.clone()).unwrap();
        g.add_transaction(tx2.clone()).unwrap();

        let eligible = g.find_eligible_parents(10);
        assert_eq!(eligible, vec![tx2.id]);
    }

    #[test]
    fn prune_drops_transactions_below_horizon() {
        let mut g = Graph::new();
        let genesis = genesis_ref(&g);
        let tx1 = child_of(&[&genesis]);
        let tx2 = child_of(&[&tx1]);
        g.add_transaction(tx1.clone()).unwrap();
        g.add_transaction(tx2.clone()).unwrap();

        g.prune(tx2.id, 0);

        assert_eq!(g.root(), tx2.id);
        assert_eq!(g.root_depth(), tx2.depth);
        assert!(g.find(&tx1.id).is_none());
        assert!(g.find(&tx2.id).is_some());
    }
}
