// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

//! Query-response plumbing: validating and admitting an incoming wire
//! transaction, and updating conflict sets after a successful sampling
//! query.

use std::collections::{HashSet, VecDeque};

use skein_tx::{validate_wired_transaction, Transaction, WireTransaction};
use skein_types::TransactionID;

use crate::{error::LedgerError, ledger::Ledger};

/// The depth bound within which a transaction's ancestors are checked for
/// "strongly preferred" status, and the toggle for the conflict-set
/// update's uncertain "skip if already accepted" short-circuit (`spec.md`
/// §9 open question -- exposed here as a configurable heuristic rather
/// than baked into the protocol).
#[derive(Debug, Clone, Copy)]
pub struct RpcConfig {
    pub strongly_preferred_depth: u64,
    pub short_circuit_accepted: bool,
    pub beta2: u32,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self { strongly_preferred_depth: 32, short_circuit_accepted: true, beta2: 10 }
    }
}

pub struct RpcCore {
    config: RpcConfig,
}

impl RpcCore {
    pub fn new(config: RpcConfig) -> Self {
        Self { config }
    }

    /// Validates signatures, builds the transaction's derived fields, and
    /// inserts it into the graph. Returns `(id, strongly_preferred)` on
    /// success; `MissingParents` is forwarded by the caller as a non-fatal
    /// parked state rather than an error, per `spec.md` §7.
    pub fn respond_to_query(
        &self,
        ledger: &mut Ledger,
        wire_tx: &WireTransaction,
    ) -> Result<(TransactionID, bool), LedgerError> {
        validate_wired_transaction(wire_tx)?;

        let sender_account = ledger.account(wire_tx.sender)?;
        if wire_tx.nonce < sender_account.nonce {
            return Err(LedgerError::NonceStale { expected: sender_account.nonce, got: wire_tx.nonce });
        }

        let graph = ledger.graph();
        let mut parent_depths = Vec::with_capacity(wire_tx.parent_ids.len());
        let mut parent_confidences = Vec::with_capacity(wire_tx.parent_ids.len());
        for parent in &wire_tx.parent_ids {
            if let Some(parent_tx) = graph.find(parent) {
                parent_depths.push(parent_tx.depth);
                parent_confidences.push(parent_tx.confidence);
            }
        }

        let tx = Transaction::new(
            wire_tx.sender,
            wire_tx.creator,
            wire_tx.nonce,
            wire_tx.tag,
            wire_tx.payload.clone(),
            wire_tx.parent_ids.clone(),
            &parent_depths,
            &parent_confidences,
            wire_tx.creator_signature,
            wire_tx.sender_signature,
        );
        let id = tx.id;

        match ledger.add_transaction(tx) {
            Ok(()) => {},
            Err(skein_graph::GraphError::MissingParents(_)) => return Ok((id, false)),
            Err(err) => return Err(err.into()),
        }

        let strongly_preferred = self.is_strongly_preferred(ledger, id);
        Ok((id, strongly_preferred))
    }

    fn is_strongly_preferred(&self, ledger: &Ledger, id: TransactionID) -> bool {
        let Some(tx) = ledger.graph().find(&id) else { return false };
        let start_depth = tx.depth;

        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([id]);

        while let Some(current_id) = queue.pop_front() {
            if !visited.insert(current_id) {
                continue;
            }
            let Some(current) = ledger.graph().find(&current_id) else { continue };
            if start_depth.saturating_sub(current.depth) > self.config.strongly_preferred_depth {
                continue;
            }

            if current.is_genesis() {
                continue;
            }

            let set = ledger.conflicts().get(current.sender, current.nonce);
            if set.preferred != current.id {
                return false;
            }

            for parent in &current.parent_ids {
                queue.push_back(*parent);
            }
        }

        true
    }

    /// BFS over `tx`'s ancestors, updating each ancestor's conflict set per
    /// §4.D. When `short_circuit_accepted` is set, an ancestor whose set is
    /// already decided with `preferred == ancestor` is not revisited and
    /// its own ancestors are not explored further, bounding the work.
    pub fn handle_successful_query(&self, ledger: &Ledger, tx: TransactionID) {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([tx]);

        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            let Some(current) = ledger.graph().find(&id) else { continue };
            if current.is_genesis() {
                continue;
            }

            let already_accepted = {
                let set = ledger.conflicts().get(current.sender, current.nonce);
                set.preferred == current.id && set.is_decided(self.config.beta2)
            };

            if self.config.short_circuit_accepted && already_accepted {
                continue;
            }

            ledger.conflicts().update_on_successful_query(
                ledger.graph(),
                current.sender,
                current.nonce,
                current.id,
                self.config.beta2,
            );

            for parent in &current.parent_ids {
                queue.push_back(*parent);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::{Keypair, Signer};
    use rand::rngs::OsRng;
    use skein_tx::Tag;
    use skein_types::AccountID;

    use super::*;

    fn signed_wire(creator: &Keypair, sender: &Keypair, nonce: u64, parent_ids: Vec<TransactionID>) -> WireTransaction {
        let mut tx = WireTransaction {
            tag: Tag::Transfer,
            payload: vec![1, 2, 3],
            parent_ids,
            creator: AccountID::from_slice(creator.public.as_bytes()).unwrap(),
            creator_signature: [0; 64],
            sender: AccountID::from_slice(sender.public.as_bytes()).unwrap(),
            sender_signature: [0; 64],
            nonce,
        };
        tx.creator_signature = creator.sign(&tx.creator_signing_prefix()).to_bytes();
        tx.sender_signature = sender.sign(&tx.sender_signing_prefix()).to_bytes();
        tx
    }

    #[test]
    fn respond_to_query_admits_a_valid_root_child() {
        let sender = Keypair::generate(&mut OsRng {});
        let sender_id = AccountID::from_slice(sender.public.as_bytes()).unwrap();
        let mut ledger = Ledger::new(sender_id);

        let wire_tx = signed_wire(&sender, &sender, 0, vec![TransactionID::ZERO]);
        let rpc = RpcCore::new(RpcConfig::default());

        let (id, _) = rpc.respond_to_query(&mut ledger, &wire_tx).unwrap();
        assert!(ledger.graph().find(&id).is_some());
    }

    #[test]
    fn respond_to_query_rejects_stale_nonce() {
        let sender = Keypair::generate(&mut OsRng {});
        let sender_id = AccountID::from_slice(sender.public.as_bytes()).unwrap();
        let mut ledger = Ledger::new(sender_id);
        ledger.seed_nonce(sender_id, 5).unwrap();

        let rpc = RpcCore::new(RpcConfig::default());
        let stale = signed_wire(&sender, &sender, 2, vec![TransactionID::ZERO]);
        assert!(matches!(rpc.respond_to_query(&mut ledger, &stale), Err(LedgerError::NonceStale { .. })));
    }

    #[test]
    fn handle_successful_query_updates_conflict_set_for_ancestors() {
        let sender = Keypair::generate(&mut OsRng {});
        let sender_id = AccountID::from_slice(sender.public.as_bytes()).unwrap();
        let mut ledger = Ledger::new(sender_id);
        let rpc = RpcCore::new(RpcConfig::default());

        let wire_tx = signed_wire(&sender, &sender, 0, vec![TransactionID::ZERO]);
        let (id, _) = rpc.respond_to_query(&mut ledger, &wire_tx).unwrap();

        rpc.handle_successful_query(&ledger, id);

        let tx = ledger.graph().find(&id).unwrap().clone();
        let set = ledger.conflicts().get(tx.sender, tx.nonce);
        assert_eq!(set.preferred, id);
    }
}
