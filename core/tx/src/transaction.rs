// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

use skein_types::{blake2b_256, leading_zero_bits, AccountID, TransactionID};

use crate::tag::Tag;

/// A transaction in the DAG. `id`, `depth`, `confidence` and `seed` are all
/// derived fields; they are only ever set by [`Transaction::new`] or by the
/// graph on insertion, never constructed independently, so a `Transaction`
/// never carries a value inconsistent with its own parents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: TransactionID,
    pub sender: AccountID,
    pub creator: AccountID,
    pub nonce: u64,
    pub tag: Tag,
    pub payload: Vec<u8>,
    pub parent_ids: Vec<TransactionID>,
    pub depth: u64,
    pub confidence: u64,
    pub seed: u32,
    pub creator_signature: [u8; 64],
    pub sender_signature: [u8; 64],
}

impl Transaction {
    /// Builds a transaction from its wire fields plus the parents' depth and
    /// confidence, computing `seed`, `depth`, `confidence`, and `id`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sender: AccountID,
        creator: AccountID,
        nonce: u64,
        tag: Tag,
        payload: Vec<u8>,
        parent_ids: Vec<TransactionID>,
        parent_depths: &[u64],
        parent_confidences: &[u64],
        creator_signature: [u8; 64],
        sender_signature: [u8; 64],
    ) -> Self {
        let depth = if parent_depths.is_empty() { 0 } else { 1 + parent_depths.iter().copied().max().unwrap() };
        let confidence: u64 = parent_confidences.iter().sum::<u64>() + parent_ids.len() as u64;
        let seed = Self::compute_seed(&sender, &parent_ids);

        let mut tx = Self {
            id: TransactionID::ZERO,
            sender,
            creator,
            nonce,
            tag,
            payload,
            parent_ids,
            depth,
            confidence,
            seed,
            creator_signature,
            sender_signature,
        };
        tx.id = TransactionID(blake2b_256(&tx.marshal_without_id()));
        tx
    }

    /// Synthetic genesis: zero id, depth 0, confidence 0, no parents.
    pub fn genesis() -> Self {
        Self {
            id: TransactionID::ZERO,
            sender: AccountID::ZERO,
            creator: AccountID::ZERO,
            nonce: 0,
            tag: Tag::Transfer,
            payload: Vec::new(),
            parent_ids: Vec::new(),
            depth: 0,
            confidence: 0,
            seed: 0,
            creator_signature: [0u8; 64],
            sender_signature: [0u8; 64],
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.id.is_zero()
    }

    /// `BLAKE2b-256(sender ‖ parent_ids...)`, leading-zero-bit count.
    pub fn compute_seed(sender: &AccountID, parent_ids: &[TransactionID]) -> u32 {
        let mut buf = Vec::with_capacity(AccountID::LEN + parent_ids.len() * TransactionID::LEN);
        buf.extend_from_slice(sender.as_bytes());
        for parent in parent_ids {
            buf.extend_from_slice(parent.as_bytes());
        }
        leading_zero_bits(&blake2b_256(&buf))
    }

    /// Every field except `id` itself, in deterministic wire order; `id`
    /// is the BLAKE2b-256 hash of this buffer.
    fn marshal_without_id(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(self.sender.as_bytes());
        buf.extend_from_slice(self.creator.as_bytes());
        buf.extend_from_slice(&self.nonce.to_le_bytes());
        buf.push(self.tag.as_u8());
        buf.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf.push(self.parent_ids.len() as u8);
        for parent in &self.parent_ids {
            buf.extend_from_slice(parent.as_bytes());
        }
        buf.extend_from_slice(&self.depth.to_le_bytes());
        buf.extend_from_slice(&self.confidence.to_le_bytes());
        buf.extend_from_slice(&self.seed.to_le_bytes());
        buf.extend_from_slice(&self.creator_signature);
        buf.extend_from_slice(&self.sender_signature);
        buf
    }
}
