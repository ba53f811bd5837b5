// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

//! The immutable, finalized unit that advances a ledger's snapshot root and
//! the graph's root pointer: an index, a Merkle root, and the ordered set
//! of transaction ids it finalizes.

use skein_tx::CodecError;
use skein_types::{blake2b_256, BlockID, MerkleNodeID, TransactionID};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: BlockID,
    pub index: u64,
    pub merkle_root: MerkleNodeID,
    pub transactions: Vec<TransactionID>,
}

impl Block {
    pub fn new(index: u64, merkle_root: MerkleNodeID, transactions: Vec<TransactionID>) -> Self {
        let mut block = Self { id: BlockID::ZERO, index, merkle_root, transactions };
        block.id = BlockID(blake2b_256(&block.marshal()));
        block
    }

    /// `index(u64, be) ‖ merkle_root(16) ‖ tx_count(u32, be) ‖ tx_id(32)*count`.
    pub fn marshal(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + MerkleNodeID::LEN + 4 + self.transactions.len() * TransactionID::LEN);
        buf.extend_from_slice(&self.index.to_be_bytes());
        buf.extend_from_slice(self.merkle_root.as_bytes());
        buf.extend_from_slice(&(self.transactions.len() as u32).to_be_bytes());
        for tx in &self.transactions {
            buf.extend_from_slice(tx.as_bytes());
        }
        buf
    }

    pub fn parse(data: &[u8]) -> Result<Self, CodecError> {
        let mut pos = 0usize;
        let mut take = |n: usize| -> Result<&[u8], CodecError> {
            if data.len() < pos + n {
                return Err(CodecError::Block("truncated block".into()));
            }
            let slice = &data[pos..pos + n];
            pos += n;
            Ok(slice)
        };

        let index = u64::from_be_bytes(take(8)?.try_into().unwrap());
        let merkle_root = MerkleNodeID::from_slice(take(MerkleNodeID::LEN)?).expect("length checked by take");
        let tx_count = u32::from_be_bytes(take(4)?.try_into().unwrap());

        let mut transactions = Vec::with_capacity(tx_count as usize);
        for _ in 0..tx_count {
            transactions.push(TransactionID::from_slice(take(TransactionID::LEN)?).expect("length checked by take"));
        }

        Ok(Self::new(index, merkle_root, transactions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_round_trips_through_marshal_parse() {
        let block = Block::new(3, MerkleNodeID([9; 16]), vec![TransactionID([1; 32]), TransactionID([2; 32])]);
        let parsed = Block::parse(&block.marshal()).unwrap();
        assert_eq!(block, parsed);
    }

    #[test]
    fn identical_content_yields_identical_id() {
        let a = Block::new(1, MerkleNodeID([1; 16]), vec![TransactionID([5; 32])]);
        let b = Block::new(1, MerkleNodeID([1; 16]), vec![TransactionID([5; 32])]);
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn parse_rejects_truncated_input() {
        let block = Block::new(1, MerkleNodeID([1; 16]), vec![TransactionID([5; 32])]);
        let encoded = block.marshal();
        assert!(Block::parse(&encoded[..encoded.len() - 1]).is_err());
    }
}
