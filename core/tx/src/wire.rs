// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

use skein_types::{AccountID, TransactionID};

use crate::{error::CodecError, tag::Tag};

/// The over-the-wire, signed-over encoding of a transaction: `tag ‖
/// payload_len ‖ payload ‖ parent_count ‖ parent_id*count ‖ creator ‖
/// creator_sig ‖ sender ‖ sender_sig ‖ nonce`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireTransaction {
    pub tag: Tag,
    pub payload: Vec<u8>,
    pub parent_ids: Vec<TransactionID>,
    pub creator: AccountID,
    pub creator_signature: [u8; 64],
    pub sender: AccountID,
    pub sender_signature: [u8; 64],
    pub nonce: u64,
}

impl WireTransaction {
    fn header(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.push(self.tag.as_u8());
        buf.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf.push(self.parent_ids.len() as u8);
        for parent in &self.parent_ids {
            buf.extend_from_slice(parent.as_bytes());
        }
        buf
    }

    /// The prefix the creator's signature is computed over: header plus
    /// `creator`.
    pub fn creator_signing_prefix(&self) -> Vec<u8> {
        let mut buf = self.header();
        buf.extend_from_slice(self.creator.as_bytes());
        buf
    }

    /// The prefix the sender's signature is computed over: header plus
    /// `creator`, `sender`, and `nonce`.
    pub fn sender_signing_prefix(&self) -> Vec<u8> {
        let mut buf = self.creator_signing_prefix();
        buf.extend_from_slice(self.sender.as_bytes());
        buf.extend_from_slice(&self.nonce.to_le_bytes());
        buf
    }

    pub fn marshal(&self) -> Vec<u8> {
        let mut buf = self.header();
        buf.extend_from_slice(self.creator.as_bytes());
        buf.extend_from_slice(&self.creator_signature);
        buf.extend_from_slice(self.sender.as_bytes());
        buf.extend_from_slice(&self.sender_signature);
        buf.extend_from_slice(&self.nonce.to_le_bytes());
        buf
    }

    pub fn parse(data: &[u8]) -> Result<Self, CodecError> {
        let mut pos = 0usize;
        let mut take = |n: usize| -> Result<&[u8], CodecError> {
            if data.len() < pos + n {
                return Err(CodecError::WireTransaction("truncated wire transaction".into()));
            }
            let slice = &data[pos..pos + n];
            pos += n;
            Ok(slice)
        };

        let raw_tag = take(1)?[0];
        let tag = Tag::from_u8(raw_tag)
            .ok_or_else(|| CodecError::WireTransaction(format!("unknown transaction tag {raw_tag}")))?;

        let payload_len = u32::from_le_bytes(take(4)?.try_into().unwrap()) as usize;
        let payload = take(payload_len)?.to_vec();

        let parent_count = take(1)?[0];
        let mut parent_ids = Vec::with_capacity(parent_count as usize);
        for _ in 0..parent_count {
            parent_ids.push(TransactionID::from_slice(take(TransactionID::LEN)?).expect("length checked by take"));
        }

        let creator = AccountID::from_slice(take(AccountID::LEN)?).expect("length checked by take");
        let mut creator_signature = [0u8; 64];
        creator_signature.copy_from_slice(take(64)?);

        let sender = AccountID::from_slice(take(AccountID::LEN)?).expect("length checked by take");
        let mut sender_signature = [0u8; 64];
        sender_signature.copy_from_slice(take(64)?);

        let nonce = u64::from_le_bytes(take(8)?.try_into().unwrap());

        Ok(Self { tag, payload, parent_ids, creator, creator_signature, sender, sender_signature, nonce })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WireTransaction {
        WireTransaction {
            tag: Tag::Transfer,
            payload: vec![1, 2, 3, 4],
            parent_ids: vec![TransactionID([1; 32]), TransactionID([2; 32])],
            creator: AccountID([3; 32]),
            creator_signature: [4; 64],
            sender: AccountID([5; 32]),
            sender_signature: [6; 64],
            nonce: 42,
        }
    }

    #[test]
    fn wire_transaction_round_trips() {
        let tx = sample();
        assert_eq!(WireTransaction::parse(&tx.marshal()).unwrap(), tx);
    }

    #[test]
    fn wire_transaction_rejects_truncated_input() {
        let tx = sample();
        let encoded = tx.marshal();
        assert!(WireTransaction::parse(&encoded[..encoded.len() - 1]).is_err());
    }
}
