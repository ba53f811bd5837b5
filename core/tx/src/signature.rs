// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

use ed25519_dalek::{PublicKey, Signature, Verifier};

use crate::{error::CodecError, wire::WireTransaction};

/// Validates both the creator and sender Ed25519 signatures on a
/// [`WireTransaction`] against the identities it carries. `creator` and
/// `sender` double as Ed25519 public keys (an `AccountID` is exactly 32
/// bytes, the same width as a compressed Ed25519 key).
pub fn validate_wired_transaction(tx: &WireTransaction) -> Result<(), CodecError> {
    verify(tx.creator.as_bytes(), &tx.creator_signing_prefix(), &tx.creator_signature)
        .map_err(|_| CodecError::WireTransaction("creator signature is invalid".into()))?;
    verify(tx.sender.as_bytes(), &tx.sender_signing_prefix(), &tx.sender_signature)
        .map_err(|_| CodecError::WireTransaction("sender signature is invalid".into()))?;
    Ok(())
}

fn verify(public_key: &[u8], message: &[u8], signature: &[u8; 64]) -> Result<(), ()> {
    let public_key = PublicKey::from_bytes(public_key).map_err(|_| ())?;
    let signature = Signature::from_bytes(signature).map_err(|_| ())?;
    public_key.verify(message, &signature).map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::{Keypair, Signer};
    use rand::rngs::OsRng;
    use skein_types::{AccountID, TransactionID};

    use super::*;
    use crate::tag::Tag;

    fn signed(creator: &Keypair, sender: &Keypair, nonce: u64) -> WireTransaction {
        let mut tx = WireTransaction {
            tag: Tag::Transfer,
            payload: vec![1, 2, 3],
            parent_ids: vec![TransactionID([1; 32])],
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
    fn valid_signatures_are_accepted() {
        let mut csprng = OsRng {};
        let creator = Keypair::generate(&mut csprng);
        let sender = Keypair::generate(&mut csprng);
        let tx = signed(&creator, &sender, 7);
        assert!(validate_wired_transaction(&tx).is_ok());
    }

    #[test]
    fn tampered_nonce_invalidates_sender_signature() {
        let mut csprng = OsRng {};
        let creator = Keypair::generate(&mut csprng);
        let sender = Keypair::generate(&mut csprng);
        let mut tx = signed(&creator, &sender, 7);
        tx.nonce = 8;
        assert!(validate_wired_transaction(&tx).is_err());
    }
}
