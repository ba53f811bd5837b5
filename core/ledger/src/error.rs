// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

use skein_avl::AvlError;
use skein_contract_host::ContractHostError;
use skein_graph::GraphError;
use skein_tx::CodecError;
use skein_types::{AccountID, MerkleNodeID, TransactionID};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] CodecError),

    #[error("graph rejected transaction: {0}")]
    Graph(#[from] GraphError),

    #[error("contract host: {0}")]
    Contract(#[from] ContractHostError),

    #[error("corrupted or missing snapshot node: {0}")]
    Store(#[from] AvlError),

    #[error("account {account} has insufficient balance: needs {required}, has {available}")]
    InsufficientBalance { account: AccountID, required: u64, available: u64 },

    #[error("transaction nonce {got} does not match expected account nonce {expected}")]
    NonceStale { expected: u64, got: u64 },

    #[error("transaction {0} referenced by block is not in the graph")]
    UnknownTransaction(TransactionID),

    #[error("block merkle root {actual} does not match expected {expected}; block rejected")]
    MerkleRootMismatch { expected: MerkleNodeID, actual: MerkleNodeID },

    #[error("arithmetic overflow applying payload")]
    Overflow,
}
