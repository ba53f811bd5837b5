// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("transfer: {0}")]
    Transfer(String),

    #[error("stake: {0}")]
    Stake(String),

    #[error("contract: {0}")]
    Contract(String),

    #[error("batch: {0}")]
    Batch(String),

    #[error("wire transaction: {0}")]
    WireTransaction(String),

    #[error("block: {0}")]
    Block(String),
}
