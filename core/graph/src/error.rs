// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

use skein_types::TransactionID;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("transaction {0} references one or more parents not yet in the graph")]
    MissingParents(TransactionID),

    #[error("transaction {0} has a depth or confidence inconsistent with its parents")]
    InvalidParents(TransactionID),

    #[error("transaction {0} already exists in the graph")]
    AlreadyExists(TransactionID),

    #[error("transaction {0} is malformed: {1}")]
    Malformed(TransactionID, String),
}
