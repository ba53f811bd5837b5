// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

//! Transaction payload codecs (transfer, stake, contract, batch), the
//! derived [`Transaction`] fields (id, depth, confidence, seed), and the
//! over-the-wire [`WireTransaction`] marshal/parse/signature pair.

mod error;
mod payload;
mod signature;
mod tag;
mod transaction;
mod wire;

pub use error::CodecError;
pub use payload::{Batch, Contract, Stake, Transfer, PLACE_STAKE, WITHDRAW_REWARD, WITHDRAW_STAKE};
pub use signature::validate_wired_transaction;
pub use tag::Tag;
pub use transaction::Transaction;
pub use wire::WireTransaction;
