// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

//! Binds the AVL snapshot, the transaction graph, conflict-set tracking,
//! and the contract host together: block application, the account read
//! model, and the RPC query core.

mod account;
mod apply;
mod error;
mod keys;
mod ledger;
mod rpc;

pub use account::Account;
pub use error::LedgerError;
pub use ledger::Ledger;
pub use rpc::{RpcConfig, RpcCore};
