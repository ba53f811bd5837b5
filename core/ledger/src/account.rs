// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

//! The account read model, supplementing the distilled transfer/stake spec
//! with the exact shape the account query endpoint renders.

use skein_avl::{AvlError, Snapshot, Tree};
use skein_types::AccountID;

use crate::{error::LedgerError, keys};

/// A snapshot-reading view of one account, shaped as the account query
/// endpoint would render it: `{id, balance, gas_balance, stake, reward,
/// nonce, is_contract, num_pages}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Account {
    pub id: AccountID,
    pub balance: u64,
    pub gas_balance: u64,
    pub stake: u64,
    pub reward: u64,
    pub nonce: u64,
    pub is_contract: bool,
    pub num_pages: u64,
}

impl Account {
    pub fn zero(id: AccountID) -> Self {
        Self { id, balance: 0, gas_balance: 0, stake: 0, reward: 0, nonce: 0, is_contract: false, num_pages: 0 }
    }
}

/// Implemented by both the live [`Tree`] and an immutable [`Snapshot`], so
/// account reads work against either a transient working tree or a
/// published snapshot without duplicating the read logic.
pub trait KvRead {
    fn kv_get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, AvlError>;
}

impl KvRead for Tree {
    fn kv_get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, AvlError> {
        self.get(key)
    }
}

impl KvRead for Snapshot {
    fn kv_get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, AvlError> {
        self.get(key)
    }
}

fn read_u64(kv: &impl KvRead, key: Vec<u8>) -> Result<u64, LedgerError> {
    match kv.kv_get(&key)? {
        None => Ok(0),
        Some(bytes) if bytes.len() == 8 => Ok(u64::from_le_bytes(bytes.try_into().unwrap())),
        Some(_) => Err(LedgerError::Overflow),
    }
}

pub fn read_account(kv: &impl KvRead, id: AccountID) -> Result<Account, LedgerError> {
    let is_contract = kv.kv_get(&keys::contract_code(id))?.is_some();
    Ok(Account {
        id,
        balance: read_u64(kv, keys::balance(id))?,
        gas_balance: read_u64(kv, keys::gas_balance(id))?,
        stake: read_u64(kv, keys::stake(id))?,
        reward: read_u64(kv, keys::reward(id))?,
        nonce: read_u64(kv, keys::nonce(id))?,
        is_contract,
        num_pages: read_u64(kv, keys::contract_num_pages(id))?,
    })
}

pub fn write_u64(tree: &mut Tree, key: Vec<u8>, value: u64) -> Result<(), LedgerError> {
    tree.put(key, value.to_le_bytes().to_vec())?;
    Ok(())
}
