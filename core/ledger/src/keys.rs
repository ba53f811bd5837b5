// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

//! Snapshot key encoding: a one-byte domain tag followed by the account id
//! (and, for contract pages, an eight-byte big-endian page index), per
//! `spec.md` §6 ("each logical key is a concatenation of a one-byte domain
//! tag and the account id").

use skein_types::AccountID;

const BALANCE: u8 = 0;
const STAKE: u8 = 1;
const REWARD: u8 = 2;
const NONCE: u8 = 3;
const GAS_BALANCE: u8 = 4;
const CONTRACT_CODE: u8 = 5;
const CONTRACT_NUM_PAGES: u8 = 6;
const CONTRACT_PAGE: u8 = 7;

fn tagged(tag: u8, id: AccountID) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + AccountID::LEN);
    key.push(tag);
    key.extend_from_slice(id.as_bytes());
    key
}

pub fn balance(id: AccountID) -> Vec<u8> {
    tagged(BALANCE, id)
}

pub fn stake(id: AccountID) -> Vec<u8> {
    tagged(STAKE, id)
}

pub fn reward(id: AccountID) -> Vec<u8> {
    tagged(REWARD, id)
}

pub fn nonce(id: AccountID) -> Vec<u8> {
    tagged(NONCE, id)
}

pub fn gas_balance(id: AccountID) -> Vec<u8> {
    tagged(GAS_BALANCE, id)
}

pub fn contract_code(id: AccountID) -> Vec<u8> {
    tagged(CONTRACT_CODE, id)
}

pub fn contract_num_pages(id: AccountID) -> Vec<u8> {
    tagged(CONTRACT_NUM_PAGES, id)
}

pub fn contract_page(id: AccountID, index: u64) -> Vec<u8> {
    let mut key = tagged(CONTRACT_PAGE, id);
    key.extend_from_slice(&index.to_be_bytes());
    key
}
