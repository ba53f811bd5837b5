// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

//! Executes a single transaction's payload against a transient [`Tree`].
//! Every function here takes `&mut Tree` and returns `Err` on any failure
//! without attempting to undo its own partial writes -- the caller
//! (`Ledger::apply_block`) runs each transaction against a disposable fork
//! and only merges it back on success, which is what gives a failed
//! transaction (bad nonce, insufficient balance, contract trap or
//! out-of-gas) whole-transaction rollback for free.

use skein_avl::Tree;
use skein_contract_host::{GasMeter, NullContractHost, SimpleGasMeter};
use skein_tx::{Batch, Contract, Stake, Tag, Transaction, Transfer, PLACE_STAKE, WITHDRAW_REWARD, WITHDRAW_STAKE};
use skein_types::{blake2b_256, AccountID};

use crate::{
    account::{read_account, write_u64},
    error::LedgerError,
    keys,
};

/// Applies `tx`'s payload and, on success, bumps the sender's nonce.
pub fn apply_transaction(tree: &mut Tree, tx: &Transaction, gas_price: u64) -> Result<(), LedgerError> {
    let sender_account = read_account(tree, tx.sender)?;
    if tx.nonce != sender_account.nonce {
        return Err(LedgerError::NonceStale { expected: sender_account.nonce, got: tx.nonce });
    }

    apply_payload(tree, tx.tag, &tx.payload, tx.sender, tx.id, gas_price)?;

    write_u64(tree, keys::nonce(tx.sender), sender_account.nonce + 1)
}

fn apply_payload(
    tree: &mut Tree,
    tag: Tag,
    payload: &[u8],
    sender: AccountID,
    contract_seed: skein_types::TransactionID,
    gas_price: u64,
) -> Result<(), LedgerError> {
    match tag {
        Tag::Transfer => apply_transfer(tree, payload, sender, gas_price),
        Tag::Stake => apply_stake(tree, payload, sender),
        Tag::Contract => apply_contract(tree, payload, sender, contract_account_id(contract_seed, None), gas_price),
        Tag::Batch => apply_batch(tree, payload, sender, contract_seed, gas_price),
    }
}

fn apply_transfer(tree: &mut Tree, payload: &[u8], sender: AccountID, gas_price: u64) -> Result<(), LedgerError> {
    let transfer = Transfer::parse(payload)?;

    let gas_cost = transfer.gas_limit.checked_mul(gas_price).ok_or(LedgerError::Overflow)?;
    let cost = transfer.amount.checked_add(gas_cost).ok_or(LedgerError::Overflow)?;

    let mut sender_account = read_account(tree, sender)?;
    if sender_account.balance < cost {
        return Err(LedgerError::InsufficientBalance { account: sender, required: cost, available: sender_account.balance });
    }
    sender_account.balance -= cost;
    write_u64(tree, keys::balance(sender), sender_account.balance)?;

    let mut recipient_account = read_account(tree, transfer.recipient)?;
    recipient_account.balance =
        recipient_account.balance.checked_add(transfer.amount).ok_or(LedgerError::Overflow)?;
    write_u64(tree, keys::balance(transfer.recipient), recipient_account.balance)?;

    if let Some(func_name) = &transfer.func_name {
        let func_name = String::from_utf8_lossy(func_name);
        let params = transfer.func_params.clone().unwrap_or_default();

        let mut host = NullContractHost::new(transfer.recipient, sender);
        let mut gas = SimpleGasMeter::new(transfer.gas_limit);
        host.call(func_name.as_ref(), &params, &mut gas)?;

        let refund = gas.remaining().checked_mul(gas_price).ok_or(LedgerError::Overflow)?;
        let mut sender_account = read_account(tree, sender)?;
        sender_account.balance = sender_account.balance.checked_add(refund).ok_or(LedgerError::Overflow)?;
        write_u64(tree, keys::balance(sender), sender_account.balance)?;
    }

    Ok(())
}

fn apply_stake(tree: &mut Tree, payload: &[u8], sender: AccountID) -> Result<(), LedgerError> {
    let stake = Stake::parse(payload)?;
    let mut account = read_account(tree, sender)?;

    match stake.opcode {
        WITHDRAW_STAKE => {
            if account.stake < stake.amount {
                return Err(LedgerError::InsufficientBalance { account: sender, required: stake.amount, available: account.stake });
            }
            account.stake -= stake.amount;
            account.balance = account.balance.checked_add(stake.amount).ok_or(LedgerError::Overflow)?;
            write_u64(tree, keys::stake(sender), account.stake)?;
            write_u64(tree, keys::balance(sender), account.balance)?;
        },
        PLACE_STAKE => {
            if account.balance < stake.amount {
                return Err(LedgerError::InsufficientBalance { account: sender, required: stake.amount, available: account.balance });
            }
            account.balance -= stake.amount;
            account.stake = account.stake.checked_add(stake.amount).ok_or(LedgerError::Overflow)?;
            write_u64(tree, keys::balance(sender), account.balance)?;
            write_u64(tree, keys::stake(sender), account.stake)?;
        },
        WITHDRAW_REWARD => {
            if account.reward < stake.amount {
                return Err(LedgerError::InsufficientBalance { account: sender, required: stake.amount, available: account.reward });
            }
            account.reward -= stake.amount;
            account.balance = account.balance.checked_add(stake.amount).ok_or(LedgerError::Overflow)?;
            write_u64(tree, keys::reward(sender), account.reward)?;
            write_u64(tree, keys::balance(sender), account.balance)?;
        },
        _ => unreachable!("Stake::parse already rejects opcodes above withdraw_reward"),
    }

    Ok(())
}

fn apply_contract(
    tree: &mut Tree,
    payload: &[u8],
    sender: AccountID,
    contract_id: AccountID,
    gas_price: u64,
) -> Result<(), LedgerError> {
    let contract = Contract::parse(payload)?;

    let gas_cost = contract.gas_limit.checked_mul(gas_price).ok_or(LedgerError::Overflow)?;
    let total_cost = gas_cost.checked_add(contract.gas_deposit).ok_or(LedgerError::Overflow)?;

    let mut sender_account = read_account(tree, sender)?;
    if sender_account.balance < total_cost {
        return Err(LedgerError::InsufficientBalance { account: sender, required: total_cost, available: sender_account.balance });
    }
    sender_account.balance -= total_cost;
    write_u64(tree, keys::balance(sender), sender_account.balance)?;

    tree.put(keys::contract_code(contract_id), contract.code)?;
    write_u64(tree, keys::contract_num_pages(contract_id), 1)?;
    write_u64(tree, keys::gas_balance(contract_id), contract.gas_deposit)?;

    Ok(())
}

fn apply_batch(
    tree: &mut Tree,
    payload: &[u8],
    sender: AccountID,
    contract_seed: skein_types::TransactionID,
    gas_price: u64,
) -> Result<(), LedgerError> {
    let batch = Batch::parse(payload)?;

    for (index, (tag, entry)) in batch.tags.iter().zip(batch.payloads.iter()).enumerate() {
        match tag {
            Tag::Transfer => apply_transfer(tree, entry, sender, gas_price)?,
            Tag::Stake => apply_stake(tree, entry, sender)?,
            Tag::Contract => {
                apply_contract(tree, entry, sender, contract_account_id(contract_seed, Some(index as u32)), gas_price)?
            },
            Tag::Batch => unreachable!("Batch::parse already rejects nested batch entries"),
        }
    }

    Ok(())
}

/// The contract account created by a deploy: the transaction's own id for a
/// top-level deploy, or a per-entry derived id for a deploy nested in a
/// batch (so two contract deploys in the same batch don't collide).
fn contract_account_id(seed: skein_types::TransactionID, batch_index: Option<u32>) -> AccountID {
    match batch_index {
        None => AccountID::from_slice(seed.as_bytes()).expect("TransactionID and AccountID are both 32 bytes"),
        Some(index) => {
            let mut buf = seed.as_bytes().to_vec();
            buf.extend_from_slice(&index.to_be_bytes());
            AccountID(blake2b_256(&buf))
        },
    }
}
