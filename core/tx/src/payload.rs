// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

use skein_types::AccountID;

use crate::{error::CodecError, tag::Tag};

const MAX_FUNC_NAME_LEN: usize = 1024;
const MAX_CONTRACT_PAYLOAD: usize = 1024 * 1024;
const MAX_BATCH_ENTRY_LEN: usize = 2 * 1024 * 1024;

pub const WITHDRAW_STAKE: u8 = 0;
pub const PLACE_STAKE: u8 = 1;
pub const WITHDRAW_REWARD: u8 = 2;
const MIN_REWARD_WITHDRAWAL: u64 = 100;

/// A byte cursor that fails fast with the codec's own errors instead of
/// `std::io`'s, since every read site needs a distinct, wire-compatible
/// message.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.remaining() < n {
            return None;
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Some(slice)
    }

    fn take_u64_le(&mut self) -> Option<u64> {
        self.take(8).map(|b| u64::from_le_bytes(b.try_into().unwrap()))
    }

    fn take_u32_le(&mut self) -> Option<u32> {
        self.take(4).map(|b| u32::from_le_bytes(b.try_into().unwrap()))
    }

    fn take_u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub recipient: AccountID,
    pub amount: u64,
    pub gas_limit: u64,
    pub gas_deposit: u64,
    pub func_name: Option<Vec<u8>>,
    pub func_params: Option<Vec<u8>>,
}

impl Transfer {
    pub fn marshal(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32 + 8 + 8 + 8 + 4 + 4);
        buf.extend_from_slice(self.recipient.as_bytes());
        buf.extend_from_slice(&self.amount.to_le_bytes());
        buf.extend_from_slice(&self.gas_limit.to_le_bytes());
        buf.extend_from_slice(&self.gas_deposit.to_le_bytes());
        if let Some(name) = &self.func_name {
            buf.extend_from_slice(&(name.len() as u32).to_le_bytes());
            buf.extend_from_slice(name);
            if let Some(params) = &self.func_params {
                buf.extend_from_slice(&(params.len() as u32).to_le_bytes());
                buf.extend_from_slice(params);
            }
        }
        buf
    }

    pub fn parse(data: &[u8]) -> Result<Self, CodecError> {
        let mut c = Cursor::new(data);

        let recipient = c
            .take(AccountID::LEN)
            .ok_or_else(|| CodecError::Transfer("failed to decode recipient".into()))?;
        let recipient = AccountID::from_slice(recipient).expect("length checked by take()");

        let amount = c
            .take_u64_le()
            .ok_or_else(|| CodecError::Transfer("failed to decode amount of PERLs to send".into()))?;

        if c.remaining() == 0 {
            return Ok(Self { recipient, amount, gas_limit: 0, gas_deposit: 0, func_name: None, func_params: None });
        }
        let gas_limit = c
            .take_u64_le()
            .ok_or_else(|| CodecError::Transfer("failed to decode gas limit".into()))?;

        if c.remaining() == 0 {
            return Ok(Self { recipient, amount, gas_limit, gas_deposit: 0, func_name: None, func_params: None });
        }
        let gas_deposit = c
            .take_u64_le()
            .ok_or_else(|| CodecError::Transfer("failed to decode gas deposit".into()))?;

        if c.remaining() == 0 {
            return Ok(Self { recipient, amount, gas_limit, gas_deposit, func_name: None, func_params: None });
        }
        let func_name_len = c.take_u32_le().ok_or_else(|| {
            CodecError::Transfer("failed to decode size of smart contract function name to invoke".into())
        })? as usize;

        let func_name = if func_name_len > 0 {
            if gas_limit == 0 {
                return Err(CodecError::Transfer(
                    "gas limit for invoking smart contract function must be greater than zero".into(),
                ));
            }
            if func_name_len > MAX_FUNC_NAME_LEN {
                return Err(CodecError::Transfer("smart contract function name exceeds 1024 characters".into()));
            }
            let name = c.take(func_name_len).ok_or_else(|| {
                CodecError::Transfer("failed to decode smart contract function name to invoke".into())
            })?;
            if name == b"init" {
                return Err(CodecError::Transfer("not allowed to call init function for smart contract".into()));
            }
            Some(name.to_vec())
        } else {
            None
        };

        if c.remaining() == 0 {
            return Ok(Self { recipient, amount, gas_limit, gas_deposit, func_name, func_params: None });
        }
        let func_params_len = c.take_u32_le().ok_or_else(|| {
            CodecError::Transfer("failed to decode number of smart contract function invocation parameters".into())
        })? as usize;

        if func_params_len > MAX_CONTRACT_PAYLOAD {
            return Err(CodecError::Transfer("smart contract payload exceeds 1MB".into()));
        }
        let func_params = c
            .take(func_params_len)
            .ok_or_else(|| CodecError::Transfer("failed to decode smart contract function invocation parameters".into()))?
            .to_vec();

        Ok(Self { recipient, amount, gas_limit, gas_deposit, func_name, func_params: Some(func_params) })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stake {
    pub opcode: u8,
    pub amount: u64,
}

impl Stake {
    pub fn marshal(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(9);
        buf.push(self.opcode);
        buf.extend_from_slice(&self.amount.to_le_bytes());
        buf
    }

    pub fn parse(data: &[u8]) -> Result<Self, CodecError> {
        if data.len() != 9 {
            return Err(CodecError::Stake("payload must be exactly 9 bytes".into()));
        }
        let opcode = data[0];
        if opcode > WITHDRAW_REWARD {
            return Err(CodecError::Stake("opcode must be 0, 1, or 2".into()));
        }
        let amount = u64::from_le_bytes(data[1..9].try_into().unwrap());
        if amount == 0 {
            return Err(CodecError::Stake("amount must be greater than zero".into()));
        }
        if opcode == WITHDRAW_REWARD && amount < MIN_REWARD_WITHDRAWAL {
            return Err(CodecError::Stake(format!(
                "must withdraw a reward of a minimum of {MIN_REWARD_WITHDRAWAL} PERLs, but requested to withdraw {amount} PERLs"
            )));
        }
        Ok(Self { opcode, amount })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    pub gas_limit: u64,
    pub gas_deposit: u64,
    pub params: Vec<u8>,
    pub code: Vec<u8>,
}

impl Contract {
    pub fn marshal(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + 8 + 4 + self.params.len() + self.code.len());
        buf.extend_from_slice(&self.gas_limit.to_le_bytes());
        buf.extend_from_slice(&self.gas_deposit.to_le_bytes());
        buf.extend_from_slice(&(self.params.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.params);
        buf.extend_from_slice(&self.code);
        buf
    }

    pub fn parse(data: &[u8]) -> Result<Self, CodecError> {
        let mut c = Cursor::new(data);

        let gas_limit = c.take_u64_le().ok_or_else(|| CodecError::Contract("failed to decode gas limit".into()))?;
        let gas_deposit =
            c.take_u64_le().ok_or_else(|| CodecError::Contract("failed to decode gas deposit".into()))?;

        if gas_limit == 0 {
            return Err(CodecError::Contract(
                "gas limit for invoking smart contract function must be greater than zero".into(),
            ));
        }

        let params_len = c
            .take_u32_le()
            .ok_or_else(|| CodecError::Contract("failed to decode number of smart contract init parameters".into()))?
            as usize;
        if params_len > MAX_CONTRACT_PAYLOAD {
            return Err(CodecError::Contract("smart contract payload exceeds 1MB".into()));
        }
        let params = c
            .take(params_len)
            .ok_or_else(|| CodecError::Contract("failed to decode smart contract init parameters".into()))?
            .to_vec();

        let code = c.take(c.remaining()).unwrap_or(&[]).to_vec();
        if code.is_empty() {
            return Err(CodecError::Contract("smart contract must have code of length greater than zero".into()));
        }

        Ok(Self { gas_limit, gas_deposit, params, code })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    pub tags: Vec<Tag>,
    pub payloads: Vec<Vec<u8>>,
}

impl Batch {
    pub fn add_transfer(&mut self, transfer: Transfer) -> Result<(), CodecError> {
        self.push(Tag::Transfer, transfer.marshal())
    }

    pub fn add_stake(&mut self, stake: Stake) -> Result<(), CodecError> {
        self.push(Tag::Stake, stake.marshal())
    }

    pub fn add_contract(&mut self, contract: Contract) -> Result<(), CodecError> {
        self.push(Tag::Contract, contract.marshal())
    }

    fn push(&mut self, tag: Tag, payload: Vec<u8>) -> Result<(), CodecError> {
        self.tags.push(tag);
        self.payloads.push(payload);
        Ok(())
    }

    pub fn marshal(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1);
        buf.push(self.tags.len() as u8);
        for (tag, payload) in self.tags.iter().zip(self.payloads.iter()) {
            buf.push(tag.as_u8());
            buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            buf.extend_from_slice(payload);
        }
        buf
    }

    pub fn parse(data: &[u8]) -> Result<Self, CodecError> {
        let mut c = Cursor::new(data);

        let count = c
            .take_u8()
            .ok_or_else(|| CodecError::Batch("failed to decode number of transactions in batch".into()))?;
        if count == 0 {
            return Err(CodecError::Batch("size must be greater than zero".into()));
        }

        let mut tags = Vec::with_capacity(count as usize);
        let mut payloads = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let raw_tag = c.take_u8().ok_or_else(|| CodecError::Batch("could not read tag".into()))?;
            let tag = Tag::from_u8(raw_tag).ok_or_else(|| CodecError::Batch("could not read tag".into()))?;
            if tag == Tag::Batch {
                return Err(CodecError::Batch(
                    "entries inside batch cannot be batch transactions themselves".into(),
                ));
            }

            let payload_len =
                c.take_u32_le().ok_or_else(|| CodecError::Batch("could not read payload size".into()))? as usize;
            if payload_len > MAX_BATCH_ENTRY_LEN {
                return Err(CodecError::Batch("payload size exceeds 2MB".into()));
            }
            let payload = c.take(payload_len).ok_or_else(|| CodecError::Batch("could not read payload".into()))?;

            tags.push(tag);
            payloads.push(payload.to_vec());
        }

        Ok(Self { tags, payloads })
    }
}
