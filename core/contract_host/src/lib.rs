// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

//! The syscall surface a WASM contract runtime is given access to:
//! snapshot read/write, paged linear memory, and deterministic gas
//! accounting. No interpreter lives in this crate -- the runtime itself is
//! an external collaborator; [`NullContractHost`] is a deterministic stub
//! used to exercise the Transfer/Contract dispatch path in tests without a
//! real VM.

use std::collections::HashMap;

use skein_types::AccountID;
use thiserror::Error;

pub const PAGE_SIZE: u64 = 64 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContractHostError {
    #[error("out of gas")]
    OutOfGas,

    #[error("contract trapped: {0}")]
    Trap(String),

    #[error("page {0} out of bounds")]
    PageOutOfBounds(u64),
}

pub trait GasMeter {
    fn remaining(&self) -> u64;

    /// Deducts `amount` gas, failing with [`ContractHostError::OutOfGas`]
    /// if the meter would go negative.
    fn charge(&mut self, amount: u64) -> Result<(), ContractHostError>;
}

/// A fixed-budget gas meter: `charge` is a plain saturating subtraction
/// with a floor check, deterministic regardless of host platform.
pub struct SimpleGasMeter {
    remaining: u64,
}

impl SimpleGasMeter {
    pub fn new(limit: u64) -> Self {
        Self { remaining: limit }
    }
}

impl GasMeter for SimpleGasMeter {
    fn remaining(&self) -> u64 {
        self.remaining
    }

    fn charge(&mut self, amount: u64) -> Result<(), ContractHostError> {
        self.remaining = self.remaining.checked_sub(amount).ok_or(ContractHostError::OutOfGas)?;
        Ok(())
    }
}

/// Syscalls exposed to a contract invocation: snapshot read/write scoped
/// to the calling account, paged linear memory, and the calling
/// identities.
pub trait ContractHost {
    fn self_id(&self) -> AccountID;
    fn sender_id(&self) -> AccountID;
    fn snapshot_read(&self, key: &[u8]) -> Option<Vec<u8>>;
    fn snapshot_write(&mut self, key: Vec<u8>, value: Vec<u8>);
    fn log(&mut self, message: &str);
    fn num_pages(&self) -> u64;
    fn read_memory(&self, page: u64, offset: u32, len: u32) -> Result<Vec<u8>, ContractHostError>;
    fn write_memory(&mut self, page: u64, offset: u32, data: &[u8]) -> Result<(), ContractHostError>;
}

/// A deterministic stand-in for a real WASM contract runtime: snapshot
/// reads/writes are backed by an in-memory map, and `call` recognizes
/// exactly one exported function, `f`, which adds one to its little-endian
/// `u32` argument. This is enough to exercise deploy-then-call scenarios
/// without an interpreter.
pub struct NullContractHost {
    self_id: AccountID,
    sender_id: AccountID,
    snapshot: HashMap<Vec<u8>, Vec<u8>>,
    pages: Vec<[u8; PAGE_SIZE as usize]>,
    logs: Vec<String>,
}

impl NullContractHost {
    pub fn new(self_id: AccountID, sender_id: AccountID) -> Self {
        Self { self_id, sender_id, snapshot: HashMap::new(), pages: vec![[0u8; PAGE_SIZE as usize]], logs: Vec::new() }
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    /// Dispatches a call to the contract's single exported function. Only
    /// `"f"` is recognized; anything else traps, matching a real
    /// interpreter rejecting a call to an unexported name.
    pub fn call(&mut self, func_name: &str, params: &[u8], gas: &mut dyn GasMeter) -> Result<Vec<u8>, ContractHostError> {
        gas.charge(10)?;

        match func_name {
            "f" => {
                if params.len() != 4 {
                    return Err(ContractHostError::Trap("f expects a single u32 argument".into()));
                }
                let x = u32::from_le_bytes(params.try_into().unwrap());
                gas.charge(1)?;
                Ok((x.wrapping_add(1)).to_le_bytes().to_vec())
            },
            other => Err(ContractHostError::Trap(format!("no exported function named {other}"))),
        }
    }
}

impl ContractHost for NullContractHost {
    fn self_id(&self) -> AccountID {
        self.self_id
    }

    fn sender_id(&self) -> AccountID {
        self.sender_id
    }

    fn snapshot_read(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.snapshot.get(key).cloned()
    }

    fn snapshot_write(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.snapshot.insert(key, value);
    }

    fn log(&mut self, message: &str) {
        self.logs.push(message.to_string());
    }

    fn num_pages(&self) -> u64 {
        self.pages.len() as u64
    }

    fn read_memory(&self, page: u64, offset: u32, len: u32) -> Result<Vec<u8>, ContractHostError> {
        let page_buf = self.pages.get(page as usize).ok_or(ContractHostError::PageOutOfBounds(page))?;
        let start = offset as usize;
        let end = start + len as usize;
        if end > page_buf.len() {
            return Err(ContractHostError::PageOutOfBounds(page));
        }
        Ok(page_buf[start..end].to_vec())
    }

    fn write_memory(&mut self, page: u64, offset: u32, data: &[u8]) -> Result<(), ContractHostError> {
        if page as usize >= self.pages.len() {
            self.pages.resize(page as usize + 1, [0u8; PAGE_SIZE as usize]);
        }
        let page_buf = &mut self.pages[page as usize];
        let start = offset as usize;
        let end = start + data.len();
        if end > page_buf.len() {
            return Err(ContractHostError::PageOutOfBounds(page));
        }
        page_buf[start..end].copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gas_meter_rejects_charge_beyond_limit() {
        let mut meter = SimpleGasMeter::new(5);
        assert!(meter.charge(3).is_ok());
        assert_eq!(meter.remaining(), 2);
        assert_eq!(meter.charge(3), Err(ContractHostError::OutOfGas));
    }

    #[test]
    fn snapshot_read_write_round_trips() {
        let mut host = NullContractHost::new(AccountID([1; 32]), AccountID([2; 32]));
        host.snapshot_write(b"k".to_vec(), b"v".to_vec());
        assert_eq!(host.snapshot_read(b"k"), Some(b"v".to_vec()));
    }

    #[test]
    fn calling_f_adds_one_to_its_argument() {
        let mut host = NullContractHost::new(AccountID([1; 32]), AccountID([2; 32]));
        let mut gas = SimpleGasMeter::new(1000);
        let result = host.call("f", &41u32.to_le_bytes(), &mut gas).unwrap();
        assert_eq!(u32::from_le_bytes(result.try_into().unwrap()), 42);
        assert_eq!(gas.remaining(), 989);
    }

    #[test]
    fn calling_unknown_function_traps() {
        let mut host = NullContractHost::new(AccountID([1; 32]), AccountID([2; 32]));
        let mut gas = SimpleGasMeter::new(1000);
        assert!(matches!(host.call("bogus", &[], &mut gas), Err(ContractHostError::Trap(_))));
    }

    #[test]
    fn memory_write_then_read_round_trips() {
        let mut host = NullContractHost::new(AccountID([1; 32]), AccountID([2; 32]));
        host.write_memory(0, 10, &[1, 2, 3]).unwrap();
        assert_eq!(host.read_memory(0, 10, 3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn writing_past_existing_pages_grows_the_arena() {
        let mut host = NullContractHost::new(AccountID([1; 32]), AccountID([2; 32]));
        assert_eq!(host.num_pages(), 1);
        host.write_memory(2, 0, &[9]).unwrap();
        assert_eq!(host.num_pages(), 3);
    }
}
