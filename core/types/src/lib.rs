// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

//! Fixed-width, content-addressed identifiers used throughout the skein
//! ledger core: accounts, transactions, blocks and Merkle-AVL nodes.

use std::fmt;

use blake2::{
    digest::{Update, VariableOutput},
    VarBlake2b,
};
use serde::{Deserialize, Serialize};

macro_rules! fixed_id {
    ($name:ident, $len:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;
            pub const ZERO: Self = Self([0u8; $len]);

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; $len]
            }

            pub fn from_slice(bytes: &[u8]) -> Result<Self, IdLengthError> {
                if bytes.len() != $len {
                    return Err(IdLengthError {
                        expected: $len,
                        actual: bytes.len(),
                    });
                }
                let mut buf = [0u8; $len];
                buf.copy_from_slice(bytes);
                Ok(Self(buf))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::ZERO
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(self.0))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }
    };
}

fixed_id!(AccountID, 32, "A 32-byte account identifier.");
fixed_id!(TransactionID, 32, "A BLAKE2b-256 transaction identifier.");
fixed_id!(BlockID, 32, "A BLAKE2b-256 block identifier.");
fixed_id!(MerkleNodeID, 16, "A BLAKE2b-128 Merkle-AVL node identifier.");

#[derive(Debug, thiserror::Error)]
#[error("expected an id of {expected} bytes, got {actual}")]
pub struct IdLengthError {
    pub expected: usize,
    pub actual: usize,
}

/// BLAKE2b hash of `data` truncated/expanded to `N` bytes.
pub fn blake2b<const N: usize>(data: &[u8]) -> [u8; N] {
    let mut hasher = VarBlake2b::new(N).expect("requested digest size must be valid for blake2b");
    hasher.update(data);
    let mut out = [0u8; N];
    hasher.finalize_variable(|res| out.copy_from_slice(res));
    out
}

pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    blake2b::<32>(data)
}

pub fn blake2b_128(data: &[u8]) -> [u8; 16] {
    blake2b::<16>(data)
}

/// Count of leading zero bits across a byte slice, used to derive a
/// transaction's `seed` tie-break weight from `BLAKE2b-256(sender ‖
/// parent_ids...)`.
pub fn leading_zero_bits(bytes: &[u8]) -> u32 {
    let mut count = 0;
    for byte in bytes {
        if *byte == 0 {
            count += 8;
            continue;
        }
        count += byte.leading_zeros();
        break;
    }
    count
}
