// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

/// Discriminates the payload carried by a transaction or a batch entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    Transfer = 0,
    Stake = 1,
    Contract = 2,
    Batch = 3,
}

impl Tag {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Tag::Transfer),
            1 => Some(Tag::Stake),
            2 => Some(Tag::Contract),
            3 => Some(Tag::Batch),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}
