// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

//! Loads this node's signing keypair from `<data_dir>/identity.json`,
//! generating and persisting a fresh one on first run.

use std::path::Path;

use ed25519_dalek::Keypair;
use rand::rngs::OsRng;

pub fn load_or_create(data_dir: &Path) -> anyhow::Result<Keypair> {
    let path = data_dir.join("identity.json");

    if path.exists() {
        let bytes = std::fs::read(&path)?;
        let keypair: Keypair = serde_json::from_slice(&bytes)?;
        return Ok(keypair);
    }

    std::fs::create_dir_all(data_dir)?;
    let keypair = Keypair::generate(&mut OsRng {});
    std::fs::write(&path, serde_json::to_vec(&keypair)?)?;
    Ok(keypair)
}
