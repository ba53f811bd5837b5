// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

//! Layered configuration: an embedded default TOML, optionally overridden by
//! a file the operator points at, further overridden by `SKEIN_`-prefixed
//! environment variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;

const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct SnowballSection {
    pub k: usize,
    pub alpha: f64,
    pub beta1: u32,
    pub beta2: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub data_dir: PathBuf,
    pub listen_address: String,
    pub peer_sampler_address: String,
    pub avl_cache_capacity: usize,
    pub pruning_horizon: u64,
    pub gas_price: u64,
    pub snowball: SnowballSection,
}

/// Loads the embedded default, layers an optional file on top, then layers
/// `SKEIN_`-prefixed environment overrides (double-underscore separated,
/// e.g. `SKEIN_SNOWBALL__BETA1=4`).
pub fn load(config_path: Option<&Path>) -> Result<NodeConfig, config::ConfigError> {
    let mut builder = config::Config::builder().add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml));

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path));
    }

    builder
        .add_source(config::Environment::with_prefix("SKEIN").separator("__"))
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_parses() {
        let config = load(None).unwrap();
        assert_eq!(config.snowball.k, 10);
        assert_eq!(config.gas_price, 1);
    }

    #[test]
    fn environment_overrides_default() {
        std::env::set_var("SKEIN_GAS_PRICE", "7");
        let config = load(None).unwrap();
        std::env::remove_var("SKEIN_GAS_PRICE");
        assert_eq!(config.gas_price, 7);
    }
}
