// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

//! Installs `log4rs` from a file, writing the embedded default config to
//! that path first if nothing is there yet.

use std::path::Path;

const DEFAULT_LOG_CONFIG: &str = include_str!("log4rs_sample.yml");

pub fn initialize_logging(log_config_path: &Path) -> anyhow::Result<()> {
    if !log_config_path.exists() {
        if let Some(parent) = log_config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(log_config_path, DEFAULT_LOG_CONFIG)?;
    }

    log4rs::init_file(log_config_path, Default::default())?;
    Ok(())
}
