// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML file layered over the built-in defaults.
    #[clap(short, long, env = "SKEIN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to a log4rs YAML config. Written from the built-in default the
    /// first time the node starts if it doesn't already exist.
    #[clap(long, env = "SKEIN_LOG_CONFIG")]
    pub log_config: Option<PathBuf>,

    /// Overrides `data_dir` from the loaded config.
    #[clap(long, env = "SKEIN_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

impl Cli {
    pub fn init() -> Self {
        Self::parse()
    }
}
