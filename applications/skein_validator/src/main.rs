// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

mod bootstrap;
mod cli;
mod config;
mod identity;
mod logging;

use std::{path::PathBuf, process};

use clap::Parser;
use log::{error, info};
use tokio::{runtime, sync::watch};

use crate::cli::Cli;

const LOG_TARGET: &str = "skein::validator::app";

fn main() {
    if let Err(err) = main_inner() {
        eprintln!("{:?}", err);
        error!(target: LOG_TARGET, "exiting with error: {}", err);
        process::exit(1);
    }
}

fn main_inner() -> anyhow::Result<()> {
    let cli = Cli::init();

    let log_config_path = cli.log_config.clone().unwrap_or_else(|| PathBuf::from("log4rs.yml"));
    logging::initialize_logging(&log_config_path)?;

    let mut config = config::load(cli.config.as_deref())?;
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }

    let runtime = build_runtime()?;
    runtime.block_on(run_node(config))
}

async fn run_node(config: config::NodeConfig) -> anyhow::Result<()> {
    let keypair = identity::load_or_create(&config.data_dir)?;
    info!(target: LOG_TARGET, "node identity loaded");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut services = bootstrap::spawn_services(&config, &keypair, shutdown_rx).await?;

    info!(target: LOG_TARGET, "validator node started");

    tokio::signal::ctrl_c().await?;
    info!(target: LOG_TARGET, "shutdown signal received");
    let _ = shutdown_tx.send(true);

    for handle in services.handles.drain(..) {
        let _ = handle.await;
    }

    Ok(())
}

fn build_runtime() -> anyhow::Result<runtime::Runtime> {
    Ok(runtime::Builder::new_multi_thread().enable_all().build()?)
}
