// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

//! Constructs the ledger and the Snowball finalizer and starts the
//! finalizer's round loop as a background task. No networking stack is
//! implemented here (out of scope); the round loop is fed by an in-process
//! loopback sampler standing in for a real peer transport.

use std::{sync::Arc, time::Duration};

use ed25519_dalek::Keypair;
use log::info;
use skein_avl::{InMemoryNodeStore, NodeCache, NodeStore};
use skein_consensus::{Snowball, SnowballConfig};
use skein_ledger::{Ledger, RpcConfig, RpcCore};
use skein_types::AccountID;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
};

use crate::config::NodeConfig;

const LOG_TARGET: &str = "skein::validator::bootstrap";

pub struct Services {
    pub ledger: Arc<Mutex<Ledger>>,
    pub rpc: Arc<RpcCore>,
    pub finalizer: Arc<Mutex<Snowball>>,
    pub handles: Vec<JoinHandle<()>>,
}

pub async fn spawn_services(
    config: &NodeConfig,
    keypair: &Keypair,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<Services> {
    ensure_directories_exist(config)?;

    let public_key = AccountID::from_slice(keypair.public.as_bytes())?;
    let store: Arc<dyn NodeStore> = Arc::new(InMemoryNodeStore::new());
    let cache = Arc::new(NodeCache::new(config.avl_cache_capacity));
    let ledger = Ledger::with_store(store, cache, public_key)
        .with_gas_price(config.gas_price)
        .with_pruning_horizon(config.pruning_horizon);
    let ledger = Arc::new(Mutex::new(ledger));

    let rpc = Arc::new(RpcCore::new(RpcConfig { beta2: config.snowball.beta2, ..RpcConfig::default() }));

    let snowball_config =
        SnowballConfig { k: config.snowball.k, alpha: config.snowball.alpha, beta1: config.snowball.beta1 };
    let finalizer = Arc::new(Mutex::new(Snowball::new(snowball_config)));

    let mut handles = Vec::with_capacity(1);
    handles.push(spawn_loopback_sampler(finalizer.clone(), shutdown));

    info!(target: LOG_TARGET, "services started, listening on {}", config.listen_address);
    Ok(Services { ledger, rpc, finalizer, handles })
}

/// Stands in for a real peer sampler: periodically begins a round and
/// immediately casts a single local vote for the current preference, just
/// enough to exercise the finalizer's state machine end to end without a
/// transport.
fn spawn_loopback_sampler(finalizer: Arc<Mutex<Snowball>>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(Duration::from_millis(200)) => {
                    let mut sb = finalizer.lock().await;
                    let round = sb.begin_round();
                    if let Some(preferred) = sb.preferred() {
                        sb.submit_reply(round, 0, preferred);
                        sb.tally();
                    }
                },
            }
        }
    })
}

fn ensure_directories_exist(config: &NodeConfig) -> std::io::Result<()> {
    std::fs::create_dir_all(&config.data_dir)
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::{Keypair, Signer};
    use rand::rngs::OsRng;

    use super::*;
    use crate::config::SnowballSection;

    fn test_config(data_dir: std::path::PathBuf) -> NodeConfig {
        NodeConfig {
            data_dir,
            listen_address: "127.0.0.1:0".to_string(),
            peer_sampler_address: "loopback".to_string(),
            avl_cache_capacity: 128,
            pruning_horizon: 16,
            gas_price: 1,
            snowball: SnowballSection { k: 10, alpha: 0.8, beta1: 3, beta2: 10 },
        }
    }

    #[tokio::test]
    async fn spawn_services_starts_a_finalizer_task() {
        let dir = std::env::temp_dir().join(format!("skein-bootstrap-test-{}", std::process::id()));
        let config = test_config(dir);
        let keypair = Keypair::generate(&mut OsRng {});
        let _ = keypair.sign(b"unused-smoke-test-signature");

        let (_tx, rx) = watch::channel(false);
        let services = spawn_services(&config, &keypair, rx).await.unwrap();
        assert_eq!(services.handles.len(), 1);

        let account = services.ledger.lock().await.account(AccountID::from_slice(keypair.public.as_bytes()).unwrap()).unwrap();
        assert_eq!(account.balance, 0);
    }
}
