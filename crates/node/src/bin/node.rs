//! The cluster replica binary: opens the redb-backed raft log, starts the
//! raft instance, and serves the HTTP gateway (commit pipeline, chain
//! reads, and internal raft RPCs) on top of it.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use openraft::BasicNode;
use tokio::sync::watch;

use sentinel_fsm::ReplicatedFsm;
use sentinel_gateway::{state::GatewayState, GatewayConfig};
use sentinel_ledger::{HttpLedgerClient, LedgerClient};
use sentinel_storage::RaftLogStore;
use sentinel_types::NodeConfig;

#[derive(Parser, Debug)]
#[command(name = "sentinel-node", about = "Replicated index-ordering cluster node")]
struct Opts {
    /// Path to the node's TOML configuration file.
    #[arg(long, env = "SENTINEL_NODE_CONFIG")]
    config: PathBuf,
}

fn load_config(path: &PathBuf) -> Result<NodeConfig> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    sentinel_telemetry::init_tracing()?;
    let opts = Opts::parse();
    let config = load_config(&opts.config)?;

    fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating data directory {}", config.data_dir.display()))?;

    let verifier = sentinel_crypto::AttestationVerifier::load_from_pem_file(&config.attestor_public_key_path)
        .context("loading trusted attestation public key")?;
    let fsm = Arc::new(Mutex::new(ReplicatedFsm::new(verifier)));

    let raw_log_store = RaftLogStore::open(&config.data_dir.join("raft_log.redb"))
        .context("opening raft log store")?;

    let ledger: Option<Arc<dyn LedgerClient>> = config
        .ledger
        .as_ref()
        .map(|ledger_config| Arc::new(HttpLedgerClient::new(ledger_config)) as Arc<dyn LedgerClient>);

    let raft = sentinel_raft::start(
        config.node_id,
        raw_log_store,
        fsm.clone(),
        Duration::from_millis(config.request_timeout_ms),
    )
    .await
    .context("starting raft instance")?;

    if config.bootstrap {
        let members: BTreeMap<u64, BasicNode> = config
            .cluster
            .members
            .iter()
            .map(|member| (member.node_id, BasicNode::new(member.raft_addr.to_string())))
            .collect();
        match raft.initialize(members).await {
            Ok(()) => tracing::info!(target: "node", "cluster initialized"),
            Err(e) => tracing::warn!(target: "node", error = %e, "cluster already initialized, skipping"),
        }
    }

    let config = Arc::new(config);
    let gateway_state = GatewayState::new(config.node_id, raft, fsm, config.clone(), ledger);
    let gateway_config = GatewayConfig {
        listen_addr: config.bind_api,
        rps: 200,
        burst: 400,
        body_limit_kb: 256,
        trusted_proxies: Vec::new(),
        request_timeout_secs: 10,
        max_in_flight: 1024,
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    sentinel_gateway::run_server(gateway_config, gateway_state, shutdown_rx).await?;
    Ok(())
}
