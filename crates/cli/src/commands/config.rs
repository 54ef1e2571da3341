//! `sentinel-cli config`: scaffolds starter TOML configuration files for a
//! cluster node or a signer daemon.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use sentinel_types::{ClusterConfig, ClusterMember, NodeConfig, SignerConfig};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[clap(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a starter `NodeConfig` TOML file.
    ScaffoldNode {
        #[clap(long)]
        output: PathBuf,
        #[clap(long)]
        node_id: u64,
        #[clap(long, default_value = "127.0.0.1:8080")]
        bind_api: String,
        #[clap(long, default_value = "127.0.0.1:9090")]
        bind_raft: String,
        #[clap(long)]
        data_dir: PathBuf,
        #[clap(long)]
        attestor_public_key_path: PathBuf,
        #[clap(long)]
        bootstrap: bool,
    },
    /// Write a starter `SignerConfig` TOML file.
    ScaffoldSigner {
        #[clap(long)]
        output: PathBuf,
        #[clap(long, default_value = "127.0.0.1:8090")]
        bind_api: String,
        #[clap(long, default_value = "127.0.0.1:9100")]
        bind_metrics: String,
        #[clap(long)]
        data_dir: PathBuf,
        #[clap(long)]
        attestation_private_key_path: PathBuf,
        #[clap(long)]
        attestor_public_key_path: PathBuf,
        /// API address of a seed cluster member, e.g. 127.0.0.1:8080.
        #[clap(long)]
        seed_member: String,
    },
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommand::ScaffoldNode {
            output,
            node_id,
            bind_api,
            bind_raft,
            data_dir,
            attestor_public_key_path,
            bootstrap,
        } => {
            let config = NodeConfig {
                node_id,
                bind_api: bind_api.parse().context("parsing --bind-api")?,
                bind_raft: bind_raft.parse().context("parsing --bind-raft")?,
                data_dir,
                cluster: ClusterConfig {
                    members: vec![ClusterMember {
                        node_id,
                        raft_addr: bind_raft.parse().context("parsing --bind-raft")?,
                        api_addr: bind_api.parse().context("parsing --bind-api")?,
                    }],
                },
                bootstrap,
                attestor_public_key_path,
                ledger: None,
                mirror_overrides: BTreeMap::new(),
                mirror_default: false,
                request_timeout_ms: 3_000,
            };
            write_toml(&output, &config)
        }
        ConfigCommand::ScaffoldSigner {
            output,
            bind_api,
            bind_metrics,
            data_dir,
            attestation_private_key_path,
            attestor_public_key_path,
            seed_member,
        } => {
            let seed_addr = seed_member.parse().context("parsing --seed-member")?;
            let config = SignerConfig {
                bind_api: bind_api.parse().context("parsing --bind-api")?,
                bind_metrics: bind_metrics.parse().context("parsing --bind-metrics")?,
                cluster: ClusterConfig {
                    members: vec![ClusterMember { node_id: 0, raft_addr: seed_addr, api_addr: seed_addr }],
                },
                data_dir,
                attestation_private_key_path,
                attestor_public_key_path,
                ledger: None,
                mirror_overrides: BTreeMap::new(),
                mirror_default: false,
                commit_timeout_ms: 3_000,
            };
            write_toml(&output, &config)
        }
    }
}

fn write_toml(output: &PathBuf, value: &impl serde::Serialize) -> Result<()> {
    let rendered = toml::to_string_pretty(value).context("rendering configuration as TOML")?;
    std::fs::write(output, rendered).with_context(|| format!("writing {}", output.display()))?;
    println!("wrote {}", output.display());
    Ok(())
}
