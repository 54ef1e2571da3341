//! `sentinel-cli query`: read-only HTTP calls against a running cluster
//! replica's gateway.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::Value;

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Base URL of the cluster replica to query, e.g. http://127.0.0.1:8080.
    #[clap(long, global = true, default_value = "http://127.0.0.1:8080")]
    node: String,
    #[clap(subcommand)]
    command: QueryCommand,
}

#[derive(Subcommand, Debug)]
enum QueryCommand {
    /// Report this node's id, leadership status, and known leader.
    Health,
    /// Report the cluster's current leader and its API address.
    Leader,
    /// Report the latest committed index and hash for a key.
    Index {
        /// Hex-encoded public-key hash.
        pkh: String,
    },
    /// Dump the full append-only chain for a key.
    Chain {
        /// Hex-encoded public-key hash.
        pkh: String,
    },
    /// List every public-key hash the FSM has a chain for.
    Keys,
    /// Resolve a human-readable key id to its public-key hash.
    ResolveKid {
        kid: String,
    },
}

pub async fn run(args: QueryArgs) -> Result<()> {
    let client = reqwest::Client::new();
    let base = args.node.trim_end_matches('/').to_string();

    let request = match &args.command {
        QueryCommand::Health => client.get(format!("{base}/health")),
        QueryCommand::Leader => client.get(format!("{base}/leader")),
        QueryCommand::Index { pkh } => client.get(format!("{base}/pubkey_hash/{pkh}/index")),
        QueryCommand::Chain { pkh } => client.get(format!("{base}/pubkey_hash/{pkh}/chain")),
        QueryCommand::Keys => client.get(format!("{base}/keys")),
        QueryCommand::ResolveKid { kid } => client.get(format!("{base}/resolve_kid")).query(&[("kid", kid)]),
    };

    let resp = request.send().await.context("sending request to cluster")?;
    let status = resp.status();
    let body: Value = resp.json().await.context("decoding response body")?;

    if !status.is_success() {
        anyhow::bail!("cluster returned {status}: {body}");
    }

    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
