#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! Administration tool for the index-ordering service: key lifecycle,
//! cluster queries, and config-file scaffolding.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{config, keys, query};

#[derive(Parser, Debug)]
#[clap(
    name = "sentinel-cli",
    version,
    about = "Administration tool for the index-ordering service"
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage LMS/HSS signing keys in a local keystore.
    Keys(keys::KeysArgs),
    /// Query a running cluster replica.
    Query(query::QueryArgs),
    /// Scaffold node and signer configuration files.
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Keys(args) => keys::run(args),
        Commands::Query(args) => query::run(args).await,
        Commands::Config(args) => config::run(args),
    }
}
