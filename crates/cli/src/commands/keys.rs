//! `sentinel-cli keys`: lifecycle operations against a local keystore
//! directory. Operates directly on the on-disk keystore, not through a
//! running cluster, so it is meant to run on the signer host.

use std::path::PathBuf;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use clap::{Args, Subcommand};
use serde::Serialize;
use zeroize::Zeroizing;

use sentinel_keystore::Keystore;
use sentinel_types::Kid;

#[derive(Args, Debug)]
pub struct KeysArgs {
    #[clap(subcommand)]
    command: KeysCommand,
}

#[derive(Subcommand, Debug)]
enum KeysCommand {
    /// Generate a new LMS/HSS key pair and seal it into the keystore.
    Create {
        /// Path to the signer's keystore directory.
        #[clap(long)]
        data_dir: PathBuf,
        /// Human-readable identifier for the new key.
        #[clap(long)]
        kid: String,
        /// Free-form owner label stored alongside the key material.
        #[clap(long)]
        owner: String,
    },
    /// List every key id known to a keystore.
    List {
        #[clap(long)]
        data_dir: PathBuf,
    },
    /// Show the public key, current index, and parameter set for one key.
    Show {
        #[clap(long)]
        data_dir: PathBuf,
        #[clap(long)]
        kid: String,
    },
}

fn read_passphrase() -> Result<Zeroizing<Vec<u8>>> {
    if let Ok(from_env) = std::env::var("SENTINEL_KEYSTORE_PASSPHRASE") {
        return Ok(Zeroizing::new(from_env.into_bytes()));
    }
    let prompted = rpassword::prompt_password("Keystore passphrase: ").context("reading passphrase")?;
    Ok(Zeroizing::new(prompted.into_bytes()))
}

#[derive(Serialize)]
struct CreatedKey {
    kid: String,
    pkh: String,
    public_key_b64: String,
    parameter_set: String,
}

#[derive(Serialize)]
struct KeySummary {
    kid: String,
    current_index: Option<u64>,
}

#[derive(Serialize)]
struct KeyDetail {
    kid: String,
    public_key_b64: String,
    parameter_set: String,
    current_index: Option<u64>,
}

pub fn run(args: KeysArgs) -> Result<()> {
    match args.command {
        KeysCommand::Create { data_dir, kid, owner } => {
            std::fs::create_dir_all(&data_dir)
                .with_context(|| format!("creating keystore directory {}", data_dir.display()))?;
            let passphrase = read_passphrase()?;
            let keystore = Keystore::open(&data_dir, passphrase).context("opening keystore")?;
            let kid = Kid::new(kid);
            let created = keystore.create_key(&kid, owner).context("creating key")?;
            print_json(&CreatedKey {
                kid: created.kid.as_str().to_string(),
                pkh: created.pkh.to_hex(),
                public_key_b64: BASE64.encode(&created.public_key),
                parameter_set: created.parameter_set,
            })
        }
        KeysCommand::List { data_dir } => {
            let passphrase = read_passphrase()?;
            let keystore = Keystore::open(&data_dir, passphrase).context("opening keystore")?;
            let summaries: Result<Vec<KeySummary>> = keystore
                .all_kids()
                .context("listing keys")?
                .into_iter()
                .map(|kid_str| {
                    let kid = Kid::new(kid_str.clone());
                    let current_index = keystore.current_index(&kid).context("reading current index")?;
                    Ok(KeySummary { kid: kid_str, current_index })
                })
                .collect();
            print_json(&summaries?)
        }
        KeysCommand::Show { data_dir, kid } => {
            let passphrase = read_passphrase()?;
            let keystore = Keystore::open(&data_dir, passphrase).context("opening keystore")?;
            let kid = Kid::new(kid);
            let public_key = keystore.public_key(&kid).context("reading public key")?;
            let parameter_set = keystore.parameter_set(&kid).context("reading parameter set")?;
            let current_index = keystore.current_index(&kid).context("reading current index")?;
            print_json(&KeyDetail {
                kid: kid.as_str().to_string(),
                public_key_b64: BASE64.encode(&public_key),
                parameter_set,
                current_index,
            })
        }
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
