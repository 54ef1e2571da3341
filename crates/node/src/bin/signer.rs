//! The signer daemon: holds sealed LMS/HSS private material and exposes a
//! `/sign` endpoint that runs the full commit-and-sign protocol against the
//! cluster before ever touching the key.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::post;
use axum::Router;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use clap::Parser;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use sentinel_crypto::{check_key_pair_consistency, sha256, AttestationSigner, AttestationVerifier};
use sentinel_driver::{ClusterClient, SignerDriver};
use sentinel_keystore::Keystore;
use sentinel_ledger::{HttpLedgerClient, LedgerClient};
use sentinel_types::{Kid, Pkh, SignerConfig};

#[derive(Parser, Debug)]
#[command(name = "sentinel-signer", about = "Signer-side protocol driver daemon")]
struct Opts {
    /// Path to the signer's TOML configuration file.
    #[arg(long, env = "SENTINEL_SIGNER_CONFIG")]
    config: PathBuf,
}

fn load_config(path: &PathBuf) -> Result<SignerConfig> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
}

fn read_passphrase() -> Result<Zeroizing<Vec<u8>>> {
    if let Ok(from_env) = std::env::var("SENTINEL_KEYSTORE_PASSPHRASE") {
        return Ok(Zeroizing::new(from_env.into_bytes()));
    }
    let prompted = rpassword::prompt_password("Keystore passphrase: ").context("reading passphrase")?;
    Ok(Zeroizing::new(prompted.into_bytes()))
}

struct AppState {
    driver: SignerDriver,
    keystore: Arc<Keystore>,
}

#[derive(Deserialize)]
struct SignRequest {
    kid: String,
    message_base64: String,
}

#[derive(Serialize)]
struct SignResponse {
    index: u64,
    signature_base64: String,
    log_committed: bool,
    mirrored: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

async fn sign_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignRequest>,
) -> impl IntoResponse {
    let kid = Kid::new(req.kid);
    let message = match BASE64.decode(req.message_base64.as_bytes()) {
        Ok(bytes) => bytes,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: ErrorBody { code: "MALFORMED_MESSAGE", message: e.to_string() },
                }),
            )
                .into_response();
        }
    };

    let public_key = match state.keystore.public_key(&kid) {
        Ok(pk) => pk,
        Err(e) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse { error: ErrorBody { code: "UNKNOWN_KEY", message: e.to_string() } }),
            )
                .into_response();
        }
    };
    let pkh = Pkh::from_bytes(sha256(&public_key));

    let started = Instant::now();
    sentinel_telemetry::driver_metrics().inc_sign_attempt(kid.as_str());
    match state.driver.commit_and_sign(&kid, &pkh, &message).await {
        Ok(outcome) => {
            sentinel_telemetry::driver_metrics()
                .observe_commit_latency(kid.as_str(), started.elapsed().as_secs_f64());
            sentinel_telemetry::driver_metrics().inc_sign_committed(kid.as_str(), outcome.mirrored);
            Json(SignResponse {
                index: outcome.index,
                signature_base64: BASE64.encode(outcome.signature),
                log_committed: outcome.log_committed,
                mirrored: outcome.mirrored,
            })
            .into_response()
        }
        Err(e) => {
            use sentinel_types::ErrorCode;
            sentinel_telemetry::driver_metrics().inc_sign_indeterminate(kid.as_str());
            sentinel_telemetry::error_metrics().inc_error("driver", e.code());
            (
                StatusCode::CONFLICT,
                Json(ErrorResponse { error: ErrorBody { code: e.code(), message: e.to_string() } }),
            )
                .into_response()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    sentinel_telemetry::init_tracing()?;
    let opts = Opts::parse();
    let config = load_config(&opts.config)?;

    fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating data directory {}", config.data_dir.display()))?;

    let passphrase = read_passphrase()?;
    let keystore = Arc::new(Keystore::open(&config.data_dir, passphrase).context("opening keystore")?);

    let signer = AttestationSigner::load_from_pem_file(&config.attestation_private_key_path)
        .context("loading attestation private key")?;
    let verifier = AttestationVerifier::load_from_pem_file(&config.attestor_public_key_path)
        .context("loading trusted attestation public key")?;
    check_key_pair_consistency(&signer, &verifier).context("attestation key pair consistency check")?;

    let Some(seed_member) = config.cluster.members.first() else {
        bail!("signer configuration must list at least one cluster member");
    };
    let cluster = ClusterClient::new(
        format!("http://{}", seed_member.api_addr),
        Duration::from_millis(config.commit_timeout_ms),
    );

    let ledger: Option<Arc<dyn LedgerClient>> = config
        .ledger
        .as_ref()
        .map(|ledger_config| Arc::new(HttpLedgerClient::new(ledger_config)) as Arc<dyn LedgerClient>);

    let driver = SignerDriver::new(cluster, keystore.clone(), Arc::new(signer), ledger);

    let sink = sentinel_telemetry::prometheus::install().context("installing prometheus metrics")?;
    let _ = sentinel_telemetry::sinks::SINK.set(sink);

    let state = Arc::new(AppState { driver, keystore });
    let app = Router::new().route("/sign", post(sign_handler)).with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind_api)
        .await
        .with_context(|| format!("binding signer API on {}", config.bind_api))?;
    tracing::info!(target: "signer", addr = %config.bind_api, "signer listening");

    let metrics_addr = config.bind_metrics;
    let metrics_server = tokio::spawn(async move {
        sentinel_telemetry::http::run_server(metrics_addr).await;
    });

    let serve = axum::serve(listener, app).with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!(target: "signer", "shutting down gracefully");
    });

    if let Err(e) = serve.await {
        tracing::error!(target: "signer", error = %e, "server error");
    }
    metrics_server.abort();
    Ok(())
}
