#![forbid(unsafe_code)]

pub mod commit;
pub mod error;
pub mod internal_raft;
pub mod metrics;
pub mod rate_limit;
pub mod reads;
pub mod router;
pub mod state;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::{middleware, Router};
use tokio::sync::watch;
use tower::{limit::ConcurrencyLimitLayer, load_shed::LoadShedLayer, timeout::TimeoutLayer, BoxError, ServiceBuilder};
use tower_http::{catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use rate_limit::IpLimiter;
use state::GatewayState;

pub struct GatewayConfig {
    pub listen_addr: SocketAddr,
    pub rps: u32,
    pub burst: u32,
    pub body_limit_kb: usize,
    pub trusted_proxies: Vec<String>,
    pub request_timeout_secs: u64,
    pub max_in_flight: usize,
}

async fn map_middleware_error(err: BoxError) -> impl IntoResponse {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            Json(serde_json::json!({
                "error": { "code": "TIMEOUT", "message": "request timed out" }
            })),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "error": { "code": "OVERLOADED", "message": err.to_string() }
            })),
        )
    }
}

pub fn build_router(state: GatewayState, config: &GatewayConfig) -> Router {
    let limiter = IpLimiter::new(config.rps, config.burst, &config.trusted_proxies);

    let internal = Router::new()
        .route("/raft/append-entries", post(internal_raft::append_entries))
        .route("/raft/install-snapshot", post(internal_raft::install_snapshot))
        .route("/raft/vote", post(internal_raft::vote));

    let public = Router::new()
        .route("/health", get(reads::health))
        .route("/leader", get(reads::leader))
        .route("/pubkey_hash/:hex/index", get(reads::pubkey_hash_index))
        .route("/pubkey_hash/:hex/chain", get(reads::pubkey_hash_chain))
        .route("/keys", get(reads::keys))
        .route("/all_entries", get(reads::all_entries))
        .route("/resolve_kid", get(reads::resolve_kid))
        .route("/commit_index", post(commit::handler))
        .route("/metrics", get(metrics::handler))
        .route_layer(middleware::from_fn_with_state(limiter, rate_limit::middleware));

    Router::new()
        .merge(public)
        .merge(internal)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(map_middleware_error))
                .layer(LoadShedLayer::new())
                .layer(ConcurrencyLimitLayer::new(config.max_in_flight))
                .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs))),
        )
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(config.body_limit_kb * 1024))
}

pub async fn run_server(
    config: GatewayConfig,
    state: GatewayState,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    metrics::install();

    let addr = config.listen_addr;
    let app = build_router(state, &config);

    tracing::info!(target: "gateway", %addr, "gateway listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            shutdown_rx.changed().await.ok();
            tracing::info!(target: "gateway", "shutting down gracefully");
        });

    if let Err(e) = server.await {
        tracing::error!(target: "gateway", error = %e, "server error");
    }

    Ok(())
}
