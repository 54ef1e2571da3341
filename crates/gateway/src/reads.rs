//! Read-only endpoints: cluster health, key lookups, and chain inspection.
//! These never touch the replicated log and are answered locally by every
//! replica from its own state machine, which may lag the leader slightly.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};

use sentinel_fsm::{verify_chain_integrity, ChainIntegrity, ALL_ENTRIES_MAX};
use sentinel_types::{ChainRecord, Kid, Pkh};

use crate::error::AppError;
use crate::state::GatewayState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub node_id: u64,
    pub leader_id: Option<u64>,
    pub is_leader: bool,
}

pub async fn health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let leader_id = state.raft.current_leader().await;
    Json(HealthResponse {
        node_id: state.node_id,
        is_leader: leader_id == Some(state.node_id),
        leader_id,
    })
}

#[derive(Serialize)]
pub struct LeaderResponse {
    pub leader_id: Option<u64>,
    pub leader_api_addr: Option<String>,
}

pub async fn leader(State(state): State<GatewayState>) -> Json<LeaderResponse> {
    let leader_id = state.raft.current_leader().await;
    let leader_api_addr = leader_id.and_then(|id| state.config.cluster.api_addr_of(id)).map(|a| a.to_string());
    Json(LeaderResponse { leader_id, leader_api_addr })
}

fn parse_pkh(hex: &str) -> Result<Pkh, AppError> {
    Pkh::from_hex(hex).map_err(|e| AppError::new(axum::http::StatusCode::BAD_REQUEST, "INVALID_PKH", e.to_string()))
}

#[derive(Serialize)]
pub struct IndexResponse {
    pub pkh: Pkh,
    pub exists: bool,
    pub index: Option<u64>,
    pub hash: Option<sentinel_types::Digest>,
    pub terminal: bool,
}

pub async fn pubkey_hash_index(
    State(state): State<GatewayState>,
    Path(hex): Path<String>,
) -> Result<Json<IndexResponse>, AppError> {
    let pkh = parse_pkh(&hex)?;
    let fsm = state.fsm.lock().expect("fsm mutex poisoned");
    let terminal = fsm.chains().get(&pkh).map(|c| c.terminal).unwrap_or(false);
    let latest = fsm.latest(&pkh);
    Ok(Json(IndexResponse {
        pkh,
        exists: latest.is_some(),
        index: latest.map(|r| r.index),
        hash: latest.map(|r| r.hash),
        terminal,
    }))
}

#[derive(Serialize)]
pub struct ChainResponse {
    pub pkh: Pkh,
    pub records: Vec<ChainRecord>,
    pub integrity: ChainIntegrity,
}

pub async fn pubkey_hash_chain(
    State(state): State<GatewayState>,
    Path(hex): Path<String>,
) -> Result<Json<ChainResponse>, AppError> {
    let pkh = parse_pkh(&hex)?;
    let fsm = state.fsm.lock().expect("fsm mutex poisoned");
    let records = fsm.chain_of(&pkh).map(|r| r.to_vec()).unwrap_or_default();
    let integrity = verify_chain_integrity(&records);
    Ok(Json(ChainResponse { pkh, records, integrity }))
}

#[derive(Serialize)]
pub struct KeysResponse {
    pub keys: Vec<Pkh>,
}

pub async fn keys(State(state): State<GatewayState>) -> Json<KeysResponse> {
    let fsm = state.fsm.lock().expect("fsm mutex poisoned");
    Json(KeysResponse { keys: fsm.all_keys() })
}

#[derive(Deserialize)]
pub struct AllEntriesQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    1000
}

#[derive(Serialize)]
pub struct AllEntriesResponse {
    pub records: Vec<ChainRecord>,
}

pub async fn all_entries(
    State(state): State<GatewayState>,
    Query(q): Query<AllEntriesQuery>,
) -> Json<AllEntriesResponse> {
    let fsm = state.fsm.lock().expect("fsm mutex poisoned");
    Json(AllEntriesResponse { records: fsm.all_entries(q.limit.min(ALL_ENTRIES_MAX)) })
}

#[derive(Deserialize)]
pub struct KidQuery {
    pub kid: String,
}

#[derive(Serialize)]
pub struct ResolveKidResponse {
    pub pkh: Option<Pkh>,
}

pub async fn resolve_kid(
    State(state): State<GatewayState>,
    Query(q): Query<KidQuery>,
) -> Json<ResolveKidResponse> {
    let fsm = state.fsm.lock().expect("fsm mutex poisoned");
    let kid = Kid::new(q.kid);
    Json(ResolveKidResponse { pkh: fsm.pkh_for_kid(&kid) })
}
