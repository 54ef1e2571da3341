//! Internal raft RPC endpoints consumed by [`sentinel_raft::HttpNetwork`]
//! on peer replicas, not meant to be called by driver or operator clients.

use axum::extract::State;
use axum::response::Json;

use openraft::raft::{
    AppendEntriesRequest, AppendEntriesResponse, InstallSnapshotRequest, InstallSnapshotResponse,
    VoteRequest, VoteResponse,
};
use sentinel_raft::NodeId;

use crate::state::GatewayState;

pub async fn append_entries(
    State(state): State<GatewayState>,
    Json(rpc): Json<AppendEntriesRequest<sentinel_raft::TypeConfig>>,
) -> Json<AppendEntriesResponse<NodeId>> {
    let resp = state.raft.append_entries(rpc).await.unwrap_or_else(|e| {
        tracing::warn!(target: "gateway", error = %e, "append_entries failed");
        AppendEntriesResponse::HigherVote(openraft::Vote::new_committed(0, state.node_id))
    });
    Json(resp)
}

pub async fn install_snapshot(
    State(state): State<GatewayState>,
    Json(rpc): Json<InstallSnapshotRequest<sentinel_raft::TypeConfig>>,
) -> Json<InstallSnapshotResponse<NodeId>> {
    match state.raft.install_snapshot(rpc).await {
        Ok(resp) => Json(resp),
        Err(e) => {
            tracing::warn!(target: "gateway", error = %e, "install_snapshot failed");
            Json(InstallSnapshotResponse {
                vote: openraft::Vote::new_committed(0, state.node_id),
            })
        }
    }
}

pub async fn vote(
    State(state): State<GatewayState>,
    Json(rpc): Json<VoteRequest<NodeId>>,
) -> Json<VoteResponse<NodeId>> {
    match state.raft.vote(rpc).await {
        Ok(resp) => Json(resp),
        Err(e) => {
            tracing::warn!(target: "gateway", error = %e, "vote failed");
            Json(VoteResponse {
                vote: openraft::Vote::new_committed(0, state.node_id),
                vote_granted: false,
                last_log_id: None,
            })
        }
    }
}
