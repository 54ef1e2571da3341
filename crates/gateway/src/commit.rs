//! The commit pipeline: validates a candidate chain record, proposes it to
//! the replicated log, and optionally mirrors the result to the external
//! ledger.
//!
//! Dual-commit outcomes on a successful validation:
//! - log ok + mirror ok (or disabled) -> success, log position authoritative.
//! - log ok + mirror failed -> success, log is authoritative; warn only.
//! - log failed + mirror ok -> success in fallback mode: the response
//!   carries the sentinel log position `0` and `log_committed: false` so
//!   the driver knows the ledger, not the log, is the record of this index.
//! - log failed + mirror failed or disabled -> failure; the caller applies
//!   the discard rule.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use sentinel_types::ErrorCode;
use serde::{Deserialize, Serialize};

use sentinel_raft::CommitRequest as RaftCommitRequest;
use sentinel_types::{ChainRecord, PipelineError};

use crate::error::AppError;
use crate::metrics;
use crate::router;
use crate::state::GatewayState;

#[derive(Deserialize)]
pub struct CommitIndexRequest {
    pub record: ChainRecord,
    /// Overrides the per-key configured default for mirroring this commit
    /// to the external ledger.
    #[serde(default)]
    pub mirror: Option<bool>,
}

#[derive(Serialize)]
pub struct CommitIndexResponse {
    pub committed: bool,
    pub log_committed: bool,
    pub log_index: u64,
    pub mirrored: bool,
}

pub async fn handler(
    State(state): State<GatewayState>,
    method: Method,
    headers: HeaderMap,
    uri: axum::http::Uri,
    body: Bytes,
) -> Result<Response, AppError> {
    let started = Instant::now();

    if state.raft.current_leader().await != Some(state.node_id) {
        let target = router::leader_api_addr(&state).await?;
        let path_and_query = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/commit_index");
        return router::forward(&state, target, method, path_and_query, headers, body).await;
    }

    let req: CommitIndexRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::from(PipelineError::Malformed(e.to_string())))?;

    let kid = req.record.kid.clone();
    let pkh = req.record.pkh;
    let candidate_index = req.record.index;
    let should_mirror = req.mirror.unwrap_or_else(|| state.config.mirror_enabled_for(kid.as_str()));

    {
        let fsm = state.fsm.lock().expect("fsm mutex poisoned");
        if let Err(e) = fsm.dry_run_validate(&req.record) {
            let pipeline_err = match e {
                sentinel_fsm::FsmError::Conflict(c) => PipelineError::Conflict(c),
                sentinel_fsm::FsmError::Unauthenticated => PipelineError::Unauthenticated,
                other => PipelineError::Malformed(other.to_string()),
            };
            metrics::record_commit("rejected", pipeline_err.code());
            return Err(AppError::from(pipeline_err));
        }
    }

    let write_result = state.raft.client_write(RaftCommitRequest { record: req.record }).await;

    match write_result {
        Ok(resp) => {
            let response = resp.response().clone();
            match (response.applied_index, response.error_code) {
                (Some(log_index), None) => {
                    metrics::record_commit("ok", "");
                    metrics::record_request("/commit_index", "ok", started.elapsed().as_secs_f64());
                    let mirrored = mirror_after_log_success(&state, should_mirror, &pkh, &kid, log_index).await;
                    Ok(success(log_index, true, mirrored))
                }
                (_, Some(code)) => {
                    // The record itself was rejected by the state machine;
                    // this is not a commit-channel failure, so the mirror
                    // is never consulted.
                    metrics::record_commit("rejected", &code);
                    let message = response.error_message.unwrap_or_default();
                    Err(AppError::new(StatusCode::CONFLICT, code, message))
                }
                (None, None) => handle_log_failure(&state, should_mirror, &pkh, &kid, candidate_index, started).await,
            }
        }
        Err(e) => handle_log_failure(&state, should_mirror, &pkh, &kid, candidate_index, started)
            .await
            .map_err(|app_err| app_err.with_source(e)),
    }
}

async fn mirror_after_log_success(
    state: &GatewayState,
    should_mirror: bool,
    pkh: &sentinel_types::Pkh,
    kid: &sentinel_types::Kid,
    log_index: u64,
) -> bool {
    if !should_mirror {
        return false;
    }
    match &state.ledger {
        Some(ledger) => match ledger.mirror_commit(pkh, log_index).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(target: "gateway", error = %e, %kid, "ledger mirror failed after successful log commit");
                false
            }
        },
        None => false,
    }
}

/// The log didn't confirm a commit (timeout, lost leadership, network
/// partition). Falls back to the ledger if mirroring is enabled; otherwise
/// the outcome is indeterminate and the caller must discard the index.
async fn handle_log_failure(
    state: &GatewayState,
    should_mirror: bool,
    pkh: &sentinel_types::Pkh,
    kid: &sentinel_types::Kid,
    candidate_index: u64,
    started: Instant,
) -> Result<Response, AppError> {
    if should_mirror {
        if let Some(ledger) = &state.ledger {
            match ledger.mirror_commit(pkh, candidate_index).await {
                Ok(()) => {
                    tracing::warn!(target: "gateway", %kid, index = candidate_index, "replicated log commit failed, falling back to ledger mirror");
                    metrics::record_commit("fallback", "");
                    metrics::record_request("/commit_index", "fallback", started.elapsed().as_secs_f64());
                    return Ok(success(0, false, true));
                }
                Err(e) => {
                    tracing::error!(target: "gateway", error = %e, %kid, "both replicated log and ledger mirror failed");
                }
            }
        }
    }
    metrics::record_commit("indeterminate", "PIPELINE_INDETERMINATE");
    metrics::record_request("/commit_index", "indeterminate", started.elapsed().as_secs_f64());
    Err(AppError::from(PipelineError::Indeterminate))
}

fn success(log_index: u64, log_committed: bool, mirrored: bool) -> Response {
    Json(CommitIndexResponse { committed: true, log_committed, log_index, mirrored }).into_response()
}
