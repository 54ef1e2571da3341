//! Leader router: every write must land on the raft leader. A replica that
//! receives a write while not leading forwards the original request
//! verbatim (method, path, query, headers, body) to whichever node it
//! currently believes is leader.

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};

use sentinel_raft::NodeId;
use sentinel_types::PipelineError;

use crate::error::AppError;
use crate::metrics;
use crate::state::GatewayState;

/// Resolves the current leader's API address from the static cluster
/// membership table, or `NoLeader` if raft hasn't elected one yet.
pub async fn leader_api_addr(state: &GatewayState) -> Result<std::net::SocketAddr, PipelineError> {
    let leader_id: Option<NodeId> = state.raft.current_leader().await;
    let leader_id = leader_id.ok_or(PipelineError::NoLeader)?;
    state
        .config
        .cluster
        .api_addr_of(leader_id)
        .ok_or_else(|| PipelineError::Internal(format!("unknown api address for leader {leader_id}")))
}

/// Forwards the current request to `target` and relays its response back
/// to the original caller unchanged.
pub async fn forward(
    state: &GatewayState,
    target: std::net::SocketAddr,
    method: Method,
    path_and_query: &str,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let url = format!("http://{target}{path_and_query}");
    let mut req = state.http.request(method, &url);
    for (name, value) in headers.iter() {
        if name == axum::http::header::HOST {
            continue;
        }
        req = req.header(name, value);
    }
    let resp = req.body(body).send().await.map_err(|e| {
        metrics::record_forward("error");
        AppError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "PIPELINE_NO_LEADER",
            format!("failed to forward to leader at {target}: {e}"),
        )
    })?;
    metrics::record_forward("ok");

    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| AppError::internal(format!("failed to read forwarded response body: {e}")))?;

    let mut response = (status, bytes).into_response();
    *response.headers_mut() = headers;
    Ok(response)
}
