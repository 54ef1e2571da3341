//! HTTP client for the cluster's commit pipeline, used by the signer
//! driver. Any node's API address works: the gateway forwards writes to
//! the current leader transparently, so the driver doesn't need to track
//! leadership itself.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use sentinel_types::{ChainRecord, Digest, Pkh};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("cluster request failed: {0}")]
    Transport(String),
    #[error("cluster rejected the request: {code}: {message}")]
    Rejected { code: String, message: String },
    #[error("cluster response could not be decoded: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy)]
pub struct HeadInfo {
    pub exists: bool,
    pub index: u64,
    pub hash: Digest,
}

#[derive(Serialize)]
struct CommitIndexRequest<'a> {
    record: &'a ChainRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    mirror: Option<bool>,
}

#[derive(Deserialize)]
struct CommitIndexResponseWire {
    committed: bool,
    log_committed: bool,
    log_index: u64,
    mirrored: bool,
}

#[derive(Deserialize)]
struct IndexResponseWire {
    #[allow(dead_code)]
    pkh: Pkh,
    exists: bool,
    index: Option<u64>,
    hash: Option<Digest>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// The driver's view of a commit outcome: `committed` covers both the
/// normal case and the log-failed/mirror-succeeded fallback, so the
/// discard rule only needs to check this one field.
#[derive(Debug, Clone, Copy)]
pub struct CommitOutcome {
    pub committed: bool,
    pub log_committed: bool,
    pub log_index: u64,
    pub mirrored: bool,
}

#[derive(Clone)]
pub struct ClusterClient {
    http: reqwest::Client,
    base_url: String,
}

impl ClusterClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client builds with default TLS config"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn head(&self, pkh: &Pkh) -> Result<HeadInfo, ClientError> {
        let url = format!("{}/pubkey_hash/{}/index", self.base_url, pkh.to_hex());
        let resp = self.http.get(&url).send().await.map_err(|e| ClientError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(self.decode_error(resp).await);
        }
        let body: IndexResponseWire =
            resp.json().await.map_err(|e| ClientError::Decode(e.to_string()))?;
        match (body.exists, body.index, body.hash) {
            (true, Some(index), Some(hash)) => Ok(HeadInfo { exists: true, index, hash }),
            _ => Ok(HeadInfo { exists: false, index: 0, hash: sentinel_types::GENESIS_DIGEST }),
        }
    }

    pub async fn commit(&self, record: &ChainRecord, mirror: Option<bool>) -> Result<CommitOutcome, ClientError> {
        let url = format!("{}/commit_index", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&CommitIndexRequest { record, mirror })
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(self.decode_error(resp).await);
        }
        let body: CommitIndexResponseWire =
            resp.json().await.map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(CommitOutcome {
            committed: body.committed,
            log_committed: body.log_committed,
            log_index: body.log_index,
            mirrored: body.mirrored,
        })
    }

    async fn decode_error(&self, resp: reqwest::Response) -> ClientError {
        match resp.json::<ErrorBody>().await {
            Ok(body) => ClientError::Rejected { code: body.error.code, message: body.error.message },
            Err(e) => ClientError::Decode(e.to_string()),
        }
    }
}
