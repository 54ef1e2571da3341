//! HTTP implementation of [`LedgerClient`] against an authenticated ledger
//! RPC endpoint. Transient failures (connection errors, 5xx, 429) are
//! retried with capped exponential backoff; anything else is surfaced
//! immediately so the caller's dual-commit / reconciliation logic can act
//! on it without waiting out the retry budget.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use sentinel_types::{LedgerConfig, MirrorError, Pkh};

use crate::client::{IdentityEntry, LedgerClient};

const MAX_RETRIES: usize = 4;
const BASE_BACKOFF_MS: u64 = 100;

pub struct HttpLedgerClient {
    base: String,
    credential: String,
    attestor_tag: String,
    client: Client,
}

impl HttpLedgerClient {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            base: config.endpoint.trim_end_matches('/').to_string(),
            credential: config.credential.clone(),
            attestor_tag: config.attestor_tag.clone(),
            client: Client::builder()
                .timeout(Duration::from_millis(config.timeout_ms))
                .build()
                .expect("reqwest client builds with default TLS config"),
        }
    }

    fn retry_delay(attempt: usize) -> Duration {
        let ms = BASE_BACKOFF_MS.saturating_mul(1u64 << attempt).min(2_000);
        Duration::from_millis(ms)
    }

    async fn call<Req: Serialize, Resp: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        req: &Req,
    ) -> Result<Resp, MirrorError> {
        let url = format!("{}/{path}", self.base);
        let mut attempt = 0;
        loop {
            let result = self
                .client
                .post(&url)
                .bearer_auth(&self.credential)
                .json(req)
                .send()
                .await;

            let response = match result {
                Ok(r) => r,
                Err(e) if attempt < MAX_RETRIES => {
                    tracing::debug!(target: "ledger", error = %e, attempt, "ledger RPC send failed, retrying");
                    sleep(Self::retry_delay(attempt)).await;
                    attempt += 1;
                    continue;
                }
                Err(e) => return Err(MirrorError::Rpc(e.to_string())),
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                if attempt < MAX_RETRIES {
                    tracing::debug!(target: "ledger", %status, attempt, "ledger RPC transient error, retrying");
                    sleep(Self::retry_delay(attempt)).await;
                    attempt += 1;
                    continue;
                }
                return Err(MirrorError::Rpc(format!("ledger returned {status}")));
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(MirrorError::Rpc(format!("ledger returned {status}: {body}")));
            }

            return response.json::<Resp>().await.map_err(|e| MirrorError::Rpc(e.to_string()));
        }
    }
}

#[derive(Serialize)]
struct ComputeNormalizedIdRequest<'a> {
    pkh: &'a str,
}

#[derive(Deserialize)]
struct ComputeNormalizedIdResponse {
    normalized_id: String,
}

#[derive(Serialize)]
struct GetIdentityRequest<'a> {
    normalized_id: &'a str,
}

#[derive(Deserialize)]
struct GetIdentityResponse {
    entries: Vec<IdentityEntry>,
}

#[derive(Serialize)]
struct UpdateIdentityRequest<'a> {
    normalized_id: &'a str,
    entries: Vec<IdentityEntry>,
}

#[derive(Deserialize)]
struct UpdateIdentityResponse {}

#[async_trait::async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn compute_normalized_id(&self, pkh: &Pkh) -> Result<String, MirrorError> {
        let hex = pkh.to_hex();
        let resp: ComputeNormalizedIdResponse = self
            .call("compute-normalized-id", &ComputeNormalizedIdRequest { pkh: &hex })
            .await?;
        if resp.normalized_id.is_empty() {
            return Err(MirrorError::BadNormalizedId("ledger returned an empty id".into()));
        }
        Ok(resp.normalized_id)
    }

    async fn get_identity(&self, normalized_id: &str) -> Result<Option<IdentityEntry>, MirrorError> {
        let resp: GetIdentityResponse = self
            .call("get-identity", &GetIdentityRequest { normalized_id })
            .await?;
        Ok(resp.entries.into_iter().next())
    }

    async fn get_identity_history(&self, normalized_id: &str) -> Result<Vec<IdentityEntry>, MirrorError> {
        self.call("get-identity-history", &GetIdentityRequest { normalized_id }).await
    }

    async fn update_identity(&self, normalized_id: &str, entry: IdentityEntry) -> Result<(), MirrorError> {
        let _: UpdateIdentityResponse = self
            .call(
                "update-identity",
                &UpdateIdentityRequest { normalized_id, entries: vec![entry] },
            )
            .await?;
        Ok(())
    }

    async fn mirror_commit(&self, pkh: &Pkh, index: u64) -> Result<(), MirrorError> {
        let normalized_id = self.compute_normalized_id(pkh).await?;
        self.update_identity(
            &normalized_id,
            IdentityEntry { tag: self.attestor_tag.clone(), index },
        )
        .await
    }

    async fn current_index(&self, pkh: &Pkh) -> Result<Option<u64>, MirrorError> {
        let normalized_id = self.compute_normalized_id(pkh).await?;
        Ok(self.get_identity(&normalized_id).await?.map(|e| e.index))
    }
}
