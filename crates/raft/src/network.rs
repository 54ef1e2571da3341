//! HTTP-based `openraft` network transport. Raft RPCs (vote, append-entries,
//! install-snapshot) are POSTed as JSON to the internal raft routes the
//! gateway exposes on every cluster replica.

use std::time::Duration;

use openraft::error::{InstallSnapshotError, NetworkError, RaftError};
use openraft::network::{RaftNetwork, RaftNetworkFactory};
use openraft::raft::{
    AppendEntriesRequest, AppendEntriesResponse, InstallSnapshotRequest, InstallSnapshotResponse,
    VoteRequest, VoteResponse,
};
use openraft::BasicNode;

use crate::type_config::{NodeId, TypeConfig};

#[derive(Clone)]
pub struct HttpNetworkFactory {
    client: reqwest::Client,
}

impl HttpNetworkFactory {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client builds with default TLS config"),
        }
    }
}

impl RaftNetworkFactory<TypeConfig> for HttpNetworkFactory {
    type Network = HttpNetwork;

    async fn new_client(&mut self, target: NodeId, node: &BasicNode) -> Self::Network {
        HttpNetwork {
            client: self.client.clone(),
            target,
            base_url: format!("http://{}", node.addr),
        }
    }
}

pub struct HttpNetwork {
    client: reqwest::Client,
    target: NodeId,
    base_url: String,
}

impl HttpNetwork {
    async fn post<Req: serde::Serialize, Resp: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        req: &Req,
    ) -> Result<Resp, NetworkError> {
        let url = format!("{}/raft/{path}", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(req)
            .send()
            .await
            .map_err(|e| NetworkError::new(&e))?;
        resp.json::<Resp>().await.map_err(|e| NetworkError::new(&e))
    }
}

impl RaftNetwork<TypeConfig> for HttpNetwork {
    async fn append_entries(
        &mut self,
        rpc: AppendEntriesRequest<TypeConfig>,
        _option: openraft::network::RPCOption,
    ) -> Result<AppendEntriesResponse<NodeId>, openraft::error::RPCError<NodeId, BasicNode, RaftError<NodeId>>>
    {
        self.post("append-entries", &rpc)
            .await
            .map_err(|e| openraft::error::RPCError::Network(e))
    }

    async fn install_snapshot(
        &mut self,
        rpc: InstallSnapshotRequest<TypeConfig>,
        _option: openraft::network::RPCOption,
    ) -> Result<
        InstallSnapshotResponse<NodeId>,
        openraft::error::RPCError<NodeId, BasicNode, RaftError<NodeId, InstallSnapshotError>>,
    > {
        self.post("install-snapshot", &rpc)
            .await
            .map_err(|e| openraft::error::RPCError::Network(e))
    }

    async fn vote(
        &mut self,
        rpc: VoteRequest<NodeId>,
        _option: openraft::network::RPCOption,
    ) -> Result<VoteResponse<NodeId>, openraft::error::RPCError<NodeId, BasicNode, RaftError<NodeId>>>
    {
        self.post("vote", &rpc)
            .await
            .map_err(|e| openraft::error::RPCError::Network(e))
    }
}
