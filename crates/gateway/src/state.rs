use std::sync::{Arc, Mutex};
use std::time::Duration;

use sentinel_fsm::ReplicatedFsm;
use sentinel_ledger::LedgerClient;
use sentinel_raft::{ClusterRaft, NodeId};
use sentinel_types::NodeConfig;

#[derive(Clone)]
pub struct GatewayState {
    pub node_id: NodeId,
    pub raft: ClusterRaft,
    pub fsm: Arc<Mutex<ReplicatedFsm>>,
    pub config: Arc<NodeConfig>,
    pub ledger: Option<Arc<dyn LedgerClient>>,
    pub http: reqwest::Client,
}

impl GatewayState {
    pub fn new(
        node_id: NodeId,
        raft: ClusterRaft,
        fsm: Arc<Mutex<ReplicatedFsm>>,
        config: Arc<NodeConfig>,
        ledger: Option<Arc<dyn LedgerClient>>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .expect("reqwest client builds with default TLS config");
        Self {
            node_id,
            raft,
            fsm,
            config,
            ledger,
            http,
        }
    }
}
