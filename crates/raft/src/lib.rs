//! `openraft` wiring for the replicated log: storage adapters, the state
//! machine adapter, and the HTTP network transport.

pub mod log_store;
pub mod network;
pub mod state_machine;
pub mod type_config;

pub use log_store::LogStore;
pub use network::HttpNetworkFactory;
pub use state_machine::StateMachine;
pub use type_config::{CommitRequest, CommitResponse, NodeId, TypeConfig};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use openraft::Config;
use sentinel_fsm::ReplicatedFsm;
use sentinel_storage::RaftLogStore as RawLogStore;

pub type ClusterRaft = openraft::Raft<TypeConfig>;

/// Builds and starts a `Raft` instance wired to redb-backed log storage,
/// the chain-record state machine, and the HTTP network transport.
pub async fn start(
    node_id: NodeId,
    raw_log_store: RawLogStore,
    fsm: Arc<Mutex<ReplicatedFsm>>,
    network_timeout: Duration,
) -> Result<ClusterRaft, openraft::error::Fatal<NodeId>> {
    let config = Arc::new(
        Config {
            heartbeat_interval: 250,
            election_timeout_min: 800,
            election_timeout_max: 1500,
            ..Default::default()
        }
        .validate()
        .expect("raft config is statically valid"),
    );

    let log_store = LogStore::new(raw_log_store);
    let state_machine = StateMachine::new(fsm);
    let network = HttpNetworkFactory::new(network_timeout);

    openraft::Raft::new(node_id, config, network, log_store, state_machine).await
}
