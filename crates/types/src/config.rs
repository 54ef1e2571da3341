//! Shared configuration structures.
//!
//! Deserialized from a TOML file and layered with CLI flags / environment
//! variables by the `sentinel-node` and `sentinel-cli` binaries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;

/// One member of the replicated cluster: maps a raft node id to the
/// addresses other nodes use to reach it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterMember {
    pub node_id: u64,
    /// Address other replicas dial for raft RPCs (append-entries, vote, snapshot).
    pub raft_addr: SocketAddr,
    /// Address clients and the leader router dial for the HTTP API.
    pub api_addr: SocketAddr,
}

/// Static cluster membership table: id -> API address, used by the leader
/// router to translate a reported leader id into a forwarding target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub members: Vec<ClusterMember>,
}

impl ClusterConfig {
    pub fn api_addr_of(&self, node_id: u64) -> Option<SocketAddr> {
        self.members
            .iter()
            .find(|m| m.node_id == node_id)
            .map(|m| m.api_addr)
    }

    pub fn raft_addr_of(&self, node_id: u64) -> Option<SocketAddr> {
        self.members
            .iter()
            .find(|m| m.node_id == node_id)
            .map(|m| m.raft_addr)
    }

    pub fn member_ids(&self) -> Vec<u64> {
        self.members.iter().map(|m| m.node_id).collect()
    }
}

/// Optional external ledger mirror configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub endpoint: String,
    /// Bearer token or similar credential for the ledger's authenticated RPC.
    pub credential: String,
    /// Constant identifier both sides use to tag the current-index entry.
    pub attestor_tag: String,
    #[serde(default = "default_ledger_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_ledger_timeout_ms() -> u64 {
    5_000
}

/// Top-level configuration for a cluster replica node (`sentinel-node node`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub node_id: u64,
    pub bind_api: SocketAddr,
    pub bind_raft: SocketAddr,
    pub data_dir: PathBuf,
    pub cluster: ClusterConfig,
    /// Exactly one node in the cluster must set this at initial formation.
    #[serde(default)]
    pub bootstrap: bool,
    /// PEM file containing the cluster's trusted attestation public key.
    pub attestor_public_key_path: PathBuf,
    #[serde(default)]
    pub ledger: Option<LedgerConfig>,
    /// Per-key opt-in for the external ledger mirror; keys absent from this
    /// map default to `mirror_default`.
    #[serde(default)]
    pub mirror_overrides: BTreeMap<String, bool>,
    #[serde(default)]
    pub mirror_default: bool,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    3_000
}

impl NodeConfig {
    pub fn mirror_enabled_for(&self, kid: &str) -> bool {
        self.mirror_overrides
            .get(kid)
            .copied()
            .unwrap_or(self.mirror_default)
    }
}

/// Configuration for the signer-side driver daemon (`sentinel-node signer`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerConfig {
    pub bind_api: SocketAddr,
    pub bind_metrics: SocketAddr,
    pub cluster: ClusterConfig,
    pub data_dir: PathBuf,
    /// PEM file containing this signer's attestation private key.
    pub attestation_private_key_path: PathBuf,
    pub attestor_public_key_path: PathBuf,
    #[serde(default)]
    pub ledger: Option<LedgerConfig>,
    #[serde(default)]
    pub mirror_overrides: BTreeMap<String, bool>,
    #[serde(default)]
    pub mirror_default: bool,
    #[serde(default = "default_request_timeout_ms")]
    pub commit_timeout_ms: u64,
}

impl SignerConfig {
    pub fn mirror_enabled_for(&self, kid: &str) -> bool {
        self.mirror_overrides.get(kid).copied().unwrap_or(self.mirror_default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_override_wins_over_default() {
        let mut cfg = sample_node_config();
        cfg.mirror_default = false;
        cfg.mirror_overrides.insert("user_1_key_0".into(), true);
        assert!(cfg.mirror_enabled_for("user_1_key_0"));
        assert!(!cfg.mirror_enabled_for("user_2_key_0"));
    }

    fn sample_node_config() -> NodeConfig {
        NodeConfig {
            node_id: 1,
            bind_api: "127.0.0.1:8080".parse().unwrap(),
            bind_raft: "127.0.0.1:9090".parse().unwrap(),
            data_dir: "/tmp/sentinel".into(),
            cluster: ClusterConfig { members: vec![] },
            bootstrap: true,
            attestor_public_key_path: "/tmp/attestor.pub.pem".into(),
            ledger: None,
            mirror_overrides: BTreeMap::new(),
            mirror_default: false,
            request_timeout_ms: 3_000,
        }
    }
}
