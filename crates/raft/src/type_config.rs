//! The `openraft` type configuration for this cluster: node id, request,
//! and response types that flow through the replicated log.

use openraft::BasicNode;
use serde::{Deserialize, Serialize};

use sentinel_types::ChainRecord;

pub type NodeId = u64;

/// The only kind of write this replicated log carries: a candidate chain
/// record proposed by whichever node currently holds leadership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRequest {
    pub record: ChainRecord,
}

/// The state machine's reply to a committed [`CommitRequest`], carried back
/// to the client through the raft client-write response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitResponse {
    pub applied_index: Option<u64>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl CommitResponse {
    pub fn ok(applied_index: u64) -> Self {
        Self {
            applied_index: Some(applied_index),
            error_code: None,
            error_message: None,
        }
    }

    pub fn rejected(code: &'static str, message: String) -> Self {
        Self {
            applied_index: None,
            error_code: Some(code.to_string()),
            error_message: Some(message),
        }
    }
}

openraft::declare_raft_types!(
    pub TypeConfig:
        D = CommitRequest,
        R = CommitResponse,
        NodeId = NodeId,
        Node = BasicNode,
        Entry = openraft::Entry<TypeConfig>,
        SnapshotData = std::io::Cursor<Vec<u8>>,
        AsyncRuntime = openraft::TokioRuntime,
);
