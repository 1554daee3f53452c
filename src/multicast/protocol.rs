//! Admin Message Codec
//!
//! Self-describing JSON records exchanged through per-node admin znodes:
//! controller-to-node commands and the node-to-controller acknowledgement.
//! A znode may also hold the cache-config init blob written at provisioning
//! time; that blob is not an admin message and fails to decode as one, which
//! ack waiters treat as "keep waiting".

use serde::{Deserialize, Serialize};

use crate::topology::types::HashRange;

/// Operation carried by an [`AdminMessage`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminOp {
    Init,
    Start,
    Stop,
    Shutdown,
    MoveData,
    ReceiveData,
    Ack,
}

/// One admin command or acknowledgement.
///
/// `range` and `destination` accompany `MOVE_DATA`; `payload` is opaque room
/// for node-side extensions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminMessage {
    #[serde(rename = "opType")]
    pub op: AdminOp,
    /// `[lower, upper]` as 32-char hex, present on data-movement commands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<[String; 2]>,
    /// `host:port` of the receiving node, present on data-movement commands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl AdminMessage {
    pub fn new(op: AdminOp) -> Self {
        Self {
            op,
            range: None,
            destination: None,
            payload: None,
        }
    }

    pub fn ack() -> Self {
        Self::new(AdminOp::Ack)
    }

    /// The `MOVE_DATA` command: hand the keys in `range` to `destination`.
    pub fn move_data(range: HashRange, destination: String) -> Self {
        Self {
            op: AdminOp::MoveData,
            range: Some([range.lower_hex(), range.upper_hex()]),
            destination: Some(destination),
            payload: None,
        }
    }

    pub fn is_ack(&self) -> bool {
        self.op == AdminOp::Ack
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn decode(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
