//! Metadata Snapshot Records
//!
//! The serialized active-ring snapshot published at the metadata znode.
//! Storage nodes and clients receive the complete ring on every update and
//! route requests with it; the records are self-describing JSON so readers
//! need no schema beyond this module.

use serde::{Deserialize, Serialize};

use crate::topology::ring::RingMember;

/// One active node in the published snapshot. Hash bounds are 32-char
/// lowercase hex of the 128-bit ring positions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub range_low: String,
    pub range_high: String,
}

impl From<&RingMember> for NodeRecord {
    fn from(member: &RingMember) -> Self {
        Self {
            name: member.name.clone(),
            host: member.host.clone(),
            port: member.port,
            range_low: member.range.lower_hex(),
            range_high: member.range.upper_hex(),
        }
    }
}

pub fn encode_snapshot(records: &[NodeRecord]) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(records)
}

pub fn decode_snapshot(bytes: &[u8]) -> serde_json::Result<Vec<NodeRecord>> {
    serde_json::from_slice(bytes)
}
