use serde::{Deserialize, Serialize};

/// A position on the 128-bit hash ring.
pub type RingPosition = u128;

/// Hashes an arbitrary key to its ring position.
pub fn key_position(key: &str) -> RingPosition {
    RingPosition::from_be_bytes(md5::compute(key.as_bytes()).0)
}

/// Hashes a node identity (`host:port`) to its ring position.
pub fn node_position(host: &str, port: u16) -> RingPosition {
    key_position(&format!("{}:{}", host, port))
}

/// Lifecycle state of a storage node as tracked by the controller.
///
/// Transitions are driven exclusively by the controller's serialized control
/// loop: `Idle` nodes are reserved into `Inactive`, an INIT ack yields
/// `Stopped`, START/STOP acks toggle `Stopped`/`Active`, and a SHUTDOWN ack
/// ends in the terminal `Removed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeStatus {
    /// In the seed pool, not yet provisioned.
    Idle,
    /// Reserved and launched, INIT ack still outstanding.
    Inactive,
    /// Provisioned and idle; not serving keys, not on the ring.
    Stopped,
    /// Serving its hash range; present on the ring.
    Active,
    /// Terminal. Off the ring and out of the node table.
    Removed,
}

/// Cache eviction strategy forwarded to the storage node. Opaque to the
/// controller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheStrategy {
    Fifo,
    Lru,
    Lfu,
}

impl std::str::FromStr for CacheStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FIFO" => Ok(CacheStrategy::Fifo),
            "LRU" => Ok(CacheStrategy::Lru),
            "LFU" => Ok(CacheStrategy::Lfu),
            other => Err(format!("unknown cache strategy: {}", other)),
        }
    }
}

/// Per-node cache configuration, written to the node's znode as its init
/// blob during provisioning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CachePolicy {
    pub strategy: CacheStrategy,
    pub size: usize,
}

/// A single storage node known to the controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique name from the seed configuration.
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Current lifecycle state.
    pub status: NodeStatus,
    /// Assigned on provisioning; `None` while in the pool.
    pub cache_policy: Option<CachePolicy>,
}

impl Node {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            status: NodeStatus::Idle,
            cache_policy: None,
        }
    }

    /// The node's ring position, derived from its `host:port` identity.
    pub fn position(&self) -> RingPosition {
        node_position(&self.host, self.port)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.name, self.host, self.port)
    }
}

/// Half-open hash interval `(lower, upper]` owned by a ring member.
///
/// A range with `lower >= upper` wraps around zero; a single-member ring has
/// `lower == upper` and owns the entire key space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HashRange {
    pub lower: RingPosition,
    pub upper: RingPosition,
}

impl HashRange {
    pub fn new(lower: RingPosition, upper: RingPosition) -> Self {
        Self { lower, upper }
    }

    /// Whether `position` falls inside `(lower, upper]`, honoring wrap-around.
    pub fn contains(&self, position: RingPosition) -> bool {
        if self.lower < self.upper {
            position > self.lower && position <= self.upper
        } else {
            // Wrapped (or full-ring) interval.
            position > self.lower || position <= self.upper
        }
    }

    /// Lower bound as 32-char lowercase hex.
    pub fn lower_hex(&self) -> String {
        format!("{:032x}", self.lower)
    }

    /// Upper bound as 32-char lowercase hex.
    pub fn upper_hex(&self) -> String {
        format!("{:032x}", self.upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_is_derived_from_host_and_port() {
        let a = Node::new("server1", "10.0.0.1", 5000);
        let b = Node::new("server2", "10.0.0.1", 5001);

        assert_eq!(a.position(), node_position("10.0.0.1", 5000));
        assert_ne!(a.position(), b.position());
        // Renaming a node must not move it on the ring.
        let renamed = Node::new("other", "10.0.0.1", 5000);
        assert_eq!(a.position(), renamed.position());
    }

    #[test]
    fn wrapped_range_contains_both_ends_of_the_space() {
        let range = HashRange::new(0xF0, 0x10);

        assert!(range.contains(0xFF));
        assert!(range.contains(0x01));
        assert!(range.contains(0x10));
        assert!(!range.contains(0xF0));
        assert!(!range.contains(0x80));
    }

    #[test]
    fn full_ring_range_contains_everything() {
        let h = key_position("solo");
        let range = HashRange::new(h, h);

        assert!(range.contains(0));
        assert!(range.contains(h));
        assert!(range.contains(RingPosition::MAX));
    }

    #[test]
    fn cache_policy_serializes_with_uppercase_strategy() {
        let policy = CachePolicy {
            strategy: CacheStrategy::Lru,
            size: 1024,
        };

        let json = serde_json::to_string(&policy).unwrap();
        assert!(json.contains("\"LRU\""));

        let back: CachePolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, policy);
    }
}
