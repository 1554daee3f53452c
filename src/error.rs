//! Error taxonomy for the configuration service.
//!
//! Control operations never leak these across the controller's public
//! surface; they are consumed internally and reported as boolean success
//! plus queryable node statuses. Queries (ring lookups, config loading)
//! return them directly.

use std::time::Duration;

use thiserror::Error;

/// Seed configuration file rejection.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("line {line}: expected 3 tokens, got {found}: {content:?}")]
    Malformed {
        line: usize,
        found: usize,
        content: String,
    },

    #[error("line {line}: invalid port {value:?}")]
    Port { line: usize, value: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Hash ring invariant violations. Fatal to the current operation,
/// never to the process.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RingError {
    #[error("ring position {0:032x} is already taken")]
    DuplicatePosition(u128),

    #[error("hash ring is empty")]
    RingEmpty,

    #[error("node {0} is not on the ring")]
    NotMember(String),
}

/// Coordination-service failures. The current control operation treats
/// any of these as fatal; controller state is left unchanged.
#[derive(Error, Debug)]
pub enum CoordinationError {
    #[error("session lost")]
    SessionLost,

    #[error("session not connected within {0:?}")]
    ConnectTimeout(Duration),

    #[error("znode not found: {0}")]
    NotFound(String),

    #[error("znode already exists: {0}")]
    AlreadyExists(String),

    #[error("version conflict on {path}: expected {expected}, found {actual}")]
    VersionConflict {
        path: String,
        expected: u64,
        actual: u64,
    },

    #[error("invalid znode path: {0}")]
    BadPath(String),
}

/// Why the controller failed to come up. Distinguished so the binary can
/// map config rejection and an unreachable coordination service to their
/// exit codes.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Coordination(#[from] CoordinationError),
}

/// Per-target outcome of a multicast. Targets fail independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// The target did not acknowledge before the deadline.
    Timeout,
    /// Writing the command to the target's znode failed.
    WriteFailed,
    /// The shared coordination session died mid-delivery.
    SessionLost,
    /// The target's znode does not exist or was deleted while waiting.
    TargetGone,
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeliveryError::Timeout => "timeout",
            DeliveryError::WriteFailed => "write failed",
            DeliveryError::SessionLost => "session lost",
            DeliveryError::TargetGone => "target gone",
        };
        f.write_str(s)
    }
}
