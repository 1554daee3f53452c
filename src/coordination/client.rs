use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::CoordinationError;

/// How a znode is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateMode {
    /// Survives the creating session.
    Persistent,
    /// Tied to the creating session; the service appends a monotonically
    /// increasing suffix to the requested path.
    EphemeralSequential,
}

/// Znode metadata returned by read operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZnodeStat {
    /// Monotonic per-znode version, bumped on every data write.
    pub version: u64,
}

/// What a one-shot watch observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEvent {
    DataChanged,
    ChildrenChanged,
    Deleted,
}

/// A registered one-shot watch. Fires at most once, then must be
/// re-registered.
pub struct Watch {
    pub(crate) rx: oneshot::Receiver<WatchEvent>,
}

impl Watch {
    /// Resolves when the watch fires. A dropped session surfaces as
    /// [`CoordinationError::SessionLost`].
    pub async fn wait(self) -> Result<WatchEvent, CoordinationError> {
        self.rx.await.map_err(|_| CoordinationError::SessionLost)
    }
}

/// Capability interface to the durable coordination service.
///
/// One long-lived session is shared by all components; implementations must
/// be safe for concurrent operations on distinct paths.
#[async_trait]
pub trait CoordinationService: Send + Sync {
    /// Establishes the session, blocking until it reaches the connected
    /// state or `timeout` elapses.
    async fn connect(&self, timeout: Duration) -> Result<(), CoordinationError>;

    /// Creates a znode with an initial payload. Returns the actual path,
    /// which differs from the requested one for sequential nodes.
    async fn create(
        &self,
        path: &str,
        data: &[u8],
        mode: CreateMode,
    ) -> Result<String, CoordinationError>;

    async fn exists(&self, path: &str) -> Result<Option<ZnodeStat>, CoordinationError>;

    async fn get_data(&self, path: &str) -> Result<(Vec<u8>, ZnodeStat), CoordinationError>;

    /// Overwrites a znode's payload. When `expected_version` is given the
    /// write succeeds only if it matches the current version.
    async fn set_data(
        &self,
        path: &str,
        data: &[u8],
        expected_version: Option<u64>,
    ) -> Result<ZnodeStat, CoordinationError>;

    async fn delete(
        &self,
        path: &str,
        expected_version: Option<u64>,
    ) -> Result<(), CoordinationError>;

    /// Names (not paths) of the direct children of `path`.
    async fn children(&self, path: &str) -> Result<Vec<String>, CoordinationError>;

    /// Registers a one-shot watch on `path`.
    async fn watch(&self, path: &str) -> Result<Watch, CoordinationError>;
}
