use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::CoordinationError;

use super::client::{CoordinationService, CreateMode, Watch, WatchEvent, ZnodeStat};

struct Znode {
    data: Vec<u8>,
    version: u64,
    watchers: Vec<oneshot::Sender<WatchEvent>>,
}

/// In-process coordination service.
///
/// Backs tests and the binary's `--local` mode with the same semantics the
/// controller expects from a real deployment: hierarchical paths whose
/// parents must exist, monotonic per-znode versions, one-shot watches, and
/// a session gate on every operation. [`MemoryCoordination::kill_session`]
/// makes session loss observable to callers.
pub struct MemoryCoordination {
    znodes: DashMap<String, Znode>,
    connected: AtomicBool,
    session_id: Mutex<Option<Uuid>>,
    sequence: AtomicU64,
}

impl MemoryCoordination {
    pub fn new() -> Self {
        Self {
            znodes: DashMap::new(),
            connected: AtomicBool::new(false),
            session_id: Mutex::new(None),
            sequence: AtomicU64::new(0),
        }
    }

    /// Drops the session. Subsequent operations fail with `SessionLost` and
    /// every registered watch resolves as lost.
    pub fn kill_session(&self) {
        self.connected.store(false, Ordering::SeqCst);
        for mut entry in self.znodes.iter_mut() {
            // Dropping the senders wakes the waiting side with an error.
            entry.watchers.clear();
        }
        tracing::warn!("coordination session dropped");
    }

    fn ensure_session(&self) -> Result<(), CoordinationError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CoordinationError::SessionLost)
        }
    }

    fn fire(&self, path: &str, event: WatchEvent) {
        if let Some(mut entry) = self.znodes.get_mut(path) {
            for tx in entry.watchers.drain(..) {
                let _ = tx.send(event);
            }
        }
    }
}

impl Default for MemoryCoordination {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(path: &str) -> Result<(), CoordinationError> {
    let ok = path.len() > 1
        && path.starts_with('/')
        && !path.ends_with('/')
        && !path.contains("//");
    if ok {
        Ok(())
    } else {
        Err(CoordinationError::BadPath(path.to_string()))
    }
}

fn parent_of(path: &str) -> Option<&str> {
    match path.rfind('/') {
        Some(0) | None => None,
        Some(idx) => Some(&path[..idx]),
    }
}

#[async_trait]
impl CoordinationService for MemoryCoordination {
    async fn connect(&self, _timeout: Duration) -> Result<(), CoordinationError> {
        // The in-process service is always reachable; the session is live as
        // soon as an id is assigned.
        let id = Uuid::new_v4();
        *self.session_id.lock().expect("session lock poisoned") = Some(id);
        self.connected.store(true, Ordering::SeqCst);
        tracing::info!("coordination session {} established", id);
        Ok(())
    }

    async fn create(
        &self,
        path: &str,
        data: &[u8],
        mode: CreateMode,
    ) -> Result<String, CoordinationError> {
        self.ensure_session()?;
        validate(path)?;

        let actual = match mode {
            CreateMode::Persistent => path.to_string(),
            CreateMode::EphemeralSequential => {
                format!("{}{:010}", path, self.sequence.fetch_add(1, Ordering::SeqCst))
            }
        };

        if let Some(parent) = parent_of(&actual) {
            if !self.znodes.contains_key(parent) {
                return Err(CoordinationError::NotFound(parent.to_string()));
            }
        }

        match self.znodes.entry(actual.clone()) {
            Entry::Occupied(_) => return Err(CoordinationError::AlreadyExists(actual)),
            Entry::Vacant(slot) => {
                slot.insert(Znode {
                    data: data.to_vec(),
                    version: 0,
                    watchers: Vec::new(),
                });
            }
        }

        if let Some(parent) = parent_of(&actual) {
            self.fire(parent, WatchEvent::ChildrenChanged);
        }
        Ok(actual)
    }

    async fn exists(&self, path: &str) -> Result<Option<ZnodeStat>, CoordinationError> {
        self.ensure_session()?;
        Ok(self.znodes.get(path).map(|z| ZnodeStat { version: z.version }))
    }

    async fn get_data(&self, path: &str) -> Result<(Vec<u8>, ZnodeStat), CoordinationError> {
        self.ensure_session()?;
        let znode = self
            .znodes
            .get(path)
            .ok_or_else(|| CoordinationError::NotFound(path.to_string()))?;
        Ok((znode.data.clone(), ZnodeStat { version: znode.version }))
    }

    async fn set_data(
        &self,
        path: &str,
        data: &[u8],
        expected_version: Option<u64>,
    ) -> Result<ZnodeStat, CoordinationError> {
        self.ensure_session()?;
        let mut znode = self
            .znodes
            .get_mut(path)
            .ok_or_else(|| CoordinationError::NotFound(path.to_string()))?;

        if let Some(expected) = expected_version {
            if expected != znode.version {
                return Err(CoordinationError::VersionConflict {
                    path: path.to_string(),
                    expected,
                    actual: znode.version,
                });
            }
        }

        znode.data = data.to_vec();
        znode.version += 1;
        let stat = ZnodeStat { version: znode.version };
        for tx in znode.watchers.drain(..) {
            let _ = tx.send(WatchEvent::DataChanged);
        }
        Ok(stat)
    }

    async fn delete(
        &self,
        path: &str,
        expected_version: Option<u64>,
    ) -> Result<(), CoordinationError> {
        self.ensure_session()?;

        if let Some(expected) = expected_version {
            let znode = self
                .znodes
                .get(path)
                .ok_or_else(|| CoordinationError::NotFound(path.to_string()))?;
            if expected != znode.version {
                return Err(CoordinationError::VersionConflict {
                    path: path.to_string(),
                    expected,
                    actual: znode.version,
                });
            }
        }

        let (_, removed) = self
            .znodes
            .remove(path)
            .ok_or_else(|| CoordinationError::NotFound(path.to_string()))?;
        for tx in removed.watchers {
            let _ = tx.send(WatchEvent::Deleted);
        }
        if let Some(parent) = parent_of(path) {
            self.fire(parent, WatchEvent::ChildrenChanged);
        }
        Ok(())
    }

    async fn children(&self, path: &str) -> Result<Vec<String>, CoordinationError> {
        self.ensure_session()?;
        if !self.znodes.contains_key(path) {
            return Err(CoordinationError::NotFound(path.to_string()));
        }

        let prefix = format!("{}/", path);
        let mut names: Vec<String> = self
            .znodes
            .iter()
            .filter_map(|entry| {
                let rest = entry.key().strip_prefix(&prefix)?;
                if rest.is_empty() || rest.contains('/') {
                    None
                } else {
                    Some(rest.to_string())
                }
            })
            .collect();
        names.sort();
        Ok(names)
    }

    async fn watch(&self, path: &str) -> Result<Watch, CoordinationError> {
        self.ensure_session()?;
        let mut znode = self
            .znodes
            .get_mut(path)
            .ok_or_else(|| CoordinationError::NotFound(path.to_string()))?;
        let (tx, rx) = oneshot::channel();
        znode.watchers.push(tx);
        Ok(Watch { rx })
    }
}
