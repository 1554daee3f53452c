use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use crate::coordination::client::{CoordinationService, WatchEvent};
use crate::coordination::server_node_path;
use crate::error::{CoordinationError, DeliveryError};
use crate::topology::types::Node;

use super::protocol::AdminMessage;

/// Aggregate result of one multicast round.
#[derive(Debug, Default)]
pub struct MulticastOutcome {
    /// Names of targets that acknowledged before the deadline.
    pub acked: Vec<String>,
    /// Per-target failures, keyed by node name.
    pub errors: HashMap<String, DeliveryError>,
}

impl MulticastOutcome {
    pub fn all_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn failed(&self, name: &str) -> bool {
        self.errors.contains_key(name)
    }
}

/// Fans one admin command out to a set of nodes and collects per-target
/// acknowledgements under a shared deadline.
///
/// Built fresh per control operation; delivery to each target runs
/// concurrently and independently.
pub struct Multicaster {
    dcs: Arc<dyn CoordinationService>,
    targets: Vec<Node>,
    deadline: Duration,
}

impl Multicaster {
    pub fn new(dcs: Arc<dyn CoordinationService>, targets: Vec<Node>, deadline: Duration) -> Self {
        Self {
            dcs,
            targets,
            deadline,
        }
    }

    /// Delivers `message` to every target. Never fails as a whole; consult
    /// the outcome for per-target errors.
    pub async fn send(&self, message: &AdminMessage) -> MulticastOutcome {
        let mut outcome = MulticastOutcome::default();
        if self.targets.is_empty() {
            return outcome;
        }

        let payload = match message.encode() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("failed to encode admin message: {}", e);
                for node in &self.targets {
                    outcome
                        .errors
                        .insert(node.name.clone(), DeliveryError::WriteFailed);
                }
                return outcome;
            }
        };

        let deliveries = self.targets.iter().map(|node| {
            let payload = payload.as_slice();
            async move {
                let result =
                    match tokio::time::timeout(self.deadline, self.deliver(node, payload)).await {
                        Ok(result) => result,
                        Err(_) => Err(DeliveryError::Timeout),
                    };
                (node.name.clone(), result)
            }
        });

        for (name, result) in join_all(deliveries).await {
            match result {
                Ok(()) => outcome.acked.push(name),
                Err(kind) => {
                    tracing::warn!("multicast target {} failed: {}", name, kind);
                    outcome.errors.insert(name, kind);
                }
            }
        }
        outcome
    }

    async fn deliver(&self, node: &Node, payload: &[u8]) -> Result<(), DeliveryError> {
        let path = server_node_path(&node.name);

        match self.dcs.exists(&path).await {
            Ok(Some(_)) => {}
            Ok(None) => return Err(DeliveryError::TargetGone),
            Err(e) => return Err(delivery_kind(e)),
        }

        if let Err(e) = self.dcs.set_data(&path, payload, None).await {
            return Err(match e {
                CoordinationError::NotFound(_) => DeliveryError::TargetGone,
                CoordinationError::SessionLost => DeliveryError::SessionLost,
                _ => DeliveryError::WriteFailed,
            });
        }

        await_ack(self.dcs.as_ref(), &path).await
    }
}

/// Waits until the znode at `path` holds an ACK message. Loops through
/// watch registrations indefinitely; callers bound it with a timeout.
pub(crate) async fn await_ack(
    dcs: &dyn CoordinationService,
    path: &str,
) -> Result<(), DeliveryError> {
    loop {
        let watch = match dcs.watch(path).await {
            Ok(watch) => watch,
            Err(e) => return Err(delivery_kind(e)),
        };

        // The ack may have landed between our write and the watch
        // registration; re-read before waiting.
        match dcs.get_data(path).await {
            Ok((data, _)) => {
                if AdminMessage::decode(&data).map(|m| m.is_ack()).unwrap_or(false) {
                    return Ok(());
                }
            }
            Err(e) => return Err(delivery_kind(e)),
        }

        match watch.wait().await {
            Ok(WatchEvent::Deleted) => return Err(DeliveryError::TargetGone),
            Ok(_) => {}
            Err(_) => return Err(DeliveryError::SessionLost),
        }
    }
}

fn delivery_kind(e: CoordinationError) -> DeliveryError {
    match e {
        CoordinationError::NotFound(_) => DeliveryError::TargetGone,
        CoordinationError::SessionLost => DeliveryError::SessionLost,
        _ => DeliveryError::WriteFailed,
    }
}
