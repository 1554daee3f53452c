use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::future::select_all;

use crate::coordination::client::{CoordinationService, CreateMode};
use crate::coordination::{server_node_path, METADATA_PATH, SERVER_ROOT};
use crate::error::{BootstrapError, RingError};
use crate::multicast::multicaster::{await_ack, Multicaster};
use crate::multicast::protocol::{AdminMessage, AdminOp};
use crate::topology::ring::{HashRing, RingMember};
use crate::topology::types::{CachePolicy, CacheStrategy, HashRange, Node, NodeStatus};

use super::config;
use super::launch::Launcher;
use super::protocol::{encode_snapshot, NodeRecord};

/// Matches the coordination-service connection timeout of the original
/// deployment.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(2);

/// The external configuration service: owns the idle pool, the table of
/// provisioned nodes, and the authoritative hash ring.
///
/// Control operations (`add_nodes`, `start`, `stop`, `shutdown`,
/// `remove_nodes`) are serialized by `&mut self`; each fans out internally
/// through a [`Multicaster`] and never leaks errors: failures are logged
/// and reported as boolean success plus queryable node statuses.
pub struct Controller {
    dcs: Arc<dyn CoordinationService>,
    launcher: Arc<dyn Launcher>,
    deadline: Duration,
    node_pool: VecDeque<Node>,
    node_table: BTreeMap<String, Node>,
    ring: HashRing,
}

impl Controller {
    /// Parses the seed configuration, fills the idle pool and establishes
    /// the coordination session, blocking until it is connected.
    pub async fn bootstrap(
        config_path: impl AsRef<Path>,
        dcs: Arc<dyn CoordinationService>,
        launcher: Arc<dyn Launcher>,
        deadline: Duration,
    ) -> Result<Self, BootstrapError> {
        let seeds = config::load_seed_nodes(config_path)?;
        tracing::info!("node pool seeded with {} idle node(s)", seeds.len());

        dcs.connect(deadline).await?;

        Ok(Self {
            dcs,
            launcher,
            deadline,
            node_pool: seeds.into(),
            node_table: BTreeMap::new(),
            ring: HashRing::new(),
        })
    }

    /// Every provisioned node, keyed by name.
    pub fn get_nodes(&self) -> &BTreeMap<String, Node> {
        &self.node_table
    }

    /// The node responsible for `key` on the current ring.
    pub fn get_node_by_key(&self, key: &str) -> Result<&RingMember, RingError> {
        self.ring.node_for_key(key)
    }

    pub fn ring(&self) -> &HashRing {
        &self.ring
    }

    pub fn pool_size(&self) -> usize {
        self.node_pool.len()
    }

    /// Provisions a single node. See [`Self::add_nodes`].
    pub async fn add_node(&mut self, strategy: CacheStrategy, size: usize) -> Option<Node> {
        self.add_nodes(1, strategy, size).await.and_then(|mut nodes| nodes.pop())
    }

    /// Reserves `count` idle nodes, writes their init znodes, launches the
    /// remote processes and awaits their INIT acknowledgements.
    ///
    /// Returns `None` when the pool is too small or the coordination service
    /// fails during setup. Nodes that launch but never ack are dropped to
    /// `Removed` and omitted from the result; the rest come back `Stopped`.
    pub async fn add_nodes(
        &mut self,
        count: usize,
        strategy: CacheStrategy,
        size: usize,
    ) -> Option<Vec<Node>> {
        if count > self.node_pool.len() {
            tracing::warn!(
                "insufficient capacity: requested {}, pool holds {}",
                count,
                self.node_pool.len()
            );
            return None;
        }

        let policy = CachePolicy { strategy, size };
        let mut reserved: Vec<Node> = self.node_pool.drain(..count).collect();
        for node in &mut reserved {
            node.status = NodeStatus::Inactive;
            node.cache_policy = Some(policy);
        }

        if let Err(e) = self.write_init_znodes(&reserved, &policy).await {
            tracing::error!("provisioning aborted, coordination failure: {}", e);
            // Unwind the reservation; the pool is unchanged on failure.
            for mut node in reserved.into_iter().rev() {
                node.status = NodeStatus::Idle;
                node.cache_policy = None;
                self.node_pool.push_front(node);
            }
            return None;
        }

        let mut launched = Vec::new();
        for mut node in reserved {
            match self.launcher.launch(&node).await {
                Ok(()) => launched.push(node),
                Err(e) => {
                    tracing::error!("unable to launch {}: {}", node, e);
                    node.status = NodeStatus::Removed;
                }
            }
        }

        for node in &launched {
            self.node_table.insert(node.name.clone(), node.clone());
        }

        let outcome = Multicaster::new(self.dcs.clone(), launched.clone(), self.deadline)
            .send(&AdminMessage::new(AdminOp::Init))
            .await;

        let mut provisioned = Vec::new();
        for mut node in launched {
            if outcome.failed(&node.name) {
                tracing::error!("no INIT ack from {}; dropping it", node);
                node.status = NodeStatus::Removed;
                self.node_table.remove(&node.name);
            } else {
                node.status = NodeStatus::Stopped;
                self.node_table.insert(node.name.clone(), node.clone());
                provisioned.push(node);
            }
        }
        Some(provisioned)
    }

    /// Multicasts START to every `Stopped` node; acknowledged nodes join the
    /// ring and turn `Active`. Publishes metadata before reporting.
    pub async fn start(&mut self) -> bool {
        let to_start: Vec<Node> = self
            .node_table
            .values()
            .filter(|n| n.status == NodeStatus::Stopped)
            .cloned()
            .collect();

        let outcome = Multicaster::new(self.dcs.clone(), to_start.clone(), self.deadline)
            .send(&AdminMessage::new(AdminOp::Start))
            .await;

        let mut ok = outcome.all_ok();
        for node in &to_start {
            if outcome.failed(&node.name) {
                continue;
            }
            if let Err(e) = self.ring.add(node) {
                tracing::error!("cannot place {} on the ring: {}", node, e);
                ok = false;
                continue;
            }
            if let Some(entry) = self.node_table.get_mut(&node.name) {
                entry.status = NodeStatus::Active;
            }
        }

        ok & self.publish_metadata().await
    }

    /// Multicasts STOP to every `Active` node; acknowledged nodes leave the
    /// ring and turn `Stopped`. Publishes metadata before reporting.
    pub async fn stop(&mut self) -> bool {
        let to_stop: Vec<Node> = self
            .node_table
            .values()
            .filter(|n| n.status == NodeStatus::Active)
            .cloned()
            .collect();

        let outcome = Multicaster::new(self.dcs.clone(), to_stop.clone(), self.deadline)
            .send(&AdminMessage::new(AdminOp::Stop))
            .await;

        let mut ok = outcome.all_ok();
        for node in &to_stop {
            if outcome.failed(&node.name) {
                continue;
            }
            if let Err(e) = self.ring.remove(&node.name) {
                tracing::error!("cannot take {} off the ring: {}", node, e);
                ok = false;
                continue;
            }
            if let Some(entry) = self.node_table.get_mut(&node.name) {
                entry.status = NodeStatus::Stopped;
            }
        }

        ok & self.publish_metadata().await
    }

    /// Multicasts SHUTDOWN to every provisioned node. Acknowledged nodes are
    /// removed from ring and table; on full success both end up empty.
    pub async fn shutdown(&mut self) -> bool {
        let targets: Vec<Node> = self.node_table.values().cloned().collect();

        let outcome = Multicaster::new(self.dcs.clone(), targets.clone(), self.deadline)
            .send(&AdminMessage::new(AdminOp::Shutdown))
            .await;

        if outcome.all_ok() {
            self.ring.remove_all();
            self.node_table.clear();
            return self.publish_metadata().await;
        }

        for node in &targets {
            if outcome.failed(&node.name) {
                continue;
            }
            self.retire(node);
        }
        self.publish_metadata().await;
        false
    }

    /// Multicasts SHUTDOWN to the named subset. Ring and table are mutated
    /// only for nodes that acknowledged.
    pub async fn remove_nodes(&mut self, names: &[String]) -> bool {
        let mut targets = Vec::new();
        let mut ok = true;
        for name in names {
            match self.node_table.get(name) {
                Some(node) => targets.push(node.clone()),
                None => {
                    tracing::warn!("cannot remove unknown node {}", name);
                    ok = false;
                }
            }
        }

        let outcome = Multicaster::new(self.dcs.clone(), targets.clone(), self.deadline)
            .send(&AdminMessage::new(AdminOp::Shutdown))
            .await;

        ok &= outcome.all_ok();
        for node in &targets {
            if outcome.failed(&node.name) {
                continue;
            }
            self.retire(node);
        }

        ok & self.publish_metadata().await
    }

    /// Waits until `count` provisioned nodes have reached `Stopped` (their
    /// INIT acknowledged) or `timeout` elapses. Never issues a command.
    pub async fn await_nodes(&mut self, count: usize, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.collect_init_acks(count)).await {
            Ok(reached) => reached,
            Err(_) => {
                tracing::warn!("timed out awaiting {} provisioned node(s)", count);
                false
            }
        }
    }

    /// Data hand-off between two provisioned nodes: MOVE_DATA to the source,
    /// then RECEIVE_DATA to the destination, each confirmed by ack. The
    /// rebalancing policy that picks pairs and ranges stays with the caller.
    pub async fn transfer_data(&mut self, from: &str, to: &str, range: HashRange) -> bool {
        let source = match self.node_table.get(from) {
            Some(node) => node.clone(),
            None => {
                tracing::warn!("transfer source {} is not provisioned", from);
                return false;
            }
        };
        let dest = match self.node_table.get(to) {
            Some(node) => node.clone(),
            None => {
                tracing::warn!("transfer destination {} is not provisioned", to);
                return false;
            }
        };

        let moved = Multicaster::new(self.dcs.clone(), vec![source], self.deadline)
            .send(&AdminMessage::move_data(range, dest.addr()))
            .await;
        if !moved.all_ok() {
            return false;
        }

        let received = Multicaster::new(self.dcs.clone(), vec![dest], self.deadline)
            .send(&AdminMessage::new(AdminOp::ReceiveData))
            .await;
        received.all_ok()
    }

    /// Serializes the current ring and writes it to the metadata znode,
    /// creating it on first use. In-memory state is never touched here.
    async fn publish_metadata(&self) -> bool {
        let records: Vec<NodeRecord> = self.ring.members().map(NodeRecord::from).collect();
        let payload = match encode_snapshot(&records) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("failed to encode metadata snapshot: {}", e);
                return false;
            }
        };

        let result = match self.dcs.exists(METADATA_PATH).await {
            Ok(None) => self
                .dcs
                .create(METADATA_PATH, &payload, CreateMode::Persistent)
                .await
                .map(|_| ()),
            Ok(Some(stat)) => self
                .dcs
                .set_data(METADATA_PATH, &payload, Some(stat.version))
                .await
                .map(|_| ()),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                tracing::debug!("metadata published: {} active node(s)", records.len());
                true
            }
            Err(e) => {
                tracing::error!("metadata publication failed: {}", e);
                false
            }
        }
    }

    /// Terminal transition: off the ring (if active), out of the table.
    fn retire(&mut self, node: &Node) {
        if node.status == NodeStatus::Active {
            if let Err(e) = self.ring.remove(&node.name) {
                tracing::error!("cannot take {} off the ring: {}", node, e);
            }
        }
        self.node_table.remove(&node.name);
        tracing::info!("{} removed from the cluster", node);
    }

    async fn collect_init_acks(&mut self, count: usize) -> bool {
        loop {
            let reached = self
                .node_table
                .values()
                .filter(|n| matches!(n.status, NodeStatus::Stopped | NodeStatus::Active))
                .count();
            if reached >= count {
                return true;
            }

            let pending: Vec<String> = self
                .node_table
                .values()
                .filter(|n| n.status == NodeStatus::Inactive)
                .map(|n| n.name.clone())
                .collect();
            if pending.is_empty() {
                // Nothing outstanding can close the gap.
                return false;
            }

            let waits = pending.into_iter().map(|name| {
                let dcs = self.dcs.clone();
                Box::pin(async move {
                    let path = server_node_path(&name);
                    let result = await_ack(dcs.as_ref(), &path).await;
                    (name, result)
                })
            });

            let ((name, result), _, _) = select_all(waits).await;
            match result {
                Ok(()) => {
                    if let Some(node) = self.node_table.get_mut(&name) {
                        node.status = NodeStatus::Stopped;
                        tracing::info!("{} acknowledged INIT", node);
                    }
                }
                Err(kind) => {
                    tracing::warn!("gave up awaiting {}: {}", name, kind);
                    self.node_table.remove(&name);
                }
            }
        }
    }

    /// Creates the server root on first use, then writes each reserved
    /// node's init blob, purging message znodes left over from a previous
    /// provisioning round.
    async fn write_init_znodes(
        &self,
        nodes: &[Node],
        policy: &CachePolicy,
    ) -> anyhow::Result<()> {
        if self.dcs.exists(SERVER_ROOT).await?.is_none() {
            self.dcs.create(SERVER_ROOT, b"", CreateMode::Persistent).await?;
        }

        let blob = serde_json::to_vec(policy)?;
        for node in nodes {
            let path = server_node_path(&node.name);
            match self.dcs.exists(&path).await? {
                None => {
                    self.dcs.create(&path, &blob, CreateMode::Persistent).await?;
                }
                Some(stat) => {
                    self.dcs.set_data(&path, &blob, Some(stat.version)).await?;
                    for child in self.dcs.children(&path).await? {
                        let msg_path = format!("{}/{}", path, child);
                        self.dcs.delete(&msg_path, None).await?;
                    }
                }
            }
        }
        Ok(())
    }
}
