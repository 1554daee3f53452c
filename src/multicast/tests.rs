//! Multicast Module Tests
//!
//! Runs the multicaster against the in-process coordination service with
//! stub nodes acking on the other side, covering full success, independent
//! per-target timeouts, vanished targets, and session loss.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::controller::launch::spawn_stub_node;
    use crate::coordination::client::{CoordinationService, CreateMode};
    use crate::coordination::memory::MemoryCoordination;
    use crate::coordination::{server_node_path, SERVER_ROOT};
    use crate::error::DeliveryError;
    use crate::multicast::multicaster::Multicaster;
    use crate::multicast::protocol::{AdminMessage, AdminOp};
    use crate::topology::types::Node;

    const DEADLINE: Duration = Duration::from_millis(400);

    /// Creates a connected service with one admin znode per name.
    async fn cluster(names: &[&str]) -> (Arc<MemoryCoordination>, Vec<Node>) {
        let dcs = Arc::new(MemoryCoordination::new());
        dcs.connect(DEADLINE).await.unwrap();
        dcs.create(SERVER_ROOT, b"", CreateMode::Persistent)
            .await
            .unwrap();

        let mut nodes = Vec::new();
        for (i, name) in names.iter().enumerate() {
            dcs.create(&server_node_path(name), b"{}", CreateMode::Persistent)
                .await
                .unwrap();
            nodes.push(Node::new(*name, format!("10.0.0.{}", i + 1), 5000));
        }
        (dcs, nodes)
    }

    fn as_dyn(dcs: &Arc<MemoryCoordination>) -> Arc<dyn CoordinationService> {
        dcs.clone()
    }

    #[tokio::test]
    async fn every_target_acks() {
        let (dcs, nodes) = cluster(&["server1", "server2", "server3"]).await;
        for node in &nodes {
            spawn_stub_node(as_dyn(&dcs), node.name.clone());
        }

        let outcome = Multicaster::new(as_dyn(&dcs), nodes, DEADLINE)
            .send(&AdminMessage::new(AdminOp::Start))
            .await;

        assert!(outcome.all_ok());
        assert_eq!(outcome.acked.len(), 3);
    }

    #[tokio::test]
    async fn silent_target_times_out_without_blocking_the_rest() {
        let (dcs, nodes) = cluster(&["server1", "server2", "server3"]).await;
        // server3 exists but never answers.
        spawn_stub_node(as_dyn(&dcs), "server1".to_string());
        spawn_stub_node(as_dyn(&dcs), "server2".to_string());

        let outcome = Multicaster::new(as_dyn(&dcs), nodes, DEADLINE)
            .send(&AdminMessage::new(AdminOp::Stop))
            .await;

        assert!(!outcome.all_ok());
        assert_eq!(outcome.acked.len(), 2);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors["server3"], DeliveryError::Timeout);
    }

    #[tokio::test]
    async fn missing_znode_reports_target_gone() {
        let (dcs, mut nodes) = cluster(&["server1"]).await;
        spawn_stub_node(as_dyn(&dcs), "server1".to_string());
        nodes.push(Node::new("ghost", "10.0.0.9", 5000));

        let outcome = Multicaster::new(as_dyn(&dcs), nodes, DEADLINE)
            .send(&AdminMessage::new(AdminOp::Start))
            .await;

        assert_eq!(outcome.acked, vec!["server1".to_string()]);
        assert_eq!(outcome.errors["ghost"], DeliveryError::TargetGone);
    }

    #[tokio::test]
    async fn session_loss_fails_outstanding_targets() {
        let (dcs, nodes) = cluster(&["server1"]).await;
        // No stub: the target would time out, but the session dies first.
        let killer = dcs.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            killer.kill_session();
        });

        let outcome = Multicaster::new(as_dyn(&dcs), nodes, DEADLINE)
            .send(&AdminMessage::new(AdminOp::Start))
            .await;

        assert_eq!(outcome.errors["server1"], DeliveryError::SessionLost);
    }

    #[tokio::test]
    async fn resending_to_an_acked_target_is_safe() {
        let (dcs, nodes) = cluster(&["server1"]).await;
        spawn_stub_node(as_dyn(&dcs), "server1".to_string());

        let multicaster = Multicaster::new(as_dyn(&dcs), nodes, DEADLINE);
        let first = multicaster.send(&AdminMessage::new(AdminOp::Start)).await;
        let second = multicaster.send(&AdminMessage::new(AdminOp::Start)).await;

        assert!(first.all_ok());
        assert!(second.all_ok());
    }

    #[tokio::test]
    async fn empty_target_set_is_a_no_op() {
        let (dcs, _) = cluster(&[]).await;
        let outcome = Multicaster::new(as_dyn(&dcs), Vec::new(), DEADLINE)
            .send(&AdminMessage::new(AdminOp::Start))
            .await;
        assert!(outcome.all_ok());
        assert!(outcome.acked.is_empty());
    }
}
