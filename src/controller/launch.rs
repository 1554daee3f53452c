use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::coordination::client::{CoordinationService, WatchEvent};
use crate::coordination::server_node_path;
use crate::multicast::protocol::{AdminMessage, AdminOp};
use crate::topology::types::Node;

/// Capability for bringing a storage node process to life. Injected so the
/// controller core stays agnostic of the deployment mechanism.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, node: &Node) -> Result<()>;
}

/// Launches the storage server on the node's host over ssh.
///
/// The remote command redirects output to files so the ssh channel does not
/// linger waiting for more.
pub struct SshLauncher {
    server_bin: String,
    dcs_addr: String,
    attempts: usize,
}

impl SshLauncher {
    pub fn new(server_bin: impl Into<String>, dcs_addr: impl Into<String>) -> Self {
        Self {
            server_bin: server_bin.into(),
            dcs_addr: dcs_addr.into(),
            attempts: 3,
        }
    }
}

#[async_trait]
impl Launcher for SshLauncher {
    async fn launch(&self, node: &Node) -> Result<()> {
        let remote_cmd = format!(
            "nohup {} {} {} > ./logs/output.log 2> ./logs/err.log &",
            self.server_bin, node.name, self.dcs_addr
        );

        let mut delay_ms = 150u64;
        for attempt in 0..self.attempts {
            tracing::info!("launching {} via ssh: {}", node, remote_cmd);
            let status = tokio::process::Command::new("ssh")
                .arg("-o")
                .arg("StrictHostKeyChecking=no")
                .arg("-n")
                .arg(&node.host)
                .arg(&remote_cmd)
                .status()
                .await
                .context("failed to spawn ssh")?;

            if status.success() {
                return Ok(());
            }

            tracing::warn!("ssh launch of {} exited with {}", node, status);
            if attempt + 1 == self.attempts {
                break;
            }
            let jitter = rand::random::<u64>() % 50;
            tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
            delay_ms = (delay_ms * 2).min(1200);
        }

        Err(anyhow!("ssh launch of {} failed after {} attempts", node, self.attempts))
    }
}

/// Launches nodes as in-process tasks on the shared coordination service.
/// Used by tests and by the binary's `--local` mode.
pub struct StubLauncher {
    dcs: Arc<dyn CoordinationService>,
}

impl StubLauncher {
    pub fn new(dcs: Arc<dyn CoordinationService>) -> Self {
        Self { dcs }
    }
}

#[async_trait]
impl Launcher for StubLauncher {
    async fn launch(&self, node: &Node) -> Result<()> {
        spawn_stub_node(self.dcs.clone(), node.name.clone());
        Ok(())
    }
}

/// Minimal in-process storage node: reads its cache-config blob, then
/// acknowledges every admin command until it is told to shut down or its
/// znode disappears.
pub fn spawn_stub_node(dcs: Arc<dyn CoordinationService>, name: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let path = server_node_path(&name);

        if let Ok((blob, _)) = dcs.get_data(&path).await {
            tracing::debug!(
                "node {} booted with init blob of {} bytes",
                name,
                blob.len()
            );
        }

        let Ok(ack) = AdminMessage::ack().encode() else {
            return;
        };

        loop {
            let Ok(watch) = dcs.watch(&path).await else {
                break;
            };

            // A command may have landed before the watch registered.
            let data = match dcs.get_data(&path).await {
                Ok((data, _)) => data,
                Err(_) => break,
            };
            if let Ok(msg) = AdminMessage::decode(&data) {
                if !msg.is_ack() {
                    if dcs.set_data(&path, &ack, None).await.is_err() {
                        break;
                    }
                    if msg.op == AdminOp::Shutdown {
                        tracing::debug!("node {} shutting down", name);
                        break;
                    }
                }
            }

            match watch.wait().await {
                Ok(WatchEvent::Deleted) | Err(_) => break,
                Ok(_) => {}
            }
        }
    })
}
