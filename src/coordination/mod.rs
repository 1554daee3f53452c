//! Coordination Service Module
//!
//! Facade over the durable coordination service (DCS) the cluster uses for
//! command delivery and metadata publication. The rest of the crate talks to
//! the [`client::CoordinationService`] capability trait only, so any
//! strongly-consistent hierarchical store with versioned, watchable znodes
//! can back it.
//!
//! ## Semantics the cluster relies on
//! - **Versioning**: every znode carries a monotonic version number, enabling
//!   optimistic concurrency on writes and deletes.
//! - **Watches**: one-shot triggers that fire on data change, child change,
//!   or deletion of a znode, delivered in order per session.
//! - **Session liveness**: operations fail with a session error once the
//!   session is lost; the controller treats that as fatal to the current
//!   control operation.

pub mod client;
pub mod memory;


/// Persistent root under which every storage node gets its admin znode.
pub const SERVER_ROOT: &str = "/kv_servers";

/// Znode holding the serialized active-ring snapshot for storage nodes and
/// clients to read.
pub const METADATA_PATH: &str = "/metadata";

/// Admin znode path for the node named `name`.
pub fn server_node_path(name: &str) -> String {
    format!("{}/{}", SERVER_ROOT, name)
}
