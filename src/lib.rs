//! External Configuration Service for a Distributed KV Cluster
//!
//! This library crate defines the control plane that provisions, starts,
//! stops and removes storage nodes and maintains the cluster's authoritative
//! routing metadata. It serves as the foundation for the binary executable
//! (`main.rs`).
//!
//! ## Architecture Modules
//! The system is composed of four loosely coupled subsystems:
//!
//! - **`topology`**: The cluster data model and the consistent-hash ring.
//!   Nodes hash their `host:port` identity to a 128-bit position and own the
//!   key interval back to their predecessor.
//! - **`coordination`**: The facade over the durable coordination service:
//!   versioned, watchable znodes used for command delivery and metadata
//!   publication, behind a capability trait with an in-process
//!   implementation.
//! - **`multicast`**: Parallel delivery of one admin command to many nodes
//!   with per-target acknowledgement tracking under a mandatory deadline,
//!   plus the admin-message codec.
//! - **`controller`**: The serialized control loop. Seed configuration,
//!   node pool and table, the per-node lifecycle state machine, remote
//!   launch, and publication of the active-ring snapshot.

pub mod controller;
pub mod coordination;
pub mod error;
pub mod multicast;
pub mod topology;
