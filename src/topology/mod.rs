//! Cluster Topology Module
//!
//! Owns the data model of the cluster (node identity, lifecycle status and
//! cache policy) and the consistent-hash ring that partitions the key space
//! across active nodes.
//!
//! ## Core Mechanisms
//! - **Positioning**: every node hashes its `host:port` identity with MD5 to a
//!   128-bit ring position. Keys hash the same way, so placement is
//!   deterministic and independent of discovery order.
//! - **Range Ownership**: each member owns the interval `(predecessor, self]`,
//!   wrapping around zero. Ranges are recomputed for the affected member and
//!   its successor on every ring mutation.
//! - **Lookup**: a key is routed to the first member at or clockwise of its
//!   hash, wrapping to the smallest position past the end of the ring.

pub mod ring;
pub mod types;

#[cfg(test)]
mod tests;
