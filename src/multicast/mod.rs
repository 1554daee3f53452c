//! Multicast Module
//!
//! Delivers one admin command to many storage nodes in parallel and reports
//! a per-target outcome.
//!
//! ## Contract
//! - **Delivery**: the command overwrites each target's admin znode; the
//!   node's acknowledgement overwrites it back. A one-shot watch observes
//!   the turnaround.
//! - **Independence**: targets succeed or fail on their own; a slow target
//!   never blocks a fast one, and there is no cross-target ordering.
//! - **Deadline**: mandatory. Expiry marks every outstanding target as
//!   timed out and completes the call; retries are a caller decision.

pub mod multicaster;
pub mod protocol;

#[cfg(test)]
mod tests;
