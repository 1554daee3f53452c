use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

use serde::{Deserialize, Serialize};

use crate::error::RingError;

use super::types::{key_position, HashRange, Node, RingPosition};

/// A node as seen by the ring: identity plus its owned hash range.
///
/// Lifecycle status deliberately stays out; the ring only ever holds nodes
/// the controller considers active, and status is the node table's concern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RingMember {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub position: RingPosition,
    pub range: HashRange,
}

impl RingMember {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Ordered ring of active nodes keyed by their 128-bit positions.
///
/// Members partition the key space: each owns `(predecessor, self]`, with no
/// gaps or overlaps. Iteration is in ascending position order.
#[derive(Debug, Default)]
pub struct HashRing {
    ring: BTreeMap<RingPosition, RingMember>,
}

impl HashRing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Members in ascending position order.
    pub fn members(&self) -> impl Iterator<Item = &RingMember> {
        self.ring.values()
    }

    /// Inserts `node` at its hash position and recomputes the ranges of the
    /// new member and of its immediate successor, whose lower bound shifts.
    pub fn add(&mut self, node: &Node) -> Result<(), RingError> {
        let position = node.position();
        if self.ring.contains_key(&position) {
            return Err(RingError::DuplicatePosition(position));
        }

        self.ring.insert(
            position,
            RingMember {
                name: node.name.clone(),
                host: node.host.clone(),
                port: node.port,
                position,
                range: HashRange::new(position, position),
            },
        );

        self.recompute_range(position);
        if let Some(successor) = self.successor_of(position) {
            if successor != position {
                self.recompute_range(successor);
            }
        }
        Ok(())
    }

    /// Deletes the member named `name` and recomputes its successor's range,
    /// whose lower bound falls back to the removed member's old predecessor.
    pub fn remove(&mut self, name: &str) -> Result<RingMember, RingError> {
        let position = self
            .ring
            .values()
            .find(|m| m.name == name)
            .map(|m| m.position)
            .ok_or_else(|| RingError::NotMember(name.to_string()))?;

        let removed = self
            .ring
            .remove(&position)
            .ok_or_else(|| RingError::NotMember(name.to_string()))?;
        if let Some(successor) = self.successor_of(position) {
            self.recompute_range(successor);
        }
        Ok(removed)
    }

    /// Empties the ring.
    pub fn remove_all(&mut self) {
        self.ring.clear();
    }

    /// The member responsible for `key`: the first member at or clockwise of
    /// `MD5(key)`, wrapping to the smallest position.
    pub fn node_for_key(&self, key: &str) -> Result<&RingMember, RingError> {
        self.node_for_position(key_position(key))
    }

    /// Same as [`Self::node_for_key`] but takes a raw ring position.
    pub fn node_for_position(&self, position: RingPosition) -> Result<&RingMember, RingError> {
        self.ring
            .range(position..)
            .next()
            .or_else(|| self.ring.iter().next())
            .map(|(_, m)| m)
            .ok_or(RingError::RingEmpty)
    }

    /// The `(lower, upper]` range owned by the member named `name`.
    pub fn range_of(&self, name: &str) -> Result<HashRange, RingError> {
        self.ring
            .values()
            .find(|m| m.name == name)
            .map(|m| m.range)
            .ok_or_else(|| RingError::NotMember(name.to_string()))
    }

    /// First position strictly clockwise of `position`, wrapping past the
    /// largest key. With a single member this is the member itself.
    fn successor_of(&self, position: RingPosition) -> Option<RingPosition> {
        self.ring
            .range((Excluded(position), Unbounded))
            .next()
            .or_else(|| self.ring.iter().next())
            .map(|(p, _)| *p)
    }

    /// First position counter-clockwise of `position`, wrapping below zero.
    fn predecessor_of(&self, position: RingPosition) -> Option<RingPosition> {
        self.ring
            .range(..position)
            .next_back()
            .or_else(|| self.ring.iter().next_back())
            .map(|(p, _)| *p)
    }

    fn recompute_range(&mut self, position: RingPosition) {
        if let Some(lower) = self.predecessor_of(position) {
            if let Some(member) = self.ring.get_mut(&position) {
                member.range = HashRange::new(lower, position);
            }
        }
    }
}
