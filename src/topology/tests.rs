//! Topology Module Tests
//!
//! Exercises the consistent-hashing invariants the rest of the cluster
//! depends on: partitioning without gaps or overlaps, wrap-around lookup,
//! and range recomputation on ring mutations.

#[cfg(test)]
mod tests {
    use crate::error::RingError;
    use crate::topology::ring::HashRing;
    use crate::topology::types::{key_position, Node, RingPosition};

    fn seed_nodes() -> Vec<Node> {
        vec![
            Node::new("server1", "10.0.0.1", 5000),
            Node::new("server2", "10.0.0.2", 5000),
            Node::new("server3", "10.0.0.3", 5000),
        ]
    }

    fn ring_of(nodes: &[Node]) -> HashRing {
        let mut ring = HashRing::new();
        for node in nodes {
            ring.add(node).unwrap();
        }
        ring
    }

    #[test]
    fn single_member_owns_every_key() {
        let node = Node::new("solo", "10.0.0.1", 5000);
        let mut ring = HashRing::new();
        ring.add(&node).unwrap();

        for key in ["a", "zebra", "0", "some/long/key"] {
            assert_eq!(ring.node_for_key(key).unwrap().name, "solo");
        }

        // Full-space range: lower == upper == own position.
        let range = ring.range_of("solo").unwrap();
        assert_eq!(range.lower, node.position());
        assert_eq!(range.upper, node.position());
        assert!(range.contains(0));
        assert!(range.contains(RingPosition::MAX));
    }

    #[test]
    fn lookup_routes_to_first_member_at_or_clockwise() {
        let nodes = seed_nodes();
        let ring = ring_of(&nodes);

        let mut positions: Vec<RingPosition> = nodes.iter().map(|n| n.position()).collect();
        positions.sort_unstable();
        let [p0, p1, p2] = [positions[0], positions[1], positions[2]];

        // Exact hit lands on the member itself.
        assert_eq!(ring.node_for_position(p0).unwrap().position, p0);
        // Just past a member rolls to the next one.
        assert_eq!(ring.node_for_position(p0 + 1).unwrap().position, p1);
        assert_eq!(ring.node_for_position(p1 + 1).unwrap().position, p2);
        // Past the largest member wraps to the smallest.
        assert_eq!(
            ring.node_for_position(p2.wrapping_add(1)).unwrap().position,
            p0
        );
    }

    #[test]
    fn ranges_partition_the_key_space() {
        let ring = ring_of(&seed_nodes());

        // Every key is owned by exactly one member, and that member is the
        // one lookup returns.
        for key in ["alpha", "beta", "gamma", "delta", "k1", "k2", "k3", "k4"] {
            let position = key_position(key);
            let owners: Vec<_> = ring
                .members()
                .filter(|m| m.range.contains(position))
                .collect();
            assert_eq!(owners.len(), 1, "key {:?} must have exactly one owner", key);
            assert_eq!(owners[0].name, ring.node_for_key(key).unwrap().name);
        }
    }

    #[test]
    fn range_bounds_follow_ring_order() {
        let ring = ring_of(&seed_nodes());
        let members: Vec<_> = ring.members().cloned().collect();

        for (i, member) in members.iter().enumerate() {
            let predecessor = if i == 0 { members.len() - 1 } else { i - 1 };
            assert_eq!(member.range.upper, member.position);
            assert_eq!(member.range.lower, members[predecessor].position);
        }
    }

    #[test]
    fn removal_extends_the_successor_range() {
        let nodes = seed_nodes();
        let mut ring = ring_of(&nodes);

        let mut members: Vec<_> = ring.members().cloned().collect();
        members.sort_by_key(|m| m.position);
        let victim = members[1].clone();
        let old_lower = victim.range.lower;

        ring.remove(&victim.name).unwrap();

        assert_eq!(ring.len(), 2);
        let successor = ring.node_for_position(victim.position).unwrap();
        assert_eq!(successor.range.lower, old_lower);

        // Partitioning holds after the mutation.
        for key in ["alpha", "beta", "gamma", "delta"] {
            let position = key_position(key);
            let owners = ring
                .members()
                .filter(|m| m.range.contains(position))
                .count();
            assert_eq!(owners, 1);
        }
    }

    #[test]
    fn duplicate_position_is_rejected() {
        let mut ring = HashRing::new();
        ring.add(&Node::new("server1", "10.0.0.1", 5000)).unwrap();

        // Same host:port under a different name hashes to the same position.
        let twin = Node::new("impostor", "10.0.0.1", 5000);
        let err = ring.add(&twin).unwrap_err();
        assert_eq!(err, RingError::DuplicatePosition(twin.position()));
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn empty_ring_reports_ring_empty() {
        let mut ring = ring_of(&seed_nodes());
        ring.remove_all();

        assert!(ring.is_empty());
        assert_eq!(ring.node_for_key("any").unwrap_err(), RingError::RingEmpty);
        assert_eq!(
            ring.range_of("server1").unwrap_err(),
            RingError::NotMember("server1".to_string())
        );
    }

    #[test]
    fn removing_unknown_member_fails() {
        let mut ring = ring_of(&seed_nodes());
        let err = ring.remove("ghost").unwrap_err();
        assert_eq!(err, RingError::NotMember("ghost".to_string()));
        assert_eq!(ring.len(), 3);
    }
}
