use std::collections::BTreeSet;

use reachab_types::NodeId;

use crate::topology::Topology;

/// Fork/join classification (§4.2): a fork is any node with out-degree > 1,
/// a join any node with in-degree > 1. `O(|V|)` over the topology's cached
/// adjacency.
pub fn forks_and_joins(topology: &Topology) -> (BTreeSet<NodeId>, BTreeSet<NodeId>) {
    (topology.forks(), topology.joins())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::build_topology;

    #[test]
    fn classifies_a_diamond() {
        let topo = build_topology(
            &BTreeSet::from([1, 2, 3, 4]),
            &[(1, 2), (1, 3), (2, 4), (3, 4)],
        )
        .unwrap();
        let (forks, joins) = forks_and_joins(&topo);
        assert_eq!(forks, BTreeSet::from([1]));
        assert_eq!(joins, BTreeSet::from([4]));
    }

    #[test]
    fn a_node_can_be_both_fork_and_join() {
        let topo = build_topology(
            &BTreeSet::from([1, 2, 3, 4, 5]),
            &[(1, 3), (2, 3), (3, 4), (3, 5)],
        )
        .unwrap();
        let (forks, joins) = forks_and_joins(&topo);
        assert!(forks.contains(&3));
        assert!(joins.contains(&3));
    }
}
