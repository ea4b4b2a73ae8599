use std::collections::{BTreeMap, BTreeSet};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use reachab_types::{Edge, NodeId, ReachabError, Result};

/// Flattened adjacency plus the derived structures of §3/§4.1: iteration
/// sets (Kahn layers), sources, and reflexive-transitive ancestor/descendant
/// closures. Built once per analysis (or once per diamond, restricted to its
/// relevant nodes, by C4) and read-only afterwards.
///
/// The petgraph [`DiGraph`] is the adjacency representation proper, mirroring
/// the teacher's `FlatGraphView`; `outgoing`/`incoming` are a `BTreeSet`
/// cache over it so repeated lookups in C3/C5's hot loops don't re-walk
/// petgraph's neighbor iterators.
#[derive(Debug, Clone)]
pub struct Topology {
    pg: DiGraph<NodeId, ()>,
    index_of: BTreeMap<NodeId, NodeIndex>,
    outgoing: BTreeMap<NodeId, BTreeSet<NodeId>>,
    incoming: BTreeMap<NodeId, BTreeSet<NodeId>>,
    pub sources: BTreeSet<NodeId>,
    pub iteration_sets: Vec<BTreeSet<NodeId>>,
    pub ancestors: BTreeMap<NodeId, BTreeSet<NodeId>>,
    pub descendants: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl Topology {
    pub fn nodes(&self) -> BTreeSet<NodeId> {
        self.index_of.keys().copied().collect()
    }

    pub fn outgoing(&self, node: NodeId) -> &BTreeSet<NodeId> {
        static EMPTY: BTreeSet<NodeId> = BTreeSet::new();
        self.outgoing.get(&node).unwrap_or(&EMPTY)
    }

    pub fn incoming(&self, node: NodeId) -> &BTreeSet<NodeId> {
        static EMPTY: BTreeSet<NodeId> = BTreeSet::new();
        self.incoming.get(&node).unwrap_or(&EMPTY)
    }

    pub fn forks(&self) -> BTreeSet<NodeId> {
        self.outgoing
            .iter()
            .filter(|(_, succ)| succ.len() > 1)
            .map(|(&n, _)| n)
            .collect()
    }

    pub fn joins(&self) -> BTreeSet<NodeId> {
        self.incoming
            .iter()
            .filter(|(_, pred)| pred.len() > 1)
            .map(|(&n, _)| n)
            .collect()
    }
}

/// Build a [`Topology`] from an explicit node set and edge list. Used both
/// for the global graph (C1) and, by C4, for a diamond's restricted
/// subgraph — the same construction applies to both because a diamond's
/// `edge_list` is itself a valid, self-contained `EdgeList` over its
/// `relevant_nodes`.
pub fn build_topology(nodes: &BTreeSet<NodeId>, edges: &[Edge]) -> Result<Topology> {
    let mut pg: DiGraph<NodeId, ()> = DiGraph::with_capacity(nodes.len(), edges.len());
    let mut index_of = BTreeMap::new();
    for &node in nodes {
        index_of.insert(node, pg.add_node(node));
    }

    let mut outgoing: BTreeMap<NodeId, BTreeSet<NodeId>> =
        nodes.iter().map(|&n| (n, BTreeSet::new())).collect();
    let mut incoming: BTreeMap<NodeId, BTreeSet<NodeId>> =
        nodes.iter().map(|&n| (n, BTreeSet::new())).collect();

    let mut seen_edges = BTreeSet::new();
    for &(u, v) in edges {
        if u == v {
            return Err(ReachabError::invalid_input(format!(
                "self-loop on node {u} is not allowed"
            )));
        }
        if !seen_edges.insert((u, v)) {
            return Err(ReachabError::invalid_input(format!(
                "duplicate edge ({u}, {v})"
            )));
        }
        let (&ui, &vi) = (
            index_of
                .get(&u)
                .ok_or_else(|| ReachabError::invalid_input(format!("edge references unknown node {u}")))?,
            index_of
                .get(&v)
                .ok_or_else(|| ReachabError::invalid_input(format!("edge references unknown node {v}")))?,
        );
        pg.add_edge(ui, vi, ());
        outgoing.get_mut(&u).unwrap().insert(v);
        incoming.get_mut(&v).unwrap().insert(u);
    }

    let iteration_sets = kahn_layers(nodes, &outgoing, &incoming)?;
    let sources = iteration_sets.first().cloned().unwrap_or_default();
    let ancestors = ancestor_closures(&iteration_sets, &incoming);
    let descendants = descendant_closures(&iteration_sets, &outgoing);

    Ok(Topology {
        pg,
        index_of,
        outgoing,
        incoming,
        sources,
        iteration_sets,
        ancestors,
        descendants,
    })
}

/// Standard Kahn layering. Each returned layer is the set of nodes whose
/// remaining in-degree hit zero in the same round; `L0` is therefore exactly
/// the source set. Any node left unassigned once no further layer can be
/// peeled off means the graph contains a cycle.
fn kahn_layers(
    nodes: &BTreeSet<NodeId>,
    outgoing: &BTreeMap<NodeId, BTreeSet<NodeId>>,
    incoming: &BTreeMap<NodeId, BTreeSet<NodeId>>,
) -> Result<Vec<BTreeSet<NodeId>>> {
    let mut remaining_incoming: BTreeMap<NodeId, usize> = nodes
        .iter()
        .map(|&n| (n, incoming.get(&n).map_or(0, BTreeSet::len)))
        .collect();

    let mut layers = Vec::new();
    while !remaining_incoming.is_empty() {
        let layer: BTreeSet<NodeId> = remaining_incoming
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(&n, _)| n)
            .collect();
        if layer.is_empty() {
            return Err(ReachabError::invalid_input("graph contains a cycle"));
        }
        for node in &layer {
            remaining_incoming.remove(node);
        }
        for &node in &layer {
            for &succ in outgoing.get(&node).into_iter().flatten() {
                if let Some(degree) = remaining_incoming.get_mut(&succ) {
                    *degree -= 1;
                }
            }
        }
        layers.push(layer);
    }
    Ok(layers)
}

/// `ancestors[v]` = reflexive-transitive closure of parents, computed in a
/// single forward pass over the layers: by the time layer `k` is visited,
/// every parent of its nodes (which lives in an earlier layer) already has
/// its closure recorded.
fn ancestor_closures(
    layers: &[BTreeSet<NodeId>],
    incoming: &BTreeMap<NodeId, BTreeSet<NodeId>>,
) -> BTreeMap<NodeId, BTreeSet<NodeId>> {
    let mut ancestors = BTreeMap::new();
    for layer in layers {
        for &node in layer {
            let mut closure = BTreeSet::new();
            closure.insert(node);
            for &parent in incoming.get(&node).into_iter().flatten() {
                closure.extend(ancestors.get(&parent).into_iter().flatten().copied());
            }
            ancestors.insert(node, closure);
        }
    }
    ancestors
}

/// Symmetric to [`ancestor_closures`], walking the layers in reverse.
fn descendant_closures(
    layers: &[BTreeSet<NodeId>],
    outgoing: &BTreeMap<NodeId, BTreeSet<NodeId>>,
) -> BTreeMap<NodeId, BTreeSet<NodeId>> {
    let mut descendants = BTreeMap::new();
    for layer in layers.iter().rev() {
        for &node in layer {
            let mut closure = BTreeSet::new();
            closure.insert(node);
            for &child in outgoing.get(&node).into_iter().flatten() {
                closure.extend(descendants.get(&child).into_iter().flatten().copied());
            }
            descendants.insert(node, closure);
        }
    }
    descendants
}

/// Re-derive petgraph neighbor sets directly from the graph, for callers
/// that want to cross-check the cached `outgoing`/`incoming` maps against
/// the underlying adjacency representation (used by tests).
#[cfg(test)]
pub(crate) fn petgraph_outgoing(topology: &Topology, node: NodeId) -> BTreeSet<NodeId> {
    let idx = topology.index_of[&node];
    topology
        .pg
        .neighbors_directed(idx, Direction::Outgoing)
        .map(|i| topology.pg[i])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(ids: impl IntoIterator<Item = NodeId>) -> BTreeSet<NodeId> {
        ids.into_iter().collect()
    }

    #[test]
    fn chain_layers_linearly() {
        let topo = build_topology(&nodes([1, 2, 3]), &[(1, 2), (2, 3)]).unwrap();
        assert_eq!(topo.sources, nodes([1]));
        assert_eq!(
            topo.iteration_sets,
            vec![nodes([1]), nodes([2]), nodes([3])]
        );
        assert_eq!(topo.ancestors[&3], nodes([1, 2, 3]));
        assert_eq!(topo.descendants[&1], nodes([1, 2, 3]));
    }

    #[test]
    fn diamond_shares_one_layer_at_the_join() {
        let topo =
            build_topology(&nodes([1, 2, 3, 4]), &[(1, 2), (1, 3), (2, 4), (3, 4)]).unwrap();
        assert_eq!(topo.iteration_sets[1], nodes([2, 3]));
        assert_eq!(topo.forks(), nodes([1]));
        assert_eq!(topo.joins(), nodes([4]));
        assert_eq!(topo.ancestors[&4], nodes([1, 2, 3, 4]));
    }

    #[test]
    fn cycle_is_rejected() {
        let err = build_topology(&nodes([1, 2]), &[(1, 2), (2, 1)]).unwrap_err();
        assert!(matches!(err, ReachabError::InvalidInput(_)));
    }

    #[test]
    fn self_loop_is_rejected() {
        let err = build_topology(&nodes([1]), &[(1, 1)]).unwrap_err();
        assert!(matches!(err, ReachabError::InvalidInput(_)));
    }

    #[test]
    fn empty_graph_has_no_sources() {
        let topo = build_topology(&BTreeSet::new(), &[]).unwrap();
        assert!(topo.sources.is_empty());
        assert!(topo.iteration_sets.is_empty());
    }

    #[test]
    fn cached_adjacency_matches_petgraph() {
        let topo = build_topology(&nodes([1, 2, 3]), &[(1, 2), (1, 3)]).unwrap();
        assert_eq!(*topo.outgoing(1), petgraph_outgoing(&topo, 1));
    }
}
