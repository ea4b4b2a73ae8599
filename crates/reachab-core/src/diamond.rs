use std::collections::{BTreeMap, BTreeSet};

use reachab_types::{Edge, NodeId, Prob, ReachabError, Result};

use crate::model::{Diamond, DiamondsAtNode};
use crate::topology::Topology;

/// Hard cap on the recursive-completeness loop of step 8b. Exceeding it
/// means the subgraph never stabilizes, which can only happen if an
/// invariant elsewhere (monotone growth of the induced subgraph) was
/// violated.
const COMPLETENESS_ITERATION_CAP: usize = 1000;

/// Run the nine-step diamond detector (§4.3) at every join of `topology`,
/// returning the joins that resolved to a nonempty diamond.
///
/// `excluded_nodes` carries conditioning nodes from outer contexts down
/// through C4's recursion; it must not shrink across calls, or circular
/// conditioning goes undetected.
pub fn detect_diamonds(
    topology: &Topology,
    edges: &[Edge],
    node_priors: &BTreeMap<NodeId, Prob>,
    excluded_nodes: &BTreeSet<NodeId>,
) -> Result<BTreeMap<NodeId, DiamondsAtNode>> {
    let forks = topology.forks();
    let joins = topology.joins();

    let irrelevant_sources: BTreeSet<NodeId> = topology
        .sources
        .iter()
        .copied()
        .filter(|n| {
            node_priors
                .get(n)
                .is_some_and(Prob::is_irrelevant_source)
        })
        .collect();
    let mut excluded_from_search = irrelevant_sources;
    excluded_from_search.extend(excluded_nodes.iter().copied());

    let mut result = BTreeMap::new();
    for &join in &joins {
        if let Some(at_node) = detect_at_join(
            topology,
            join,
            edges,
            &forks,
            &excluded_from_search,
            excluded_nodes,
        )? {
            result.insert(join, at_node);
        }
    }
    Ok(result)
}

/// Steps 1-9 of §4.3 for a single join.
fn detect_at_join(
    topology: &Topology,
    join: NodeId,
    global_edges: &[Edge],
    forks: &BTreeSet<NodeId>,
    excluded_from_search: &BTreeSet<NodeId>,
    excluded_nodes: &BTreeSet<NodeId>,
) -> Result<Option<DiamondsAtNode>> {
    let parents = topology.incoming(join).clone();

    // Step 1: per-parent fork-ancestor sets.
    let fork_ancestors_of = |parent: NodeId| -> BTreeSet<NodeId> {
        topology
            .ancestors
            .get(&parent)
            .into_iter()
            .flatten()
            .copied()
            .filter(|n| !excluded_from_search.contains(n))
            .filter(|n| forks.contains(n))
            .collect()
    };

    // Step 2: shared forks and the parents that contribute to them.
    let mut fork_parent_count: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
    for &parent in &parents {
        for fork in fork_ancestors_of(parent) {
            fork_parent_count.entry(fork).or_default().insert(parent);
        }
    }
    let shared_forks: BTreeSet<NodeId> = fork_parent_count
        .iter()
        .filter(|(_, parents)| parents.len() >= 2)
        .map(|(&fork, _)| fork)
        .collect();
    if shared_forks.is_empty() {
        return Ok(None);
    }
    let diamond_parents: BTreeSet<NodeId> = fork_parent_count
        .into_iter()
        .filter(|(fork, _)| shared_forks.contains(fork))
        .flat_map(|(_, parents)| parents)
        .collect();

    let (relevant, conditioning, edge_list) = build_induced_subgraph(
        topology,
        join,
        global_edges,
        &shared_forks,
        excluded_nodes,
    )?;

    // Step 6: empty conditioning set means this join is already conditioned
    // further up the recursion; skip it here.
    let Some(conditioning) = conditioning else {
        return Ok(None);
    };

    let diamond = Diamond {
        relevant_nodes: relevant,
        conditioning_nodes: conditioning,
        edge_list,
    };
    validate_diamond(&diamond, join)?;

    Ok(Some(DiamondsAtNode {
        diamonds: vec![diamond],
        non_diamond_parents: parents.difference(&diamond_parents).copied().collect(),
        join_node: join,
    }))
}

/// Steps 3-8b: grow the induced subgraph from the seed shared forks out to
/// a complete diamond, re-scanning for newly exposed shared forks
/// ("recursive completeness") until the set of relevant nodes stops
/// growing.
fn build_induced_subgraph(
    topology: &Topology,
    join: NodeId,
    global_edges: &[Edge],
    seed_shared_forks: &BTreeSet<NodeId>,
    excluded_nodes: &BTreeSet<NodeId>,
) -> Result<(BTreeSet<NodeId>, Option<BTreeSet<NodeId>>, Vec<Edge>)> {
    let mut shared_forks = seed_shared_forks.clone();
    // Grows monotonically across iterations: step 8 below folds any
    // newly-discovered upstream node directly into `seed` rather than
    // patching `edge_list` in isolation, so a node pulled in this way
    // survives the next iteration's step 3/4 rebuild instead of being
    // silently dropped again (and again, forever).
    let mut seed: BTreeSet<NodeId> = BTreeSet::new();
    let mut relevant_nodes;
    let mut edge_list;
    let mut conditioning_nodes;

    let mut iteration = 0;
    loop {
        iteration += 1;
        if iteration > COMPLETENESS_ITERATION_CAP {
            return Err(ReachabError::internal(format!(
                "diamond completeness loop at join {join} did not stabilize within {COMPLETENESS_ITERATION_CAP} iterations"
            )));
        }

        // Step 3: induced subgraph seed.
        seed.insert(join);
        for &fork in &shared_forks {
            seed.insert(fork);
            let descendants = topology.descendants.get(&fork).into_iter().flatten().copied();
            let ancestors_of_join = topology.ancestors.get(&join).into_iter().flatten().copied().collect::<BTreeSet<_>>();
            seed.extend(descendants.filter(|n| ancestors_of_join.contains(n)));
        }

        // Step 4: induced edge list.
        edge_list = global_edges
            .iter()
            .copied()
            .filter(|(u, v)| seed.contains(u) && seed.contains(v))
            .collect::<Vec<_>>();

        // Step 5: diamond sources of the induced subgraph.
        let induced_incoming: BTreeMap<NodeId, BTreeSet<NodeId>> = {
            let mut incoming: BTreeMap<NodeId, BTreeSet<NodeId>> =
                seed.iter().map(|&n| (n, BTreeSet::new())).collect();
            for &(u, v) in &edge_list {
                incoming.entry(v).or_default().insert(u);
            }
            incoming
        };
        let diamond_sources: BTreeSet<NodeId> = seed
            .iter()
            .copied()
            .filter(|n| induced_incoming.get(n).is_none_or(BTreeSet::is_empty))
            .filter(|n| !excluded_nodes.contains(n))
            .collect();

        // Step 5b: relevant nodes are the endpoints actually used.
        relevant_nodes = edge_list
            .iter()
            .flat_map(|&(u, v)| [u, v])
            .collect::<BTreeSet<_>>();
        if relevant_nodes.is_empty() {
            relevant_nodes.insert(join);
        }

        // Step 6: conditioning nodes.
        conditioning_nodes = shared_forks
            .intersection(&diamond_sources)
            .copied()
            .filter(|n| !excluded_nodes.contains(n))
            .collect::<BTreeSet<_>>();
        if conditioning_nodes.is_empty() {
            return Ok((relevant_nodes, None, edge_list));
        }

        // Step 7: intermediates.
        let intermediates: BTreeSet<NodeId> = relevant_nodes
            .iter()
            .copied()
            .filter(|n| *n != join && !diamond_sources.contains(n) && !conditioning_nodes.contains(n))
            .collect();

        // Step 8: completeness — pull in every global incoming edge of each
        // intermediate. An upstream endpoint not yet in `seed` (e.g. an
        // unrelated extra source feeding an intermediate directly) is
        // folded into `seed` itself, not just `edge_list`, so step 3/4 pick
        // the edge back up on the next pass instead of re-discovering and
        // discarding it forever.
        let mut added_upstream_node = false;
        for &intermediate in &intermediates {
            for &upstream in topology.incoming(intermediate) {
                if seed.insert(upstream) {
                    added_upstream_node = true;
                }
            }
        }
        if added_upstream_node {
            continue;
        }

        // Step 8b: re-scan the (possibly-grown) sources for newly shared
        // fork ancestors.
        let rescanned = rescan_shared_forks(topology, &diamond_sources, &shared_forks);
        if rescanned.len() > shared_forks.len() {
            shared_forks = rescanned;
            continue;
        }

        edge_list.sort_unstable();
        break;
    }

    Ok((relevant_nodes, Some(conditioning_nodes), edge_list))
}

/// Step 8b's re-scan: treat the current diamond sources like join parents
/// and look for fork ancestors shared by at least two of them, same as
/// steps 1-2 but seeded from `diamond_sources` instead of `incoming[join]`.
fn rescan_shared_forks(
    topology: &Topology,
    diamond_sources: &BTreeSet<NodeId>,
    shared_forks: &BTreeSet<NodeId>,
) -> BTreeSet<NodeId> {
    let forks = topology.forks();
    let mut fork_parent_count: BTreeMap<NodeId, usize> = BTreeMap::new();
    for &source in diamond_sources {
        for fork in topology
            .ancestors
            .get(&source)
            .into_iter()
            .flatten()
            .copied()
            .filter(|n| forks.contains(n))
        {
            *fork_parent_count.entry(fork).or_insert(0) += 1;
        }
    }
    let mut grown = shared_forks.clone();
    grown.extend(
        fork_parent_count
            .into_iter()
            .filter(|(_, count)| *count >= 2)
            .map(|(fork, _)| fork),
    );
    grown
}

/// §3's five `Diamond` invariants, checked once at emission time.
fn validate_diamond(diamond: &Diamond, join: NodeId) -> Result<()> {
    if !diamond.conditioning_nodes.is_subset(&diamond.relevant_nodes) {
        return Err(ReachabError::internal(format!(
            "diamond at join {join}: conditioning_nodes is not a subset of relevant_nodes"
        )));
    }
    if diamond.conditioning_nodes.is_empty() {
        return Err(ReachabError::internal(format!(
            "diamond at join {join}: conditioning_nodes is empty"
        )));
    }
    for &(u, v) in &diamond.edge_list {
        if u == v {
            return Err(ReachabError::internal(format!(
                "diamond at join {join}: self-loop on {u}"
            )));
        }
        if !diamond.relevant_nodes.contains(&u) || !diamond.relevant_nodes.contains(&v) {
            return Err(ReachabError::internal(format!(
                "diamond at join {join}: edge ({u}, {v}) has an endpoint outside relevant_nodes"
            )));
        }
    }
    Ok(())
}
