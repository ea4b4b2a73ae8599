use std::collections::{BTreeMap, BTreeSet};

use reachab_types::{NodeId, Prob, ProbVariant, ReachabError, Result};

use crate::diamond::detect_diamonds;
use crate::model::{ComputationData, Diamond, DiamondsAtNode, UniqueDiamondStore};
use crate::topology::build_topology;

/// Depth-first expansion of the root diamonds produced by C3 into the
/// hash-keyed arena of [`ComputationData`] (C4). `processed_hashes` guards
/// against re-descending into a diamond already under construction, and also
/// retains the `Diamond` stored under each hash so a later diamond sharing
/// that hash can be checked for an actual collision rather than assumed
/// identical; `excluded_nodes` grows strictly on every recursive step, which
/// — together with that guard — is what guarantees termination (the
/// 1000-iteration cap in `diamond::detect_diamonds` is only a backstop).
pub fn build_unique_diamonds(
    root_diamonds: &BTreeMap<NodeId, DiamondsAtNode>,
    node_priors: &BTreeMap<NodeId, Prob>,
    variant: ProbVariant,
) -> Result<UniqueDiamondStore> {
    let mut store = UniqueDiamondStore::new();
    let mut processed_hashes: BTreeMap<u64, Diamond> = BTreeMap::new();

    for at_node in root_diamonds.values() {
        for diamond in &at_node.diamonds {
            process(
                diamond,
                at_node.join_node,
                &BTreeSet::new(),
                node_priors,
                variant,
                &mut processed_hashes,
                &mut store,
            )?;
        }
    }
    Ok(store)
}

/// `ambient_priors` is the prior map in force at the current recursion
/// depth: the true global `node_priors` at depth 0, and the enclosing
/// diamond's own `sub_node_priors` at every deeper level — an inner diamond's
/// "global prior" (§4.4 step 5) means "as seen from its immediately
/// enclosing diamond", not the outermost session.
fn process(
    diamond: &Diamond,
    join: NodeId,
    excluded: &BTreeSet<NodeId>,
    ambient_priors: &BTreeMap<NodeId, Prob>,
    variant: ProbVariant,
    processed_hashes: &mut BTreeMap<u64, Diamond>,
    store: &mut UniqueDiamondStore,
) -> Result<()> {
    let hash = diamond.canonical_hash();
    if let Some(existing) = processed_hashes.get(&hash) {
        check_for_collision(hash, existing, diamond)?;
        return Ok(());
    }
    processed_hashes.insert(hash, diamond.clone());

    let mut excluded = excluded.clone();
    excluded.extend(diamond.conditioning_nodes.iter().copied());

    let sub_topology = build_topology(&diamond.relevant_nodes, &diamond.edge_list)?;
    let sub_node_priors =
        build_sub_priors(diamond, join, &sub_topology, ambient_priors, variant);

    let inner_diamonds = detect_diamonds(
        &sub_topology,
        &diamond.edge_list,
        &sub_node_priors,
        &excluded,
    )?;

    for at_node in inner_diamonds.values() {
        for inner in &at_node.diamonds {
            process(
                inner,
                at_node.join_node,
                &excluded,
                &sub_node_priors,
                variant,
                processed_hashes,
                store,
            )?;
        }
    }

    store.insert(
        hash,
        ComputationData {
            diamond: diamond.clone(),
            join_node: join,
            sub_topology,
            sub_node_priors,
            sub_diamond_structures: inner_diamonds,
        },
    );
    Ok(())
}

/// A colliding hash is only a collision if the two diamonds actually differ;
/// the same diamond reached via two recursion paths legitimately shares both
/// its hash and its node sets.
fn check_for_collision(hash: u64, existing: &Diamond, candidate: &Diamond) -> Result<()> {
    if existing == candidate {
        Ok(())
    } else {
        Err(ReachabError::internal(format!(
            "hash collision detected: diamonds {existing:?} and {candidate:?} share hash {hash:#x} but are not equal"
        )))
    }
}

/// §4.4 step 5: the frozen prior map used to evaluate this diamond in
/// isolation.
///   * the join itself gets `one_value`, so C5's `belief = prior * combined`
///     returns exactly the combined arrival probability, not that times
///     itself again;
///   * an intermediate (non-source, non-join) node keeps its ambient prior;
///   * a non-conditioning sub-source gets a placeholder overwritten by C6
///     step 3 with the live outer belief;
///   * a conditioning node gets a placeholder overwritten by C6 step 5a per
///     bit-mask state.
fn build_sub_priors(
    diamond: &Diamond,
    join: NodeId,
    sub_topology: &crate::topology::Topology,
    ambient_priors: &BTreeMap<NodeId, Prob>,
    variant: ProbVariant,
) -> BTreeMap<NodeId, Prob> {
    diamond
        .relevant_nodes
        .iter()
        .map(|&node| {
            let prob = if node == join {
                Prob::one(variant)
            } else if !sub_topology.sources.contains(&node) {
                ambient_priors
                    .get(&node)
                    .cloned()
                    .unwrap_or_else(|| Prob::one(variant))
            } else if !diamond.conditioning_nodes.contains(&node) {
                Prob::zero(variant) // non_fixed_value, overwritten by C6 step 3
            } else {
                Prob::one(variant) // placeholder, overwritten by C6 step 5a
            };
            (node, prob)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diamond::detect_diamonds;
    use crate::topology::build_topology;
    use std::collections::BTreeSet;

    fn scalar_priors(values: &[(NodeId, f64)]) -> BTreeMap<NodeId, Prob> {
        values.iter().map(|&(n, p)| (n, Prob::scalar(p))).collect()
    }

    #[test]
    fn single_diamond_produces_one_entry() {
        let edges = vec![(1, 2), (1, 3), (2, 4), (3, 4)];
        let topo = build_topology(&BTreeSet::from([1, 2, 3, 4]), &edges).unwrap();
        let priors = scalar_priors(&[(1, 0.9), (2, 0.9), (3, 0.9), (4, 0.9)]);
        let root = detect_diamonds(&topo, &edges, &priors, &BTreeSet::new()).unwrap();
        let store = build_unique_diamonds(&root, &priors, ProbVariant::Scalar).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn nested_diamonds_produce_two_unique_entries() {
        let edges = vec![
            (1, 2),
            (1, 3),
            (2, 4),
            (3, 4),
            (4, 5),
            (4, 6),
            (5, 7),
            (6, 7),
        ];
        let topo = build_topology(&BTreeSet::from([1, 2, 3, 4, 5, 6, 7]), &edges).unwrap();
        let priors = scalar_priors(&[
            (1, 0.9),
            (2, 0.9),
            (3, 0.9),
            (4, 0.9),
            (5, 0.9),
            (6, 0.9),
            (7, 0.9),
        ]);
        let root = detect_diamonds(&topo, &edges, &priors, &BTreeSet::new()).unwrap();
        let store = build_unique_diamonds(&root, &priors, ProbVariant::Scalar).unwrap();
        assert_eq!(store.len(), 2);
    }

    fn diamond(relevant: &[NodeId], conditioning: &[NodeId], edges: &[(NodeId, NodeId)]) -> Diamond {
        Diamond {
            relevant_nodes: relevant.iter().copied().collect(),
            conditioning_nodes: conditioning.iter().copied().collect(),
            edge_list: edges.to_vec(),
        }
    }

    #[test]
    fn equal_diamonds_sharing_a_hash_are_not_a_collision() {
        let a = diamond(&[1, 2, 3, 4], &[1], &[(1, 2), (1, 3), (2, 4), (3, 4)]);
        let b = a.clone();
        assert!(check_for_collision(0xdead_beef, &a, &b).is_ok());
    }

    #[test]
    fn differing_diamonds_sharing_a_hash_are_a_collision() {
        let a = diamond(&[1, 2, 3, 4], &[1], &[(1, 2), (1, 3), (2, 4), (3, 4)]);
        let b = diamond(&[1, 2, 3, 4, 5], &[1], &[(1, 2), (1, 3), (2, 4), (3, 4), (5, 3)]);
        let err = check_for_collision(0xdead_beef, &a, &b).unwrap_err();
        assert!(matches!(err, ReachabError::InternalError(_)));
    }
}
