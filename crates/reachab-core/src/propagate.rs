use std::collections::BTreeMap;

use reachab_types::{Edge, NodeId, Prob, ProbVariant, ReachabError, Result};

use crate::condition;
use crate::deadline::Deadline;
use crate::model::{BeliefMap, DiamondsAtNode, UniqueDiamondStore};
use crate::topology::Topology;

/// Topological forward sweep (§4.5) computing per-node belief. Called both
/// as the outermost C5 pass over the full graph and, recursively by C6, over
/// a diamond's restricted subgraph with its conditioning nodes pinned to one
/// joint state — the same function either way, since a diamond's
/// `sub_topology` is itself a complete, self-contained topology.
pub fn propagate(
    topology: &Topology,
    node_priors: &BTreeMap<NodeId, Prob>,
    edge_probabilities: &BTreeMap<Edge, Prob>,
    diamond_structures: &BTreeMap<NodeId, DiamondsAtNode>,
    unique_diamonds: &UniqueDiamondStore,
    variant: ProbVariant,
    deadline: &Deadline,
) -> Result<BeliefMap> {
    let joins = topology.joins();
    let mut beliefs = BeliefMap::new();

    for layer in &topology.iteration_sets {
        deadline.check()?;
        for &v in layer {
            if topology.sources.contains(&v) {
                beliefs.insert(v, prior_of(node_priors, v)?);
                continue;
            }

            let mut contribs: Vec<Prob> = Vec::new();

            if let Some(at_node) = diamond_structures.get(&v) {
                let mut group_beliefs = Vec::with_capacity(at_node.diamonds.len());
                for diamond in &at_node.diamonds {
                    let hash = diamond.canonical_hash();
                    group_beliefs.push(condition::solve(
                        hash,
                        unique_diamonds,
                        &beliefs,
                        edge_probabilities,
                        variant,
                        deadline,
                    )?);
                }
                contribs.push(inclusion_exclusion(&group_beliefs, variant));

                if !at_node.non_diamond_parents.is_empty() {
                    let mut ndp_terms = Vec::with_capacity(at_node.non_diamond_parents.len());
                    for &p in &at_node.non_diamond_parents {
                        ndp_terms.push(edge_term(p, v, &beliefs, edge_probabilities)?);
                    }
                    if has_unique_path(topology, &joins, v) {
                        contribs.push(sum_all(&ndp_terms, variant));
                    } else {
                        contribs.extend(ndp_terms);
                    }
                }
            } else {
                let mut par_terms = Vec::with_capacity(topology.incoming(v).len());
                for &p in topology.incoming(v) {
                    par_terms.push(edge_term(p, v, &beliefs, edge_probabilities)?);
                }
                if has_multiple_upstream_paths(topology, &joins, v) {
                    contribs.extend(par_terms);
                } else {
                    contribs.push(sum_all(&par_terms, variant));
                }
            }

            let pre = if contribs.len() > 1 {
                inclusion_exclusion(&contribs, variant)
            } else {
                contribs.into_iter().next().ok_or_else(|| {
                    ReachabError::internal(format!("node {v} produced no belief contribution"))
                })?
            };

            beliefs.insert(v, prior_of(node_priors, v)?.mul(&pre));
        }
    }
    Ok(beliefs)
}

fn source_ancestor_count(topology: &Topology, v: NodeId) -> usize {
    topology
        .ancestors
        .get(&v)
        .map_or(0, |a| a.intersection(&topology.sources).count())
}

/// Diamond-parent case: `v`'s non-diamond-parent terms may simply be summed
/// when either `v` isn't a join, or it has at most one source ancestor (no
/// alternate upstream path to double-count).
fn has_unique_path(topology: &Topology, joins: &std::collections::BTreeSet<NodeId>, v: NodeId) -> bool {
    !joins.contains(&v) || source_ancestor_count(topology, v) <= 1
}

/// No-diamond case: `v`'s parent terms must be combined by inclusion-
/// exclusion (kept separate here) rather than summed when `v` is a join or
/// has more than one source ancestor.
fn has_multiple_upstream_paths(
    topology: &Topology,
    joins: &std::collections::BTreeSet<NodeId>,
    v: NodeId,
) -> bool {
    joins.contains(&v) || source_ancestor_count(topology, v) > 1
}

fn prior_of(node_priors: &BTreeMap<NodeId, Prob>, v: NodeId) -> Result<Prob> {
    node_priors
        .get(&v)
        .cloned()
        .ok_or_else(|| ReachabError::invalid_input(format!("node {v} has no prior")))
}

fn edge_term(
    parent: NodeId,
    child: NodeId,
    beliefs: &BeliefMap,
    edge_probabilities: &BTreeMap<Edge, Prob>,
) -> Result<Prob> {
    let belief = beliefs.get(&parent).ok_or_else(|| {
        ReachabError::internal(format!("belief for node {parent} requested before assignment"))
    })?;
    let edge_prob = edge_probabilities.get(&(parent, child)).ok_or_else(|| {
        ReachabError::invalid_input(format!(
            "missing edge probability for ({parent}, {child})"
        ))
    })?;
    Ok(belief.mul(edge_prob))
}

fn sum_all(terms: &[Prob], variant: ProbVariant) -> Prob {
    terms
        .iter()
        .fold(Prob::zero(variant), |acc, term| acc.add(term))
}

/// §4.5.1: the full alternating inclusion-exclusion sum over independent
/// terms, rather than the closed form `1 - prod(1 - t_i)` — the closed form
/// doesn't hold algebraically for `Interval`/`PBox`, only for `Scalar`.
pub(crate) fn inclusion_exclusion(terms: &[Prob], variant: ProbVariant) -> Prob {
    let n = terms.len();
    if n == 0 {
        return Prob::zero(variant);
    }
    if n == 1 {
        return terms[0].clone();
    }

    let mut total = Prob::zero(variant);
    for mask in 1u32..(1u32 << n) {
        let mut product: Option<Prob> = None;
        for (i, term) in terms.iter().enumerate() {
            if mask & (1 << i) != 0 {
                product = Some(match product {
                    None => term.clone(),
                    Some(acc) => acc.mul(term),
                });
            }
        }
        let product = product.expect("mask is nonzero, at least one bit is set");
        if mask.count_ones() % 2 == 1 {
            total = total.add(&product);
        } else {
            total = total.sub(&product);
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::build_topology;
    use std::collections::BTreeSet;

    fn scalar_priors(values: &[(NodeId, f64)]) -> BTreeMap<NodeId, Prob> {
        values.iter().map(|&(n, p)| (n, Prob::scalar(p))).collect()
    }

    fn scalar_edges(values: &[(Edge, f64)]) -> BTreeMap<Edge, Prob> {
        values.iter().map(|&(e, p)| (e, Prob::scalar(p))).collect()
    }

    #[test]
    fn inclusion_exclusion_matches_closed_form_for_two_terms() {
        let terms = vec![Prob::scalar(0.9), Prob::scalar(0.8)];
        let combined = inclusion_exclusion(&terms, ProbVariant::Scalar);
        // 1 - (1-0.9)(1-0.8) = 1 - 0.1*0.2 = 0.98
        assert!(matches!(combined, Prob::Scalar(p) if (p - 0.98).abs() < 1e-9));
    }

    #[test]
    fn s1_no_diamond_chain() {
        let edges = vec![(1, 2), (2, 3)];
        let topo = build_topology(&BTreeSet::from([1, 2, 3]), &edges).unwrap();
        let priors = scalar_priors(&[(1, 1.0), (2, 0.9), (3, 0.9)]);
        let edge_probs = scalar_edges(&[((1, 2), 0.9), ((2, 3), 0.9)]);
        let beliefs = propagate(
            &topo,
            &priors,
            &edge_probs,
            &BTreeMap::new(),
            &BTreeMap::new(),
            ProbVariant::Scalar,
            &Deadline::none(),
        )
        .unwrap();
        assert!(matches!(beliefs[&1], Prob::Scalar(p) if (p - 1.0).abs() < 1e-9));
        assert!(matches!(beliefs[&2], Prob::Scalar(p) if (p - 0.81).abs() < 1e-9));
        assert!(matches!(beliefs[&3], Prob::Scalar(p) if (p - 0.6561).abs() < 1e-9));
    }
}
