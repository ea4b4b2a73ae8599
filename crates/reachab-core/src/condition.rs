use std::collections::BTreeMap;

use reachab_types::{Edge, NodeId, Prob, ProbVariant, ReachabError, Result};

use crate::deadline::Deadline;
use crate::model::{BeliefMap, UniqueDiamondStore};
use crate::propagate::propagate;

/// Conditioning solver (§4.6): enumerate every joint state of a diamond's
/// conditioning nodes, weight each by the product of the outer belief (or
/// its complement) at those nodes, and recursively re-invoke C5 on the
/// diamond's own restricted subgraph to get the join's belief under that
/// state. The weighted sum is the diamond's contribution to the join's
/// belief in the outer context.
pub fn solve(
    hash: u64,
    unique_diamonds: &UniqueDiamondStore,
    outer_beliefs: &BeliefMap,
    edge_probabilities: &BTreeMap<Edge, Prob>,
    variant: ProbVariant,
    deadline: &Deadline,
) -> Result<Prob> {
    let cd = unique_diamonds.get(&hash).ok_or_else(|| {
        ReachabError::internal(format!("diamond hash {hash:#x} missing from unique-diamond store"))
    })?;

    let conditioning: Vec<NodeId> = cd.diamond.conditioning_nodes.iter().copied().collect();
    let k = conditioning.len();
    if k == 0 {
        return Err(ReachabError::internal(
            "diamond reached the conditioning solver with no conditioning nodes",
        ));
    }

    // Step 3: freeze every non-conditioning sub-source to the belief already
    // assigned for it in the outer context.
    let mut frozen_priors = cd.sub_node_priors.clone();
    for &source in &cd.sub_topology.sources {
        if !cd.diamond.conditioning_nodes.contains(&source) {
            let outer_belief = outer_beliefs.get(&source).ok_or_else(|| {
                ReachabError::internal(format!(
                    "outer belief for sub-source {source} requested before assignment"
                ))
            })?;
            frozen_priors.insert(source, outer_belief.clone());
        }
    }

    let restricted_edge_probabilities: BTreeMap<Edge, Prob> = cd
        .diamond
        .edge_list
        .iter()
        .map(|&edge| {
            edge_probabilities
                .get(&edge)
                .cloned()
                .map(|p| (edge, p))
                .ok_or_else(|| {
                    ReachabError::invalid_input(format!(
                        "missing edge probability for ({}, {})",
                        edge.0, edge.1
                    ))
                })
        })
        .collect::<Result<_>>()?;

    let outer_conditioning_beliefs: Vec<Prob> = conditioning
        .iter()
        .map(|c| {
            outer_beliefs.get(c).cloned().ok_or_else(|| {
                ReachabError::internal(format!(
                    "outer belief for conditioning node {c} requested before assignment"
                ))
            })
        })
        .collect::<Result<_>>()?;

    let mut acc = Prob::zero(variant);
    for mask in 0u32..(1u32 << k) {
        deadline.check()?;

        let mut state_priors = frozen_priors.clone();
        let mut weight = Prob::one(variant);
        for (i, (&node, belief)) in conditioning.iter().zip(&outer_conditioning_beliefs).enumerate() {
            let bit_set = mask & (1 << i) != 0;
            let (state_value, factor) = if bit_set {
                (Prob::one(variant), belief.clone())
            } else {
                (Prob::zero(variant), belief.complement())
            };
            state_priors.insert(node, state_value);
            weight = weight.mul(&factor);
        }

        let sub_beliefs = propagate(
            &cd.sub_topology,
            &state_priors,
            &restricted_edge_probabilities,
            &cd.sub_diamond_structures,
            unique_diamonds,
            variant,
            deadline,
        )?;

        let join_belief = sub_beliefs.get(&cd.join_node).ok_or_else(|| {
            ReachabError::internal(format!(
                "diamond solve did not produce a belief for its own join {}",
                cd.join_node
            ))
        })?;
        acc = acc.add(&join_belief.mul(&weight));
    }

    Ok(acc)
}
