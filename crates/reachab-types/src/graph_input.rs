use std::collections::BTreeMap;

use crate::prob::ProbVariant;
use crate::{Edge, NodeId, Prob, ReachabError};

/// The engine's sole input: an edge list plus per-node and per-edge priors,
/// all expressed in one [`ProbVariant`]. Collaborator readers (`reachab-io`)
/// build this from CSV or JSON; `analyze` never parses text itself.
///
/// Not `Serialize`/`Deserialize`: `edge_probabilities` is keyed by `(NodeId,
/// NodeId)`, which JSON cannot represent as a map key directly (the §6 JSON
/// format spells it `"(u,v)"` instead) — `reachab-io` owns that
/// string<->tuple conversion rather than this type carrying a derive that
/// would panic on such a key at serialization time.
#[derive(Debug, Clone)]
pub struct GraphInput {
    pub edges: Vec<Edge>,
    pub node_priors: BTreeMap<NodeId, Prob>,
    pub edge_probabilities: BTreeMap<Edge, Prob>,
    pub probability_variant: ProbVariant,
}

impl GraphInput {
    /// All node ids mentioned by either a prior or an edge endpoint.
    pub fn all_nodes(&self) -> std::collections::BTreeSet<NodeId> {
        let mut nodes: std::collections::BTreeSet<NodeId> =
            self.node_priors.keys().copied().collect();
        for &(u, v) in &self.edges {
            nodes.insert(u);
            nodes.insert(v);
        }
        nodes
    }

    /// Structural + variant validation independent of topology (cycle
    /// detection is C1's job, not this function's).
    pub fn validate(&self) -> Result<(), ReachabError> {
        let mut seen = std::collections::HashSet::new();
        for &(u, v) in &self.edges {
            if u == v {
                return Err(ReachabError::invalid_input(format!(
                    "self-loop on node {u} is not allowed"
                )));
            }
            if !seen.insert((u, v)) {
                return Err(ReachabError::invalid_input(format!(
                    "duplicate edge ({u}, {v})"
                )));
            }
        }

        for node in self.all_nodes() {
            let prior = self.node_priors.get(&node).ok_or_else(|| {
                ReachabError::invalid_input(format!("node {node} has no prior"))
            })?;
            prior.validate_variant(self.probability_variant)?;
            prior.validate()?;
        }

        for &edge in &self.edges {
            let p = self.edge_probabilities.get(&edge).ok_or_else(|| {
                ReachabError::invalid_input(format!(
                    "edge ({}, {}) has no edge probability",
                    edge.0, edge.1
                ))
            })?;
            p.validate_variant(self.probability_variant)?;
            p.validate()?;
        }

        Ok(())
    }
}
