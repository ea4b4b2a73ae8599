use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Edge, GraphInput, NodeId, Prob};

/// How far through the pipeline `analyze` should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Stop after C1/C2: topology + fork/join detection only.
    Structure,
    /// Stop after C3: diamond detection only.
    DiamondsOnly,
    /// Run the full pipeline (C1 through C6) and return belief values.
    #[default]
    Reachability,
}

/// The full recognized option set of `spec.md` §6. `enable_monte_carlo`,
/// `mc_samples`, and `include_classification` are carried here because they
/// are part of the documented request shape the full system's façade
/// accepts, but `reachab-core::analyze` does not act on them — Monte-Carlo
/// validation and diamond classification are external collaborators outside
/// this engine's scope (see DESIGN.md).
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub analysis_mode: AnalysisMode,

    /// Global node-prior override, applied before input but after individual
    /// overrides in the *evaluation* sense (precedence is individual >
    /// global > input; see [`apply_overrides`]).
    pub override_node_prior: Option<Prob>,
    pub override_edge_probability: Option<Prob>,

    pub individual_node_priors: BTreeMap<NodeId, Prob>,
    pub individual_edge_probabilities: BTreeMap<Edge, Prob>,

    /// Inert: recognized for request-shape compatibility, not executed.
    pub include_classification: bool,
    pub enable_monte_carlo: bool,
    pub mc_samples: u64,

    /// `0` = no deadline.
    pub deadline_ms: u64,
}

/// Resolve the effective node priors and edge probabilities for a run,
/// applying the documented precedence `individual > global > input`.
pub fn apply_overrides(
    graph: &GraphInput,
    options: &AnalysisOptions,
) -> (BTreeMap<NodeId, Prob>, BTreeMap<Edge, Prob>) {
    let mut node_priors = graph.node_priors.clone();
    if let Some(global) = &options.override_node_prior {
        for value in node_priors.values_mut() {
            *value = global.clone();
        }
    }
    for (&node, value) in &options.individual_node_priors {
        node_priors.insert(node, value.clone());
    }

    let mut edge_probabilities = graph.edge_probabilities.clone();
    if let Some(global) = &options.override_edge_probability {
        for value in edge_probabilities.values_mut() {
            *value = global.clone();
        }
    }
    for (&edge, value) in &options.individual_edge_probabilities {
        edge_probabilities.insert(edge, value.clone());
    }

    (node_priors, edge_probabilities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn graph() -> GraphInput {
        GraphInput {
            edges: vec![(1, 2)],
            node_priors: BTreeMap::from([(1, Prob::scalar(0.5)), (2, Prob::scalar(0.5))]),
            edge_probabilities: BTreeMap::from([((1, 2), Prob::scalar(0.5))]),
            probability_variant: crate::ProbVariant::Scalar,
        }
    }

    #[test]
    fn individual_overrides_beat_global_overrides_beat_input() {
        let g = graph();
        let mut options = AnalysisOptions {
            override_node_prior: Some(Prob::scalar(0.9)),
            ..Default::default()
        };
        options.individual_node_priors.insert(1, Prob::scalar(0.1));

        let (priors, _) = apply_overrides(&g, &options);
        assert_eq!(priors[&1], Prob::scalar(0.1));
        assert_eq!(priors[&2], Prob::scalar(0.9));
    }

    #[test]
    fn no_overrides_keeps_input() {
        let g = graph();
        let (priors, edges) = apply_overrides(&g, &AnalysisOptions::default());
        assert_eq!(priors[&1], Prob::scalar(0.5));
        assert_eq!(edges[&(1, 2)], Prob::scalar(0.5));
    }
}
