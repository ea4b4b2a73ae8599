use std::collections::{BTreeMap, BTreeSet};

use reachab_types::{AnalysisMode, AnalysisOptions, GraphInput, NodeId, Result, apply_overrides};

use crate::builder::build_unique_diamonds;
use crate::deadline::Deadline;
use crate::diamond::detect_diamonds;
use crate::forkjoin::forks_and_joins;
use crate::model::{BeliefMap, DiamondsAtNode, UniqueDiamondStore};
use crate::propagate::propagate;
use crate::topology::{Topology, build_topology};

/// The result of one `analyze` call, shaped by `options.analysis_mode`: each
/// mode stops the `C1 -> C6` pipeline at the point named in §6 and returns
/// only what that stage produced.
pub enum AnalysisOutput {
    /// `Structure`: C1 + C2 only.
    Structure {
        topology: Topology,
        forks: BTreeSet<NodeId>,
        joins: BTreeSet<NodeId>,
    },
    /// `DiamondsOnly`: C1 through C3.
    Diamonds {
        diamonds: BTreeMap<NodeId, DiamondsAtNode>,
    },
    /// `Reachability`: the full `C1` through `C6` pipeline.
    Reachability {
        beliefs: BeliefMap,
        diamonds: BTreeMap<NodeId, DiamondsAtNode>,
        unique_diamond_count: usize,
    },
}

/// Top-level engine entry point: `analyze(graph, options) -> belief map`,
/// generalized to the three recognized analysis modes (§6). Wires
/// `C1 -> C2 -> C3 -> C4 -> C5 (-> C6 -> C5 ...)` in sequence, stopping
/// early for `Structure`/`DiamondsOnly`.
pub fn analyze(graph: &GraphInput, options: &AnalysisOptions) -> Result<AnalysisOutput> {
    graph.validate()?;

    let nodes = graph.all_nodes();
    let topology = build_topology(&nodes, &graph.edges)?;

    if options.analysis_mode == AnalysisMode::Structure {
        let (forks, joins) = forks_and_joins(&topology);
        return Ok(AnalysisOutput::Structure {
            topology,
            forks,
            joins,
        });
    }

    let (node_priors, edge_probabilities) = apply_overrides(graph, options);
    for prior in node_priors.values() {
        prior.validate_variant(graph.probability_variant)?;
        prior.validate()?;
    }
    for prob in edge_probabilities.values() {
        prob.validate_variant(graph.probability_variant)?;
        prob.validate()?;
    }

    let root_diamonds = detect_diamonds(&topology, &graph.edges, &node_priors, &BTreeSet::new())?;

    if options.analysis_mode == AnalysisMode::DiamondsOnly {
        return Ok(AnalysisOutput::Diamonds {
            diamonds: root_diamonds,
        });
    }

    let unique_diamonds: UniqueDiamondStore =
        build_unique_diamonds(&root_diamonds, &node_priors, graph.probability_variant)?;
    let unique_diamond_count = unique_diamonds.len();

    let deadline = Deadline::new(options.deadline_ms);
    let beliefs = propagate(
        &topology,
        &node_priors,
        &edge_probabilities,
        &root_diamonds,
        &unique_diamonds,
        graph.probability_variant,
        &deadline,
    )?;

    Ok(AnalysisOutput::Reachability {
        beliefs,
        diamonds: root_diamonds,
        unique_diamond_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reachab_types::Prob;

    fn graph(
        edges: Vec<(NodeId, NodeId)>,
        node_priors: Vec<(NodeId, f64)>,
        edge_probabilities: Vec<((NodeId, NodeId), f64)>,
    ) -> GraphInput {
        GraphInput {
            edges,
            node_priors: node_priors
                .into_iter()
                .map(|(n, p)| (n, Prob::scalar(p)))
                .collect(),
            edge_probabilities: edge_probabilities
                .into_iter()
                .map(|(e, p)| (e, Prob::scalar(p)))
                .collect(),
            probability_variant: reachab_types::ProbVariant::Scalar,
        }
    }

    #[test]
    fn s1_no_diamond_end_to_end() {
        let g = graph(
            vec![(1, 2), (2, 3)],
            vec![(1, 1.0), (2, 0.9), (3, 0.9)],
            vec![((1, 2), 0.9), ((2, 3), 0.9)],
        );
        let out = analyze(&g, &AnalysisOptions::default()).unwrap();
        let AnalysisOutput::Reachability { beliefs, .. } = out else {
            panic!("expected Reachability output");
        };
        assert!(matches!(beliefs[&1], Prob::Scalar(p) if (p - 1.0).abs() < 1e-9));
        assert!(matches!(beliefs[&2], Prob::Scalar(p) if (p - 0.81).abs() < 1e-9));
        assert!(matches!(beliefs[&3], Prob::Scalar(p) if (p - 0.6561).abs() < 1e-9));
    }

    #[test]
    fn s4_nested_diamonds_build_exactly_two_unique_entries() {
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
        let g = graph(
            edges,
            vec![
                (1, 0.9),
                (2, 0.9),
                (3, 0.9),
                (4, 0.9),
                (5, 0.9),
                (6, 0.9),
                (7, 0.9),
            ],
            vec![
                ((1, 2), 0.9),
                ((1, 3), 0.9),
                ((2, 4), 0.9),
                ((3, 4), 0.9),
                ((4, 5), 0.9),
                ((4, 6), 0.9),
                ((5, 7), 0.9),
                ((6, 7), 0.9),
            ],
        );
        let out = analyze(&g, &AnalysisOptions::default()).unwrap();
        let AnalysisOutput::Reachability {
            beliefs,
            unique_diamond_count,
            ..
        } = out
        else {
            panic!("expected Reachability output");
        };
        assert_eq!(unique_diamond_count, 2);
        assert!(matches!(beliefs[&7], Prob::Scalar(p) if (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn s5_irrelevant_source_uses_naive_combination() {
        let edges = vec![(1, 2), (1, 3), (2, 4), (3, 4)];
        let g = graph(
            edges,
            vec![(1, 1.0), (2, 0.9), (3, 0.9), (4, 0.9)],
            vec![((1, 2), 0.9), ((1, 3), 0.8), ((2, 4), 0.7), ((3, 4), 0.6)],
        );
        let out = analyze(&g, &AnalysisOptions::default()).unwrap();
        let AnalysisOutput::Reachability {
            beliefs, diamonds, ..
        } = out
        else {
            panic!("expected Reachability output");
        };
        assert!(diamonds.is_empty());

        let b2 = 0.9 * 0.9 * 0.9;
        let b3 = 0.9 * 1.0 * 0.8;
        let expected4 = 0.9 * (1.0 - (1.0 - b2 * 0.7) * (1.0 - b3 * 0.6));
        assert!(matches!(beliefs[&4], Prob::Scalar(p) if (p - expected4).abs() < 1e-9));
    }

    #[test]
    fn s6_cycle_is_rejected() {
        let g = graph(
            vec![(1, 2), (2, 1)],
            vec![(1, 1.0), (2, 1.0)],
            vec![((1, 2), 1.0), ((2, 1), 1.0)],
        );
        let err = analyze(&g, &AnalysisOptions::default()).unwrap_err();
        assert!(matches!(err, reachab_types::ReachabError::InvalidInput(_)));
    }

    #[test]
    fn empty_graph_is_empty_belief_map() {
        let g = graph(vec![], vec![], vec![]);
        let out = analyze(&g, &AnalysisOptions::default()).unwrap();
        let AnalysisOutput::Reachability { beliefs, .. } = out else {
            panic!("expected Reachability output");
        };
        assert!(beliefs.is_empty());
    }

    #[test]
    fn structure_mode_stops_after_c2() {
        let g = graph(
            vec![(1, 2), (1, 3)],
            vec![(1, 1.0), (2, 1.0), (3, 1.0)],
            vec![((1, 2), 1.0), ((1, 3), 1.0)],
        );
        let options = AnalysisOptions {
            analysis_mode: AnalysisMode::Structure,
            ..Default::default()
        };
        let out = analyze(&g, &options).unwrap();
        let AnalysisOutput::Structure { forks, joins, .. } = out else {
            panic!("expected Structure output");
        };
        assert_eq!(forks, BTreeSet::from([1]));
        assert!(joins.is_empty());
    }

    #[test]
    fn diamonds_only_mode_stops_after_c3() {
        let g = graph(
            vec![(1, 2), (1, 3), (2, 4), (3, 4)],
            vec![(1, 0.9), (2, 0.9), (3, 0.9), (4, 0.9)],
            vec![((1, 2), 0.9), ((1, 3), 0.9), ((2, 4), 0.9), ((3, 4), 0.9)],
        );
        let options = AnalysisOptions {
            analysis_mode: AnalysisMode::DiamondsOnly,
            ..Default::default()
        };
        let out = analyze(&g, &options).unwrap();
        let AnalysisOutput::Diamonds { diamonds } = out else {
            panic!("expected Diamonds output");
        };
        assert_eq!(diamonds.len(), 1);
    }
}
