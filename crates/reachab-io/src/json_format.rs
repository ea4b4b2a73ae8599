use std::collections::BTreeMap;

use eyre::{Context, eyre};
use reachab_types::{Edge, GraphInput, NodeId, Prob, ProbVariant};
use serde::Deserialize;

/// Wire shape of the §6 alternative JSON format. `node_priors` keys are
/// plain node-id strings (JSON object keys are always strings); thus we have:
/// `edge_probabilities` keys are the literal `"(u,v)"` form, since a tuple
/// can't be a JSON object key either.
#[derive(Debug, Deserialize)]
struct Wire {
    edges: Vec<(NodeId, NodeId)>,
    #[serde(default)]
    node_priors: BTreeMap<String, f64>,
    #[serde(default)]
    edge_probabilities: BTreeMap<String, f64>,
}

pub fn parse(input: &str) -> eyre::Result<GraphInput> {
    let wire: Wire = serde_json::from_str(input).wrap_err("malformed JSON graph input")?;

    let mut node_priors = BTreeMap::new();
    for (key, value) in wire.node_priors {
        let node: NodeId = key
            .parse()
            .wrap_err_with(|| format!("non-numeric node_priors key {key:?}"))?;
        node_priors.insert(node, Prob::scalar(value));
    }

    let mut edge_probabilities = BTreeMap::new();
    for (key, value) in wire.edge_probabilities {
        let edge = parse_edge_key(&key)?;
        edge_probabilities.insert(edge, Prob::scalar(value));
    }

    let graph = GraphInput {
        edges: wire.edges,
        node_priors,
        edge_probabilities,
        probability_variant: ProbVariant::Scalar,
    };
    graph.validate().map_err(|e| eyre!(e))?;
    Ok(graph)
}

/// Parse the `"(u,v)"` edge-probability key format into an [`Edge`].
fn parse_edge_key(key: &str) -> eyre::Result<Edge> {
    let inner = key
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| eyre!("edge key {key:?} is not of the form \"(u,v)\""))?;
    let (u, v) = inner
        .split_once(',')
        .ok_or_else(|| eyre!("edge key {key:?} is not of the form \"(u,v)\""))?;
    let u: NodeId = u
        .trim()
        .parse()
        .wrap_err_with(|| format!("non-numeric edge key {key:?}"))?;
    let v: NodeId = v
        .trim()
        .parse()
        .wrap_err_with(|| format!("non-numeric edge key {key:?}"))?;
    Ok((u, v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_diamond() {
        let json = r#"{
            "edges": [[1,2],[1,3],[2,4],[3,4]],
            "node_priors": {"1": 1.0, "2": 0.0, "3": 0.0, "4": 0.0},
            "edge_probabilities": {
                "(1,2)": 0.9, "(1,3)": 0.8, "(2,4)": 0.7, "(3,4)": 0.6
            }
        }"#;
        let graph = parse(json).unwrap();
        assert_eq!(graph.edges.len(), 4);
        assert_eq!(graph.node_priors[&1], Prob::scalar(1.0));
        assert_eq!(graph.edge_probabilities[&(2, 4)], Prob::scalar(0.7));
    }

    #[test]
    fn rejects_malformed_edge_key() {
        assert!(parse_edge_key("1,2").is_err());
        assert!(parse_edge_key("(1,2").is_err());
        assert!(parse_edge_key("(a,2)").is_err());
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(parse("not json").is_err());
    }
}
