use std::collections::BTreeMap;
use std::io::Read;

use eyre::{Context, eyre};
use reachab_types::{GraphInput, Prob, ProbVariant};

/// Parse the §6 CSV matrix format: row `i` (1-based) is node `i`'s record,
/// columns are `node_prior` followed by one column per destination node
/// (same 1-based node ids as the rows), each entry either the edge
/// probability in `(0, 1]` or `0` for "no edge".
pub fn parse(input: &str) -> eyre::Result<GraphInput> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(false)
        .from_reader(input.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.wrap_err("malformed CSV record")?;
        let mut fields = Vec::with_capacity(record.len());
        for field in record.iter() {
            let value: f64 = field
                .trim()
                .parse()
                .wrap_err_with(|| format!("non-numeric CSV field {field:?}"))?;
            fields.push(value);
        }
        rows.push(fields);
    }

    let node_count = rows.len();
    if node_count == 0 {
        return Ok(GraphInput {
            edges: Vec::new(),
            node_priors: BTreeMap::new(),
            edge_probabilities: BTreeMap::new(),
            probability_variant: ProbVariant::Scalar,
        });
    }

    let mut node_priors = BTreeMap::new();
    let mut edges = Vec::new();
    let mut edge_probabilities = BTreeMap::new();

    for (row_idx, row) in rows.iter().enumerate() {
        let node = (row_idx + 1) as u64;
        if row.len() != node_count + 1 {
            return Err(eyre!(
                "row {node} has {} columns, expected {} (node_prior + {node_count} destinations)",
                row.len(),
                node_count + 1
            ));
        }

        node_priors.insert(node, Prob::scalar(row[0]));

        for (col_idx, &value) in row[1..].iter().enumerate() {
            if value == 0.0 {
                continue;
            }
            let dst = (col_idx + 1) as u64;
            edges.push((node, dst));
            edge_probabilities.insert((node, dst), Prob::scalar(value));
        }
    }

    let graph = GraphInput {
        edges,
        node_priors,
        edge_probabilities,
        probability_variant: ProbVariant::Scalar,
    };
    graph.validate().map_err(|e| eyre!(e))?;
    Ok(graph)
}

/// Read and parse a CSV graph file from any reader (path or stdin), mirroring
/// the teacher's `stdio::get_input_reader` + read-to-string convention.
pub fn parse_reader(mut reader: impl Read) -> eyre::Result<GraphInput> {
    let mut contents = String::new();
    reader
        .read_to_string(&mut contents)
        .wrap_err("failed to read CSV input")?;
    parse(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_of_two_nodes() {
        // node 1: prior 1.0, edge to node 2 at 0.9
        // node 2: prior 0.0 (non-source), no outgoing edges
        let csv = "1.0,0,0.9\n0.0,0,0\n";
        let graph = parse(csv).unwrap();
        assert_eq!(graph.edges, vec![(1, 2)]);
        assert_eq!(graph.node_priors[&1], Prob::scalar(1.0));
        assert_eq!(graph.edge_probabilities[&(1, 2)], Prob::scalar(0.9));
    }

    #[test]
    fn zero_entry_means_no_edge() {
        let csv = "1.0,0,0\n0.0,0,0\n";
        let graph = parse(csv).unwrap();
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn empty_input_is_empty_graph() {
        let graph = parse("").unwrap();
        assert!(graph.edges.is_empty());
        assert!(graph.node_priors.is_empty());
    }

    #[test]
    fn wrong_column_count_is_rejected() {
        let csv = "1.0,0\n0.0,0,0\n";
        assert!(parse(csv).is_err());
    }
}
