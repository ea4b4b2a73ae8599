use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use reachab_types::{Edge, NodeId, Prob};

/// A minimal subgraph in which two or more paths from a shared fork ancestor
/// reconverge at a join. See §4.3 for how one is found; the invariants named
/// on each field are enforced by the detector, never by this type itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Diamond {
    pub relevant_nodes: BTreeSet<NodeId>,
    pub conditioning_nodes: BTreeSet<NodeId>,
    /// Sorted ascending by `(src, dst)`; canonical ordering feeds the hash.
    pub edge_list: Vec<Edge>,
}

impl Diamond {
    /// 64-bit canonical hash of `(relevant_nodes, conditioning_nodes)`,
    /// order-independent. A lookup key only — equality between two diamonds
    /// sharing a hash is still verified by comparing the sets themselves.
    pub fn canonical_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for node in &self.relevant_nodes {
            node.hash(&mut hasher);
        }
        0xD1A3_u64.hash(&mut hasher); // separator between the two sets
        for node in &self.conditioning_nodes {
            node.hash(&mut hasher);
        }
        hasher.finish()
    }
}

/// The diamond(s) detected at one join, and the remaining parents of that
/// join that belong to no detected diamond.
///
/// `diamonds` is a list rather than a single `Diamond` for forward
/// compatibility with a multi-diamond-per-join detector: the current
/// detector (`diamond::detect_at_join`) always returns at most one, but C5's
/// inclusion-exclusion combination over `diamonds` is written to handle more.
#[derive(Debug, Clone, PartialEq)]
pub struct DiamondsAtNode {
    pub diamonds: Vec<Diamond>,
    pub non_diamond_parents: BTreeSet<NodeId>,
    pub join_node: NodeId,
}

/// Precomputed, read-only state for one unique diamond: the diamond's
/// restricted topology, the frozen priors used to evaluate it in isolation,
/// and its own inner diamonds. Built once by C4, looked up thereafter by
/// [`Diamond::canonical_hash`].
#[derive(Debug, Clone)]
pub struct ComputationData {
    pub diamond: Diamond,
    pub join_node: NodeId,
    pub sub_topology: crate::topology::Topology,
    pub sub_node_priors: BTreeMap<NodeId, Prob>,
    pub sub_diamond_structures: BTreeMap<NodeId, DiamondsAtNode>,
}

/// `node -> belief`. Written monotonically during a propagator sweep.
pub type BeliefMap = BTreeMap<NodeId, Prob>;

/// The hash-keyed arena of unique diamonds built by C4, shared read-only by
/// C5/C6 once construction finishes.
pub type UniqueDiamondStore = BTreeMap<u64, ComputationData>;
