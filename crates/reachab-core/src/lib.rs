//! Exact reachability (belief propagation) over DAGs with diamond
//! conditioning: topology preprocessing, fork/join detection, diamond
//! detection and unique-diamond canonicalization, and the belief propagator
//! with its conditioning solver.

mod analyze;
mod builder;
mod condition;
mod deadline;
mod diamond;
mod forkjoin;
mod model;
mod propagate;
mod topology;

pub use analyze::{AnalysisOutput, analyze};
pub use builder::build_unique_diamonds;
pub use deadline::Deadline;
pub use diamond::detect_diamonds;
pub use forkjoin::forks_and_joins;
pub use model::{BeliefMap, ComputationData, Diamond, DiamondsAtNode, UniqueDiamondStore};
pub use topology::{Topology, build_topology};
