//! Shared types for the reachab workspace: node identifiers, the polymorphic
//! probability scalar, the analysis request/response shapes, and the error
//! kinds returned by `reachab-core::analyze`.
//!
//! Split out of `reachab-core` so that `reachab-io` (the CSV/JSON collaborator)
//! can produce [`GraphInput`] values without depending on the algorithm crate,
//! which in turn depends on `reachab-io` for its own CLI binaries.

mod error;
mod graph_input;
mod options;
mod pbox;
mod prob;

pub use error::ReachabError;
pub use graph_input::GraphInput;
pub use options::{AnalysisMode, AnalysisOptions, apply_overrides};
pub use pbox::PBox;
pub use prob::{Prob, ProbVariant};

/// Dense, externally-opaque node identifier. Ordering has no semantic meaning;
/// `BTreeSet`/`BTreeMap` are used throughout so iteration order over node sets
/// is ascending-by-id, matching the determinism requirement.
pub type NodeId = u64;

/// A directed edge `(src, dst)`.
pub type Edge = (NodeId, NodeId);

pub type Result<T> = std::result::Result<T, ReachabError>;
