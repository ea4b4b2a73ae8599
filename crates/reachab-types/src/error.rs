use thiserror::Error;

/// Error kinds returned by the engine, per the failure semantics: all
/// detectable pre-conditions are enforced up-front (`InvalidInput`), bugs in
/// the engine's own invariants surface as `InternalError`, and a tripped
/// deadline surfaces as `Timeout`. There are no partial results: every
/// fallible engine entry point returns `Result<_, ReachabError>` and a caller
/// sees either a complete answer or nothing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReachabError {
    /// The caller violated a pre-condition: a cycle, a missing prior or edge
    /// probability, a probability outside `[0, 1]`, a malformed iteration-set
    /// partition, or an `incoming`/`outgoing` inconsistency.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An invariant was violated inside the engine itself: a hash collision
    /// between non-equal diamonds, the diamond-detector's recursive
    /// completeness loop exceeding its iteration cap, or a belief requested
    /// before it was assigned.
    #[error("internal error: {0}")]
    InternalError(String),

    /// The caller-supplied deadline tripped before the analysis completed.
    #[error("analysis deadline of {deadline_ms}ms exceeded")]
    Timeout { deadline_ms: u64 },
}

impl ReachabError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }
}
