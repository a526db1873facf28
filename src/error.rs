//! Error types for the invariant engine.
//!
//! A `thiserror` enum plus a crate-wide `Result` alias. Most of the
//! engine's degradation under resource limits or solver uncertainty is
//! encoded in control flow (the `empty` flag, UNDEF handling) rather than
//! `Result` propagation — this type only covers conditions that are
//! genuine failures for the caller, not soundness events.

/// Errors surfaced by the invariant engine.
#[derive(Debug, thiserror::Error)]
pub enum InvariantError {
    /// The rule set handed to [`crate::driver::InvariantDriver`] is not supported:
    /// it contains a negated uninterpreted atom, or an argument that is not
    /// an integer.
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    /// The driver observed its cancellation flag before or during a pass.
    #[error("invariant discovery cancelled")]
    Cancelled,

    /// A relational operator was given operands whose signatures do not
    /// agree with what the operation requires.
    #[error("dimension mismatch: expected width {expected}, found {found}")]
    DimensionMismatch {
        /// Width required by the operation.
        expected: usize,
        /// Width actually observed.
        found: usize,
    },
}

/// Result type used throughout the crate.
pub type InvariantResult<T> = Result<T, InvariantError>;
