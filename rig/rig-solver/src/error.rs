//! Error types for the sparse solvers.

use thiserror::Error;

/// Result type for solver operations.
pub type SolveResult<T> = Result<T, SolveError>;

/// Errors that can occur during factorization or solving.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SolveError {
    /// The input is not a valid lower triangle.
    #[error("invalid matrix structure in row {row}: {message}")]
    InvalidStructure {
        /// Offending row.
        row: usize,
        /// What was wrong.
        message: &'static str,
    },

    /// A pivot was not positive; the matrix is not positive definite.
    #[error("non-positive pivot at permuted row {row}; matrix is not positive definite")]
    NotPositiveDefinite {
        /// Permuted row index of the failing pivot.
        row: usize,
    },

    /// The hard-constraint matrix is singular to working precision.
    #[error("hard constraints are near-singular (best pivot below 1e-10)")]
    SingularConstraints,

    /// A variable is fixed by no hard constraint and appears in no soft
    /// constraint, so the system does not determine it.
    #[error("variable {var} is determined by neither hard nor soft constraints")]
    UnconstrainedVariable {
        /// The undetermined variable's index.
        var: u32,
    },

    /// `solve` was called before `factor`, or `result` before `solve`.
    #[error("operation out of order: {0}")]
    OutOfOrder(&'static str),
}
