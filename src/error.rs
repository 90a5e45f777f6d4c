//! Error types for catalog loading and the refinement loop.

use thiserror::Error;

use crate::fit::{Axis, QuadSurface};

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RemasterError>;

/// Errors surfaced by catalog I/O and the refinement loop.
///
/// All variants are deterministic functions of the input data; nothing here
/// is worth retrying without changing the data or the threshold schedule.
#[derive(Error, Debug)]
pub enum RemasterError {
    /// A catalog row failed to parse or had an inconsistent column count.
    /// Raised before any refinement round runs.
    #[error("{path}:{line}: malformed catalog row: {reason}")]
    MalformedCatalog {
        path: String,
        line: usize,
        reason: String,
    },

    /// The threshold schedule was empty or not strictly decreasing.
    /// Raised before any refinement round runs.
    #[error("invalid threshold schedule: {reason}")]
    InvalidSchedule { reason: String },

    /// A round's distance cutoff kept too few matches to fit against.
    /// Fatal: the loop aborts, reporting which round and threshold failed.
    #[error(
        "round {round} (threshold {threshold:e}): {kept} matches within threshold, \
         need at least {needed}"
    )]
    InsufficientMatches {
        round: usize,
        threshold: f64,
        kept: usize,
        needed: usize,
    },

    /// The least-squares solve produced no usable coefficients.
    /// Non-fatal: the round proceeds with the attached fallback surface.
    #[error("quadratic fit failed to converge on the {axis} axis")]
    FitNonConvergence { axis: Axis, fallback: QuadSurface },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
