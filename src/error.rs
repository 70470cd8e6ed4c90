//! Error types shared by models, boundary encoding and integrators.

use thiserror::Error;

use crate::solver::Side;

/// Errors raised while building or running a simulation.
///
/// Nothing is retried automatically and no partial result is returned:
/// the caller receives the first failure.
#[derive(Error, Debug)]
pub enum SorbError {
    /// Non-physical or inconsistent input, detected at construction
    #[error("Invalid parameter: {what}")]
    InvalidParameter { what: String },

    /// A boundary relation could not be solved for the boundary node value
    #[error("Boundary unsolvable for field '{field}' on the {side} side: {what}")]
    BoundaryUnsolvable {
        field: String,
        side: Side,
        what: String,
    },

    /// The time integrator exhausted its budget or produced a non-finite state
    #[error("Integrator did not converge at t = {time}: {what}")]
    NonConvergence { time: f64, what: String },

    /// Malformed JSON configuration
    #[error("Configuration error: {0}")]
    Configuration(#[from] serde_json::Error),
}

impl SorbError {
    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        Self::InvalidParameter { what: what.into() }
    }

    pub(crate) fn non_convergence(time: f64, what: impl Into<String>) -> Self {
        Self::NonConvergence {
            time,
            what: what.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SorbError>;
