//! Error types of the pricing core.
//!
//! An empty pricing result is never an error. Errors are either failures of
//! the master LP backend, which are propagated untouched, or contract
//! violations that abort the current callback.

use thiserror::Error;

/// Failure reported by a master LP backend
#[derive(Debug, Error)]
pub enum MasterError {
    #[error("master LP backend failure: {0}")]
    Backend(String),

    #[error("no linking constraint for edge {0}")]
    MissingLinkingConstraint(usize),

    #[error("dual values unavailable: {0}")]
    DualsUnavailable(String),
}

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("tour cannot be traced through the network: {0}")]
    UntraceableTour(String),

    #[error("stabilized bound {bound} exceeds incumbent value {incumbent}")]
    InconsistentBound { bound: f64, incumbent: f64 },

    #[error("pricing manager is {0}")]
    InvalidState(&'static str),

    #[error(transparent)]
    Master(#[from] MasterError),
}
