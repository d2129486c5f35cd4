//! Error types for sequential arrangement.

use thiserror::Error;

use crate::geometry::ObjectId;

/// Result type alias for arrangement operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while preparing, scheduling or checking objects.
///
/// An infeasible batch and a solver timeout are not errors: the scheduler
/// recovers from both by shrinking the batch or deferring objects to a new
/// plate.
#[derive(Debug, Error)]
pub enum Error {
    /// An object cannot fit the plate in any position.
    #[error("Object {id} is too large to fit the plate")]
    ObjectTooLarge {
        /// Identifier of the offending object.
        id: ObjectId,
    },

    /// No object at all could be placed on a plate.
    #[error("Complete scheduling failure: {0}")]
    SchedulingFailure(String),

    /// Printer geometry, configuration or input combination is not supported.
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    /// Invalid geometry provided.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Internal consistency check failed.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// The linear-arithmetic backend failed for a reason other than
    /// infeasibility or timeout.
    #[error("Solver error: {0}")]
    Solver(String),
}

impl Error {
    /// Returns true for errors that mean "no arrangement exists" rather than
    /// bad input.
    pub fn is_infeasibility(&self) -> bool {
        matches!(self, Error::SchedulingFailure(_) | Error::ObjectTooLarge { .. })
    }
}
