//! Structural input errors.
//!
//! Geometric and kinematic degeneracies are not errors: they surface as NaN
//! or `None` in the derived values. The variants here describe inputs that
//! make an aircraft or a pair impossible to evaluate at all.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConflictError {
    #[error("flightpath needs at least 2 waypoints, got {0}")]
    DegenerateFlightpath(usize),

    #[error("sector polygon needs at least 3 vertices, got {0}")]
    DegenerateSector(usize),

    #[error("segment index {0} is out of range for the flightpath")]
    SegmentOutOfRange(usize),

    #[error("no flightpath registered for aircraft {0}")]
    MissingFlightpath(String),

    #[error("no trajectory available for aircraft {0}")]
    MissingTrajectory(String),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),
}
