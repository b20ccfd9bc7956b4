//! Error types for grid construction and pressure projection.

use crate::grid::Axis;
use thiserror::Error;

/// Invalid grid configuration, rejected at construction or resize.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("grid resolution must be positive on every axis, got {0:?}")]
    InvalidResolution([usize; 3]),
    #[error("grid spacing must be positive and finite on every axis, got {0:?}")]
    InvalidSpacing([f32; 3]),
    #[error("{axis:?} component holds {found} samples, grid shape needs {expected}")]
    ComponentLength {
        axis: Axis,
        expected: usize,
        found: usize,
    },
}

/// Errors that abort a projection step before the output grid is touched.
///
/// A linear solver that fails to converge is not an error: it is reported
/// through [`crate::pressure::ProjectionReport`] alongside the best-effort result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("output grid shape {found:?} does not match input grid shape {expected:?}")]
    ShapeMismatch {
        expected: [usize; 3],
        found: [usize; 3],
    },
    #[error("time step must be positive and finite, got {0}")]
    InvalidTimeStep(f32),
    #[error("boundary solver was built for a different grid shape; call update_collider first")]
    StaleBoundary,
}
