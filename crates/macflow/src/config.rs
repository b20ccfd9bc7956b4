//! Projection parameters.

use crate::boundary::{BoundaryConditionSolver, BoundaryKind, DomainBoundary};
use crate::linear::LinearSolverKind;
use crate::pressure::PressureProjectionSolver;
use serde::{Deserialize, Serialize};

/// Tunable parameters of a projection setup.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Fractional (sub-cell) or blocked (whole-cell) collider treatment.
    pub boundary: BoundaryKind,
    /// Layers of faces extrapolated into the collider before constraint.
    pub extrapolation_depth: usize,
    /// Pressure linear solver.
    pub linear_solver: LinearSolverKind,
    /// Iteration cap of the linear solver.
    pub max_iterations: usize,
    /// Relative residual at which the linear solver stops.
    pub tolerance: f64,
    /// Closed or open domain walls.
    pub domain: DomainBoundary,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            boundary: BoundaryKind::Fractional,
            extrapolation_depth: 5,
            linear_solver: LinearSolverKind::ConjugateGradient,
            max_iterations: 1000,
            tolerance: 1e-6,
            domain: DomainBoundary::closed(),
        }
    }
}

impl ProjectionConfig {
    /// Projection solver and a matching boundary solver.
    pub fn build(&self) -> (PressureProjectionSolver, Box<dyn BoundaryConditionSolver>) {
        let linear = self.linear_solver.build(self.max_iterations, self.tolerance);
        let projection = PressureProjectionSolver::with_linear_system_solver(linear);

        let mut boundary = self.boundary.build();
        boundary.set_domain_boundary(self.domain);
        (projection, boundary)
    }
}
