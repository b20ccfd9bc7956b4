//! Grid-based incompressible flow core
//!
//! Pressure projection on a staggered (MAC) grid with embedded solid
//! boundaries:
//! - face-centered velocity grid with sampling, divergence and curl
//! - collider SDF cached at cell centers, sub-cell face open fractions
//! - velocity extrapolation and no-penetration constraint at solids
//! - sparse pressure Poisson assembly with a ghost-fluid free surface
//! - swappable iterative linear solvers
//!
//! # Example
//!
//! ```
//! use macflow::{BoxCollider, FaceGrid, ProjectionConfig, ProjectionDomain};
//! use glam::{Vec2, Vec3};
//!
//! let mut velocity = FaceGrid::planar(16, 16, Vec2::splat(0.1), Vec2::ZERO, Vec2::new(1.0, 0.0))?;
//! let obstacle = BoxCollider::new(Vec3::new(0.6, 0.6, -1.0), Vec3::new(1.0, 1.0, 1.0));
//!
//! let (mut projection, mut boundary) = ProjectionConfig::default().build();
//! boundary.update_collider(Some(&obstacle), velocity.shape());
//! boundary.constrain_velocity(&mut velocity, Some(&obstacle), 5);
//!
//! let input = velocity.clone();
//! let domain = ProjectionDomain::new().with_boundary(boundary.as_ref());
//! let report = projection.solve(&input, 1.0 / 60.0, &mut velocity, &domain)?;
//! assert!(report.converged());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod boundary;
pub mod collider;
pub mod config;
pub mod error;
pub mod extrapolation;
pub mod field;
pub mod fraction;
pub mod grid;
mod interp;
pub mod linear;
pub mod pressure;
pub mod weights;

pub use boundary::{
    BlockedBoundarySolver, BoundaryConditionSolver, BoundaryKind, CellMarker, ColliderBoundaryModel, DomainBoundary,
    FractionalBoundarySolver, Side,
};
pub use collider::{BoxCollider, Collider, SphereCollider};
pub use config::ProjectionConfig;
pub use error::{GridError, ProjectionError};
pub use extrapolation::extrapolate_to_region;
pub use field::{CellGrid, ConstantField, ScalarField, FAR_FIELD};
pub use glam::{Vec2, Vec3};
pub use grid::{Axis, FaceGrid, GridShape};
pub use linear::{
    ConjugateGradient, CsrMatrix, GaussSeidel, LinearSolverKind, LinearSystem, LinearSystemSolver, SolverOutcome,
};
pub use pressure::{PressureProjectionSolver, ProjectionDomain, ProjectionReport};
pub use weights::FaceWeights;
