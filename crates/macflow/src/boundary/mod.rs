//! Boundary condition solvers.
//!
//! A boundary solver owns everything derived from a collider for one grid
//! shape: the cell-centered collider SDF, the per-face open fractions and,
//! for the blocked variant, a per-cell marker. It enforces the
//! no-penetration condition on a velocity grid before pressure projection.
//!
//! Two variants share one interface:
//! - [`FractionalBoundarySolver`]: sub-cell face fractions, slip projection
//!   along the SDF normal.
//! - [`BlockedBoundarySolver`]: binary cell marker, faces touching a solid
//!   cell take the collider velocity outright.

mod blocked;
mod collider_model;
mod fractional;

pub use blocked::{BlockedBoundarySolver, CellMarker};
pub use collider_model::ColliderBoundaryModel;
pub use fractional::FractionalBoundarySolver;

use crate::collider::Collider;
use crate::field::CellGrid;
use crate::grid::{Axis, FaceGrid, GridShape};
use crate::weights::FaceWeights;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Common interface of the boundary solver variants.
///
/// Derived data is recomputed in place by `update_collider`; reads during a
/// projection are fine, updating concurrently with one is not.
pub trait BoundaryConditionSolver: Send + Sync {
    fn kind(&self) -> BoundaryKind;

    /// Resample `collider` at every cell center of `shape` and rebuild the
    /// face weights. `None` means no solid anywhere.
    fn update_collider(&mut self, collider: Option<&dyn Collider>, shape: &GridShape);

    /// Cached collider SDF (negative inside the solid).
    fn collider_sdf(&self) -> &CellGrid;

    /// Open fraction of every face, 0 = blocked, 1 = open.
    fn face_weights(&self) -> &FaceWeights;

    /// Per-cell fluid/solid classification, if this variant keeps one.
    fn marker(&self) -> Option<&[CellMarker]> {
        None
    }

    /// Enforce the collider and domain walls on `velocity`.
    ///
    /// Rebuilds the cached data from `collider` first if it was built for a
    /// different grid shape.
    fn constrain_velocity(
        &mut self,
        velocity: &mut FaceGrid,
        collider: Option<&dyn Collider>,
        extrapolation_depth: usize,
    );

    fn domain_boundary(&self) -> DomainBoundary;

    fn set_domain_boundary(&mut self, boundary: DomainBoundary);

    /// True if the cached SDF and weights were built for `grid`'s shape.
    fn is_current_for(&self, grid: &FaceGrid) -> bool;
}

/// Boundary solver variant, selectable from configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    #[default]
    Fractional,
    Blocked,
}

impl BoundaryKind {
    pub fn build(self) -> Box<dyn BoundaryConditionSolver> {
        match self {
            BoundaryKind::Fractional => Box::new(FractionalBoundarySolver::new()),
            BoundaryKind::Blocked => Box::new(BlockedBoundarySolver::new()),
        }
    }
}

/// Lower or upper end of an axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Lower,
    Upper,
}

impl Side {
    #[inline]
    fn index(self) -> usize {
        match self {
            Side::Lower => 0,
            Side::Upper => 1,
        }
    }
}

/// Which of the six domain walls are solid.
///
/// Normal velocity on a closed wall is zero after constraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainBoundary {
    /// closed[axis][side]
    closed: [[bool; 2]; 3],
}

impl Default for DomainBoundary {
    fn default() -> Self {
        Self::closed()
    }
}

impl DomainBoundary {
    pub fn closed() -> Self {
        Self {
            closed: [[true; 2]; 3],
        }
    }

    pub fn open() -> Self {
        Self {
            closed: [[false; 2]; 3],
        }
    }

    pub fn with_side(mut self, axis: Axis, side: Side, closed: bool) -> Self {
        self.closed[axis.index()][side.index()] = closed;
        self
    }

    #[inline]
    pub fn is_closed(&self, axis: Axis, side: Side) -> bool {
        self.closed[axis.index()][side.index()]
    }

    /// Zero the normal component on every closed wall.
    pub(crate) fn apply(&self, velocity: &mut FaceGrid) {
        let resolution = velocity.resolution();
        for axis in Axis::ALL {
            let a = axis.index();
            let lower = self.is_closed(axis, Side::Lower);
            let upper = self.is_closed(axis, Side::Upper);
            if !lower && !upper {
                continue;
            }
            let n = resolution[a];
            velocity.par_update_faces(axis, |coords, _, value| {
                if (lower && coords[a] == 0) || (upper && coords[a] == n) {
                    0.0
                } else {
                    value
                }
            });
        }
    }
}

/// Collider velocity at `pos`, zero without a collider.
#[inline]
pub(crate) fn collider_velocity(collider: Option<&dyn Collider>, pos: Vec3) -> Vec3 {
    collider.map_or(Vec3::ZERO, |c| c.velocity_at(pos))
}
