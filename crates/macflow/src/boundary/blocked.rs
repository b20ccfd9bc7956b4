use super::{collider_velocity, BoundaryConditionSolver, BoundaryKind, ColliderBoundaryModel, DomainBoundary};
use crate::collider::Collider;
use crate::field::CellGrid;
use crate::grid::{Axis, FaceGrid, GridShape};
use crate::weights::FaceWeights;
use serde::{Deserialize, Serialize};

/// Binary classification of a cell against the collider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellMarker {
    Fluid,
    Collider,
}

/// Boundary solver on whole cells.
///
/// Cells whose center lies inside the collider are marked `Collider`; every
/// face touching such a cell is blocked and takes the collider velocity
/// outright. Coarser than the fractional solver but unaffected by thin or
/// badly resolved geometry.
#[derive(Clone, Debug)]
pub struct BlockedBoundarySolver {
    model: ColliderBoundaryModel,
    marker: Vec<CellMarker>,
    weights: FaceWeights,
    domain: DomainBoundary,
}

impl Default for BlockedBoundarySolver {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockedBoundarySolver {
    pub fn new() -> Self {
        let model = ColliderBoundaryModel::new();
        let shape = *model.shape();
        Self {
            model,
            marker: vec![CellMarker::Fluid; shape.cell_count()],
            weights: FaceWeights::open(shape),
            domain: DomainBoundary::default(),
        }
    }

    pub fn model(&self) -> &ColliderBoundaryModel {
        &self.model
    }

    /// Marker of cell (i, j, k).
    pub fn marker_at(&self, i: usize, j: usize, k: usize) -> CellMarker {
        self.marker[self.model.shape().cell_index(i, j, k)]
    }

    fn rebuild_marker(&mut self) {
        self.marker = self
            .model
            .collider_sdf()
            .data()
            .iter()
            .map(|&phi| {
                if phi < 0.0 {
                    CellMarker::Collider
                } else {
                    CellMarker::Fluid
                }
            })
            .collect();

        let shape = *self.model.shape();
        let marker = &self.marker;
        self.weights = FaceWeights::from_predicate(shape, |axis, coords| {
            !touches_collider(&shape, marker, axis, coords)
        });
    }
}

/// True if either cell sharing the face is marked `Collider`.
fn touches_collider(shape: &GridShape, marker: &[CellMarker], axis: Axis, coords: [usize; 3]) -> bool {
    let a = axis.index();
    let [i, j, k] = coords;
    let upper = (coords[a] < shape.resolution[a]).then(|| shape.cell_index(i, j, k));
    let lower = (coords[a] > 0).then(|| {
        let mut c = coords;
        c[a] -= 1;
        shape.cell_index(c[0], c[1], c[2])
    });
    [lower, upper]
        .into_iter()
        .flatten()
        .any(|idx| marker[idx] == CellMarker::Collider)
}

impl BoundaryConditionSolver for BlockedBoundarySolver {
    fn kind(&self) -> BoundaryKind {
        BoundaryKind::Blocked
    }

    fn update_collider(&mut self, collider: Option<&dyn Collider>, shape: &GridShape) {
        self.model.update_collider(collider, shape);
        self.rebuild_marker();
    }

    fn collider_sdf(&self) -> &CellGrid {
        self.model.collider_sdf()
    }

    fn face_weights(&self) -> &FaceWeights {
        &self.weights
    }

    fn marker(&self) -> Option<&[CellMarker]> {
        Some(&self.marker)
    }

    /// Every blocked face is assigned outright, so there is nothing left for
    /// extrapolation to fill and `extrapolation_depth` is not used.
    fn constrain_velocity(
        &mut self,
        velocity: &mut FaceGrid,
        collider: Option<&dyn Collider>,
        _extrapolation_depth: usize,
    ) {
        if !self.model.is_current_for(velocity) {
            self.update_collider(collider, velocity.shape());
        }
        self.model.bind_version(velocity);

        let shape = *velocity.shape();
        for axis in Axis::ALL {
            let a = axis.index();
            let weights = self.weights.component(axis);
            velocity.par_update_faces(axis, |coords, pos, value| {
                let idx = shape.face_index(axis, coords[0], coords[1], coords[2]);
                if weights[idx] > 0.0 {
                    value
                } else {
                    collider_velocity(collider, pos)[a]
                }
            });
        }

        self.domain.apply(velocity);
    }

    fn domain_boundary(&self) -> DomainBoundary {
        self.domain
    }

    fn set_domain_boundary(&mut self, boundary: DomainBoundary) {
        self.domain = boundary;
    }

    fn is_current_for(&self, grid: &FaceGrid) -> bool {
        self.model.is_current_for(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collider::BoxCollider;
    use glam::{Vec2, Vec3};

    #[test]
    fn test_marker_thresholds_cell_centers() {
        let grid = FaceGrid::planar(4, 2, Vec2::ONE, Vec2::ZERO, Vec2::ZERO).unwrap();
        // Covers the centers x = 2.5 and 3.5
        let solid = BoxCollider::new(Vec3::new(2.2, -1.0, -1.0), Vec3::new(5.0, 5.0, 2.0));
        let mut solver = BlockedBoundarySolver::new();
        solver.update_collider(Some(&solid), grid.shape());

        assert_eq!(solver.marker_at(1, 0, 0), CellMarker::Fluid);
        assert_eq!(solver.marker_at(2, 1, 0), CellMarker::Collider);
        assert_eq!(solver.marker().map(|m| m.len()), Some(8));

        // Face between a fluid and a collider cell is blocked, not fractional
        assert_eq!(solver.face_weights().weight(Axis::X, 2, 0, 0), 0.0);
        assert_eq!(solver.face_weights().weight(Axis::X, 1, 0, 0), 1.0);
        assert_eq!(solver.face_weights().weight(Axis::Y, 1, 1, 0), 1.0);
        assert_eq!(solver.face_weights().weight(Axis::Y, 3, 1, 0), 0.0);
    }

    #[test]
    fn test_faces_touching_collider_take_its_velocity() {
        let mut grid = FaceGrid::planar(4, 2, Vec2::ONE, Vec2::ZERO, Vec2::new(1.0, 1.0)).unwrap();
        let solid = BoxCollider::new(Vec3::new(2.2, -1.0, -1.0), Vec3::new(5.0, 5.0, 2.0))
            .with_velocity(Vec3::new(0.25, -0.75, 0.0));
        let mut solver = BlockedBoundarySolver::new();
        solver.set_domain_boundary(DomainBoundary::open());
        solver.constrain_velocity(&mut grid, Some(&solid), 2);

        assert_eq!(grid.face(Axis::X, 1, 0, 0), 1.0);
        assert_eq!(grid.face(Axis::X, 2, 0, 0), 0.25);
        assert_eq!(grid.face(Axis::X, 4, 1, 0), 0.25);
        assert_eq!(grid.face(Axis::Y, 0, 1, 0), 1.0);
        assert_eq!(grid.face(Axis::Y, 3, 1, 0), -0.75);
    }
}
