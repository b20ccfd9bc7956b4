use super::{collider_velocity, BoundaryConditionSolver, BoundaryKind, ColliderBoundaryModel, DomainBoundary};
use crate::collider::Collider;
use crate::extrapolation::extrapolate_to_region;
use crate::field::CellGrid;
use crate::grid::{Axis, FaceGrid, GridShape};
use crate::weights::FaceWeights;

/// Below this squared gradient length the SDF gives no usable normal.
const MIN_NORMAL_LENGTH_SQ: f32 = 1e-12;

/// Boundary solver using sub-cell open fractions of every face.
///
/// Constraint runs in three passes over the velocity grid:
/// 1. faces that are not fully open take the collider velocity
/// 2. fully open faces are extrapolated up to `extrapolation_depth` layers
///    into the rest
/// 3. every face that is not fully open has its normal component (along the
///    SDF gradient) replaced by the collider's, tangential part kept; where
///    the SDF is flat the face takes the collider velocity outright
#[derive(Clone, Debug)]
pub struct FractionalBoundarySolver {
    model: ColliderBoundaryModel,
    weights: FaceWeights,
    domain: DomainBoundary,
}

impl Default for FractionalBoundarySolver {
    fn default() -> Self {
        Self::new()
    }
}

impl FractionalBoundarySolver {
    pub fn new() -> Self {
        let model = ColliderBoundaryModel::new();
        let weights = FaceWeights::open(*model.shape());
        Self {
            model,
            weights,
            domain: DomainBoundary::default(),
        }
    }

    /// Open fraction of every face against the cached SDF.
    ///
    /// Pure: depends only on the cached SDF and its grid shape.
    pub fn build_weights(&self) -> FaceWeights {
        let sdf = self.model.collider_sdf();
        FaceWeights::from_sdf(*sdf.shape(), sdf)
    }

    pub fn model(&self) -> &ColliderBoundaryModel {
        &self.model
    }

    fn refresh(&mut self, velocity: &FaceGrid, collider: Option<&dyn Collider>) {
        if !self.model.is_current_for(velocity) {
            self.update_collider(collider, velocity.shape());
        }
        self.model.bind_version(velocity);
    }
}

impl BoundaryConditionSolver for FractionalBoundarySolver {
    fn kind(&self) -> BoundaryKind {
        BoundaryKind::Fractional
    }

    fn update_collider(&mut self, collider: Option<&dyn Collider>, shape: &GridShape) {
        self.model.update_collider(collider, shape);
        self.weights = self.build_weights();
    }

    fn collider_sdf(&self) -> &CellGrid {
        self.model.collider_sdf()
    }

    fn face_weights(&self) -> &FaceWeights {
        &self.weights
    }

    fn constrain_velocity(
        &mut self,
        velocity: &mut FaceGrid,
        collider: Option<&dyn Collider>,
        extrapolation_depth: usize,
    ) {
        self.refresh(velocity, collider);
        let shape = *velocity.shape();

        for axis in Axis::ALL {
            let a = axis.index();
            let weights = self.weights.component(axis);

            velocity.par_update_faces(axis, |coords, pos, value| {
                let idx = shape.face_index(axis, coords[0], coords[1], coords[2]);
                if weights[idx] >= 1.0 {
                    value
                } else {
                    collider_velocity(collider, pos)[a]
                }
            });

            let known: Vec<bool> = weights.iter().map(|&w| w >= 1.0).collect();
            extrapolate_to_region(
                velocity.component_mut(axis),
                &known,
                shape.face_size(axis),
                extrapolation_depth,
            );
        }

        // Normals and neighboring components are read from the extrapolated
        // field as it was before any projection write
        let snapshot = velocity.clone();
        let sdf = self.model.collider_sdf();
        for axis in Axis::ALL {
            let a = axis.index();
            let weights = self.weights.component(axis);

            velocity.par_update_faces(axis, |coords, pos, value| {
                let idx = shape.face_index(axis, coords[0], coords[1], coords[2]);
                if weights[idx] >= 1.0 {
                    return value;
                }

                let solid = collider_velocity(collider, pos);
                let gradient = sdf.gradient(pos);
                if gradient.length_squared() <= MIN_NORMAL_LENGTH_SQ {
                    // Flat SDF (deep inside a solid): no normal to slip along
                    return match collider {
                        Some(_) => solid[a],
                        None => value,
                    };
                }
                let normal = gradient.normalize();

                let mut fluid = snapshot.sample(pos);
                fluid[a] = value;
                let projected = fluid - fluid.dot(normal) * normal + solid.dot(normal) * normal;
                projected[a]
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
