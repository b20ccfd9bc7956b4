//! Scalar fields and the cell-centered scalar grid.

use crate::grid::GridShape;
use crate::interp;
use glam::Vec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Stand-in for an unbounded distance ("no surface anywhere").
///
/// Finite so that interpolation between two of them cannot overflow.
pub const FAR_FIELD: f32 = 1.0e20;

/// Anything that can be evaluated at a point in space.
pub trait ScalarField: Send + Sync {
    fn value_at(&self, point: Vec3) -> f32;
}

impl<F> ScalarField for F
where
    F: Fn(Vec3) -> f32 + Send + Sync,
{
    fn value_at(&self, point: Vec3) -> f32 {
        self(point)
    }
}

/// Same value everywhere.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstantField(pub f32);

impl ConstantField {
    /// SDF with no surface, everything outside (open / air).
    pub const OUTSIDE: ConstantField = ConstantField(FAR_FIELD);
    /// SDF with no surface, everything inside (fluid).
    pub const INSIDE: ConstantField = ConstantField(-FAR_FIELD);
}

impl ScalarField for ConstantField {
    fn value_at(&self, _point: Vec3) -> f32 {
        self.0
    }
}

/// Scalar grid sampled at cell centers (collider SDF, fluid SDF, pressure).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CellGrid {
    shape: GridShape,
    data: Vec<f32>,
}

impl CellGrid {
    pub fn new(shape: GridShape, initial: f32) -> Self {
        Self {
            shape,
            data: vec![initial; shape.cell_count()],
        }
    }

    /// Sample `field` at every cell center (in parallel).
    pub fn from_field(shape: GridShape, field: &dyn ScalarField) -> Self {
        let mut grid = Self::new(shape, 0.0);
        grid.fill_from(field);
        grid
    }

    /// Resample `field` at every cell center, keeping the current shape.
    pub fn fill_from(&mut self, field: &dyn ScalarField) {
        let shape = self.shape;
        self.data.par_iter_mut().enumerate().for_each(|(idx, value)| {
            let [i, j, k] = shape.cell_coords(idx);
            *value = field.value_at(shape.cell_center(i, j, k));
        });
    }

    #[inline]
    pub fn shape(&self) -> &GridShape {
        &self.shape
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize) -> f32 {
        self.data[self.shape.cell_index(i, j, k)]
    }

    /// Trilinear sample at a world position, clamped to the grid.
    pub fn sample(&self, pos: Vec3) -> f32 {
        interp::sample(
            &self.data,
            self.shape.resolution,
            self.shape.cell_origin(),
            self.shape.spacing,
            pos,
        )
    }

    /// Gradient of the trilinear interpolant at `pos`.
    pub fn gradient(&self, pos: Vec3) -> Vec3 {
        interp::gradient(
            &self.data,
            self.shape.resolution,
            self.shape.cell_origin(),
            self.shape.spacing,
            pos,
        )
    }
}

impl ScalarField for CellGrid {
    fn value_at(&self, point: Vec3) -> f32 {
        self.sample(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_field_samples_cell_centers() {
        let shape = GridShape::new([3, 2, 1], Vec3::ONE, Vec3::new(-1.0, 0.0, 0.0)).unwrap();
        let grid = CellGrid::from_field(shape, &|p: Vec3| p.x * 10.0 + p.y);
        assert_eq!(grid.get(0, 0, 0), -5.0 + 0.5);
        assert_eq!(grid.get(2, 1, 0), 15.0 + 1.5);
    }

    #[test]
    fn test_far_field_interpolation_stays_finite() {
        let shape = GridShape::new([4, 4, 4], Vec3::ONE, Vec3::ZERO).unwrap();
        let grid = CellGrid::from_field(shape, &ConstantField::OUTSIDE);
        let value = grid.sample(Vec3::new(1.3, 2.7, 0.1));
        assert!(value.is_finite());
        assert_eq!(grid.gradient(Vec3::splat(2.0)), Vec3::ZERO);
    }
}
