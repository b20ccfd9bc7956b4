//! Per-face open fractions.

use crate::field::ScalarField;
use crate::fraction::{open_fraction_face, open_fraction_segment};
use crate::grid::{Axis, GridShape};
use glam::Vec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// One weight per velocity face, same layout as the face grid components.
///
/// 0 = fully blocked, 1 = fully open.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceWeights {
    shape: GridShape,
    data: [Vec<f32>; 3],
}

impl FaceWeights {
    /// Every face fully open.
    pub fn open(shape: GridShape) -> Self {
        Self::uniform(shape, 1.0)
    }

    pub fn uniform(shape: GridShape, weight: f32) -> Self {
        Self {
            shape,
            data: Axis::ALL.map(|axis| vec![weight; shape.face_count(axis)]),
        }
    }

    /// Open fraction of every face with respect to `sdf` (open where sdf > 0).
    ///
    /// Samples the SDF at the corners bounding each face: two on planar grids
    /// for in-plane faces, four otherwise. Deterministic in `sdf` and `shape`.
    pub fn from_sdf(shape: GridShape, sdf: &dyn ScalarField) -> Self {
        let mut weights = Self::open(shape);
        for axis in Axis::ALL {
            weights.data[axis.index()]
                .par_iter_mut()
                .enumerate()
                .for_each(|(idx, weight)| {
                    let [i, j, k] = shape.face_coords(axis, idx);
                    let center = shape.face_position(axis, i, j, k);
                    *weight = face_open_fraction(&shape, axis, center, sdf);
                });
        }
        weights
    }

    /// Binary weights computed per face by `is_open(axis, coords)`.
    pub fn from_predicate<F>(shape: GridShape, is_open: F) -> Self
    where
        F: Fn(Axis, [usize; 3]) -> bool + Sync,
    {
        let mut weights = Self::open(shape);
        for axis in Axis::ALL {
            weights.data[axis.index()]
                .par_iter_mut()
                .enumerate()
                .for_each(|(idx, weight)| {
                    let coords = shape.face_coords(axis, idx);
                    *weight = if is_open(axis, coords) { 1.0 } else { 0.0 };
                });
        }
        weights
    }

    #[inline]
    pub fn shape(&self) -> &GridShape {
        &self.shape
    }

    #[inline]
    pub fn component(&self, axis: Axis) -> &[f32] {
        &self.data[axis.index()]
    }

    #[inline]
    pub fn weight(&self, axis: Axis, i: usize, j: usize, k: usize) -> f32 {
        self.data[axis.index()][self.shape.face_index(axis, i, j, k)]
    }

    /// Keep the smaller weight of each face (a face is only as open as its
    /// most restrictive boundary).
    pub fn intersect(&mut self, other: &FaceWeights) {
        debug_assert_eq!(self.shape.resolution, other.shape.resolution);
        for axis in Axis::ALL {
            let a = axis.index();
            self.data[a]
                .par_iter_mut()
                .zip(other.data[a].par_iter())
                .for_each(|(w, &o)| *w = w.min(o));
        }
    }
}

fn face_open_fraction(shape: &GridShape, axis: Axis, center: Vec3, sdf: &dyn ScalarField) -> f32 {
    let (t1, t2) = axis.tangents();
    let d1 = 0.5 * shape.spacing[t1.index()] * t1.unit();
    let d2 = 0.5 * shape.spacing[t2.index()] * t2.unit();

    // On planar grids x/y faces reduce to a segment along the in-plane tangent
    if shape.is_planar() && axis != Axis::Z {
        return open_fraction_segment(sdf.value_at(center - d1), sdf.value_at(center + d1));
    }

    open_fraction_face(
        sdf.value_at(center - d1 - d2),
        sdf.value_at(center + d1 - d2),
        sdf.value_at(center - d1 + d2),
        sdf.value_at(center + d1 + d2),
    )
}
