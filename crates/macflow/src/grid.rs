//! Face-centered (MAC / staggered) vector grid.
//!
//! Velocity components are stored on cell faces:
//! - u (X-component) on YZ faces at x = origin.x + i * dx
//! - v (Y-component) on XZ faces at y = origin.y + j * dy
//! - w (Z-component) on XY faces at z = origin.z + k * dz
//!
//! A planar problem is a grid with a single cell layer along z.

use crate::error::GridError;
use crate::interp;
use glam::{Vec2, Vec3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SHAPE_VERSION: AtomicU64 = AtomicU64::new(1);

/// Fresh, process-unique shape stamp.
fn next_shape_version() -> u64 {
    NEXT_SHAPE_VERSION.fetch_add(1, Ordering::Relaxed)
}

/// Coordinate axis; also names the velocity component stored normal to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    #[inline]
    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }

    /// The two axes spanning a face whose normal is `self`.
    #[inline]
    pub fn tangents(self) -> (Axis, Axis) {
        match self {
            Axis::X => (Axis::Y, Axis::Z),
            Axis::Y => (Axis::X, Axis::Z),
            Axis::Z => (Axis::X, Axis::Y),
        }
    }
}

/// Resolution, spacing and origin of a grid.
///
/// Everything keyed to a grid (collider SDF, face weights, pressure) carries
/// one of these so it can be checked against the grid it is used with.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridShape {
    /// Number of cells along x, y, z
    pub resolution: [usize; 3],
    /// Cell size along each axis
    pub spacing: Vec3,
    /// Lower corner of the grid bounding box
    pub origin: Vec3,
}

impl Default for GridShape {
    /// A single unit cell at the origin.
    fn default() -> Self {
        Self {
            resolution: [1, 1, 1],
            spacing: Vec3::ONE,
            origin: Vec3::ZERO,
        }
    }
}

impl GridShape {
    pub fn new(resolution: [usize; 3], spacing: Vec3, origin: Vec3) -> Result<Self, GridError> {
        if resolution.iter().any(|&n| n == 0) {
            return Err(GridError::InvalidResolution(resolution));
        }
        if spacing.cmple(Vec3::ZERO).any() || !spacing.is_finite() {
            return Err(GridError::InvalidSpacing(spacing.to_array()));
        }
        Ok(Self {
            resolution,
            spacing,
            origin,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.resolution[0]
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.resolution[1]
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.resolution[2]
    }

    /// True for grids with a single cell layer along z.
    #[inline]
    pub fn is_planar(&self) -> bool {
        self.resolution[2] == 1
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.resolution.iter().product()
    }

    // ========== Cell-centered data ==========

    #[inline]
    pub fn cell_index(&self, i: usize, j: usize, k: usize) -> usize {
        interp::linear_index(self.resolution, i, j, k)
    }

    #[inline]
    pub fn cell_coords(&self, idx: usize) -> [usize; 3] {
        interp::unravel(self.resolution, idx)
    }

    /// World position of the center of cell (i, j, k).
    #[inline]
    pub fn cell_center(&self, i: usize, j: usize, k: usize) -> Vec3 {
        self.origin + (Vec3::new(i as f32, j as f32, k as f32) + 0.5) * self.spacing
    }

    /// World position of the cell-centered sample (0, 0, 0).
    #[inline]
    pub fn cell_origin(&self) -> Vec3 {
        self.origin + 0.5 * self.spacing
    }

    // ========== Face-centered data ==========

    /// Array size of the component normal to `axis`: one extra sample along `axis`.
    #[inline]
    pub fn face_size(&self, axis: Axis) -> [usize; 3] {
        let mut size = self.resolution;
        size[axis.index()] += 1;
        size
    }

    #[inline]
    pub fn face_count(&self, axis: Axis) -> usize {
        self.face_size(axis).iter().product()
    }

    #[inline]
    pub fn face_index(&self, axis: Axis, i: usize, j: usize, k: usize) -> usize {
        interp::linear_index(self.face_size(axis), i, j, k)
    }

    #[inline]
    pub fn face_coords(&self, axis: Axis, idx: usize) -> [usize; 3] {
        interp::unravel(self.face_size(axis), idx)
    }

    /// Position of face sample (0, 0, 0) for the component normal to `axis`.
    ///
    /// Differs from `origin`: faces sit on the lower boundary along `axis`
    /// and half a cell in along the other two.
    #[inline]
    pub fn face_origin(&self, axis: Axis) -> Vec3 {
        self.cell_origin() - 0.5 * self.spacing * axis.unit()
    }

    #[inline]
    pub fn face_position(&self, axis: Axis, i: usize, j: usize, k: usize) -> Vec3 {
        self.face_origin(axis) + Vec3::new(i as f32, j as f32, k as f32) * self.spacing
    }

    /// True if the face lies on the domain boundary (it has only one adjacent cell).
    #[inline]
    pub fn is_boundary_face(&self, axis: Axis, coords: [usize; 3]) -> bool {
        let a = axis.index();
        coords[a] == 0 || coords[a] == self.resolution[a]
    }
}

/// Staggered vector grid.
///
/// Deserialized payloads are checked: a shape that fails [`GridShape::new`]
/// or arrays that do not fit it are rejected with a [`GridError`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "FaceGridData")]
pub struct FaceGrid {
    shape: GridShape,

    /// Changes on every construct/resize; shared by clones.
    #[serde(skip)]
    shape_version: u64,

    /// U (X-component) on YZ faces. Size: (width+1) * height * depth
    u: Vec<f32>,
    /// V (Y-component) on XZ faces. Size: width * (height+1) * depth
    v: Vec<f32>,
    /// W (Z-component) on XY faces. Size: width * height * (depth+1)
    w: Vec<f32>,
}

/// Serialized form of a [`FaceGrid`], checked on conversion.
#[derive(Deserialize)]
struct FaceGridData {
    shape: GridShape,
    u: Vec<f32>,
    v: Vec<f32>,
    w: Vec<f32>,
}

impl TryFrom<FaceGridData> for FaceGrid {
    type Error = GridError;

    fn try_from(data: FaceGridData) -> Result<Self, GridError> {
        let shape = GridShape::new(data.shape.resolution, data.shape.spacing, data.shape.origin)?;
        for (axis, found) in [(Axis::X, data.u.len()), (Axis::Y, data.v.len()), (Axis::Z, data.w.len())] {
            let expected = shape.face_count(axis);
            if found != expected {
                return Err(GridError::ComponentLength { axis, expected, found });
            }
        }
        Ok(Self {
            shape,
            shape_version: next_shape_version(),
            u: data.u,
            v: data.v,
            w: data.w,
        })
    }
}

impl FaceGrid {
    /// Create a grid with every face set to the matching component of `initial`.
    pub fn new(
        resolution: [usize; 3],
        spacing: Vec3,
        origin: Vec3,
        initial: Vec3,
    ) -> Result<Self, GridError> {
        let shape = GridShape::new(resolution, spacing, origin)?;
        Ok(Self::from_shape(shape, initial))
    }

    /// Create a single-layer grid for a planar problem.
    ///
    /// The z spacing matches the x spacing; w is initialised to zero.
    pub fn planar(
        width: usize,
        height: usize,
        spacing: Vec2,
        origin: Vec2,
        initial: Vec2,
    ) -> Result<Self, GridError> {
        Self::new(
            [width, height, 1],
            spacing.extend(spacing.x),
            origin.extend(0.0),
            initial.extend(0.0),
        )
    }

    pub fn from_shape(shape: GridShape, initial: Vec3) -> Self {
        Self {
            shape,
            shape_version: next_shape_version(),
            u: vec![initial.x; shape.face_count(Axis::X)],
            v: vec![initial.y; shape.face_count(Axis::Y)],
            w: vec![initial.z; shape.face_count(Axis::Z)],
        }
    }

    /// Reinitialise every array for a new shape. Invalidates anything keyed
    /// to the previous shape version.
    pub fn resize(
        &mut self,
        resolution: [usize; 3],
        spacing: Vec3,
        origin: Vec3,
        initial: Vec3,
    ) -> Result<(), GridError> {
        let shape = GridShape::new(resolution, spacing, origin)?;
        *self = Self::from_shape(shape, initial);
        Ok(())
    }

    /// Become a copy of `other`, shape and shape version included.
    pub fn set(&mut self, other: &FaceGrid) {
        self.clone_from(other);
    }

    // ========== Metadata ==========

    #[inline]
    pub fn shape(&self) -> &GridShape {
        &self.shape
    }

    #[inline]
    pub fn shape_version(&self) -> u64 {
        self.shape_version
    }

    #[inline]
    pub fn resolution(&self) -> [usize; 3] {
        self.shape.resolution
    }

    #[inline]
    pub fn spacing(&self) -> Vec3 {
        self.shape.spacing
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.shape.origin
    }

    // ========== Field accessors ==========

    pub fn u(&self) -> &[f32] {
        &self.u
    }

    pub fn u_mut(&mut self) -> &mut [f32] {
        &mut self.u
    }

    pub fn v(&self) -> &[f32] {
        &self.v
    }

    pub fn v_mut(&mut self) -> &mut [f32] {
        &mut self.v
    }

    pub fn w(&self) -> &[f32] {
        &self.w
    }

    pub fn w_mut(&mut self) -> &mut [f32] {
        &mut self.w
    }

    /// Component array normal to `axis`.
    #[inline]
    pub fn component(&self, axis: Axis) -> &[f32] {
        match axis {
            Axis::X => &self.u,
            Axis::Y => &self.v,
            Axis::Z => &self.w,
        }
    }

    #[inline]
    pub fn component_mut(&mut self, axis: Axis) -> &mut [f32] {
        match axis {
            Axis::X => &mut self.u,
            Axis::Y => &mut self.v,
            Axis::Z => &mut self.w,
        }
    }

    /// Face value of the component normal to `axis` at face (i, j, k).
    #[inline]
    pub fn face(&self, axis: Axis, i: usize, j: usize, k: usize) -> f32 {
        self.component(axis)[self.shape.face_index(axis, i, j, k)]
    }

    #[inline]
    pub fn face_mut(&mut self, axis: Axis, i: usize, j: usize, k: usize) -> &mut f32 {
        let idx = self.shape.face_index(axis, i, j, k);
        &mut self.component_mut(axis)[idx]
    }

    // ========== Sampling and derivatives ==========

    /// Trilinearly interpolated velocity at a world position.
    ///
    /// Each component is interpolated on its own offset lattice; positions
    /// outside the domain clamp to the nearest interpolation cell.
    pub fn sample(&self, pos: Vec3) -> Vec3 {
        let shape = &self.shape;
        let component = |axis: Axis| {
            interp::sample(
                self.component(axis),
                shape.face_size(axis),
                shape.face_origin(axis),
                shape.spacing,
                pos,
            )
        };
        Vec3::new(component(Axis::X), component(Axis::Y), component(Axis::Z))
    }

    /// Velocity at the center of cell (i, j, k): average of the two opposing faces.
    pub fn value_at_cell_center(&self, i: usize, j: usize, k: usize) -> Vec3 {
        Vec3::new(
            0.5 * (self.face(Axis::X, i, j, k) + self.face(Axis::X, i + 1, j, k)),
            0.5 * (self.face(Axis::Y, i, j, k) + self.face(Axis::Y, i, j + 1, k)),
            0.5 * (self.face(Axis::Z, i, j, k) + self.face(Axis::Z, i, j, k + 1)),
        )
    }

    /// div(v) = du/dx + dv/dy + dw/dz at cell (i, j, k), from the six bounding faces.
    pub fn divergence_at(&self, i: usize, j: usize, k: usize) -> f32 {
        let h = self.shape.spacing;
        (self.face(Axis::X, i + 1, j, k) - self.face(Axis::X, i, j, k)) / h.x
            + (self.face(Axis::Y, i, j + 1, k) - self.face(Axis::Y, i, j, k)) / h.y
            + (self.face(Axis::Z, i, j, k + 1) - self.face(Axis::Z, i, j, k)) / h.z
    }

    /// Curl at cell (i, j, k) from central differences of neighboring cell-center
    /// velocities (one-sided neighbors clamp to the cell itself at the domain edge).
    ///
    /// On planar grids only the z component is meaningful.
    pub fn curl_at(&self, i: usize, j: usize, k: usize) -> Vec3 {
        let [nx, ny, nz] = self.shape.resolution;
        let h = self.shape.spacing;

        let left = self.value_at_cell_center(i.saturating_sub(1), j, k);
        let right = self.value_at_cell_center((i + 1).min(nx - 1), j, k);
        let down = self.value_at_cell_center(i, j.saturating_sub(1), k);
        let up = self.value_at_cell_center(i, (j + 1).min(ny - 1), k);
        let back = self.value_at_cell_center(i, j, k.saturating_sub(1));
        let front = self.value_at_cell_center(i, j, (k + 1).min(nz - 1));

        Vec3::new(
            0.5 * (up.z - down.z) / h.y - 0.5 * (front.y - back.y) / h.z,
            0.5 * (front.x - back.x) / h.z - 0.5 * (right.z - left.z) / h.x,
            0.5 * (right.y - left.y) / h.x - 0.5 * (up.x - down.x) / h.y,
        )
    }

    /// Divergence at a world position, interpolated from the cell-center values.
    pub fn divergence(&self, pos: Vec3) -> f32 {
        let shape = &self.shape;
        interp::trilinear_weights(shape.resolution, shape.cell_origin(), shape.spacing, pos)
            .into_iter()
            .filter(|&(_, w)| w > 0.0)
            .map(|([i, j, k], w)| w * self.divergence_at(i, j, k))
            .sum()
    }

    /// Curl at a world position, interpolated from the cell-center values.
    pub fn curl(&self, pos: Vec3) -> Vec3 {
        let shape = &self.shape;
        interp::trilinear_weights(shape.resolution, shape.cell_origin(), shape.spacing, pos)
            .into_iter()
            .filter(|&(_, w)| w > 0.0)
            .map(|([i, j, k], w)| w * self.curl_at(i, j, k))
            .sum()
    }

    /// Largest |div(v)| over all cells.
    pub fn max_abs_divergence(&self) -> f32 {
        (0..self.shape.cell_count())
            .into_par_iter()
            .map(|idx| {
                let [i, j, k] = self.shape.cell_coords(idx);
                self.divergence_at(i, j, k).abs()
            })
            .reduce(|| 0.0, f32::max)
    }

    // ========== Fill and iteration ==========

    pub fn fill(&mut self, value: Vec3) {
        self.u.fill(value.x);
        self.v.fill(value.y);
        self.w.fill(value.z);
    }

    /// Set every face from a position-dependent function (evaluated in parallel).
    pub fn fill_with<F>(&mut self, f: F)
    where
        F: Fn(Vec3) -> Vec3 + Sync,
    {
        for axis in Axis::ALL {
            let a = axis.index();
            self.par_update_faces(axis, |_, pos, _| f(pos)[a]);
        }
    }

    /// Serial iteration over the face index space of `axis`, i fastest, k last.
    pub fn for_each_face_index<F>(&self, axis: Axis, mut f: F)
    where
        F: FnMut(usize, usize, usize),
    {
        let [ni, nj, nk] = self.shape.face_size(axis);
        for k in 0..nk {
            for j in 0..nj {
                for i in 0..ni {
                    f(i, j, k);
                }
            }
        }
    }

    /// Parallel iteration over the face index space of `axis`. No ordering guarantee.
    pub fn par_for_each_face_index<F>(&self, axis: Axis, f: F)
    where
        F: Fn(usize, usize, usize) + Sync + Send,
    {
        let shape = self.shape;
        (0..shape.face_count(axis)).into_par_iter().for_each(|idx| {
            let [i, j, k] = shape.face_coords(axis, idx);
            f(i, j, k);
        });
    }

    /// Parallel in-place update: each face of `axis` is replaced by
    /// `f(coords, position, current_value)`. Each task writes only its own face.
    pub fn par_update_faces<F>(&mut self, axis: Axis, f: F)
    where
        F: Fn([usize; 3], Vec3, f32) -> f32 + Sync + Send,
    {
        let shape = self.shape;
        self.component_mut(axis)
            .par_iter_mut()
            .enumerate()
            .for_each(|(idx, value)| {
                let coords = shape.face_coords(axis, idx);
                let pos = shape.face_position(axis, coords[0], coords[1], coords[2]);
                *value = f(coords, pos, *value);
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_sizes() {
        let grid = FaceGrid::new([4, 5, 6], Vec3::ONE, Vec3::ZERO, Vec3::ZERO).unwrap();
        // U faces: (4+1) * 5 * 6
        assert_eq!(grid.u().len(), 5 * 5 * 6);
        // V faces: 4 * (5+1) * 6
        assert_eq!(grid.v().len(), 4 * 6 * 6);
        // W faces: 4 * 5 * (6+1)
        assert_eq!(grid.w().len(), 4 * 5 * 7);
    }

    #[test]
    fn test_face_positions() {
        let grid =
            FaceGrid::new([4, 4, 4], Vec3::splat(0.5), Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO)
                .unwrap();
        let shape = grid.shape();
        assert_eq!(shape.face_position(Axis::X, 0, 0, 0), Vec3::new(1.0, 0.25, 0.25));
        assert_eq!(shape.face_position(Axis::Y, 1, 0, 0), Vec3::new(1.75, 0.0, 0.25));
        assert_eq!(shape.face_position(Axis::Z, 0, 0, 2), Vec3::new(1.25, 0.25, 1.0));
        assert_eq!(shape.cell_center(0, 0, 0), Vec3::new(1.25, 0.25, 0.25));
    }

    #[test]
    fn test_invalid_configuration_rejected() {
        assert_eq!(
            FaceGrid::new([0, 4, 4], Vec3::ONE, Vec3::ZERO, Vec3::ZERO).unwrap_err(),
            GridError::InvalidResolution([0, 4, 4])
        );
        assert!(matches!(
            FaceGrid::planar(4, 4, Vec2::new(1.0, -0.1), Vec2::ZERO, Vec2::ZERO),
            Err(GridError::InvalidSpacing(_))
        ));
        assert!(matches!(
            FaceGrid::new([4, 4, 4], Vec3::new(1.0, f32::NAN, 1.0), Vec3::ZERO, Vec3::ZERO),
            Err(GridError::InvalidSpacing(_))
        ));
    }

    #[test]
    fn test_resize_bumps_shape_version() {
        let mut grid = FaceGrid::planar(4, 4, Vec2::ONE, Vec2::ZERO, Vec2::X).unwrap();
        let before = grid.shape_version();
        let clone = grid.clone();
        assert_eq!(clone.shape_version(), before);

        grid.resize([8, 8, 1], Vec3::ONE, Vec3::ZERO, Vec3::ZERO).unwrap();
        assert_ne!(grid.shape_version(), before);
        assert_eq!(grid.u().len(), 9 * 8);
        assert!(grid.u().iter().all(|&u| u == 0.0));

        // A rejected resize leaves the grid untouched
        let version = grid.shape_version();
        assert!(grid.resize([8, 0, 1], Vec3::ONE, Vec3::ZERO, Vec3::ZERO).is_err());
        assert_eq!(grid.shape_version(), version);
        assert_eq!(grid.resolution(), [8, 8, 1]);
    }

    #[test]
    fn test_sample_linear_field_is_exact() {
        let mut grid = FaceGrid::new([6, 6, 6], Vec3::ONE, Vec3::ZERO, Vec3::ZERO).unwrap();
        grid.fill_with(|p| Vec3::new(p.y, 2.0 * p.x, p.x + p.z));

        let pos = Vec3::new(2.3, 3.1, 1.7);
        let sampled = grid.sample(pos);
        let expected = Vec3::new(pos.y, 2.0 * pos.x, pos.x + pos.z);
        assert!((sampled - expected).length() < 1e-4, "sampled {:?}, expected {:?}", sampled, expected);
    }

    #[test]
    fn test_sample_clamps_outside_domain() {
        let grid = FaceGrid::planar(4, 4, Vec2::ONE, Vec2::ZERO, Vec2::new(1.0, -2.0)).unwrap();
        let far = grid.sample(Vec3::new(-100.0, 50.0, 3.0));
        assert_eq!(far, Vec3::new(1.0, -2.0, 0.0));
    }

    #[test]
    fn test_divergence_of_linear_field() {
        let mut grid = FaceGrid::new([4, 4, 4], Vec3::splat(0.5), Vec3::ZERO, Vec3::ZERO).unwrap();
        // div = 1 + 2 + 3
        grid.fill_with(|p| Vec3::new(p.x, 2.0 * p.y, 3.0 * p.z));
        for (i, j, k) in [(0, 0, 0), (1, 2, 3), (3, 3, 3)] {
            let div = grid.divergence_at(i, j, k);
            assert!((div - 6.0).abs() < 1e-4, "div at ({i},{j},{k}) = {}", div);
        }
    }

    #[test]
    fn test_curl_of_rigid_rotation() {
        // u = -y, v = x has curl (0, 0, 2)
        let mut grid = FaceGrid::planar(6, 6, Vec2::ONE, Vec2::ZERO, Vec2::ZERO).unwrap();
        grid.fill_with(|p| Vec3::new(-p.y, p.x, 0.0));
        let curl = grid.curl_at(2, 3, 0);
        assert!((curl - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-5, "curl = {:?}", curl);
        assert!(grid.divergence_at(2, 3, 0).abs() < 1e-6);
    }

    #[test]
    fn test_divergence_and_curl_at_position() {
        let mut grid = FaceGrid::new([5, 5, 5], Vec3::splat(0.5), Vec3::ZERO, Vec3::ZERO).unwrap();
        grid.fill_with(|p| Vec3::new(p.x - p.y, p.x + 2.0 * p.y, 3.0 * p.z));

        // Interior point, all eight surrounding cells away from the walls
        let pos = Vec3::new(1.1, 1.35, 1.2);
        let div = grid.divergence(pos);
        assert!((div - 6.0).abs() < 1e-4, "divergence {}", div);

        // dv/dx - du/dy = 1 - (-1)
        let curl = grid.curl(pos);
        assert!((curl - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-4, "curl {:?}", curl);

        // On a cell center the interpolated value is the cell value
        let center = grid.shape().cell_center(2, 3, 1);
        assert!((grid.curl(center) - grid.curl_at(2, 3, 1)).length() < 1e-6);
    }

    #[test]
    fn test_deserialize_checks_array_lengths() {
        let mut grid = FaceGrid::planar(3, 2, Vec2::ONE, Vec2::ZERO, Vec2::ZERO).unwrap();
        grid.fill_with(|p| Vec3::new(p.x, p.y, 0.0));
        let json = serde_json::to_string(&grid).unwrap();
        let parsed: FaceGrid = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.shape(), grid.shape());
        assert_eq!(parsed.u(), grid.u());
        assert_ne!(parsed.shape_version(), grid.shape_version());

        // Drop one u sample
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["u"].as_array_mut().unwrap().pop();
        let err = serde_json::from_value::<FaceGrid>(value).unwrap_err();
        assert!(err.to_string().contains("X component holds 7 samples"), "{}", err);

        // Zero resolution
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["shape"]["resolution"][0] = serde_json::json!(0);
        assert!(serde_json::from_value::<FaceGrid>(value).is_err());
    }

    #[test]
    fn test_face_accessors() {
        let mut grid = FaceGrid::new([3, 3, 3], Vec3::ONE, Vec3::ZERO, Vec3::ZERO).unwrap();
        *grid.face_mut(Axis::Y, 1, 3, 2) = 4.5;
        assert_eq!(grid.face(Axis::Y, 1, 3, 2), 4.5);
        let idx = grid.shape().face_index(Axis::Y, 1, 3, 2);
        assert_eq!(grid.v()[idx], 4.5);
        assert_eq!(grid.shape().face_coords(Axis::Y, idx), [1, 3, 2]);
    }

    #[test]
    fn test_serial_iteration_order_is_i_first() {
        let grid = FaceGrid::planar(2, 2, Vec2::ONE, Vec2::ZERO, Vec2::ZERO).unwrap();
        let mut visited = Vec::new();
        grid.for_each_face_index(Axis::X, |i, j, k| visited.push((i, j, k)));
        assert_eq!(
            visited,
            vec![(0, 0, 0), (1, 0, 0), (2, 0, 0), (0, 1, 0), (1, 1, 0), (2, 1, 0)]
        );
    }

    #[test]
    fn test_parallel_iteration_visits_every_face_once() {
        use std::sync::atomic::AtomicUsize;

        let grid = FaceGrid::new([5, 4, 3], Vec3::ONE, Vec3::ZERO, Vec3::ZERO).unwrap();
        let count = AtomicUsize::new(0);
        let sum = AtomicUsize::new(0);
        grid.par_for_each_face_index(Axis::Z, |i, j, k| {
            count.fetch_add(1, Ordering::Relaxed);
            sum.fetch_add(grid.shape().face_index(Axis::Z, i, j, k), Ordering::Relaxed);
        });
        let n = grid.shape().face_count(Axis::Z);
        assert_eq!(count.into_inner(), n);
        assert_eq!(sum.into_inner(), n * (n - 1) / 2);
    }
}
