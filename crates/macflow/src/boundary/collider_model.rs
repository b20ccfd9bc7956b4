use crate::collider::Collider;
use crate::field::{CellGrid, ConstantField, FAR_FIELD};
use crate::grid::{FaceGrid, GridShape};
use glam::Vec3;

/// Collider SDF cached at the cell centers of one grid shape.
///
/// `update_collider` is the only way the cached SDF changes. Until the first
/// update it describes a single open unit cell.
#[derive(Clone, Debug)]
pub struct ColliderBoundaryModel {
    sdf: CellGrid,
    /// Stamp of the grid the SDF was last checked against
    shape_version: Option<u64>,
    has_collider: bool,
}

impl Default for ColliderBoundaryModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ColliderBoundaryModel {
    pub fn new() -> Self {
        Self {
            sdf: CellGrid::new(GridShape::default(), FAR_FIELD),
            shape_version: None,
            has_collider: false,
        }
    }

    /// Resample `collider` at every cell center of `shape`.
    ///
    /// Must be called again whenever the resolution, spacing, origin or the
    /// collider itself changes. `None` fills the SDF with [`FAR_FIELD`].
    pub fn update_collider(&mut self, collider: Option<&dyn Collider>, shape: &GridShape) {
        match collider {
            Some(collider) => {
                let sdf = |p: Vec3| collider.signed_distance(p);
                self.sdf = CellGrid::from_field(*shape, &sdf);
            }
            None => self.sdf = CellGrid::from_field(*shape, &ConstantField::OUTSIDE),
        }
        self.has_collider = collider.is_some();
        self.shape_version = None;

        log::debug!(
            "Collider SDF rebuilt: {:?} cells, collider: {}",
            shape.resolution,
            self.has_collider
        );
    }

    #[inline]
    pub fn collider_sdf(&self) -> &CellGrid {
        &self.sdf
    }

    #[inline]
    pub fn shape(&self) -> &GridShape {
        self.sdf.shape()
    }

    /// Whether the last update was given a collider.
    #[inline]
    pub fn has_collider(&self) -> bool {
        self.has_collider
    }

    /// Stamp comparison first, shape comparison as fallback.
    pub fn is_current_for(&self, grid: &FaceGrid) -> bool {
        self.shape_version == Some(grid.shape_version()) || self.sdf.shape() == grid.shape()
    }

    /// Remember `grid`'s stamp once the SDF is known to match its shape.
    pub(crate) fn bind_version(&mut self, grid: &FaceGrid) {
        debug_assert!(self.sdf.shape() == grid.shape());
        self.shape_version = Some(grid.shape_version());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collider::SphereCollider;

    #[test]
    fn test_update_samples_cell_centers() {
        let shape = GridShape::new([4, 4, 4], Vec3::ONE, Vec3::ZERO).unwrap();
        let sphere = SphereCollider::new(Vec3::splat(2.0), 1.0);
        let mut model = ColliderBoundaryModel::new();
        model.update_collider(Some(&sphere), &shape);

        assert!(model.has_collider());
        assert_eq!(model.shape(), &shape);
        let expected = (Vec3::splat(1.5) - Vec3::splat(2.0)).length() - 1.0;
        assert!((model.collider_sdf().get(1, 1, 1) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_no_collider_is_far_field() {
        let shape = GridShape::new([2, 3, 1], Vec3::ONE, Vec3::ZERO).unwrap();
        let mut model = ColliderBoundaryModel::new();
        model.update_collider(None, &shape);
        assert!(!model.has_collider());
        assert!(model.collider_sdf().data().iter().all(|&d| d == FAR_FIELD));
    }

    #[test]
    fn test_resize_makes_model_stale() {
        let mut grid = FaceGrid::new([4, 4, 1], Vec3::ONE, Vec3::ZERO, Vec3::ZERO).unwrap();
        let mut model = ColliderBoundaryModel::new();
        model.update_collider(None, grid.shape());
        assert!(model.is_current_for(&grid));
        model.bind_version(&grid);

        grid.resize([8, 4, 1], Vec3::ONE, Vec3::ZERO, Vec3::ZERO).unwrap();
        assert!(!model.is_current_for(&grid));

        // Same shape under a fresh stamp still matches
        grid.resize([4, 4, 1], Vec3::ONE, Vec3::ZERO, Vec3::ZERO).unwrap();
        assert!(model.is_current_for(&grid));
    }
}
