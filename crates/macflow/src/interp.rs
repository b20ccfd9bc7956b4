//! Trilinear interpolation over flat row-major arrays.
//!
//! Shared by the face-centered velocity grid (one call per component, each
//! with its own data origin) and the cell-centered scalar grid.

use glam::Vec3;

/// Row-major linear index, x fastest.
#[inline]
pub(crate) fn linear_index(size: [usize; 3], i: usize, j: usize, k: usize) -> usize {
    (k * size[1] + j) * size[0] + i
}

/// Inverse of [`linear_index`].
#[inline]
pub(crate) fn unravel(size: [usize; 3], idx: usize) -> [usize; 3] {
    let i = idx % size[0];
    let j = (idx / size[0]) % size[1];
    let k = idx / (size[0] * size[1]);
    [i, j, k]
}

/// Lower/upper sample and blend factor along one axis.
///
/// Positions outside the data range are clamped to the nearest valid
/// interpolation cell. An axis with a single sample always resolves to it.
#[derive(Clone, Copy, Debug)]
struct AxisStencil {
    i0: usize,
    i1: usize,
    t: f32,
}

#[inline]
fn stencil(x: f32, n: usize) -> AxisStencil {
    if n <= 1 {
        return AxisStencil { i0: 0, i1: 0, t: 0.0 };
    }
    let i0 = (x.floor() as i64).clamp(0, n as i64 - 2) as usize;
    let t = (x - i0 as f32).clamp(0.0, 1.0);
    AxisStencil { i0, i1: i0 + 1, t }
}

/// The eight samples and stencils around a continuous position.
struct Cell {
    sx: AxisStencil,
    sy: AxisStencil,
    sz: AxisStencil,
    /// corners[dk][dj][di]
    corners: [[[f32; 2]; 2]; 2],
}

fn gather(data: &[f32], size: [usize; 3], data_origin: Vec3, spacing: Vec3, pos: Vec3) -> Cell {
    let local = (pos - data_origin) / spacing;
    let sx = stencil(local.x, size[0]);
    let sy = stencil(local.y, size[1]);
    let sz = stencil(local.z, size[2]);

    let mut corners = [[[0.0f32; 2]; 2]; 2];
    for (dk, k) in [sz.i0, sz.i1].into_iter().enumerate() {
        for (dj, j) in [sy.i0, sy.i1].into_iter().enumerate() {
            for (di, i) in [sx.i0, sx.i1].into_iter().enumerate() {
                corners[dk][dj][di] = data[linear_index(size, i, j, k)];
            }
        }
    }

    Cell { sx, sy, sz, corners }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Trilinearly interpolate `data` (sampled at `data_origin + index * spacing`).
pub(crate) fn sample(
    data: &[f32],
    size: [usize; 3],
    data_origin: Vec3,
    spacing: Vec3,
    pos: Vec3,
) -> f32 {
    let cell = gather(data, size, data_origin, spacing, pos);
    let c = &cell.corners;

    let c00 = lerp(c[0][0][0], c[0][0][1], cell.sx.t);
    let c10 = lerp(c[0][1][0], c[0][1][1], cell.sx.t);
    let c01 = lerp(c[1][0][0], c[1][0][1], cell.sx.t);
    let c11 = lerp(c[1][1][0], c[1][1][1], cell.sx.t);

    let c0 = lerp(c00, c10, cell.sy.t);
    let c1 = lerp(c01, c11, cell.sy.t);

    lerp(c0, c1, cell.sz.t)
}

/// The eight lattice points around `pos` with their trilinear weights.
///
/// Same clamping as [`sample`]; lets callers interpolate quantities that are
/// computed per lattice point rather than stored.
pub(crate) fn trilinear_weights(
    size: [usize; 3],
    data_origin: Vec3,
    spacing: Vec3,
    pos: Vec3,
) -> [([usize; 3], f32); 8] {
    let local = (pos - data_origin) / spacing;
    let sx = stencil(local.x, size[0]);
    let sy = stencil(local.y, size[1]);
    let sz = stencil(local.z, size[2]);

    let mut out = [([0; 3], 0.0); 8];
    let mut n = 0;
    for (k, wz) in [(sz.i0, 1.0 - sz.t), (sz.i1, sz.t)] {
        for (j, wy) in [(sy.i0, 1.0 - sy.t), (sy.i1, sy.t)] {
            for (i, wx) in [(sx.i0, 1.0 - sx.t), (sx.i1, sx.t)] {
                out[n] = ([i, j, k], wx * wy * wz);
                n += 1;
            }
        }
    }
    out
}

/// Gradient of the trilinear interpolant inside the (clamped) cell holding `pos`.
///
/// Axes with a single sample contribute zero. Outside the data range the
/// slope of the nearest cell is returned, so the boundary rows still yield a
/// usable direction.
pub(crate) fn gradient(
    data: &[f32],
    size: [usize; 3],
    data_origin: Vec3,
    spacing: Vec3,
    pos: Vec3,
) -> Vec3 {
    let cell = gather(data, size, data_origin, spacing, pos);
    let c = &cell.corners;
    let (tx, ty, tz) = (cell.sx.t, cell.sy.t, cell.sz.t);

    let mut grad = Vec3::ZERO;

    if size[0] > 1 {
        let d00 = c[0][0][1] - c[0][0][0];
        let d10 = c[0][1][1] - c[0][1][0];
        let d01 = c[1][0][1] - c[1][0][0];
        let d11 = c[1][1][1] - c[1][1][0];
        grad.x = lerp(lerp(d00, d10, ty), lerp(d01, d11, ty), tz) / spacing.x;
    }
    if size[1] > 1 {
        let d00 = c[0][1][0] - c[0][0][0];
        let d10 = c[0][1][1] - c[0][0][1];
        let d01 = c[1][1][0] - c[1][0][0];
        let d11 = c[1][1][1] - c[1][0][1];
        grad.y = lerp(lerp(d00, d10, tx), lerp(d01, d11, tx), tz) / spacing.y;
    }
    if size[2] > 1 {
        let d00 = c[1][0][0] - c[0][0][0];
        let d10 = c[1][0][1] - c[0][0][1];
        let d01 = c[1][1][0] - c[0][1][0];
        let d11 = c[1][1][1] - c[0][1][1];
        grad.z = lerp(lerp(d00, d10, tx), lerp(d01, d11, tx), ty) / spacing.z;
    }

    grad
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unravel_inverts_linear_index() {
        let size = [3, 4, 5];
        for k in 0..5 {
            for j in 0..4 {
                for i in 0..3 {
                    assert_eq!(unravel(size, linear_index(size, i, j, k)), [i, j, k]);
                }
            }
        }
    }

    #[test]
    fn test_sample_reproduces_linear_function() {
        // f = x + 2y - z on a 4x4x4 lattice with unit spacing
        let size = [4, 4, 4];
        let mut data = vec![0.0; 64];
        for k in 0..4 {
            for j in 0..4 {
                for i in 0..4 {
                    data[linear_index(size, i, j, k)] = i as f32 + 2.0 * j as f32 - k as f32;
                }
            }
        }

        let pos = Vec3::new(1.25, 2.5, 0.75);
        let value = sample(&data, size, Vec3::ZERO, Vec3::ONE, pos);
        assert!((value - (1.25 + 5.0 - 0.75)).abs() < 1e-5, "got {}", value);

        let grad = gradient(&data, size, Vec3::ZERO, Vec3::ONE, pos);
        assert!((grad - Vec3::new(1.0, 2.0, -1.0)).length() < 1e-5, "got {:?}", grad);
    }

    #[test]
    fn test_weights_sum_to_one() {
        let size = [4, 3, 1];
        let weights = trilinear_weights(size, Vec3::ZERO, Vec3::ONE, Vec3::new(1.25, 0.5, 7.0));
        let total: f32 = weights.iter().map(|&(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-6);
        // Single-sample z axis resolves to layer 0
        assert!(weights.iter().all(|&([_, _, k], _)| k == 0));
        let heaviest = weights.iter().fold(0.0f32, |m, &(_, w)| m.max(w));
        assert!((heaviest - 0.375).abs() < 1e-6);
    }

    #[test]
    fn test_sample_clamps_outside_range() {
        let size = [2, 1, 1];
        let data = vec![1.0, 3.0];
        assert_eq!(sample(&data, size, Vec3::ZERO, Vec3::ONE, Vec3::new(-5.0, 0.0, 0.0)), 1.0);
        assert_eq!(sample(&data, size, Vec3::ZERO, Vec3::ONE, Vec3::new(9.0, 7.0, -3.0)), 3.0);

        // Slope of the nearest cell survives clamping; single-sample axes are flat
        let grad = gradient(&data, size, Vec3::ZERO, Vec3::ONE, Vec3::new(9.0, 7.0, -3.0));
        assert_eq!(grad, Vec3::new(2.0, 0.0, 0.0));
    }
}
