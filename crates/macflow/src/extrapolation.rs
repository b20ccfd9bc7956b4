//! Layered extrapolation of sampled values into unknown regions.
//!
//! Each layer assigns every unknown sample that has at least one known
//! axis neighbor the average of those neighbors. New values are written to
//! a separate buffer and merged after the layer, so a layer never reads
//! values it produced itself.

use crate::interp::{linear_index, unravel};
use rayon::prelude::*;

/// Extrapolate `values` (laid out i-fastest over `size`) from samples where
/// `known` is true, at most `depth` layers deep.
///
/// Samples out of reach after `depth` layers keep their current value.
/// Returns the number of layers that changed anything.
pub fn extrapolate_to_region(
    values: &mut [f32],
    known: &[bool],
    size: [usize; 3],
    depth: usize,
) -> usize {
    debug_assert_eq!(values.len(), size[0] * size[1] * size[2]);
    debug_assert_eq!(known.len(), values.len());

    let mut known = known.to_vec();
    let mut layer: Vec<Option<f32>> = vec![None; values.len()];

    for depth_reached in 0..depth {
        {
            let values = &*values;
            let known = &known;
            layer.par_iter_mut().enumerate().for_each(|(idx, out)| {
                *out = if known[idx] {
                    None
                } else {
                    known_neighbor_average(values, known, size, idx)
                };
            });
        }

        let mut changed = false;
        for (idx, new_value) in layer.iter().enumerate() {
            if let Some(value) = *new_value {
                values[idx] = value;
                known[idx] = true;
                changed = true;
            }
        }
        if !changed {
            return depth_reached;
        }
    }
    depth
}

fn known_neighbor_average(values: &[f32], known: &[bool], size: [usize; 3], idx: usize) -> Option<f32> {
    let coords = unravel(size, idx);
    let mut sum = 0.0;
    let mut count = 0;

    for axis in 0..3 {
        let c = coords[axis];
        let lower = (c > 0).then(|| c - 1);
        let upper = (c + 1 < size[axis]).then(|| c + 1);
        for n in [lower, upper].into_iter().flatten() {
            let mut neighbor = coords;
            neighbor[axis] = n;
            let nidx = linear_index(size, neighbor[0], neighbor[1], neighbor[2]);
            if known[nidx] {
                sum += values[nidx];
                count += 1;
            }
        }
    }

    (count > 0).then(|| sum / count as f32)
}
