//! Fractions of segments and faces on either side of an SDF zero level set.
//!
//! The SDF is assumed to vary linearly between samples. "Open" means
//! strictly positive; a sample exactly on the surface counts as closed, so a
//! face lying on a collider wall is blocked.

/// Fraction of the segment between two samples with phi > 0.
pub fn open_fraction_segment(phi0: f32, phi1: f32) -> f32 {
    match (phi0 > 0.0, phi1 > 0.0) {
        (true, true) => 1.0,
        (false, false) => 0.0,
        (true, false) => (phi0 / (phi0 - phi1)).clamp(0.0, 1.0),
        (false, true) => (phi1 / (phi1 - phi0)).clamp(0.0, 1.0),
    }
}

/// Fraction of a triangle with phi > 0, for phi linear over the triangle.
fn open_fraction_triangle(a: f32, b: f32, c: f32) -> f32 {
    // Rotate so the vertex whose sign differs from the other two comes first
    let (a, b, c) = match (a > 0.0, b > 0.0, c > 0.0) {
        (true, true, true) => return 1.0,
        (false, false, false) => return 0.0,
        (true, false, false) | (false, true, true) => (a, b, c),
        (false, true, false) | (true, false, true) => (b, c, a),
        (false, false, true) | (true, true, false) => (c, a, b),
    };

    // Corner triangle cut off around the odd vertex
    let corner = (a / (a - b)).clamp(0.0, 1.0) * (a / (a - c)).clamp(0.0, 1.0);
    if a > 0.0 {
        corner
    } else {
        1.0 - corner
    }
}

/// Fraction of a rectangular face with phi > 0, given its four corner samples.
///
/// The face is split into four triangles around its center (center value is
/// the corner average) and phi is treated as linear on each. Exact when phi
/// is linear across the face; monotone non-decreasing in every corner value.
pub fn open_fraction_face(phi_00: f32, phi_10: f32, phi_01: f32, phi_11: f32) -> f32 {
    let center = 0.25 * (phi_00 + phi_10 + phi_01 + phi_11);
    let area = open_fraction_triangle(phi_00, phi_10, center)
        + open_fraction_triangle(phi_10, phi_11, center)
        + open_fraction_triangle(phi_11, phi_01, center)
        + open_fraction_triangle(phi_01, phi_00, center);
    (0.25 * area).clamp(0.0, 1.0)
}

/// Fraction of the segment from `phi0` to `phi1` lying inside (phi < 0).
///
/// Used for ghost-fluid distances to a free surface.
pub fn inside_fraction_segment(phi0: f32, phi1: f32) -> f32 {
    match (phi0 < 0.0, phi1 < 0.0) {
        (true, true) => 1.0,
        (false, false) => 0.0,
        (true, false) => (phi0 / (phi0 - phi1)).clamp(0.0, 1.0),
        (false, true) => (phi1 / (phi1 - phi0)).clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_fraction() {
        assert_eq!(open_fraction_segment(1.0, 2.0), 1.0);
        assert_eq!(open_fraction_segment(-1.0, -2.0), 0.0);
        assert_eq!(open_fraction_segment(1.0, -1.0), 0.5);
        assert_eq!(open_fraction_segment(-3.0, 1.0), 0.25);
        // Surface samples are closed
        assert_eq!(open_fraction_segment(0.0, 0.0), 0.0);
        assert_eq!(open_fraction_segment(0.0, 1.0), 1.0);
    }

    #[test]
    fn test_face_fraction_uniform_signs() {
        assert_eq!(open_fraction_face(1.0, 1.0, 2.0, 0.5), 1.0);
        assert_eq!(open_fraction_face(-1.0, -1.0, -2.0, 0.0), 0.0);
    }

    #[test]
    fn test_face_fraction_matches_segment_for_one_dimensional_variation() {
        // phi varies only along the first face axis
        for (a, b) in [(1.0, -1.0), (-3.0, 1.0), (0.2, -0.6), (2.0, -0.5)] {
            let face = open_fraction_face(a, b, a, b);
            let segment = open_fraction_segment(a, b);
            assert!((face - segment).abs() < 1e-5, "face {} vs segment {} for ({a}, {b})", face, segment);
        }
    }

    #[test]
    fn test_face_fraction_single_corner() {
        // phi = x + y - 1.5 on the unit square: open region is the corner
        // triangle x + y > 1.5 with area 0.125
        let f = open_fraction_face(-1.5, -0.5, -0.5, 0.5);
        assert!((f - 0.125).abs() < 1e-5, "got {}", f);
    }

    #[test]
    fn test_inside_fraction() {
        assert_eq!(inside_fraction_segment(-1.0, 1.0), 0.5);
        assert_eq!(inside_fraction_segment(-1.0, 3.0), 0.25);
        assert_eq!(inside_fraction_segment(-1.0, -1.0), 1.0);
        assert_eq!(inside_fraction_segment(1.0, 1.0), 0.0);
    }
}
