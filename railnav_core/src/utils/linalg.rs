// railnav_core/src/utils/linalg.rs

use nalgebra::{Matrix3, SMatrix};

/// Determinants with a magnitude below this are treated as singular.
pub const DEFAULT_SINGULAR_EPSILON: f64 = 1e-12;

/// Inverts a 3x3 matrix with the cofactor method. Returns `None` if the
/// determinant is below `epsilon` in magnitude (or not finite).
pub fn invert_3x3(m: &Matrix3<f64>, epsilon: f64) -> Option<Matrix3<f64>> {
    let det = m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
        - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
        + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)]);

    if !det.is_finite() || det.abs() < epsilon {
        return None;
    }

    let inv_det = 1.0 / det;
    Some(Matrix3::new(
        (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)]) * inv_det,
        (m[(0, 2)] * m[(2, 1)] - m[(0, 1)] * m[(2, 2)]) * inv_det,
        (m[(0, 1)] * m[(1, 2)] - m[(0, 2)] * m[(1, 1)]) * inv_det,
        (m[(1, 2)] * m[(2, 0)] - m[(1, 0)] * m[(2, 2)]) * inv_det,
        (m[(0, 0)] * m[(2, 2)] - m[(0, 2)] * m[(2, 0)]) * inv_det,
        (m[(0, 2)] * m[(1, 0)] - m[(0, 0)] * m[(1, 2)]) * inv_det,
        (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)]) * inv_det,
        (m[(0, 1)] * m[(2, 0)] - m[(0, 0)] * m[(2, 1)]) * inv_det,
        (m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)]) * inv_det,
    ))
}

/// Replaces a square matrix with its symmetric part, removing the asymmetry
/// that accumulates through floating-point products.
pub fn symmetrize<const N: usize>(m: &mut SMatrix<f64, N, N>) {
    *m = (*m + m.transpose()) * 0.5;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn inverse_times_matrix_is_identity() {
        let m = Matrix3::new(4.0, 1.0, 0.5, 1.0, 3.0, 0.2, 0.5, 0.2, 2.0);
        let inv = invert_3x3(&m, DEFAULT_SINGULAR_EPSILON).unwrap();
        let product = m * inv;
        for r in 0..3 {
            for c in 0..3 {
                let expected = if r == c { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(product[(r, c)], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn non_symmetric_matrix_is_inverted() {
        let m = Matrix3::new(2.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 3.0, 1.0);
        let inv = invert_3x3(&m, DEFAULT_SINGULAR_EPSILON).unwrap();
        let expected = m.try_inverse().unwrap();
        assert_abs_diff_eq!(inv, expected, epsilon = 1e-12);
    }

    #[test]
    fn singular_matrix_is_rejected() {
        // Third row is the sum of the first two.
        let m = Matrix3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 5.0, 7.0, 9.0);
        assert!(invert_3x3(&m, DEFAULT_SINGULAR_EPSILON).is_none());
        assert!(invert_3x3(&Matrix3::zeros(), DEFAULT_SINGULAR_EPSILON).is_none());
    }

    #[test]
    fn symmetrize_averages_off_diagonal_terms() {
        let mut m = Matrix3::new(1.0, 2.0, 0.0, 4.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        symmetrize(&mut m);
        assert_eq!(m[(0, 1)], 3.0);
        assert_eq!(m[(1, 0)], 3.0);
        assert_eq!(m, m.transpose());
    }
}
