//! Damped normal-equation solver for the Levenberg–Marquardt step.
//!
//! Each trial step solves
//!
//! ```text
//! (JᵀJ + λ · diag(JᵀJ)) δ = Jᵀ r
//! ```
//!
//! Implementation choices:
//! - The parameter dimension is fixed at 3, so we work with stack-allocated
//!   `Matrix3`/`Vector3`.
//! - Cholesky first (the damped matrix is symmetric positive definite whenever
//!   J has full column rank); SVD with progressively looser tolerances as a
//!   fallback for nearly collinear columns.

use nalgebra::{Matrix3, Vector3};

/// Diagonal entries below this are treated as a vanishing Jacobian column.
const DIAG_FLOOR: f64 = 1e-300;

/// Solve the damped system. Returns `None` when no finite solution exists.
pub fn solve_damped(jtj: &Matrix3<f64>, jtr: &Vector3<f64>, lambda: f64) -> Option<Vector3<f64>> {
    let mut a = *jtj;
    for i in 0..3 {
        let d = jtj[(i, i)].max(DIAG_FLOOR);
        a[(i, i)] += lambda * d;
    }

    if let Some(chol) = a.cholesky() {
        let delta = chol.solve(jtr);
        if delta.iter().all(|v| v.is_finite()) {
            return Some(delta);
        }
    }

    let svd = a.svd(true, true);
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(delta) = svd.solve(jtr, tol) {
            if delta.iter().all(|v| v.is_finite()) {
                return Some(delta);
            }
        }
    }

    None
}

/// `true` when a Jacobian column vanishes (the parameter has no influence on the residuals).
pub fn has_vanishing_column(jtj: &Matrix3<f64>) -> bool {
    (0..3).any(|i| {
        let d = jtj[(i, i)];
        !d.is_finite() || d <= DIAG_FLOOR
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undamped_solve_matches_direct_inverse() {
        let jtj = Matrix3::new(4.0, 1.0, 0.0, 1.0, 3.0, 0.5, 0.0, 0.5, 2.0);
        let expected = Vector3::new(1.0, -2.0, 0.5);
        let jtr = jtj * expected;

        let delta = solve_damped(&jtj, &jtr, 0.0).unwrap();
        for i in 0..3 {
            assert!((delta[i] - expected[i]).abs() < 1e-10);
        }
    }

    #[test]
    fn damping_shrinks_the_step() {
        let jtj = Matrix3::identity();
        let jtr = Vector3::new(1.0, 1.0, 1.0);
        let small = solve_damped(&jtj, &jtr, 1.0).unwrap();
        assert!((small[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn detects_vanishing_column() {
        let mut jtj = Matrix3::identity();
        assert!(!has_vanishing_column(&jtj));
        jtj[(1, 1)] = 0.0;
        assert!(has_vanishing_column(&jtj));
    }
}
