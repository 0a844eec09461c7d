//! Gamma-shaped longitudinal profile.
//!
//! ```text
//! f(z; a, b, scale) = scale · b · (b z)^(a-1) · exp(-b z) / Γ(a)
//! ```
//!
//! The fitter relies on two primitive operations:
//! - evaluate `f` at a depth (for residuals/plots)
//! - evaluate `f` and its gradient w.r.t. `(a, b, scale)` (for the Jacobian)
//!
//! Numerical notes:
//! - `z` is clamped to `z >= epsilon` before the power term, so `z = 0` never
//!   hits `0^(a-1)`.
//! - Evaluation happens in log space with `ln Γ(a)` from `statrs`; for large `a`
//!   the direct form overflows long before the ratio does.

use nalgebra::Vector3;
use statrs::function::gamma::{digamma, ln_gamma};

use crate::domain::GammaParams;

/// Evaluate the model at depth `z`.
///
/// Returns NaN for non-positive `a`/`b` (the model is undefined there).
pub fn gamma_profile(z: f64, params: &GammaParams, epsilon: f64) -> f64 {
    let GammaParams { a, b, scale } = *params;
    if !(a > 0.0 && b > 0.0) {
        return f64::NAN;
    }
    let bz = b * z.max(epsilon);
    let ln_shape = b.ln() + (a - 1.0) * bz.ln() - bz - ln_gamma(a);
    scale * ln_shape.exp()
}

/// Evaluate the model and its gradient `(∂f/∂a, ∂f/∂b, ∂f/∂scale)` at depth `z`.
pub fn gamma_profile_with_gradient(
    z: f64,
    params: &GammaParams,
    epsilon: f64,
) -> (f64, Vector3<f64>) {
    let GammaParams { a, b, scale } = *params;
    let z = z.max(epsilon);
    let f = gamma_profile(z, params, epsilon);
    let shape = if scale != 0.0 {
        f / scale
    } else {
        gamma_profile(z, &GammaParams { scale: 1.0, ..*params }, epsilon)
    };

    let d_a = f * ((b * z).ln() - digamma(a));
    let d_b = f * (a / b - z);
    (f, Vector3::new(d_a, d_b, shape))
}

/// Sample the model on `n` evenly spaced depths in `[z_min, z_max]`.
pub fn sample_profile(
    params: &GammaParams,
    z_min: f64,
    z_max: f64,
    n: usize,
    epsilon: f64,
) -> (Vec<f64>, Vec<f64>) {
    let n = n.max(2);
    let mut depths = Vec::with_capacity(n);
    let mut values = Vec::with_capacity(n);
    for i in 0..n {
        let u = i as f64 / (n as f64 - 1.0);
        let z = z_min + u * (z_max - z_min);
        depths.push(z);
        values.push(gamma_profile(z, params, epsilon));
    }
    (depths, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPS: f64 = 1e-3;

    #[test]
    fn shape_one_is_exponential() {
        let p = GammaParams::new(1.0, 0.2, 3.0);
        for &z in &[0.5_f64, 2.0, 10.0] {
            let expected = 3.0 * 0.2 * (-0.2 * z).exp();
            assert_relative_eq!(gamma_profile(z, &p, EPS), expected, max_relative = 1e-12);
        }
    }

    #[test]
    fn zero_depth_is_clamped() {
        let p = GammaParams::new(4.0, 0.08, 100.0);
        let at_zero = gamma_profile(0.0, &p, EPS);
        let at_eps = gamma_profile(EPS, &p, EPS);
        assert!(at_zero.is_finite());
        assert_eq!(at_zero, at_eps);
    }

    #[test]
    fn peak_sits_at_the_mode() {
        let p = GammaParams::new(4.0, 0.08, 100.0);
        let peak = gamma_profile(37.5, &p, EPS);
        assert!(peak > gamma_profile(37.0, &p, EPS));
        assert!(peak > gamma_profile(38.0, &p, EPS));
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let p = GammaParams::new(3.3, 0.11, 42.0);
        let z = 17.0;
        let (_, grad) = gamma_profile_with_gradient(z, &p, EPS);

        let h = 1e-6;
        let da = (gamma_profile(z, &GammaParams { a: p.a + h, ..p }, EPS)
            - gamma_profile(z, &GammaParams { a: p.a - h, ..p }, EPS))
            / (2.0 * h);
        let db = (gamma_profile(z, &GammaParams { b: p.b + h, ..p }, EPS)
            - gamma_profile(z, &GammaParams { b: p.b - h, ..p }, EPS))
            / (2.0 * h);
        let ds = (gamma_profile(z, &GammaParams { scale: p.scale + h, ..p }, EPS)
            - gamma_profile(z, &GammaParams { scale: p.scale - h, ..p }, EPS))
            / (2.0 * h);

        assert_relative_eq!(grad[0], da, max_relative = 1e-5);
        assert_relative_eq!(grad[1], db, max_relative = 1e-5);
        assert_relative_eq!(grad[2], ds, max_relative = 1e-5);
    }

    #[test]
    fn invalid_shape_is_nan() {
        let p = GammaParams::new(-1.0, 0.1, 1.0);
        assert!(gamma_profile(5.0, &p, EPS).is_nan());
    }
}
