//! Levenberg–Marquardt least squares for the Gamma profile.
//!
//! Minimizes `Σ (y_i − f(z_i; a, b, scale))²` starting from a strictly positive
//! guess. The parameter vector is `(a, b, scale)`; the Jacobian is analytic.
//!
//! Step control:
//! - accept a trial step only if it lowers the SSE and keeps all parameters > 0
//! - on acceptance divide λ by 10, on rejection multiply by 10
//! - every trial step (accepted or not) counts against the iteration budget
//!
//! Convergence (any of):
//! - the undamped Gauss–Newton step predicts a relative SSE reduction `<= FTOL`
//! - the scaled gradient is `<= GTOL` (MINPACK-style cosine test)
//! - the step is `<= XTOL` relative to the parameter norm
//! - the SSE is zero (up to rounding)

use nalgebra::{Matrix3, Vector3};
use tracing::debug;

use crate::domain::{FitFailure, GammaParams};
use crate::math::{has_vanishing_column, solve_damped};
use crate::models::gamma_profile_with_gradient;

const FTOL: f64 = 1e-12;
const GTOL: f64 = 1e-12;
const XTOL: f64 = 1e-10;
const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MAX: f64 = 1e20;
const LAMBDA_MIN: f64 = 1e-15;
/// SSE at or below `SSE_FLOOR · Σy²` counts as an exact fit.
const SSE_FLOOR: f64 = 1e-28;

#[derive(Debug, Clone, Copy)]
pub struct LmOptions {
    pub max_iterations: usize,
    /// Depth clamp passed to the model.
    pub epsilon: f64,
}

/// A converged fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmFit {
    pub params: GammaParams,
    pub sse: f64,
    pub iterations: usize,
}

/// Residual sum of squares, `JᵀJ` and `Jᵀr` at `params`.
#[derive(Debug, Clone, Copy)]
struct Linearization {
    sse: f64,
    jtj: Matrix3<f64>,
    jtr: Vector3<f64>,
}

fn linearize(depths: &[f64], y: &[f64], params: &GammaParams, epsilon: f64) -> Option<Linearization> {
    let mut sse = 0.0;
    let mut jtj = Matrix3::zeros();
    let mut jtr = Vector3::zeros();
    for (&z, &yi) in depths.iter().zip(y) {
        let (f, grad) = gamma_profile_with_gradient(z, params, epsilon);
        let r = yi - f;
        sse += r * r;
        jtj += grad * grad.transpose();
        jtr += grad * r;
    }
    let finite = sse.is_finite() && jtj.iter().all(|v| v.is_finite()) && jtr.iter().all(|v| v.is_finite());
    finite.then_some(Linearization { sse, jtj, jtr })
}

fn to_vector(p: &GammaParams) -> Vector3<f64> {
    Vector3::new(p.a, p.b, p.scale)
}

fn from_vector(v: &Vector3<f64>) -> GammaParams {
    GammaParams::new(v[0], v[1], v[2])
}

/// Scaled-gradient test. Only meaningful once every Jacobian column is non-zero.
fn gradient_converged(lin: &Linearization) -> bool {
    let r_norm = lin.sse.sqrt();
    (0..3).all(|i| {
        let col_norm = lin.jtj[(i, i)].sqrt();
        (lin.jtr[i] / (col_norm * r_norm)).abs() <= GTOL
    })
}

/// Fit the Gamma profile to `(depths, y)` starting from `start`.
///
/// `depths` and `y` must have the same length (at least 3 for a determined fit;
/// callers enforce this before invoking the solver).
pub fn levenberg_marquardt(
    depths: &[f64],
    y: &[f64],
    start: GammaParams,
    opts: &LmOptions,
) -> Result<LmFit, FitFailure> {
    if !start.is_positive() {
        return Err(FitFailure::NonPositiveGuess);
    }

    let sse_floor = SSE_FLOOR * y.iter().map(|v| v * v).sum::<f64>();
    let mut params = start;
    let mut lin = linearize(depths, y, &params, opts.epsilon).ok_or(FitFailure::NonFinite)?;
    let mut lambda = LAMBDA_INIT;
    let mut iterations = 0usize;

    loop {
        if lin.sse == 0.0 || lin.sse <= sse_floor {
            return Ok(LmFit {
                params,
                sse: lin.sse,
                iterations,
            });
        }
        // A parameter without influence on the residuals cannot be determined,
        // even if the remaining gradient is flat.
        if has_vanishing_column(&lin.jtj) {
            return Err(FitFailure::SingularJacobian);
        }
        if gradient_converged(&lin) {
            return Ok(LmFit {
                params,
                sse: lin.sse,
                iterations,
            });
        }
        if let Some(gn) = solve_damped(&lin.jtj, &lin.jtr, 0.0) {
            let predicted = gn.dot(&lin.jtr);
            if predicted.is_finite() && predicted <= FTOL * lin.sse {
                return Ok(LmFit {
                    params,
                    sse: lin.sse,
                    iterations,
                });
            }
        }

        if iterations >= opts.max_iterations {
            return Err(FitFailure::IterationBudget);
        }
        iterations += 1;

        let Some(delta) = solve_damped(&lin.jtj, &lin.jtr, lambda) else {
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                return Err(FitFailure::SingularJacobian);
            }
            continue;
        };

        let current = to_vector(&params);
        let small_step = delta.norm() <= XTOL * (current.norm() + XTOL);
        let trial = from_vector(&(current + delta));

        let improved = if trial.is_positive() {
            linearize(depths, y, &trial, opts.epsilon).filter(|next| next.sse < lin.sse)
        } else {
            None
        };

        match improved {
            Some(next) => {
                params = trial;
                lin = next;
                lambda = (lambda / 10.0).max(LAMBDA_MIN);
                debug!(
                    iteration = iterations,
                    sse = lin.sse,
                    lambda,
                    a = params.a,
                    b = params.b,
                    scale = params.scale,
                    "accepted LM step"
                );
                if small_step {
                    return Ok(LmFit {
                        params,
                        sse: lin.sse,
                        iterations,
                    });
                }
            }
            None => {
                if small_step {
                    // No further progress is possible at machine precision.
                    return Ok(LmFit {
                        params,
                        sse: lin.sse,
                        iterations,
                    });
                }
                lambda *= 10.0;
                if lambda > LAMBDA_MAX {
                    return Err(FitFailure::SingularJacobian);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::gamma_profile;
    use approx::assert_relative_eq;

    const EPS: f64 = 1e-3;

    fn synthetic(truth: &GammaParams, depths: &[f64]) -> Vec<f64> {
        depths.iter().map(|&z| gamma_profile(z, truth, EPS)).collect()
    }

    #[test]
    fn recovers_noise_free_parameters() {
        let truth = GammaParams::new(3.0, 0.2, 50.0);
        let depths: Vec<f64> = (1..20).map(|i| i as f64).collect();
        let y = synthetic(&truth, &depths);

        let opts = LmOptions {
            max_iterations: 10_000,
            epsilon: EPS,
        };
        let fit = levenberg_marquardt(&depths, &y, GammaParams::new(2.0, 0.1, 5.0), &opts).unwrap();
        assert_relative_eq!(fit.params.a, truth.a, max_relative = 1e-6);
        assert_relative_eq!(fit.params.b, truth.b, max_relative = 1e-6);
        assert_relative_eq!(fit.params.scale, truth.scale, max_relative = 1e-6);
        assert!(fit.iterations > 0);
    }

    #[test]
    fn exhausted_budget_is_reported() {
        let truth = GammaParams::new(3.0, 0.2, 50.0);
        let depths: Vec<f64> = (1..20).map(|i| i as f64).collect();
        let y = synthetic(&truth, &depths);

        let opts = LmOptions {
            max_iterations: 1,
            epsilon: EPS,
        };
        let err = levenberg_marquardt(&depths, &y, GammaParams::new(2.0, 0.1, 5.0), &opts).unwrap_err();
        assert_eq!(err, FitFailure::IterationBudget);
    }

    #[test]
    fn non_positive_start_is_rejected() {
        let opts = LmOptions {
            max_iterations: 10,
            epsilon: EPS,
        };
        let err = levenberg_marquardt(&[1.0, 2.0, 3.0], &[1.0, 2.0, 1.0], GammaParams::new(0.0, 0.1, 1.0), &opts)
            .unwrap_err();
        assert_eq!(err, FitFailure::NonPositiveGuess);
    }

    #[test]
    fn exact_start_converges_immediately() {
        let truth = GammaParams::new(4.0, 0.08, 100.0);
        let depths: Vec<f64> = (1..11).map(|i| i as f64 * 5.5).collect();
        let y = synthetic(&truth, &depths);
        let opts = LmOptions {
            max_iterations: 10,
            epsilon: EPS,
        };
        let fit = levenberg_marquardt(&depths, &y, truth, &opts).unwrap();
        assert_eq!(fit.iterations, 0);
        assert_eq!(fit.params, truth);
    }

    #[test]
    fn underflowing_model_is_singular() {
        // b = 1000 puts every depth hundreds of e-folds past the maximum, so the
        // model and all three Jacobian columns are exactly zero.
        let depths: Vec<f64> = (1..9).map(|i| i as f64 * 5.5).collect();
        let y = [40.0, 90.0, 120.0, 95.0, 60.0, 30.0, 12.0, 4.0];
        let opts = LmOptions {
            max_iterations: 100,
            epsilon: EPS,
        };
        let err = levenberg_marquardt(&depths, &y, GammaParams::new(4.0, 1e3, 120.0), &opts).unwrap_err();
        assert_eq!(err, FitFailure::SingularJacobian);
    }

    #[test]
    fn non_finite_data_is_reported() {
        let opts = LmOptions {
            max_iterations: 100,
            epsilon: EPS,
        };
        let y = [1.0, f64::INFINITY, 2.0];
        let err = levenberg_marquardt(&[1.0, 2.0, 3.0], &y, GammaParams::new(4.0, 0.1, 2.0), &opts).unwrap_err();
        assert_eq!(err, FitFailure::NonFinite);
    }
}
