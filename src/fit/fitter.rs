//! Shower shape fitting for a single profile.
//!
//! Given a `LayerProfile` and a `FitConfig` we:
//! 1. select the fitted quantity (total or mean energy per layer)
//! 2. bail out with `Degenerate` on a flat profile (no solver call)
//! 3. compute the model-free shower maximum and tail leakage on the full profile
//! 4. trim edge layers and run Levenberg–Marquardt on the remaining window
//! 5. derive shower maximum and width from the fitted parameters
//!
//! Nothing in here returns an error: every outcome is a `FitResult` status.

use tracing::{info, warn};

use crate::domain::{
    DEFAULT_A0, DEFAULT_B0, FitConfig, FitFailure, FitQuality, FitResult, GammaParams,
    InitialGuess, LayerProfile, Normalization,
};
use crate::fit::levenberg::{LmOptions, levenberg_marquardt};
use crate::fit::shape::{is_flat, tail_leakage, trim_window};

/// Number of free model parameters `(a, b, scale)`.
pub const N_PARAMS: usize = 3;

/// Fit the Gamma shower model to `profile`.
pub fn fit(profile: &LayerProfile, config: &FitConfig) -> FitResult {
    let y = profile.select(config.y_selector);

    if is_flat(&y) {
        warn!(layers = y.len(), "flat profile, skipping parametric fit");
        return FitResult::degenerate();
    }
    let Some((max_layer, tail)) = tail_leakage(&y) else {
        return FitResult::degenerate();
    };

    let depths = profile.depths();
    let (z_fit, y_window) = trim_window(&depths, &y, config.trim);
    if z_fit.len() < N_PARAMS {
        warn!(
            layers = y.len(),
            lead = config.trim.lead,
            trail = config.trim.trail,
            "too few layers left after trimming"
        );
        return FitResult::failed(FitFailure::TooFewPoints, max_layer, tail);
    }

    let norm = normalization_factor(&y, config.normalize);
    let y_fit: Vec<f64> = y_window.iter().map(|v| v / norm).collect();

    let start = initial_guess(&config.initial_guess, &y_fit);
    if !start.is_positive() {
        warn!(a = start.a, b = start.b, scale = start.scale, "initial guess is not strictly positive");
        return FitResult::failed(FitFailure::NonPositiveGuess, max_layer, tail);
    }

    let opts = LmOptions {
        max_iterations: config.max_iterations,
        epsilon: config.epsilon,
    };
    match levenberg_marquardt(z_fit, &y_fit, start, &opts) {
        Ok(lm) => {
            let n = z_fit.len();
            let quality = FitQuality {
                sse: lm.sse,
                rmse: (lm.sse / n as f64).sqrt(),
                ndf: n - N_PARAMS,
                iterations: lm.iterations,
            };
            info!(
                a = lm.params.a,
                b = lm.params.b,
                scale = lm.params.scale,
                iterations = lm.iterations,
                "shower fit converged"
            );
            let deepest = depths.last().copied().unwrap_or(0.0);
            if !maximum_within(&lm.params, deepest) {
                warn!(
                    shower_max = lm.params.shower_max_depth(),
                    deepest,
                    "fitted shower maximum lies outside the sampled depth range"
                );
            }
            FitResult::success(lm.params, quality, max_layer, tail)
        }
        Err(failure) => {
            warn!(reason = failure.describe(), "shower fit failed");
            FitResult::failed(failure, max_layer, tail)
        }
    }
}

/// `true` when the fitted maximum `(a-1)/b` falls inside `[0, deepest]`.
fn maximum_within(params: &GammaParams, deepest: f64) -> bool {
    let z_max = params.shower_max_depth();
    z_max.is_finite() && (0.0..=deepest).contains(&z_max)
}

/// Starting point: caller overrides, else `(DEFAULT_A0, DEFAULT_B0, max(y))`.
pub fn initial_guess(overrides: &InitialGuess, y_fit: &[f64]) -> GammaParams {
    let peak = y_fit.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    GammaParams {
        a: overrides.a.unwrap_or(DEFAULT_A0),
        b: overrides.b.unwrap_or(DEFAULT_B0),
        scale: overrides.scale.unwrap_or(peak),
    }
}

/// Divisor applied to the fitted values (`1.0` unless peak normalization is on).
pub fn normalization_factor(y: &[f64], mode: Normalization) -> f64 {
    match mode {
        Normalization::None => 1.0,
        Normalization::Peak => {
            let peak = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if peak.is_finite() && peak > 0.0 { peak } else { 1.0 }
        }
    }
}
