//! Reporting utilities: per-layer residuals and reference comparison.

pub mod format;

pub use format::*;

use crate::domain::{FitConfig, FitResult, LayerProfile};
use crate::fit::normalization_factor;
use crate::models::{BetheHeitler, gamma_profile, normalize_unit_sum};

/// Measured vs fitted value of one layer, in the units the fit ran in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerResidual {
    pub layer: usize,
    pub depth: f64,
    pub y_obs: f64,
    pub y_fit: f64,
    pub residual: f64,
    /// `false` for layers dropped by the trim window.
    pub fitted: bool,
}

/// Compute fitted values and residuals for every layer of `profile`.
///
/// Returns an empty list when `result` carries no parameters.
pub fn compute_residuals(profile: &LayerProfile, result: &FitResult, config: &FitConfig) -> Vec<LayerResidual> {
    let Some(params) = result.params else {
        return Vec::new();
    };
    let y = profile.select(config.y_selector);
    let norm = normalization_factor(&y, config.normalize);
    let n = y.len();
    let window = config.trim.lead..n.saturating_sub(config.trim.trail);

    profile
        .layers
        .iter()
        .zip(&y)
        .enumerate()
        .map(|(i, (layer, &v))| {
            let y_obs = v / norm;
            let y_fit = gamma_profile(layer.depth, &params, config.epsilon);
            LayerResidual {
                layer: layer.layer,
                depth: layer.depth,
                y_obs,
                y_fit,
                residual: y_obs - y_fit,
                fitted: window.contains(&i),
            }
        })
        .collect()
}

/// Measured shape vs Bethe–Heitler expectation, both normalized to unit sum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceRow {
    pub layer: usize,
    pub depth: f64,
    pub measured: f64,
    pub expected: f64,
}

pub fn compare_reference(profile: &LayerProfile, config: &FitConfig, reference: &BetheHeitler) -> Vec<ReferenceRow> {
    let depths = profile.depths();
    let measured = normalize_unit_sum(&profile.select(config.y_selector));
    let expected = reference.expected_shape(&depths);
    profile
        .layers
        .iter()
        .zip(measured.iter().zip(&expected))
        .map(|(layer, (&m, &e))| ReferenceRow {
            layer: layer.layer,
            depth: layer.depth,
            measured: m,
            expected: e,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitQuality, GammaParams, Normalization};
    use approx::assert_relative_eq;

    fn profile() -> LayerProfile {
        LayerProfile::from_depth_values(&[0.0, 1.0, 2.0, 3.0], &[1.0, 4.0, 3.0, 2.0])
    }

    fn success(params: GammaParams) -> FitResult {
        let quality = FitQuality {
            sse: 0.0,
            rmse: 0.0,
            ndf: 0,
            iterations: 1,
        };
        FitResult::success(params, quality, 1, 5.0)
    }

    #[test]
    fn residuals_mark_trimmed_layers() {
        let result = success(GammaParams::new(2.0, 1.0, 10.0));
        let rows = compute_residuals(&profile(), &result, &FitConfig::default());
        assert_eq!(rows.len(), 4);
        assert_eq!(
            rows.iter().map(|r| r.fitted).collect::<Vec<_>>(),
            vec![false, true, true, false]
        );
        for r in &rows {
            assert_relative_eq!(r.residual, r.y_obs - r.y_fit);
        }
    }

    #[test]
    fn residuals_follow_normalization() {
        let result = success(GammaParams::new(2.0, 1.0, 1.0));
        let config = FitConfig {
            normalize: Normalization::Peak,
            ..FitConfig::default()
        };
        let rows = compute_residuals(&profile(), &result, &config);
        assert_relative_eq!(rows[1].y_obs, 1.0);
        assert_relative_eq!(rows[2].y_obs, 0.75);
    }

    #[test]
    fn residuals_empty_without_params() {
        assert!(compute_residuals(&profile(), &FitResult::degenerate(), &FitConfig::default()).is_empty());
    }

    #[test]
    fn reference_rows_are_unit_normalized() {
        let rows = compare_reference(&profile(), &FitConfig::default(), &BetheHeitler::lead(1000.0));
        let measured: f64 = rows.iter().map(|r| r.measured).sum();
        let expected: f64 = rows.iter().map(|r| r.expected).sum();
        assert_relative_eq!(measured, 1.0, epsilon = 1e-12);
        assert_relative_eq!(expected, 1.0, epsilon = 1e-12);
        assert_relative_eq!(rows[1].measured, 0.4);
    }
}
