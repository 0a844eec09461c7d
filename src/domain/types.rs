//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during extraction and fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ProfileError;
use crate::models::BetheHeitler;

/// Depth below which the model is evaluated at the clamp value (avoids `0^(a-1)`).
pub const DEFAULT_EPSILON: f64 = 1e-3;

/// Solver budget (trial steps).
pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

/// Default shape parameter of the initial guess.
pub const DEFAULT_A0: f64 = 4.0;

/// Default rate parameter of the initial guess (per depth unit).
pub const DEFAULT_B0: f64 = 0.1;

/// A 1D histogram as delivered by a histogram source.
///
/// No validation happens at construction; the extractor checks the
/// `edges.len() == contents.len() + 1` contract per layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub contents: Vec<f64>,
}

impl Histogram {
    pub fn new(edges: Vec<f64>, contents: Vec<f64>) -> Self {
        Self { edges, contents }
    }

    /// Uniform binning over `[low, high)` with all contents zero.
    pub fn uniform(bins: usize, low: f64, high: f64) -> Self {
        let width = (high - low) / bins.max(1) as f64;
        let edges = (0..=bins).map(|i| low + width * i as f64).collect();
        Self {
            edges,
            contents: vec![0.0; bins],
        }
    }

    /// Bin midpoints. Only meaningful for well-formed histograms.
    pub fn centers(&self) -> Vec<f64> {
        self.edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
    }

    /// Add `weight` to the bin containing `value`; values outside the edges are dropped.
    pub fn fill(&mut self, value: f64, weight: f64) -> bool {
        let n = self.contents.len();
        if n == 0 || self.edges.len() != n + 1 || !value.is_finite() {
            return false;
        }
        if value < self.edges[0] || value >= self.edges[n] {
            return false;
        }
        // First edge strictly greater than `value`, minus one, is the bin index.
        let idx = self.edges.partition_point(|&e| e <= value).saturating_sub(1);
        self.contents[idx.min(n - 1)] += weight;
        true
    }
}

/// Per-layer summary statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerStats {
    pub layer: usize,
    /// Depth coordinate (`layer * layer_pitch`).
    pub depth: f64,
    pub mean_energy: f64,
    pub std_energy: f64,
    pub total_energy: f64,
}

/// Longitudinal profile, one entry per layer in depth order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerProfile {
    pub layers: Vec<LayerStats>,
}

impl LayerProfile {
    pub fn new(layers: Vec<LayerStats>) -> Self {
        Self { layers }
    }

    /// Build a profile directly from `(depth, y)` pairs of the selected quantity.
    ///
    /// Useful for profiles that come from somewhere other than histograms (tests,
    /// tabulated reference showers). The value is stored as both mean and total.
    pub fn from_depth_values(depths: &[f64], values: &[f64]) -> Self {
        let layers = depths
            .iter()
            .zip(values.iter())
            .enumerate()
            .map(|(layer, (&depth, &y))| LayerStats {
                layer,
                depth,
                mean_energy: y,
                std_energy: 0.0,
                total_energy: y,
            })
            .collect();
        Self { layers }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn depths(&self) -> Vec<f64> {
        self.layers.iter().map(|l| l.depth).collect()
    }

    /// Values of the selected quantity, in layer order.
    pub fn select(&self, selector: YSelector) -> Vec<f64> {
        self.layers.iter().map(|l| selector.value(l)).collect()
    }
}

/// Which per-layer quantity the fitter works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum YSelector {
    /// Sum of bin contents per layer.
    #[default]
    #[value(name = "total")]
    #[serde(rename = "total")]
    TotalEnergy,
    /// Content-weighted mean of the bin centers per layer.
    #[value(name = "mean")]
    #[serde(rename = "mean")]
    MeanEnergy,
}

impl YSelector {
    pub fn value(self, layer: &LayerStats) -> f64 {
        match self {
            YSelector::TotalEnergy => layer.total_energy,
            YSelector::MeanEnergy => layer.mean_energy,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            YSelector::TotalEnergy => "total E_dep",
            YSelector::MeanEnergy => "mean E_dep",
        }
    }
}

/// Optional rescaling of the selected values before the parametric fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// Fit the values as measured.
    #[default]
    None,
    /// Divide by the largest selected value (peak = 1).
    Peak,
}

/// Number of edge layers excluded from the parametric fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trim {
    pub lead: usize,
    pub trail: usize,
}

impl Default for Trim {
    fn default() -> Self {
        Self { lead: 1, trail: 1 }
    }
}

/// Caller overrides for the solver's starting point; `None` uses the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InitialGuess {
    pub a: Option<f64>,
    pub b: Option<f64>,
    pub scale: Option<f64>,
}

/// Configuration of a single `fit` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    pub y_selector: YSelector,
    pub trim: Trim,
    /// Depth clamp for model evaluation.
    pub epsilon: f64,
    /// Maximum number of solver trial steps.
    pub max_iterations: usize,
    pub initial_guess: InitialGuess,
    pub normalize: Normalization,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            y_selector: YSelector::TotalEnergy,
            trim: Trim::default(),
            epsilon: DEFAULT_EPSILON,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            initial_guess: InitialGuess::default(),
            normalize: Normalization::None,
        }
    }
}

impl FitConfig {
    pub fn validate(&self) -> Result<(), ProfileError> {
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(ProfileError::InvalidConfig(format!(
                "epsilon must be finite and > 0, got {}",
                self.epsilon
            )));
        }
        if self.max_iterations == 0 {
            return Err(ProfileError::InvalidConfig(
                "max_iterations must be >= 1".to_string(),
            ));
        }
        let guess = self.initial_guess;
        for (name, value) in [("a0", guess.a), ("b0", guess.b), ("scale0", guess.scale)] {
            if let Some(v) = value {
                if !(v.is_finite() && v > 0.0) {
                    return Err(ProfileError::InvalidConfig(format!(
                        "initial guess {name} must be finite and > 0, got {v}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Terminal status of a fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStatus {
    Success,
    /// Flat profile: no shape information, no fit attempted.
    Degenerate,
    FitFailed,
}

impl FitStatus {
    pub fn display_name(self) -> &'static str {
        match self {
            FitStatus::Success => "success",
            FitStatus::Degenerate => "degenerate",
            FitStatus::FitFailed => "fit failed",
        }
    }
}

/// Why a fit ended in `FitStatus::FitFailed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitFailure {
    /// Fewer points than parameters remain after trimming.
    TooFewPoints,
    /// The starting point is not strictly positive in all parameters.
    NonPositiveGuess,
    /// Iteration budget exhausted before convergence.
    IterationBudget,
    /// Normal equations could not be solved at any damping.
    SingularJacobian,
    /// The model produced NaN/∞ at the current parameters.
    NonFinite,
}

impl FitFailure {
    pub fn describe(self) -> &'static str {
        match self {
            FitFailure::TooFewPoints => "too few points after trimming",
            FitFailure::NonPositiveGuess => "initial guess is not strictly positive",
            FitFailure::IterationBudget => "iteration budget exhausted",
            FitFailure::SingularJacobian => "singular Jacobian",
            FitFailure::NonFinite => "non-finite model values",
        }
    }
}

/// Parameters of `f(z; a, b, scale) = scale · b · (b z)^(a-1) · e^(-b z) / Γ(a)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GammaParams {
    /// Shape.
    pub a: f64,
    /// Rate (per depth unit).
    pub b: f64,
    /// Normalization (area under the curve).
    pub scale: f64,
}

impl GammaParams {
    pub fn new(a: f64, b: f64, scale: f64) -> Self {
        Self { a, b, scale }
    }

    /// Mode of the Gamma shape.
    pub fn shower_max_depth(&self) -> f64 {
        (self.a - 1.0) / self.b
    }

    /// Standard deviation of the Gamma shape.
    pub fn shower_width(&self) -> f64 {
        self.a.sqrt() / self.b
    }

    pub fn is_positive(&self) -> bool {
        [self.a, self.b, self.scale]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    pub sse: f64,
    pub rmse: f64,
    /// Points minus parameters.
    pub ndf: usize,
    pub iterations: usize,
}

/// Output of `fit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub status: FitStatus,
    pub failure: Option<FitFailure>,
    pub params: Option<GammaParams>,
    pub shower_max_depth: Option<f64>,
    pub shower_width: Option<f64>,
    /// Layer index of the largest measured value.
    pub shower_max_layer: Option<usize>,
    pub tail_leakage: Option<f64>,
    pub quality: Option<FitQuality>,
}

impl FitResult {
    pub fn degenerate() -> Self {
        Self {
            status: FitStatus::Degenerate,
            failure: None,
            params: None,
            shower_max_depth: None,
            shower_width: None,
            shower_max_layer: None,
            tail_leakage: None,
            quality: None,
        }
    }

    pub fn failed(failure: FitFailure, shower_max_layer: usize, tail_leakage: f64) -> Self {
        Self {
            status: FitStatus::FitFailed,
            failure: Some(failure),
            params: None,
            shower_max_depth: None,
            shower_width: None,
            shower_max_layer: Some(shower_max_layer),
            tail_leakage: Some(tail_leakage),
            quality: None,
        }
    }

    pub fn success(
        params: GammaParams,
        quality: FitQuality,
        shower_max_layer: usize,
        tail_leakage: f64,
    ) -> Self {
        Self {
            status: FitStatus::Success,
            failure: None,
            params: Some(params),
            shower_max_depth: Some(params.shower_max_depth()),
            shower_width: Some(params.shower_width()),
            shower_max_layer: Some(shower_max_layer),
            tail_leakage: Some(tail_leakage),
            quality: Some(quality),
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus environment defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    /// Absorber + active-medium thickness per layer (depth units, e.g. mm).
    pub layer_pitch: f64,
    pub fit: FitConfig,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_csv: Option<PathBuf>,
    pub export_json: Option<PathBuf>,

    /// Optional analytic expectation to overlay.
    pub reference: Option<BetheHeitler>,
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ProfileError> {
        if !(self.layer_pitch.is_finite() && self.layer_pitch > 0.0) {
            return Err(ProfileError::InvalidConfig(format!(
                "layer_pitch must be finite and > 0, got {}",
                self.layer_pitch
            )));
        }
        if let Some(reference) = &self.reference {
            reference.validate()?;
        }
        self.fit.validate()
    }
}

/// A saved fit report (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub input: String,
    pub layer_pitch: f64,
    pub config: FitConfig,
    pub profile: LayerProfile,
    pub result: FitResult,
    /// Fitted model sampled on a fine depth grid (empty unless the fit succeeded).
    pub grid: CurveGrid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurveGrid {
    pub depth: Vec<f64>,
    pub y: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centers_are_edge_midpoints() {
        let h = Histogram::new(vec![0.0, 1.0, 3.0], vec![1.0, 1.0]);
        assert_eq!(h.centers(), vec![0.5, 2.0]);
    }

    #[test]
    fn fill_drops_out_of_range_values() {
        let mut h = Histogram::uniform(4, 0.0, 4.0);
        assert!(h.fill(0.0, 1.0));
        assert!(h.fill(3.999, 2.0));
        assert!(h.fill(1.0, 1.0));
        assert!(!h.fill(4.0, 1.0));
        assert!(!h.fill(-0.1, 1.0));
        assert_eq!(h.contents, vec![1.0, 1.0, 0.0, 2.0]);
    }

    #[test]
    fn gamma_params_observables() {
        let p = GammaParams::new(4.0, 0.08, 100.0);
        assert!((p.shower_max_depth() - 37.5).abs() < 1e-12);
        assert!((p.shower_width() - 25.0).abs() < 1e-12);
    }

    #[test]
    fn fit_config_rejects_non_positive_guess() {
        let config = FitConfig {
            initial_guess: InitialGuess {
                a: Some(0.0),
                ..InitialGuess::default()
            },
            ..FitConfig::default()
        };
        assert!(matches!(config.validate(), Err(ProfileError::InvalidConfig(_))));
        assert!(FitConfig::default().validate().is_ok());
    }
}
