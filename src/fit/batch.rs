//! Run-level analysis: extraction followed by the shower fit.
//!
//! Independent runs share nothing, so a batch is a plain `par_iter` over the
//! sources. Output order matches input order.

use rayon::prelude::*;

use crate::domain::{FitConfig, FitResult, LayerProfile};
use crate::error::ProfileError;
use crate::extract::extract;
use crate::fit::fitter::fit;
use crate::io::HistogramSource;

/// Extracted profile plus its fit outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct RunAnalysis {
    pub profile: LayerProfile,
    pub result: FitResult,
}

/// Extract and fit a single run.
pub fn analyze<S: HistogramSource + ?Sized>(
    source: &S,
    layer_pitch: f64,
    config: &FitConfig,
) -> Result<RunAnalysis, ProfileError> {
    let profile = extract(source, layer_pitch)?;
    let result = fit(&profile, config);
    Ok(RunAnalysis { profile, result })
}

/// Analyze many runs in parallel.
///
/// A malformed run yields its own `Err` without affecting the others.
pub fn analyze_runs<S: HistogramSource + Sync>(
    runs: &[S],
    layer_pitch: f64,
    config: &FitConfig,
) -> Vec<Result<RunAnalysis, ProfileError>> {
    runs.par_iter()
        .map(|source| analyze(source, layer_pitch, config))
        .collect()
}
