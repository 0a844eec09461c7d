//! Shared pipeline logic used by the CLI subcommands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load histograms -> extract profile -> fit -> residuals / reference comparison
//!
//! The command handlers can then focus on presentation and exports.

use std::path::Path;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::app::short_name;
use crate::domain::{FitConfig, FitResult, FitStatus, LayerProfile, RunConfig};
use crate::error::AppError;
use crate::extract::extract;
use crate::fit::{analyze_runs, fit};
use crate::io::{HistogramSet, list_run_files, load_histograms};
use crate::report::{BatchEntry, LayerResidual, ReferenceRow, compare_reference, compute_residuals};

/// All computed outputs of a single `shower fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub profile: LayerProfile,
    pub result: FitResult,
    pub residuals: Vec<LayerResidual>,
    pub reference: Option<Vec<ReferenceRow>>,
}

/// Load `input` and extract its layer profile.
pub fn load_profile(input: &Path, layer_pitch: f64) -> Result<LayerProfile, AppError> {
    let histograms = load_histograms(input)?;
    let profile = extract(&histograms, layer_pitch)?;
    if histograms.len() > profile.len() {
        warn!(
            stored = histograms.len(),
            contiguous = profile.len(),
            "histograms beyond the first missing layer are ignored"
        );
    }
    info!(layers = profile.len(), input = %input.display(), "extracted layer profile");
    Ok(profile)
}

/// Execute extraction + fit for one input file.
pub fn run_fit(config: &RunConfig) -> Result<RunOutput, AppError> {
    config.validate()?;
    let profile = load_profile(&config.input, config.layer_pitch)?;
    if profile.is_empty() {
        warn!(input = %config.input.display(), "no layer histograms found (expected hLayer0, hLayer1, ...)");
    }

    let result = fit(&profile, &config.fit);
    info!(status = result.status.display_name(), "fit finished");

    let residuals = compute_residuals(&profile, &result, &config.fit);
    let reference = config
        .reference
        .as_ref()
        .map(|bh| compare_reference(&profile, &config.fit, bh));

    Ok(RunOutput {
        profile,
        result,
        residuals,
        reference,
    })
}

/// Analyze every run file under `dir`.
///
/// Files are loaded and analyzed in parallel; a file that cannot be loaded or
/// extracted becomes an error row and does not stop the batch.
pub fn run_batch(dir: &Path, layer_pitch: f64, config: &FitConfig) -> Result<Vec<BatchEntry>, AppError> {
    config.validate()?;
    if !(layer_pitch.is_finite() && layer_pitch > 0.0) {
        return Err(AppError::new(2, format!("layer_pitch must be finite and > 0, got {layer_pitch}")));
    }

    let files = list_run_files(dir)?;
    if files.is_empty() {
        return Err(AppError::new(2, format!("No .json or .csv run files in '{}'", dir.display())));
    }
    info!(runs = files.len(), dir = %dir.display(), "starting batch");

    let loaded: Vec<Result<HistogramSet, AppError>> = files.par_iter().map(|p| load_histograms(p)).collect();

    let mut load_errors = Vec::with_capacity(loaded.len());
    let mut sets = Vec::with_capacity(loaded.len());
    for load in loaded {
        match load {
            Ok(set) => {
                load_errors.push(None);
                sets.push(set);
            }
            Err(e) => load_errors.push(Some(e.message().to_string())),
        }
    }
    let mut analyses = analyze_runs(&sets, layer_pitch, config).into_iter();

    let mut entries = Vec::with_capacity(files.len());
    for (path, load_error) in files.iter().zip(load_errors) {
        let run = short_name(path);

        let outcome = match load_error {
            Some(msg) => Err(msg),
            None => match analyses.next() {
                Some(Ok(analysis)) => Ok(analysis),
                Some(Err(e)) => Err(e.to_string()),
                None => Err("run was not analyzed".to_string()),
            },
        };

        let entry = match outcome {
            Ok(analysis) => {
                if analysis.result.status != FitStatus::Success {
                    warn!(run = %run, status = analysis.result.status.display_name(), "run did not fit");
                }
                BatchEntry {
                    run,
                    layers: analysis.profile.len(),
                    outcome: Ok(analysis.result),
                }
            }
            Err(msg) => {
                warn!(run = %run, error = %msg, "run skipped");
                BatchEntry {
                    run,
                    layers: 0,
                    outcome: Err(msg),
                }
            }
        };
        entries.push(entry);
    }

    Ok(entries)
}
