//! Read/write fit report JSON files.
//!
//! A fit report is the portable representation of one analyzed run:
//! - the fit configuration and the extracted layer profile
//! - the fit result (status, parameters, observables)
//! - a precomputed model grid for quick plotting
//!
//! The schema is defined by `domain::ProfileFile`.

use std::fs::File;
use std::path::Path;

use chrono::Utc;

use crate::domain::{CurveGrid, FitConfig, FitResult, LayerProfile, ProfileFile};
use crate::error::AppError;
use crate::models::sample_profile;

/// Number of grid points written for the fitted curve.
pub const GRID_POINTS: usize = 101;

/// Assemble a report for `profile` / `result`.
pub fn build_profile_file(
    input: &Path,
    layer_pitch: f64,
    config: &FitConfig,
    profile: &LayerProfile,
    result: &FitResult,
) -> ProfileFile {
    ProfileFile {
        tool: "shower".to_string(),
        generated_at: Utc::now(),
        input: input.display().to_string(),
        layer_pitch,
        config: config.clone(),
        profile: profile.clone(),
        result: result.clone(),
        grid: build_grid(profile, result, config.epsilon),
    }
}

/// Write a fit report JSON file.
pub fn write_profile_json(path: &Path, report: &ProfileFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create fit report '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::new(4, format!("Failed to write fit report: {e}")))?;
    Ok(())
}

/// Read a fit report JSON file.
pub fn read_profile_json(path: &Path) -> Result<ProfileFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open fit report '{}': {e}", path.display())))?;
    let report: ProfileFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid fit report JSON: {e}")))?;
    Ok(report)
}

fn build_grid(profile: &LayerProfile, result: &FitResult, epsilon: f64) -> CurveGrid {
    let Some(params) = result.params else {
        return CurveGrid::default();
    };
    let depths = profile.depths();
    let z_max = depths.last().copied().unwrap_or(0.0);
    if !(z_max.is_finite() && z_max > 0.0) {
        return CurveGrid::default();
    }
    let (depth, y) = sample_profile(&params, 0.0, z_max, GRID_POINTS, epsilon);
    CurveGrid { depth, y }
}
