//! Layer statistics extraction.
//!
//! Turns raw per-layer histograms into a `LayerProfile`:
//!
//! - probe layers `0, 1, 2, ...` until the source has no histogram (first gap ends discovery)
//! - validate each histogram (shape, finiteness, monotone edges)
//! - compute total, content-weighted mean and std of the bin centers
//! - assign `depth = index * layer_pitch`

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{Histogram, LayerProfile, LayerStats};
use crate::error::ProfileError;
use crate::io::HistogramSource;
use crate::math::weighted_moments;

/// Extract the longitudinal profile from a histogram source.
pub fn extract<S: HistogramSource + ?Sized>(
    source: &S,
    layer_pitch: f64,
) -> Result<LayerProfile, ProfileError> {
    let mut layers = Vec::new();
    let mut index = 0usize;
    while let Some(hist) = source.layer(index) {
        let stats = layer_stats(index, &hist, layer_pitch)?;
        debug!(
            layer = index,
            depth = stats.depth,
            total = stats.total_energy,
            mean = stats.mean_energy,
            std = stats.std_energy,
            "extracted layer"
        );
        layers.push(stats);
        index += 1;
    }
    Ok(LayerProfile::new(layers))
}

/// Extract from an ordered map of layer index to histogram.
pub fn extract_layers(
    histograms: &BTreeMap<usize, Histogram>,
    layer_pitch: f64,
) -> Result<LayerProfile, ProfileError> {
    extract(histograms, layer_pitch)
}

/// Statistics of a single layer.
pub fn layer_stats(index: usize, hist: &Histogram, layer_pitch: f64) -> Result<LayerStats, ProfileError> {
    validate_histogram(index, hist)?;

    let centers = hist.centers();
    let moments = weighted_moments(&centers, &hist.contents);

    Ok(LayerStats {
        layer: index,
        depth: index as f64 * layer_pitch,
        mean_energy: moments.mean,
        std_energy: moments.std,
        total_energy: moments.total,
    })
}

fn validate_histogram(index: usize, hist: &Histogram) -> Result<(), ProfileError> {
    if hist.edges.len() != hist.contents.len() + 1 {
        return Err(ProfileError::ShapeMismatch {
            layer: index,
            edges: hist.edges.len(),
            contents: hist.contents.len(),
        });
    }
    if hist
        .edges
        .iter()
        .chain(hist.contents.iter())
        .any(|v| !v.is_finite())
    {
        return Err(ProfileError::NonFinite { layer: index });
    }
    if hist.edges.windows(2).any(|w| w[1] <= w[0]) {
        return Err(ProfileError::NonMonotonicEdges { layer: index });
    }
    Ok(())
}
