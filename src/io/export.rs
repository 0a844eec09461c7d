//! Exports.
//!
//! - the per-layer table as CSV (`layer,depth,mean,std,total`), meant to be
//!   easy to consume in spreadsheets or downstream scripts
//! - histogram sets as JSON snapshots readable by `ingest`

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::domain::{Histogram, LayerProfile};
use crate::error::AppError;
use crate::io::source::HistogramSet;

#[derive(Debug, Serialize)]
struct LayerRow {
    layer: usize,
    depth: f64,
    mean: f64,
    std: f64,
    total: f64,
}

/// Write the layer table of `profile` to a CSV file.
pub fn write_layer_stats_csv(path: &Path, profile: &LayerProfile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_layer_stats(file, profile)
}

/// Write the layer table of `profile` to any writer.
pub fn write_layer_stats<W: Write>(writer: W, profile: &LayerProfile) -> Result<(), AppError> {
    let mut out = csv::Writer::from_writer(writer);
    for l in &profile.layers {
        out.serialize(LayerRow {
            layer: l.layer,
            depth: l.depth,
            mean: l.mean_energy,
            std: l.std_energy,
            total: l.total_energy,
        })
        .map_err(|e| AppError::new(4, format!("Failed to write export CSV row: {e}")))?;
    }
    out.flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

/// Write `set` as a JSON snapshot with `hLayer<i>` keys.
pub fn write_snapshot_json(path: &Path, set: &HistogramSet) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create snapshot '{}': {e}", path.display())))?;
    write_snapshot(file, set)
}

pub fn write_snapshot<W: Write>(writer: W, set: &HistogramSet) -> Result<(), AppError> {
    let named: BTreeMap<String, &Histogram> = set
        .iter()
        .map(|(layer, hist)| (format!("hLayer{layer}"), hist))
        .collect();
    serde_json::to_writer_pretty(writer, &named)
        .map_err(|e| AppError::new(4, format!("Failed to write snapshot: {e}")))
}
