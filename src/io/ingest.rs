//! Histogram ingest.
//!
//! Two on-disk layouts load into the same `HistogramSet`:
//!
//! - **JSON snapshot**: a top-level object mapping histogram names (`hLayer<i>`
//!   or bare `<i>`) to `{ "edges": [...], "contents": [...] }`. Other keys
//!   (totals, metadata) are ignored.
//! - **CSV long format**: one row per bin with columns
//!   `layer,edge_low,edge_high,content`. Rows of a layer must be contiguous
//!   (`edge_low` equals the previous row's `edge_high`).
//!
//! Errors are reported with exit code 2. Shape and finiteness checks of the
//! resulting histograms are left to the extractor.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::domain::Histogram;
use crate::error::AppError;
use crate::io::source::{HistogramSet, parse_layer_name};

/// Supported input layouts, resolved from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Json,
    Csv,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Load all layer histograms from `path`.
pub fn load_histograms(path: &Path) -> Result<HistogramSet, AppError> {
    let format = InputFormat::from_path(path).ok_or_else(|| {
        AppError::new(
            2,
            format!(
                "Unsupported input '{}': expected a .json snapshot or a .csv bin table",
                path.display()
            ),
        )
    })?;
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open input '{}': {e}", path.display())))?;

    let set = match format {
        InputFormat::Json => read_json_snapshot(file),
        InputFormat::Csv => read_csv_bins(file),
    }
    .map_err(|msg| AppError::new(2, format!("{}: {msg}", path.display())))?;

    tracing::debug!(path = %path.display(), histograms = set.len(), "loaded histograms");
    Ok(set)
}

/// Parse a JSON snapshot.
pub fn read_json_snapshot<R: Read>(reader: R) -> Result<HistogramSet, String> {
    let root: BTreeMap<String, serde_json::Value> =
        serde_json::from_reader(reader).map_err(|e| format!("Invalid histogram JSON: {e}"))?;

    let mut set = HistogramSet::new();
    for (name, value) in root {
        let Some(layer) = parse_layer_name(&name) else {
            continue;
        };
        let hist: Histogram =
            serde_json::from_value(value).map_err(|e| format!("Invalid histogram `{name}`: {e}"))?;
        if set.insert(layer, hist).is_some() {
            return Err(format!("Duplicate histogram for layer {layer} (`{name}`)"));
        }
    }
    Ok(set)
}

/// Parse a CSV bin table.
pub fn read_csv_bins<R: Read>(reader: R) -> Result<HistogramSet, String> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| format!("Failed to read CSV headers: {e}"))?
        .clone();
    let header_map = build_header_map(&headers);
    for name in ["layer", "edge_low", "edge_high", "content"] {
        if !header_map.contains_key(name) {
            return Err(format!("Missing required column: `{name}`"));
        }
    }

    let mut layers: BTreeMap<usize, Histogram> = BTreeMap::new();
    for (idx, record) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let record = record.map_err(|e| format!("line {line}: {e}"))?;
        let row = parse_row(&record, &header_map).map_err(|e| format!("line {line}: {e}"))?;

        let hist = layers
            .entry(row.layer)
            .or_insert_with(|| Histogram::new(vec![row.edge_low], Vec::new()));
        let last_edge = hist.edges.last().copied().unwrap_or(row.edge_low);
        if row.edge_low != last_edge {
            return Err(format!(
                "line {line}: layer {} bin starts at {} but the previous bin ends at {last_edge}",
                row.layer, row.edge_low
            ));
        }
        hist.edges.push(row.edge_high);
        hist.contents.push(row.content);
    }

    Ok(layers.into())
}

#[derive(Debug, Clone, Copy)]
struct BinRow {
    layer: usize,
    edge_low: f64,
    edge_high: f64,
    content: f64,
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<BinRow, String> {
    let layer = get_required(record, header_map, "layer")?;
    let layer = layer
        .parse::<usize>()
        .map_err(|_| format!("Invalid layer index '{layer}'"))?;
    Ok(BinRow {
        layer,
        edge_low: parse_f64(get_required(record, header_map, "edge_low")?)?,
        edge_high: parse_f64(get_required(record, header_map, "edge_high")?)?,
        content: parse_f64(get_required(record, header_map, "content")?)?,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports may prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn parse_f64(s: &str) -> Result<f64, String> {
    s.parse::<f64>().map_err(|_| format!("Invalid number '{s}'"))
}

/// Input files of a batch directory (`.json` / `.csv`), sorted by path.
pub fn list_run_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| AppError::new(2, format!("Failed to read directory '{}': {e}", dir.display())))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AppError::new(2, format!("Failed to read directory entry: {e}")))?;
        let path = entry.path();
        if path.is_file() && InputFormat::from_path(&path).is_some() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
