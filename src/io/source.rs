//! Histogram sources.
//!
//! The extractor never knows where histograms come from; it only probes a
//! `HistogramSource` for layers `0, 1, 2, ...` until one is missing.

use std::collections::BTreeMap;

use crate::domain::Histogram;

/// Yields the histogram of a layer, or `None` when the layer does not exist.
pub trait HistogramSource {
    fn layer(&self, index: usize) -> Option<Histogram>;
}

/// An ordered map of layer index to histogram is itself a source.
impl HistogramSource for BTreeMap<usize, Histogram> {
    fn layer(&self, index: usize) -> Option<Histogram> {
        self.get(&index).cloned()
    }
}

/// In-memory histogram set, the common currency of all file-backed sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistogramSet {
    layers: BTreeMap<usize, Histogram>,
}

impl HistogramSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, layer: usize, histogram: Histogram) -> Option<Histogram> {
        self.layers.insert(layer, histogram)
    }

    pub fn get(&self, layer: usize) -> Option<&Histogram> {
        self.layers.get(&layer)
    }

    /// Number of stored layers (including any beyond a gap).
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Histogram)> {
        self.layers.iter().map(|(&k, v)| (k, v))
    }
}

impl From<BTreeMap<usize, Histogram>> for HistogramSet {
    fn from(layers: BTreeMap<usize, Histogram>) -> Self {
        Self { layers }
    }
}

impl FromIterator<(usize, Histogram)> for HistogramSet {
    fn from_iter<I: IntoIterator<Item = (usize, Histogram)>>(iter: I) -> Self {
        Self {
            layers: iter.into_iter().collect(),
        }
    }
}

impl HistogramSource for HistogramSet {
    fn layer(&self, index: usize) -> Option<Histogram> {
        self.layers.get(&index).cloned()
    }
}

/// Parse a layer index out of a histogram name: `hLayer12` or a bare `12`.
///
/// ROOT-style cycle suffixes (`hLayer3;1`) are ignored. Anything else yields `None`.
pub fn parse_layer_name(name: &str) -> Option<usize> {
    let name = name.trim();
    let name = name.split(';').next().unwrap_or(name);
    let digits = name.strip_prefix("hLayer").unwrap_or(name);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_names() {
        assert_eq!(parse_layer_name("hLayer0"), Some(0));
        assert_eq!(parse_layer_name("hLayer12;1"), Some(12));
        assert_eq!(parse_layer_name("7"), Some(7));
        assert_eq!(parse_layer_name("hTotal"), None);
        assert_eq!(parse_layer_name("hLayer"), None);
        assert_eq!(parse_layer_name("hLayer-1"), None);
    }

    #[test]
    fn set_answers_probes() {
        let set: HistogramSet = [(0, Histogram::uniform(2, 0.0, 1.0))].into_iter().collect();
        assert!(set.layer(0).is_some());
        assert!(set.layer(1).is_none());
    }
}
