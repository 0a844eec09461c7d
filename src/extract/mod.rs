//! Layer statistics extraction (histograms -> `LayerProfile`).

pub mod extractor;

pub use extractor::*;
