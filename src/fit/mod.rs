//! Shower profile fitting.
//!
//! Responsibilities:
//!
//! - model-free shape statistics (flatness, shower-max layer, tail leakage)
//! - Levenberg–Marquardt fit of the Gamma profile
//! - per-run orchestration and parallel batch analysis

pub mod batch;
pub mod fitter;
pub mod levenberg;
pub mod shape;

pub use batch::*;
pub use fitter::*;
pub use levenberg::{LmFit, LmOptions, levenberg_marquardt};
pub use shape::*;
