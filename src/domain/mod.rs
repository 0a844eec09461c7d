//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw inputs (`Histogram`)
//! - the extracted profile (`LayerStats`, `LayerProfile`)
//! - fit configuration (`FitConfig`, `YSelector`, `Trim`, `InitialGuess`)
//! - fit outputs (`FitResult`, `FitStatus`, `GammaParams`, etc.)

pub mod types;

pub use types::*;
