//! `shower-profile` library crate.
//!
//! The binary (`shower`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - extraction and fitting can be driven from other histogram sources
//! - code stays easy to navigate as the project grows
//!
//! Core flow: `io::HistogramSource` -> `extract::extract` -> `fit::fit`.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod extract;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
