//! Command-line parsing for the `shower` binary.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the extraction/fitting code.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::data::FillMode;
use crate::domain::{DEFAULT_EPSILON, DEFAULT_MAX_ITERATIONS, Normalization, YSelector};

/// Default layer pitch: 1.5 mm lead + 4 mm scintillator.
pub const DEFAULT_LAYER_PITCH: f64 = 5.5;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "shower",
    version,
    about = "Longitudinal shower profile extraction and Gamma fitting for sampling calorimeters"
)]
pub struct Cli {
    /// Increase log verbosity (`-v` info, `-vv` debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract per-layer statistics and print the layer table.
    Stats(StatsArgs),
    /// Extract, fit the Gamma profile, print diagnostics and optionally plot/export.
    Fit(FitArgs),
    /// Analyze every run file in a directory (in parallel), one summary row per run.
    Batch(BatchArgs),
    /// Write synthetic histogram snapshots.
    Simulate(SimulateArgs),
    /// Plot a previously exported fit report.
    Plot(PlotArgs),
}

/// Detector geometry.
#[derive(Debug, Args, Clone)]
pub struct GeometryArgs {
    /// Depth per layer (absorber + active medium), e.g. in mm.
    #[arg(long, env = "SHOWER_LAYER_PITCH", default_value_t = DEFAULT_LAYER_PITCH)]
    pub layer_pitch: f64,
}

/// Options controlling the parametric fit.
#[derive(Debug, Args, Clone)]
pub struct FitOptions {
    /// Per-layer quantity to fit.
    #[arg(long = "y", value_enum, default_value_t = YSelector::TotalEnergy)]
    pub y_selector: YSelector,

    /// Leading layers excluded from the fit.
    #[arg(long, default_value_t = 1)]
    pub trim_lead: usize,

    /// Trailing layers excluded from the fit.
    #[arg(long, default_value_t = 1)]
    pub trim_trail: usize,

    /// Depth clamp used when evaluating the model near z = 0.
    #[arg(long, default_value_t = DEFAULT_EPSILON)]
    pub epsilon: f64,

    /// Solver budget (trial steps).
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: usize,

    /// Initial shape parameter (default 4).
    #[arg(long)]
    pub a0: Option<f64>,

    /// Initial rate parameter (default 0.1 per depth unit).
    #[arg(long)]
    pub b0: Option<f64>,

    /// Initial normalization (default: max of the fitted values).
    #[arg(long)]
    pub scale0: Option<f64>,

    /// Rescale values before fitting.
    #[arg(long, value_enum, default_value_t = Normalization::None)]
    pub normalize: Normalization,
}

#[derive(Debug, Parser, Clone)]
pub struct StatsArgs {
    /// Histogram snapshot (.json) or bin table (.csv).
    pub input: PathBuf,

    #[command(flatten)]
    pub geometry: GeometryArgs,

    /// Write the layer table to CSV (`layer,depth,mean,std,total`).
    #[arg(long)]
    pub export_csv: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Histogram snapshot (.json) or bin table (.csv).
    pub input: PathBuf,

    #[command(flatten)]
    pub geometry: GeometryArgs,

    #[command(flatten)]
    pub fit: FitOptions,

    /// Incident energy (MeV) for a Bethe–Heitler reference comparison (lead absorber).
    #[arg(long)]
    pub incident_energy: Option<f64>,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Write the layer table to CSV.
    #[arg(long)]
    pub export_csv: Option<PathBuf>,

    /// Write the fit report (config, profile, result, fitted grid) to JSON.
    #[arg(long)]
    pub export_json: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct BatchArgs {
    /// Directory containing run files (.json / .csv).
    pub dir: PathBuf,

    #[command(flatten)]
    pub geometry: GeometryArgs,

    #[command(flatten)]
    pub fit: FitOptions,
}

#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    /// Output snapshot path; with `--runs > 1` this is a directory.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Number of runs to generate (seeds `seed, seed + 1, ...`).
    #[arg(long, default_value_t = 1)]
    pub runs: usize,

    #[arg(long, default_value_t = 20)]
    pub layers: usize,

    #[command(flatten)]
    pub geometry: GeometryArgs,

    #[arg(long, default_value_t = 1000)]
    pub events: usize,

    /// Mean visible shower energy (MeV).
    #[arg(long, default_value_t = 50.0)]
    pub energy: f64,

    /// Gamma shape of the generating profile.
    #[arg(long, default_value_t = 4.0)]
    pub shape: f64,

    /// Gamma rate of the generating profile (per depth unit).
    #[arg(long, default_value_t = 0.08)]
    pub rate: f64,

    /// Stochastic resolution term (σ = resolution · sqrt(E)).
    #[arg(long, default_value_t = 0.3)]
    pub resolution: f64,

    #[arg(long, default_value_t = 100)]
    pub bins: usize,

    /// Upper edge of the per-layer energy histograms (MeV).
    #[arg(long, default_value_t = 10.0)]
    pub energy_max: f64,

    #[arg(long, value_enum, default_value_t = FillMode::Counts)]
    pub fill: FillMode,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Options for plotting a saved fit report.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Fit report JSON produced by `shower fit --export-json`.
    pub report: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_defaults() {
        let cli = Cli::try_parse_from(["shower", "fit", "run.json"]).unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.fit.trim_lead, 1);
        assert_eq!(args.fit.trim_trail, 1);
        assert_eq!(args.fit.y_selector, YSelector::TotalEnergy);
        assert!(args.fit.a0.is_none());
        assert!(!args.no_plot);
    }

    #[test]
    fn verbosity_is_global() {
        let cli = Cli::try_parse_from(["shower", "stats", "run.csv", "-vv", "--layer-pitch", "4"]).unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Stats(args) = cli.command else {
            panic!("expected stats");
        };
        assert_eq!(args.geometry.layer_pitch, 4.0);
    }

    #[test]
    fn value_enums_parse() {
        let cli = Cli::try_parse_from([
            "shower", "batch", "runs/", "--y", "mean", "--normalize", "peak", "--trim-lead", "0",
        ])
        .unwrap();
        let Command::Batch(args) = cli.command else {
            panic!("expected batch");
        };
        assert_eq!(args.fit.y_selector, YSelector::MeanEnergy);
        assert_eq!(args.fit.normalize, Normalization::Peak);
        assert_eq!(args.fit.trim_lead, 0);
    }
}
