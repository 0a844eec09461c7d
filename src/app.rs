//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` defaults and parses CLI arguments
//! - installs the log subscriber
//! - dispatches to the subcommand handlers (extract, fit, batch, simulate, plot)
//! - prints reports/plots and writes optional exports

use std::path::Path;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{BatchArgs, Cli, Command, FitArgs, FitOptions, PlotArgs, SimulateArgs, StatsArgs};
use crate::data::{SimulationConfig, generate_run};
use crate::domain::{FitConfig, InitialGuess, RunConfig, Trim};
use crate::error::AppError;
use crate::io::{build_profile_file, read_profile_json, write_layer_stats_csv, write_profile_json, write_snapshot_json};
use crate::models::BetheHeitler;
use crate::report::{format_batch_table, format_fit_summary, format_profile_table, format_reference, format_residuals};

pub mod pipeline;

/// Entry point for the `shower` binary.
pub fn run() -> Result<(), AppError> {
    // A missing `.env` is the normal case.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Stats(args) => handle_stats(args),
        Command::Fit(args) => handle_fit(args),
        Command::Batch(args) => handle_batch(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Plot(args) => handle_plot(args),
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second init (e.g. from tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_stats(args: StatsArgs) -> Result<(), AppError> {
    let pitch = args.geometry.layer_pitch;
    if !(pitch.is_finite() && pitch > 0.0) {
        return Err(AppError::new(2, format!("layer_pitch must be finite and > 0, got {pitch}")));
    }
    let profile = pipeline::load_profile(&args.input, pitch)?;
    println!("{}", format_profile_table(&profile));

    if let Some(path) = &args.export_csv {
        write_layer_stats_csv(path, &profile)?;
        info!(path = %path.display(), "wrote layer table");
    }
    Ok(())
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args);
    let run = pipeline::run_fit(&config)?;
    let input = config.input.display().to_string();

    println!(
        "{}",
        format_fit_summary(&input, config.layer_pitch, &config.fit, &run.profile, &run.result)
    );
    if !run.residuals.is_empty() {
        println!("{}", format_residuals(&run.residuals));
    }
    if let (Some(rows), Some(reference)) = (&run.reference, &config.reference) {
        println!("{}", format_reference(rows, reference));
    }
    if config.plot {
        let plot = crate::plot::render_fit_plot(
            &run.profile,
            &run.result,
            &config.fit,
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }

    // Optional exports.
    if let Some(path) = &config.export_csv {
        write_layer_stats_csv(path, &run.profile)?;
        info!(path = %path.display(), "wrote layer table");
    }
    if let Some(path) = &config.export_json {
        let report = build_profile_file(&config.input, config.layer_pitch, &config.fit, &run.profile, &run.result);
        write_profile_json(path, &report)?;
        info!(path = %path.display(), "wrote fit report");
    }

    Ok(())
}

fn handle_batch(args: BatchArgs) -> Result<(), AppError> {
    let config = fit_config_from_options(&args.fit);
    let entries = pipeline::run_batch(&args.dir, args.geometry.layer_pitch, &config)?;
    println!("{}", format_batch_table(&entries));
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let base = simulation_config_from_args(&args);
    if args.runs == 0 {
        return Err(AppError::new(2, "Run count must be > 0."));
    }

    if args.runs == 1 {
        let run = generate_run(&base)?;
        write_snapshot_json(&args.output, &run)?;
        println!("Wrote {} layers to {}", run.len(), args.output.display());
        return Ok(());
    }

    std::fs::create_dir_all(&args.output).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to create output directory '{}': {e}", args.output.display()),
        )
    })?;
    for i in 0..args.runs {
        let config = SimulationConfig {
            seed: base.seed.wrapping_add(i as u64),
            ..base.clone()
        };
        let run = generate_run(&config)?;
        let path = args.output.join(format!("run_{i:03}.json"));
        write_snapshot_json(&path, &run)?;
    }
    println!("Wrote {} runs to {}", args.runs, args.output.display());
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let report = read_profile_json(&args.report)?;
    let plot = crate::plot::render_report_plot(&report, args.width, args.height);
    println!("{plot}");
    Ok(())
}

pub fn fit_config_from_options(opts: &FitOptions) -> FitConfig {
    FitConfig {
        y_selector: opts.y_selector,
        trim: Trim {
            lead: opts.trim_lead,
            trail: opts.trim_trail,
        },
        epsilon: opts.epsilon,
        max_iterations: opts.max_iterations,
        initial_guess: InitialGuess {
            a: opts.a0,
            b: opts.b0,
            scale: opts.scale0,
        },
        normalize: opts.normalize,
    }
}

pub fn run_config_from_args(args: &FitArgs) -> RunConfig {
    RunConfig {
        input: args.input.clone(),
        layer_pitch: args.geometry.layer_pitch,
        fit: fit_config_from_options(&args.fit),
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_csv: args.export_csv.clone(),
        export_json: args.export_json.clone(),
        reference: args.incident_energy.map(BetheHeitler::lead),
    }
}

pub fn simulation_config_from_args(args: &SimulateArgs) -> SimulationConfig {
    SimulationConfig {
        layers: args.layers,
        layer_pitch: args.geometry.layer_pitch,
        events: args.events,
        energy: args.energy,
        shape: args.shape,
        rate: args.rate,
        resolution: args.resolution,
        bins: args.bins,
        energy_max: args.energy_max,
        fill: args.fill,
        seed: args.seed,
    }
}

/// Display name for a path in reports (file name when available).
pub fn short_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
