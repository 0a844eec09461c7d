//! End-to-end: synthetic run -> snapshot file -> extraction -> fit.

use std::fs;
use std::path::PathBuf;

use shower_profile::app::pipeline::{run_batch, run_fit};
use shower_profile::data::{FillMode, SimulationConfig, generate_run};
use shower_profile::domain::{FitConfig, FitStatus, Histogram, RunConfig};
use shower_profile::fit::analyze;
use shower_profile::io::{
    HistogramSet, build_profile_file, load_histograms, read_profile_json, write_profile_json, write_snapshot_json,
};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("shower-profile-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn simulation() -> SimulationConfig {
    SimulationConfig {
        events: 1000,
        resolution: 0.1,
        energy_max: 20.0,
        fill: FillMode::EnergyWeighted,
        ..SimulationConfig::default()
    }
}

fn run_config(input: PathBuf) -> RunConfig {
    RunConfig {
        input,
        layer_pitch: 5.5,
        fit: FitConfig::default(),
        plot: false,
        plot_width: 80,
        plot_height: 20,
        export_csv: None,
        export_json: None,
        reference: None,
    }
}

#[test]
fn synthetic_run_fits_near_generating_shower_max() {
    let sim = simulation();
    let run = generate_run(&sim).unwrap();
    let analysis = analyze(&run, sim.layer_pitch, &FitConfig::default()).unwrap();

    assert_eq!(analysis.profile.len(), sim.layers);
    assert_eq!(analysis.result.status, FitStatus::Success);
    // Layers integrate over [z, z + pitch) but are placed at z, so the fitted
    // maximum sits about half a pitch before (a - 1) / b = 37.5.
    let max = analysis.result.shower_max_depth.unwrap();
    assert!((30.0..40.0).contains(&max), "shower max {max}");
    assert_eq!(analysis.result.shower_max_layer, Some(6));
}

#[test]
fn snapshot_file_round_trip_through_fit() {
    let dir = scratch_dir("fit");
    let input = dir.join("run.json");
    let run = generate_run(&simulation()).unwrap();
    write_snapshot_json(&input, &run).unwrap();

    assert_eq!(load_histograms(&input).unwrap(), run);

    let config = run_config(input.clone());
    let out = run_fit(&config).unwrap();
    assert_eq!(out.result.status, FitStatus::Success);
    assert_eq!(out.residuals.len(), out.profile.len());

    let report_path = dir.join("report.json");
    let report = build_profile_file(&input, 5.5, &config.fit, &out.profile, &out.result);
    write_profile_json(&report_path, &report).unwrap();
    let back = read_profile_json(&report_path).unwrap();
    assert_eq!(back.profile, out.profile);
    assert_eq!(back.result, out.result);
    assert!(!back.grid.depth.is_empty());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn reference_profile_from_csv_bins() {
    let dir = scratch_dir("csv");
    let input = dir.join("run.csv");
    let totals = [2.0, 40.0, 90.0, 120.0, 95.0, 60.0, 30.0, 12.0, 4.0, 1.0];
    let mut csv = String::from("layer,edge_low,edge_high,content\n");
    for (i, t) in totals.iter().enumerate() {
        csv.push_str(&format!("{i},0,1,{t}\n"));
    }
    fs::write(&input, csv).unwrap();

    let out = run_fit(&run_config(input)).unwrap();
    assert_eq!(out.profile.len(), 10);
    assert_eq!(out.profile.layers[3].depth, 16.5);
    assert_eq!(out.result.shower_max_layer, Some(3));
    assert_eq!(out.result.tail_leakage, Some(202.0));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn batch_reports_every_file() {
    let dir = scratch_dir("batch");
    for seed in 0..3 {
        let sim = SimulationConfig { seed, ..simulation() };
        write_snapshot_json(&dir.join(format!("run_{seed:03}.json")), &generate_run(&sim).unwrap()).unwrap();
    }
    let broken: HistogramSet = [(0, Histogram::new(vec![0.0, 1.0, 2.0], vec![1.0]))].into_iter().collect();
    write_snapshot_json(&dir.join("zz_broken.json"), &broken).unwrap();
    fs::write(dir.join("notes.txt"), "ignored").unwrap();

    let entries = run_batch(&dir, 5.5, &FitConfig::default()).unwrap();
    assert_eq!(entries.len(), 4);
    for entry in &entries[..3] {
        assert_eq!(entry.outcome.as_ref().unwrap().status, FitStatus::Success, "{}", entry.run);
    }
    assert_eq!(entries[3].run, "zz_broken.json");
    assert!(entries[3].outcome.as_ref().unwrap_err().contains("shape mismatch"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn unsupported_input_is_exit_code_two() {
    let err = run_fit(&run_config(PathBuf::from("run.root"))).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}
