//! Synthetic calorimeter runs.
//!
//! Each layer's expected visible energy follows the Gamma longitudinal profile
//! integrated over the layer's depth interval. Per event the deposit is drawn
//! from a Gaussian with stochastic resolution `σ = resolution · sqrt(μ)`,
//! truncated at zero, and filled into a fixed-binning histogram.

use clap::ValueEnum;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use statrs::function::gamma::gamma_lr;

use crate::domain::Histogram;
use crate::error::AppError;
use crate::io::HistogramSet;

/// How a deposit is recorded in its layer histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FillMode {
    /// One entry per event (the histogram counts events per energy bin).
    #[default]
    Counts,
    /// Entries weighted by the deposited energy (bin contents sum to energy).
    EnergyWeighted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub layers: usize,
    pub layer_pitch: f64,
    pub events: usize,
    /// Mean visible energy of the whole shower (MeV).
    pub energy: f64,
    /// Gamma shape `a` of the generating profile.
    pub shape: f64,
    /// Gamma rate `b` of the generating profile (per depth unit).
    pub rate: f64,
    /// Stochastic term: `σ = resolution · sqrt(μ)`.
    pub resolution: f64,
    pub bins: usize,
    pub energy_max: f64,
    pub fill: FillMode,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            layers: 20,
            layer_pitch: 5.5,
            events: 1000,
            energy: 50.0,
            shape: 4.0,
            rate: 0.08,
            resolution: 0.3,
            bins: 100,
            energy_max: 10.0,
            fill: FillMode::Counts,
            seed: 42,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.layers == 0 || self.bins == 0 || self.events == 0 {
            return Err(AppError::new(2, "Layers, bins and events must all be > 0."));
        }
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !(positive(self.layer_pitch) && positive(self.energy_max)) {
            return Err(AppError::new(2, "Layer pitch and histogram range must be finite and > 0."));
        }
        if !(positive(self.energy) && positive(self.shape) && positive(self.rate)) {
            return Err(AppError::new(2, "Shower energy, shape and rate must be finite and > 0."));
        }
        if !(self.resolution.is_finite() && self.resolution >= 0.0) {
            return Err(AppError::new(2, "Resolution must be finite and >= 0."));
        }
        Ok(())
    }
}

/// Expected visible energy of each layer.
///
/// Layer `i` covers depths `[i·pitch, (i+1)·pitch)`; its share of the shower is
/// `P(a, b·z_hi) − P(a, b·z_lo)` with `P` the regularized lower incomplete gamma.
pub fn expected_layer_energies(config: &SimulationConfig) -> Vec<f64> {
    let cdf = |z: f64| {
        let x = config.rate * z;
        if x <= 0.0 { 0.0 } else { gamma_lr(config.shape, x) }
    };
    (0..config.layers)
        .map(|i| {
            let z_lo = i as f64 * config.layer_pitch;
            let z_hi = z_lo + config.layer_pitch;
            config.energy * (cdf(z_hi) - cdf(z_lo)).max(0.0)
        })
        .collect()
}

/// Generate one synthetic run.
pub fn generate_run(config: &SimulationConfig) -> Result<HistogramSet, AppError> {
    config.validate()?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let expected = expected_layer_energies(config);

    let mut layers: Vec<Histogram> = (0..config.layers)
        .map(|_| Histogram::uniform(config.bins, 0.0, config.energy_max))
        .collect();
    let noise: Vec<Normal<f64>> = expected
        .iter()
        .map(|&mu| Normal::new(mu, config.resolution * mu.sqrt()))
        .collect::<Result<_, _>>()
        .map_err(|e| AppError::new(4, format!("Deposit distribution error: {e}")))?;

    // Event-major loop so a run with more events extends a shorter one.
    for _ in 0..config.events {
        for (hist, dist) in layers.iter_mut().zip(&noise) {
            let deposit = dist.sample(&mut rng).max(0.0);
            if deposit <= 0.0 {
                continue;
            }
            let weight = match config.fill {
                FillMode::Counts => 1.0,
                FillMode::EnergyWeighted => deposit,
            };
            hist.fill(deposit, weight);
        }
    }

    tracing::debug!(
        layers = config.layers,
        events = config.events,
        seed = config.seed,
        "generated synthetic run"
    );
    Ok(layers.into_iter().enumerate().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;
    use crate::fit::argmax_first;
    use approx::assert_relative_eq;

    #[test]
    fn expected_energies_sum_to_contained_fraction() {
        let config = SimulationConfig {
            layers: 200,
            ..SimulationConfig::default()
        };
        let total: f64 = expected_layer_energies(&config).iter().sum();
        assert_relative_eq!(total, config.energy, max_relative = 1e-6);
    }

    #[test]
    fn expected_energies_peak_near_shower_max() {
        let config = SimulationConfig::default();
        let e = expected_layer_energies(&config);
        // (a - 1) / b = 37.5 mm lies in layer 6 at 5.5 mm pitch.
        assert_eq!(argmax_first(&e), Some(6));
    }

    #[test]
    fn same_seed_same_run() {
        let config = SimulationConfig {
            events: 50,
            ..SimulationConfig::default()
        };
        assert_eq!(generate_run(&config).unwrap(), generate_run(&config).unwrap());

        let other = SimulationConfig { seed: 7, ..config.clone() };
        assert_ne!(generate_run(&config).unwrap(), generate_run(&other).unwrap());
    }

    #[test]
    fn energy_weighted_mean_tracks_expectation() {
        let config = SimulationConfig {
            events: 2000,
            resolution: 0.1,
            fill: FillMode::EnergyWeighted,
            energy_max: 20.0,
            ..SimulationConfig::default()
        };
        let run = generate_run(&config).unwrap();
        assert_eq!(run.len(), config.layers);

        let profile = extract(&run, config.layer_pitch).unwrap();
        let expected = expected_layer_energies(&config);
        let peak = argmax_first(&expected).unwrap();
        let per_event = profile.layers[peak].total_energy / config.events as f64;
        assert_relative_eq!(per_event, expected[peak], max_relative = 0.05);
    }

    #[test]
    fn counts_never_exceed_events() {
        let config = SimulationConfig {
            events: 300,
            ..SimulationConfig::default()
        };
        let run = generate_run(&config).unwrap();
        for (_, hist) in run.iter() {
            let n: f64 = hist.contents.iter().sum();
            assert!(n <= 300.0);
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SimulationConfig {
            rate: 0.0,
            ..SimulationConfig::default()
        };
        assert_eq!(generate_run(&config).unwrap_err().exit_code(), 2);
    }
}
