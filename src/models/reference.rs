//! Analytic Bethe–Heitler expectation for electromagnetic showers.
//!
//! In radiation-length units `t = z / X0` the mean longitudinal profile follows
//! a Gamma shape with rate `b ≈ 0.5` and shape `a = 1 + b · ln(E0 / Ec)`, i.e. the
//! shower maximum sits at `t_max = ln(E0 / Ec)`.
//!
//! Both the expectation and the measured profile are compared after normalizing
//! to unit sum, so only the *shape* matters.

use serde::{Deserialize, Serialize};
use statrs::function::gamma::ln_gamma;

use crate::error::ProfileError;

/// Lead critical energy (MeV).
pub const LEAD_CRITICAL_ENERGY: f64 = 8.9;
/// Lead radiation length (mm).
pub const LEAD_RADIATION_LENGTH: f64 = 5.6;
/// Conventional rate parameter in radiation-length units.
pub const DEFAULT_RATE: f64 = 0.5;

const T_EPS: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetheHeitler {
    /// Incident particle energy (MeV).
    pub incident_energy: f64,
    /// Critical energy of the absorber (MeV).
    pub critical_energy: f64,
    /// Radiation length of the absorber (depth units).
    pub radiation_length: f64,
    /// Rate in radiation-length units.
    pub b: f64,
}

impl BetheHeitler {
    /// Lead absorber defaults for the given incident energy.
    pub fn lead(incident_energy: f64) -> Self {
        Self {
            incident_energy,
            critical_energy: LEAD_CRITICAL_ENERGY,
            radiation_length: LEAD_RADIATION_LENGTH,
            b: DEFAULT_RATE,
        }
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        let fields = [
            ("incident_energy", self.incident_energy),
            ("critical_energy", self.critical_energy),
            ("radiation_length", self.radiation_length),
            ("b", self.b),
        ];
        for (name, v) in fields {
            if !(v.is_finite() && v > 0.0) {
                return Err(ProfileError::InvalidConfig(format!(
                    "Bethe-Heitler {name} must be finite and > 0, got {v}"
                )));
            }
        }
        if self.shape() <= 0.0 {
            return Err(ProfileError::InvalidConfig(format!(
                "incident energy {} MeV is too far below the critical energy {} MeV",
                self.incident_energy, self.critical_energy
            )));
        }
        Ok(())
    }

    /// Shape parameter `a = 1 + b · ln(E0 / Ec)`.
    pub fn shape(&self) -> f64 {
        1.0 + self.b * (self.incident_energy / self.critical_energy).ln()
    }

    /// Expected shower maximum in depth units.
    pub fn shower_max_depth(&self) -> f64 {
        (self.shape() - 1.0) / self.b * self.radiation_length
    }

    /// Expected shape at `depths`, normalized to unit sum.
    pub fn expected_shape(&self, depths: &[f64]) -> Vec<f64> {
        let a = self.shape();
        let b = self.b;
        let raw: Vec<f64> = depths
            .iter()
            .map(|&z| {
                let bt = b * (z / self.radiation_length).max(T_EPS);
                (b.ln() + (a - 1.0) * bt.ln() - bt - ln_gamma(a)).exp()
            })
            .collect();
        normalize_unit_sum(&raw)
    }
}

/// Scale `values` so they sum to one; all-zero (or empty) input is returned as zeros.
pub fn normalize_unit_sum(values: &[f64]) -> Vec<f64> {
    let sum: f64 = values.iter().sum();
    if sum == 0.0 || !sum.is_finite() {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| v / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn shape_follows_log_energy_ratio() {
        let bh = BetheHeitler::lead(10.0);
        assert_abs_diff_eq!(bh.shape(), 1.0 + 0.5 * (10.0_f64 / 8.9).ln(), epsilon = 1e-12);
    }

    #[test]
    fn expected_shape_is_normalized_and_peaks_near_t_max() {
        let bh = BetheHeitler::lead(10_000.0);
        let depths: Vec<f64> = (0..40).map(|i| i as f64 * 2.0).collect();
        let shape = bh.expected_shape(&depths);
        assert_abs_diff_eq!(shape.iter().sum::<f64>(), 1.0, epsilon = 1e-12);

        let (peak_idx, _) = shape
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc });
        assert!((depths[peak_idx] - bh.shower_max_depth()).abs() <= 2.0);
    }

    #[test]
    fn normalize_handles_all_zero() {
        assert_eq!(normalize_unit_sum(&[0.0, 0.0]), vec![0.0, 0.0]);
        assert_eq!(normalize_unit_sum(&[1.0, 3.0]), vec![0.25, 0.75]);
    }

    #[test]
    fn validate_rejects_sub_critical_energy() {
        let bh = BetheHeitler::lead(0.01);
        assert!(bh.validate().is_err());
    }
}
