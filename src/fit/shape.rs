//! Model-free shape statistics of a profile.
//!
//! These never look at the parametric fit: they are computed directly from the
//! measured values and serve as a cross-check of the fitted shower maximum.

use crate::domain::Trim;

/// Absolute tolerance of the flatness test.
const FLAT_ATOL: f64 = 1e-8;
/// Relative tolerance of the flatness test.
const FLAT_RTOL: f64 = 1e-5;

/// `true` when every value equals the first within `FLAT_ATOL + FLAT_RTOL·|y0|`.
///
/// An empty slice is flat (it carries no shape either).
pub fn is_flat(values: &[f64]) -> bool {
    let Some(&first) = values.first() else {
        return true;
    };
    let tol = FLAT_ATOL + FLAT_RTOL * first.abs();
    values.iter().all(|v| (v - first).abs() <= tol)
}

/// Index of the largest value; ties resolve to the lowest index.
pub fn argmax_first(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Measured shower-maximum layer and the sum of all values beyond it.
///
/// An empty tail is `+0.0`.
pub fn tail_leakage(values: &[f64]) -> Option<(usize, f64)> {
    let max_layer = argmax_first(values)?;
    let tail = values[max_layer + 1..].iter().fold(0.0_f64, |acc, &v| acc + v);
    Some((max_layer, tail))
}

/// The `(depth, y)` window left after dropping `lead` leading and `trail` trailing layers.
///
/// Returns empty slices when the trim consumes the whole profile.
pub fn trim_window<'a>(depths: &'a [f64], values: &'a [f64], trim: Trim) -> (&'a [f64], &'a [f64]) {
    let n = depths.len().min(values.len());
    let start = trim.lead.min(n);
    let end = n.saturating_sub(trim.trail).max(start);
    (&depths[start..end], &values[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatness() {
        assert!(is_flat(&[]));
        assert!(is_flat(&[3.0, 3.0, 3.0]));
        assert!(is_flat(&[100.0, 100.0 + 1e-4]));
        assert!(!is_flat(&[100.0, 100.1]));
        assert!(!is_flat(&[0.0, 1e-6]));
    }

    #[test]
    fn argmax_ties_take_first() {
        assert_eq!(argmax_first(&[1.0, 5.0, 5.0, 2.0]), Some(1));
        assert_eq!(argmax_first(&[]), None);
    }

    #[test]
    fn tail_of_reference_profile() {
        let y = [2.0, 40.0, 90.0, 120.0, 95.0, 60.0, 30.0, 12.0, 4.0, 1.0];
        let (layer, tail) = tail_leakage(&y).unwrap();
        assert_eq!(layer, 3);
        assert_eq!(tail, 202.0);
    }

    #[test]
    fn tail_is_zero_when_peak_is_last() {
        let (layer, tail) = tail_leakage(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(layer, 2);
        assert_eq!(tail, 0.0);
        assert!(tail.is_sign_positive());
    }

    #[test]
    fn trim_window_bounds() {
        let z = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [5.0, 6.0, 7.0, 8.0, 9.0];
        let (zw, yw) = trim_window(&z, &y, Trim { lead: 1, trail: 2 });
        assert_eq!(zw, &[1.0, 2.0]);
        assert_eq!(yw, &[6.0, 7.0]);

        let (zw, yw) = trim_window(&z, &y, Trim { lead: 4, trail: 4 });
        assert!(zw.is_empty() && yw.is_empty());
    }
}
