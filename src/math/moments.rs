//! Content-weighted moments of a binned distribution.

/// Sum, weighted mean and weighted standard deviation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    pub total: f64,
    pub mean: f64,
    pub std: f64,
}

/// Weighted moments of `centers` with weights `contents`.
///
/// A zero total yields `mean = std = 0` rather than `0/0`. The variance is
/// floored at zero so rounding never feeds `sqrt` a negative number.
pub fn weighted_moments(centers: &[f64], contents: &[f64]) -> Moments {
    let total = contents.iter().fold(0.0_f64, |acc, &w| acc + w);
    if total == 0.0 {
        return Moments {
            total,
            mean: 0.0,
            std: 0.0,
        };
    }

    let mean = centers
        .iter()
        .zip(contents)
        .map(|(x, w)| x * w)
        .sum::<f64>()
        / total;
    let variance = centers
        .iter()
        .zip(contents)
        .map(|(x, w)| (x - mean) * (x - mean) * w)
        .sum::<f64>()
        / total;

    Moments {
        total,
        mean,
        std: variance.max(0.0).sqrt(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_pair() {
        let m = weighted_moments(&[1.0, 3.0], &[2.0, 2.0]);
        assert_eq!(m.total, 4.0);
        assert_eq!(m.mean, 2.0);
        assert_eq!(m.std, 1.0);
    }

    #[test]
    fn empty_distribution_is_zero() {
        let m = weighted_moments(&[0.5, 1.5], &[0.0, 0.0]);
        assert_eq!(m, Moments { total: 0.0, mean: 0.0, std: 0.0 });
    }

    #[test]
    fn zero_bins_total_is_positive_zero() {
        let m = weighted_moments(&[], &[]);
        assert_eq!(m.total, 0.0);
        assert!(m.total.is_sign_positive());
    }
}
