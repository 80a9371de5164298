//! Population statistics.

use crate::schema::PopulationStatistics;

/// Consistency constant making the MAD an estimator of the standard deviation
/// under normality.
pub const MAD_SCALE: f64 = 1.4826;

/// Quantile of sorted data, linear interpolation between order statistics
/// (Hyndman-Fan type 7).
pub fn quantile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let h = (n - 1) as f64 * p.clamp(0.0, 1.0);
            let lo = h.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
        }
    }
}

/// Summary statistics of a fitness vector.
pub fn observe(fitness: &[f64]) -> PopulationStatistics {
    if fitness.is_empty() {
        return PopulationStatistics::default();
    }
    let n = fitness.len() as f64;
    let mut sorted = fitness.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mean = fitness.iter().sum::<f64>() / n;
    let variance = if fitness.len() > 1 {
        fitness.iter().map(|f| (f - mean).powi(2)).sum::<f64>() / (n - 1.0)
    } else {
        0.0
    };
    let median = quantile(&sorted, 0.5);
    let mut deviations: Vec<f64> = sorted.iter().map(|f| (f - median).abs()).collect();
    deviations.sort_by(f64::total_cmp);

    PopulationStatistics {
        mean,
        min: sorted[0],
        q1: quantile(&sorted, 0.25),
        median,
        q3: quantile(&sorted, 0.75),
        max: sorted[sorted.len() - 1],
        variance,
        mad: MAD_SCALE * quantile(&deviations, 0.5),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_observe_known_values() {
        let stats = observe(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(stats.mean, 3.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.q1, 2.0);
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.q3, 4.0);
        assert_eq!(stats.max, 5.0);
        assert!((stats.variance - 2.5).abs() < 1e-12);
        // |x - 3| = 2,1,0,1,2, median 1
        assert!((stats.mad - MAD_SCALE).abs() < 1e-12);
    }

    #[test]
    fn test_quantile_interpolates() {
        let sorted = [0.0, 10.0];
        assert_eq!(quantile(&sorted, 0.25), 2.5);
        assert_eq!(quantile(&sorted, 1.0), 10.0);
    }

    #[test]
    fn test_single_value() {
        let stats = observe(&[7.0]);
        assert_eq!(stats.variance, 0.0);
        assert_eq!(stats.mad, 0.0);
        assert_eq!(stats.q1, 7.0);
    }

    proptest! {
        #[test]
        fn test_statistics_ordered(values in prop::collection::vec(-1e6f64..1e6, 1..64)) {
            let stats = observe(&values);
            let tol = 1e-9;
            prop_assert!(stats.min <= stats.q1 + tol);
            prop_assert!(stats.q1 <= stats.median + tol);
            prop_assert!(stats.median <= stats.q3 + tol);
            prop_assert!(stats.q3 <= stats.max + tol);
            prop_assert!(stats.min <= stats.mean + 1e-6 && stats.mean <= stats.max + 1e-6);
            prop_assert!(stats.variance >= 0.0);
            prop_assert!(stats.mad >= 0.0);
        }
    }
}
