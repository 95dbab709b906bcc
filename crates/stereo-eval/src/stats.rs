use serde::{Deserialize, Serialize};

/// Summary statistics of a set of epipolar residuals, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResidualStats {
    /// Number of residuals.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    /// 95th percentile, linearly interpolated between closest ranks.
    pub p95: f64,
}

impl ResidualStats {
    /// Computes the statistics of a set of residuals.
    ///
    /// Returns `None` for an empty set.
    ///
    /// # Example
    ///
    /// ```
    /// use stereo_eval::stats::ResidualStats;
    ///
    /// let stats = ResidualStats::from_residuals(&[1.0, 2.0, 3.0, 4.0]).unwrap();
    /// assert_eq!(stats.mean, 2.5);
    /// assert!((stats.std_dev - 1.118033988749895).abs() < 1e-12);
    /// assert!((stats.p95 - 3.85).abs() < 1e-12);
    /// ```
    pub fn from_residuals(residuals: &[f64]) -> Option<Self> {
        let p95 = percentile(residuals, 95.0)?;
        let n = residuals.len() as f64;
        let mean = residuals.iter().sum::<f64>() / n;
        let variance = residuals.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>() / n;

        Some(Self {
            count: residuals.len(),
            mean,
            std_dev: variance.sqrt(),
            p95,
        })
    }
}

/// The `q`-th percentile of a set of values, `q` in `[0, 100]`.
///
/// The value at fractional rank `q / 100 * (n - 1)` of the sorted set,
/// linearly interpolated between the two closest ranks. Returns `None` for
/// an empty set.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn empty_set() {
        assert_eq!(ResidualStats::from_residuals(&[]), None);
        assert_eq!(percentile(&[], 50.0), None);
    }

    #[test]
    fn single_value() {
        let stats = ResidualStats::from_residuals(&[0.7]);
        assert_eq!(
            stats,
            Some(ResidualStats {
                count: 1,
                mean: 0.7,
                std_dev: 0.0,
                p95: 0.7
            })
        );
    }

    #[test]
    fn closed_form_twenty_values() {
        // 0.05, 0.10, ..., 1.00 in shuffled order
        let mut residuals: Vec<f64> = (1..=20).map(|i| i as f64 * 0.05).collect();
        residuals.swap(0, 19);
        residuals.swap(3, 11);

        let stats = ResidualStats::from_residuals(&residuals).unwrap();
        assert_eq!(stats.count, 20);
        assert_relative_eq!(stats.mean, 0.525, epsilon = 1e-12);
        // population variance of 0.05 * (1..=20) is 0.05^2 * (20^2 - 1) / 12
        assert_relative_eq!(
            stats.std_dev,
            0.05 * (399.0f64 / 12.0).sqrt(),
            epsilon = 1e-12
        );
        // rank 0.95 * 19 = 18.05 between 0.95 and 1.00
        assert_relative_eq!(stats.p95, 0.9525, epsilon = 1e-12);
    }

    #[test]
    fn percentile_interpolation() {
        let values = [3.0, 1.0, 2.0];
        assert_eq!(percentile(&values, 0.0), Some(1.0));
        assert_eq!(percentile(&values, 50.0), Some(2.0));
        assert_eq!(percentile(&values, 100.0), Some(3.0));
        assert_relative_eq!(percentile(&values, 75.0).unwrap(), 2.5);
    }

    #[test]
    fn residuals_of_constructed_lines() {
        // lines (a, b, c) and points at known distances from them
        let lines: [(f64, f64, f64); 3] = [(0.0, 1.0, -10.0), (0.0, -2.0, 8.0), (3.0, 4.0, 0.0)];
        let points: [(f64, f64); 3] = [(5.0, 10.5), (1.0, 3.0), (4.0, 3.0)];
        let residuals: Vec<f64> = lines
            .iter()
            .zip(points.iter())
            .map(|((a, b, c), (x, y))| (a * x + b * y + c).abs() / (a * a + b * b).sqrt())
            .collect();
        assert_eq!(residuals, vec![0.5, 1.0, 4.8]);

        let stats = ResidualStats::from_residuals(&residuals).unwrap();
        assert_relative_eq!(stats.mean, 6.3 / 3.0, epsilon = 1e-12);
        let var = ((0.5f64 - 2.1).powi(2) + (1.0f64 - 2.1).powi(2) + (4.8f64 - 2.1).powi(2)) / 3.0;
        assert_relative_eq!(stats.std_dev, var.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(stats.p95, 1.0 + 0.9 * 3.8, epsilon = 1e-12);
    }
}
