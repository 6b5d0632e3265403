use serde::{Deserialize, Serialize};

/// Descriptive statistics of a set of SNR values (dB)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// 95th percentile, linear interpolation between closest ranks
    pub p95: f64,
}

impl SummaryStats {
    /// Statistics over the non-NaN values; `None` when nothing remains.
    ///
    /// Infinite values take part: they bound `min`/`max` and make `std_dev`
    /// infinite. `mean` is NaN only when both `+inf` and `-inf` are present.
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut sorted: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.total_cmp(b));

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let std_dev = if sorted.iter().any(|v| v.is_infinite()) {
            f64::INFINITY
        } else {
            (sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64).sqrt()
        };

        Some(Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            mean,
            median: percentile_sorted(&sorted, 50.0),
            std_dev,
            p95: percentile_sorted(&sorted, 95.0),
        })
    }
}

/// Percentile of ascending-sorted values with linear interpolation.
/// Between an infinite rank and its neighbour the nearest rank is taken.
fn percentile_sorted(sorted: &[f64], percent: f64) -> f64 {
    let rank = percent / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let (lo, hi) = (sorted[lower], sorted[upper]);
    let fraction = rank - lower as f64;
    if lower == upper || lo == hi {
        lo
    } else if lo.is_infinite() || hi.is_infinite() {
        if fraction < 0.5 {
            lo
        } else {
            hi
        }
    } else {
        lo + (hi - lo) * fraction
    }
}

/// Statistics of one azimuth bin or season.
///
/// An empty bin is reported as [`BinStatistics::NoData`] so that "no data"
/// can never be mistaken for an SNR value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BinStatistics {
    NoData,
    Summary(SummaryStats),
}

impl BinStatistics {
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        match SummaryStats::from_values(values) {
            Some(stats) => BinStatistics::Summary(stats),
            None => BinStatistics::NoData,
        }
    }

    pub fn count(&self) -> usize {
        match self {
            BinStatistics::NoData => 0,
            BinStatistics::Summary(stats) => stats.count,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, BinStatistics::NoData)
    }

    pub fn summary(&self) -> Option<&SummaryStats> {
        match self {
            BinStatistics::NoData => None,
            BinStatistics::Summary(stats) => Some(stats),
        }
    }

    pub fn mean(&self) -> Option<f64> {
        self.summary().map(|s| s.mean)
    }

    pub fn min(&self) -> Option<f64> {
        self.summary().map(|s| s.min)
    }

    pub fn max(&self) -> Option<f64> {
        self.summary().map(|s| s.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_summary_values() {
        let stats = SummaryStats::from_values(vec![4.0, 1.0, 3.0, 2.0, f64::NAN]).unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert_relative_eq!(stats.mean, 2.5);
        assert_relative_eq!(stats.median, 2.5);
        assert_relative_eq!(stats.std_dev, 1.25f64.sqrt());
        // rank 0.95 * 3 = 2.85 -> 3 + 0.85
        assert_relative_eq!(stats.p95, 3.85, epsilon = 1e-12);
    }

    #[test]
    fn test_single_value() {
        let stats = SummaryStats::from_values([7.0]).unwrap();
        assert_eq!(stats.median, 7.0);
        assert_eq!(stats.p95, 7.0);
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn test_infinite_snr_takes_part() {
        let stats = SummaryStats::from_values([1.0, 2.0, f64::INFINITY]).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.max, f64::INFINITY);
        assert_eq!(stats.mean, f64::INFINITY);
        assert_eq!(stats.median, 2.0);
        assert_eq!(stats.std_dev, f64::INFINITY);
        // rank 1.9 sits between 2 and +inf -> nearest rank
        assert_eq!(stats.p95, f64::INFINITY);

        let all_infinite = SummaryStats::from_values([f64::INFINITY, f64::INFINITY]).unwrap();
        assert_eq!(all_infinite.median, f64::INFINITY);
        assert_eq!(all_infinite.p95, f64::INFINITY);
        assert_eq!(all_infinite.std_dev, f64::INFINITY);
    }

    #[test]
    fn test_mixed_sign_infinities() {
        let stats = SummaryStats::from_values([f64::NEG_INFINITY, 1.0, f64::INFINITY]).unwrap();
        assert_eq!(stats.min, f64::NEG_INFINITY);
        assert_eq!(stats.max, f64::INFINITY);
        assert_eq!(stats.median, 1.0);
        assert_eq!(stats.std_dev, f64::INFINITY);
        assert_eq!(stats.p95, f64::INFINITY);
        assert!(stats.mean.is_nan());
    }

    #[test]
    fn test_empty_bin_is_no_data() {
        let bin = BinStatistics::from_values(Vec::new());
        assert!(bin.is_empty());
        assert_eq!(bin.count(), 0);
        assert_eq!(bin.mean(), None);

        let nan_only = BinStatistics::from_values([f64::NAN]);
        assert_eq!(nan_only, BinStatistics::NoData);
    }

    #[test]
    fn test_zero_snr_is_not_empty() {
        let bin = BinStatistics::from_values([0.0]);
        assert_eq!(bin.count(), 1);
        assert_eq!(bin.mean(), Some(0.0));
    }
}
