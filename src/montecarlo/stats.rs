//! Distribution statistics for simulation output

use serde::{Deserialize, Serialize};

/// Summary statistics of an rNPV sample distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionStats {
    pub mean_npv: f64,
    pub median_npv: f64,
    pub std_npv: f64,
    pub p5: f64,
    pub p25: f64,
    pub p75: f64,
    pub p95: f64,
    /// Fraction of samples with a strictly positive rNPV
    pub prob_positive: f64,
}

impl DistributionStats {
    /// Compute the full statistics block from a sample array
    pub fn from_samples(samples: &[f64]) -> Self {
        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let m = mean(samples);
        Self {
            mean_npv: m,
            median_npv: percentile(&sorted, 50.0),
            std_npv: std_dev(samples, m),
            p5: percentile(&sorted, 5.0),
            p25: percentile(&sorted, 25.0),
            p75: percentile(&sorted, 75.0),
            p95: percentile(&sorted, 95.0),
            prob_positive: if samples.is_empty() {
                0.0
            } else {
                samples.iter().filter(|&&x| x > 0.0).count() as f64 / samples.len() as f64
            },
        }
    }
}

/// Arithmetic mean; 0 for an empty slice
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Population standard deviation around a known mean
pub fn std_dev(xs: &[f64], mean: f64) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / xs.len() as f64;
    var.sqrt()
}

/// Percentile of a sorted sample with linear interpolation between ranks
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Sub-sample an array at a fixed stride to cap transfer size
///
/// Stride is `max(1, n / target)`, preserving iteration order.
pub fn subsample(xs: &[f64], target: usize) -> Vec<f64> {
    let stride = (xs.len() / target.max(1)).max(1);
    xs.iter().step_by(stride).copied().collect()
}
