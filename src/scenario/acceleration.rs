//! Budget-to-timeline acceleration curve
//!
//! Spending more on a phase buys schedule, with diminishing returns:
//! `timeline_reduction_fraction = alpha * ln(budget_multiplier)`, with the
//! multiplier capped at 2.0 and the reduction capped at 50% of the
//! original phase duration.

use serde::{Deserialize, Serialize};

/// Calibration constant for the acceleration curve
pub const ACCELERATION_ALPHA: f64 = 0.5;

/// Maximum budget multiplier the curve accepts
pub const MAX_BUDGET_MULTIPLIER: f64 = 2.0;

/// Cap: no phase can be reduced by more than 50%
pub const MAX_TIMELINE_REDUCTION: f64 = 0.50;

/// Timeline reduction fraction for a budget multiplier
pub fn acceleration_curve(budget_multiplier: f64) -> f64 {
    if budget_multiplier <= 1.0 {
        return 0.0;
    }
    let bm = budget_multiplier.min(MAX_BUDGET_MULTIPLIER);
    (ACCELERATION_ALPHA * bm.ln()).min(MAX_TIMELINE_REDUCTION)
}

/// One point on the acceleration trade-off curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccelerationPoint {
    pub budget_multiplier: f64,
    pub timeline_reduction_pct: f64,
    pub months_saved: f64,
    pub new_duration_months: f64,
    pub additional_cost_usd_m: f64,
}

/// Full trade-off curve for a phase, sampled at 5% multiplier steps
pub fn acceleration_curve_points(
    original_duration_months: f64,
    original_cost_usd_m: f64,
) -> Vec<AccelerationPoint> {
    (100..=200)
        .step_by(5)
        .map(|bm_pct| {
            let bm = bm_pct as f64 / 100.0;
            let reduction_frac = acceleration_curve(bm);
            let months_saved = reduction_frac * original_duration_months;
            AccelerationPoint {
                budget_multiplier: bm,
                timeline_reduction_pct: reduction_frac * 100.0,
                months_saved,
                new_duration_months: original_duration_months - months_saved,
                additional_cost_usd_m: (bm - 1.0) * original_cost_usd_m,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_no_uplift_no_reduction() {
        assert_eq!(acceleration_curve(1.0), 0.0);
        assert_eq!(acceleration_curve(0.8), 0.0);
    }

    #[test]
    fn test_curve_is_concave_log() {
        assert_relative_eq!(acceleration_curve(1.5), 0.5 * 1.5_f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(acceleration_curve(2.0), 0.5 * 2.0_f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_multiplier_capped_at_two() {
        assert_relative_eq!(
            acceleration_curve(3.0),
            acceleration_curve(2.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_curve_points_span_the_multiplier_range() {
        let points = acceleration_curve_points(36.0, 120.0);
        assert_eq!(points.len(), 21);
        assert_relative_eq!(points[0].budget_multiplier, 1.0, epsilon = 1e-12);
        assert_relative_eq!(points[0].months_saved, 0.0, epsilon = 1e-12);
        let last = points.last().unwrap();
        assert_relative_eq!(last.budget_multiplier, 2.0, epsilon = 1e-12);
        assert_relative_eq!(last.additional_cost_usd_m, 120.0, epsilon = 1e-12);
        assert!(last.new_duration_months >= 18.0);
    }
}
