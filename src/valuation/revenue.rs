//! Revenue uptake curves and loss-of-exclusivity erosion
//!
//! Pure functions producing gross revenue for an integer calendar year.
//! Composition order is fixed: uptake first, then erosion on the uptake
//! output.

use crate::asset::UptakeCurve;

/// Linear ramp to peak sales
///
/// Zero before launch, `peak * y / time_to_peak` during the ramp, peak
/// thereafter. `time_to_peak <= 0` is clamped to 1.
pub fn linear_uptake(years_since_launch: i32, time_to_peak: f64, peak_sales: f64) -> f64 {
    if years_since_launch < 0 {
        return 0.0;
    }
    let ttp = if time_to_peak <= 0.0 { 1.0 } else { time_to_peak };
    let y = years_since_launch as f64;
    if y >= ttp {
        return peak_sales;
    }
    peak_sales * (y / ttp)
}

/// Logistic (S-curve) ramp to peak sales
///
/// Inflection at `time_to_peak / 2`, steepness `k = 6 / max(time_to_peak, 1)`
/// so the curve reaches ~95% of peak at `time_to_peak`.
pub fn logistic_uptake(years_since_launch: i32, time_to_peak: f64, peak_sales: f64) -> f64 {
    if years_since_launch < 0 {
        return 0.0;
    }
    let ttp = if time_to_peak <= 0.0 { 1.0 } else { time_to_peak };
    let midpoint = ttp / 2.0;
    let k = 6.0 / ttp.max(1.0);
    let fraction = 1.0 / (1.0 + (-k * (years_since_launch as f64 - midpoint)).exp());
    peak_sales * fraction
}

/// Apply loss-of-exclusivity erosion after patent expiry
///
/// `erosion_pct` is the fraction of sales lost in the first year
/// post-expiry; each subsequent year halves what remains.
pub fn apply_loe_erosion(base_sales: f64, years_since_expiry: i32, erosion_pct: f64) -> f64 {
    if years_since_expiry < 0 {
        return base_sales;
    }
    if years_since_expiry == 0 {
        return base_sales * (1.0 - erosion_pct);
    }
    let remaining = base_sales * (1.0 - erosion_pct) * 0.5_f64.powi(years_since_expiry);
    remaining.max(0.0)
}

/// Gross revenue for a calendar year: uptake composed with LOE erosion
#[allow(clippy::too_many_arguments)]
pub fn gross_revenue(
    year: i32,
    launch_year: i32,
    patent_expiry_year: i32,
    peak_sales: f64,
    time_to_peak: f64,
    generic_erosion_pct: f64,
    uptake_curve: UptakeCurve,
) -> f64 {
    let years_since_launch = year - launch_year;
    if years_since_launch < 0 {
        return 0.0;
    }

    let base = match uptake_curve {
        UptakeCurve::Logistic => logistic_uptake(years_since_launch, time_to_peak, peak_sales),
        UptakeCurve::Linear => linear_uptake(years_since_launch, time_to_peak, peak_sales),
    };

    let years_since_expiry = year - patent_expiry_year;
    apply_loe_erosion(base, years_since_expiry, generic_erosion_pct)
}
