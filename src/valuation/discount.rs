//! Mid-year discounting kernel
//!
//! Cashflows in year `y` are treated as occurring at `y + 0.5` relative to
//! the base year, so the exponent is `(y - base + 0.5)`, clamped at zero
//! for years before the base.

/// Mid-year discount factor for a cashflow in `year`, discounted to
/// `base_year` at `discount_rate`
pub fn mid_year_discount_factor(year: i32, base_year: i32, discount_rate: f64) -> f64 {
    let mut t = (year - base_year) as f64 + 0.5;
    if t < 0.0 {
        t = 0.0;
    }
    1.0 / (1.0 + discount_rate).powf(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_base_year_discounts_half_year() {
        let df = mid_year_discount_factor(2025, 2025, 0.10);
        assert_relative_eq!(df, 1.0 / 1.10_f64.powf(0.5), epsilon = 1e-12);
    }

    #[test]
    fn test_year_one() {
        let df = mid_year_discount_factor(2026, 2025, 0.10);
        assert_relative_eq!(df, 1.0 / 1.10_f64.powf(1.5), epsilon = 1e-12);
    }

    #[test]
    fn test_zero_rate_is_unity() {
        assert_relative_eq!(mid_year_discount_factor(2030, 2025, 0.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_years_before_base_clamp_to_unity() {
        assert_relative_eq!(mid_year_discount_factor(2020, 2025, 0.10), 1.0, epsilon = 1e-12);
    }
}
