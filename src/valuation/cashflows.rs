//! Cashflow output structures for valuations

use serde::{Deserialize, Serialize};

use crate::error::NumericWarning;

/// One year of the valuation cash-flow table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowRow {
    pub year: i32,
    pub rd_cost_usd_m: f64,
    pub commercial_cf_usd_m: f64,
    pub net_cashflow_usd_m: f64,
    pub cumulative_pos: f64,
    pub risk_adjusted_cf_usd_m: f64,
    pub discount_factor: f64,
    pub pv_usd_m: f64,
    pub cumulative_npv_usd_m: f64,
}

/// Complete result of a deterministic valuation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationResult {
    /// Snapshot the valuation was computed for
    pub snapshot_id: u32,

    /// Risk-adjusted NPV (rNPV / eNPV), USD millions
    pub enpv_usd_m: f64,

    /// NPV before risk adjustment: eNPV / terminal PoS, 0 when the
    /// terminal PoS is 0 (a NumericWarning is attached)
    pub unadjusted_npv_usd_m: f64,

    /// Product of all phase success probabilities
    pub terminal_pos: f64,

    pub peak_sales_usd_m: f64,
    pub launch_year: i32,

    /// Yearly rows in strictly increasing year order
    pub cashflows: Vec<CashflowRow>,

    /// Non-fatal numeric degeneracies encountered during evaluation
    #[serde(default)]
    pub warnings: Vec<NumericWarning>,
}

impl ValuationResult {
    /// Summary statistics over the cash-flow table
    pub fn summary(&self) -> ValuationSummary {
        let total_rd_cost: f64 = self.cashflows.iter().map(|r| r.rd_cost_usd_m).sum();
        let total_commercial_cf: f64 = self.cashflows.iter().map(|r| r.commercial_cf_usd_m).sum();
        let total_risk_adjusted_cf: f64 =
            self.cashflows.iter().map(|r| r.risk_adjusted_cf_usd_m).sum();

        let breakeven_year = self
            .cashflows
            .iter()
            .find(|r| r.cumulative_npv_usd_m > 0.0)
            .map(|r| r.year);

        ValuationSummary {
            n_years: self.cashflows.len(),
            year_min: self.cashflows.first().map(|r| r.year).unwrap_or(0),
            year_max: self.cashflows.last().map(|r| r.year).unwrap_or(0),
            total_rd_cost_usd_m: total_rd_cost,
            total_commercial_cf_usd_m: total_commercial_cf,
            total_risk_adjusted_cf_usd_m: total_risk_adjusted_cf,
            enpv_usd_m: self.enpv_usd_m,
            breakeven_year,
        }
    }
}

/// Summary statistics for one valuation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationSummary {
    pub n_years: usize,
    pub year_min: i32,
    pub year_max: i32,
    pub total_rd_cost_usd_m: f64,
    pub total_commercial_cf_usd_m: f64,
    pub total_risk_adjusted_cf_usd_m: f64,
    pub enpv_usd_m: f64,
    /// First year the cumulative NPV turns positive, if it ever does
    pub breakeven_year: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(year: i32, pv: f64, cum: f64) -> CashflowRow {
        CashflowRow {
            year,
            rd_cost_usd_m: 1.0,
            commercial_cf_usd_m: 2.0,
            net_cashflow_usd_m: 1.0,
            cumulative_pos: 0.5,
            risk_adjusted_cf_usd_m: 0.5,
            discount_factor: 0.9,
            pv_usd_m: pv,
            cumulative_npv_usd_m: cum,
        }
    }

    #[test]
    fn test_summary_totals_and_breakeven() {
        let result = ValuationResult {
            snapshot_id: 7,
            enpv_usd_m: 1.0,
            unadjusted_npv_usd_m: 2.0,
            terminal_pos: 0.5,
            peak_sales_usd_m: 100.0,
            launch_year: 2030,
            cashflows: vec![row(2025, -2.0, -2.0), row(2026, 1.5, -0.5), row(2027, 1.5, 1.0)],
            warnings: Vec::new(),
        };

        let summary = result.summary();
        assert_eq!(summary.n_years, 3);
        assert_eq!(summary.year_min, 2025);
        assert_eq!(summary.year_max, 2027);
        assert_eq!(summary.breakeven_year, Some(2027));
        assert!((summary.total_rd_cost_usd_m - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_breakeven_absent_when_never_positive() {
        let result = ValuationResult {
            snapshot_id: 7,
            enpv_usd_m: -2.0,
            unadjusted_npv_usd_m: -4.0,
            terminal_pos: 0.5,
            peak_sales_usd_m: 100.0,
            launch_year: 2030,
            cashflows: vec![row(2025, -2.0, -2.0)],
            warnings: Vec::new(),
        };
        assert_eq!(result.summary().breakeven_year, None);
    }

    #[test]
    fn test_row_json_round_trip() {
        let r = row(2030, 1.25, 3.5);
        let json = serde_json::to_string(&r).unwrap();
        let restored: CashflowRow = serde_json::from_str(&json).unwrap();
        assert_eq!(r, restored);
    }
}
