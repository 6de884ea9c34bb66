//! Deterministic rNPV evaluator
//!
//! Builds the per-year cash-flow table for one snapshot: modelled revenue
//! through COGS/SG&A/tax to commercial cashflow, netted against R&D spend,
//! weighted by cumulative PoS, and discounted mid-year from the base year.

use log::{debug, warn};

use super::cashflows::{CashflowRow, ValuationResult};
use super::discount::mid_year_discount_factor;
use super::revenue::gross_revenue;
use super::risk::{cumulative_pos_sorted, terminal_pos};
use crate::asset::{CommercialRow, Snapshot};
use crate::error::{EngineError, NumericWarning};

/// Tail years appended after patent expiry for Monte Carlo runs, wide
/// enough to absorb sampled launch delays
pub const MC_TAIL_YEARS: i32 = 5;

/// Years the Monte Carlo grid extends before the nominal launch, so
/// negative sampled delays stay on the grid
pub(crate) const MC_LAUNCH_MARGIN_YEARS: i32 = 2;

/// Configuration for a valuation run
#[derive(Debug, Clone)]
pub struct ValuationConfig {
    /// Years of erosion tail kept after patent expiry
    pub tail_years: i32,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self { tail_years: 3 }
    }
}

impl ValuationConfig {
    /// Configuration for Monte Carlo inner evaluations
    pub fn monte_carlo() -> Self {
        Self {
            tail_years: MC_TAIL_YEARS,
        }
    }
}

/// Deterministic valuation engine
#[derive(Debug, Clone, Default)]
pub struct ValuationEngine {
    config: ValuationConfig,
}

impl ValuationEngine {
    pub fn new(config: ValuationConfig) -> Self {
        Self { config }
    }

    /// Run the full deterministic valuation for a snapshot
    ///
    /// Pure: the snapshot is not modified; rerunning yields element-wise
    /// identical rows.
    pub fn value_snapshot(&self, snapshot: &Snapshot) -> Result<ValuationResult, EngineError> {
        snapshot.validate()?;
        let (year_min, year_max) = self.year_span(snapshot);
        Ok(self.value_over_span(snapshot, year_min, year_max))
    }

    /// Determine the evaluation span for a snapshot
    ///
    /// `year_min` is the earliest of any phase start, R&D cost year, or
    /// the launch year; `year_max` extends the configured tail past
    /// patent expiry.
    pub fn year_span(&self, snapshot: &Snapshot) -> (i32, i32) {
        let mut candidates: Vec<i32> = Vec::new();
        for pi in &snapshot.phase_inputs {
            candidates.push(pi.start_year.floor() as i32);
        }
        for rc in &snapshot.rd_costs {
            candidates.push(rc.year);
        }
        candidates.push(snapshot.launch_year);

        let year_min = candidates
            .into_iter()
            .min()
            .unwrap_or(snapshot.valuation_year);
        let year_max = (snapshot.patent_expiry_year + self.config.tail_years).max(year_min);
        (year_min, year_max)
    }

    /// Evaluate a snapshot over a fixed year grid
    ///
    /// The grid is supplied by the caller so that Monte Carlo iterations
    /// share one base year regardless of sampled launch shifts.
    pub(crate) fn value_over_span(
        &self,
        snapshot: &Snapshot,
        year_min: i32,
        year_max: i32,
    ) -> ValuationResult {
        debug!(
            "valuing snapshot {} over [{}, {}]",
            snapshot.id, year_min, year_max
        );

        let phases = snapshot.sorted_phases();
        let base_year = year_min;

        let mut cashflows = Vec::with_capacity((year_max - year_min + 1) as usize);
        let mut running_npv = 0.0;

        for year in year_min..=year_max {
            let rd_cost = snapshot.rd_cost_at(year);
            let commercial_cf = self.commercial_cashflow(snapshot, year);
            let net_cf = commercial_cf - rd_cost;

            let cum_pos = cumulative_pos_sorted(&phases, year);
            let risk_adjusted_cf = net_cf * cum_pos;

            let df = mid_year_discount_factor(year, base_year, snapshot.discount_rate);
            let pv = risk_adjusted_cf * df;
            running_npv += pv;

            cashflows.push(CashflowRow {
                year,
                rd_cost_usd_m: rd_cost,
                commercial_cf_usd_m: commercial_cf,
                net_cashflow_usd_m: net_cf,
                cumulative_pos: cum_pos,
                risk_adjusted_cf_usd_m: risk_adjusted_cf,
                discount_factor: df,
                pv_usd_m: pv,
                cumulative_npv_usd_m: running_npv,
            });
        }

        let tot_pos = terminal_pos(&snapshot.phase_inputs);
        let mut warnings = Vec::new();
        let unadjusted_npv = if tot_pos > 0.0 {
            running_npv / tot_pos
        } else {
            warn!(
                "snapshot {}: terminal PoS is 0, reporting unadjusted NPV as 0",
                snapshot.id
            );
            warnings.push(NumericWarning::new(
                "terminal PoS is 0; unadjusted NPV reported as 0",
            ));
            0.0
        };

        ValuationResult {
            snapshot_id: snapshot.id,
            enpv_usd_m: running_npv,
            unadjusted_npv_usd_m: unadjusted_npv,
            terminal_pos: tot_pos,
            peak_sales_usd_m: snapshot.peak_sales_usd_m,
            launch_year: snapshot.launch_year,
            cashflows,
            warnings,
        }
    }

    /// Commercial cashflow for one year: caller-supplied row if present,
    /// otherwise modelled from the revenue curve
    fn commercial_cashflow(&self, snapshot: &Snapshot, year: i32) -> f64 {
        if let Some(row) = snapshot.commercial_row_at(year) {
            return row.net_cashflow_usd_m;
        }

        let gross = gross_revenue(
            year,
            snapshot.launch_year,
            snapshot.patent_expiry_year,
            snapshot.peak_sales_usd_m,
            snapshot.time_to_peak_years,
            snapshot.generic_erosion_pct,
            snapshot.uptake_curve,
        );
        let cogs = gross * snapshot.cogs_pct;
        let sga = gross * snapshot.sga_pct;
        let op_profit = gross - cogs - sga;
        let tax = (op_profit * snapshot.tax_rate).max(0.0);
        op_profit - tax
    }

    /// Regenerate the commercial P&L table for a snapshot
    ///
    /// Covers launch through patent expiry plus the erosion tail, skipping
    /// zero-revenue years.
    pub fn commercial_rows(&self, snapshot: &Snapshot) -> Vec<CommercialRow> {
        let commercial_end = snapshot.patent_expiry_year + self.config.tail_years;
        let mut rows = Vec::new();

        for year in snapshot.launch_year..=commercial_end {
            let gross = gross_revenue(
                year,
                snapshot.launch_year,
                snapshot.patent_expiry_year,
                snapshot.peak_sales_usd_m,
                snapshot.time_to_peak_years,
                snapshot.generic_erosion_pct,
                snapshot.uptake_curve,
            );
            if gross <= 0.0 {
                continue;
            }
            let cogs = gross * snapshot.cogs_pct;
            let sga = gross * snapshot.sga_pct;
            let op_profit = gross - cogs - sga;
            let tax = (op_profit * snapshot.tax_rate).max(0.0);
            rows.push(CommercialRow {
                year,
                gross_sales_usd_m: gross,
                net_sales_usd_m: gross,
                cogs_usd_m: cogs,
                sga_usd_m: sga,
                operating_profit_usd_m: op_profit,
                tax_usd_m: tax,
                net_cashflow_usd_m: op_profit - tax,
            });
        }
        rows
    }
}
