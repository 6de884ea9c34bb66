//! Synthetic portfolio members: hypothetical projects and BD deals
//!
//! Both kinds carry enough to build a fully-specified snapshot, so they
//! participate in aggregation exactly like any other member. Deal
//! payments (upfront, milestones) are modelled as R&D spend in their
//! years; the deal's share and royalty terms scale the peak.

use serde::{Deserialize, Serialize};

use crate::asset::{PhaseInput, RdCost, Snapshot, UptakeCurve};

/// A hypothetical pipeline project added to a portfolio for one evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypotheticalProject {
    pub compound_name: String,
    pub therapeutic_area: String,
    pub phases: Vec<PhaseInput>,
    pub rd_costs: Vec<RdCost>,
    pub peak_sales_usd_m: f64,
    pub launch_year: i32,
    pub patent_expiry_year: i32,
    pub time_to_peak_years: f64,
    pub generic_erosion_pct: f64,
    pub cogs_pct: f64,
    pub sga_pct: f64,
    pub tax_rate: f64,
    pub discount_rate: f64,
}

impl HypotheticalProject {
    /// Build the evaluation snapshot for this project
    pub fn to_snapshot(&self, valuation_year: i32) -> Snapshot {
        let mut snap = Snapshot::new(0, 0, format!("hypothetical:{}", self.compound_name));
        snap.valuation_year = valuation_year;
        snap.horizon_years = (self.patent_expiry_year - valuation_year + 5).max(20);
        snap.approval_date = Some(self.launch_year as f64);
        snap.uptake_curve = UptakeCurve::Logistic;
        snap.time_to_peak_years = self.time_to_peak_years;
        snap.generic_erosion_pct = self.generic_erosion_pct;
        snap.cogs_pct = self.cogs_pct;
        snap.sga_pct = self.sga_pct;
        snap.tax_rate = self.tax_rate;
        snap.discount_rate = self.discount_rate;
        snap.peak_sales_usd_m = self.peak_sales_usd_m;
        snap.launch_year = self.launch_year;
        snap.patent_expiry_year = self.patent_expiry_year;
        snap.phase_inputs = self.phases.clone();
        snap.rd_costs = self.rd_costs.clone();
        snap
    }
}

/// A business-development deal placeholder added to a portfolio
///
/// Valued as a single Registration-stage asset at the assumed PTRS, with
/// deal payments as R&D spend and the commercial take scaled by revenue
/// share and royalty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BdDeal {
    pub deal_name: String,
    pub therapeutic_area: String,

    /// Upfront payment due in the valuation year
    pub upfront_usd_m: f64,

    /// Milestone payments by year
    pub milestone_payments: Vec<RdCost>,

    /// Remaining development spend by year, borne at `cost_share_pct`
    pub rd_cost_remaining: Vec<RdCost>,

    /// Share of remaining development cost carried by the acquirer
    pub cost_share_pct: f64,

    /// Share of revenue accruing to the acquirer
    pub revenue_share_pct: f64,

    /// Royalty paid away on the acquirer's share
    pub royalty_rate: f64,

    /// Assumed probability of technical and regulatory success
    pub ptrs_assumed: f64,

    pub peak_sales_usd_m: f64,
    pub launch_year: i32,
    pub patent_expiry_year: i32,
    pub time_to_peak_years: f64,
    pub generic_erosion_pct: f64,
    pub cogs_pct: f64,
    pub sga_pct: f64,
    pub tax_rate: f64,
    pub discount_rate: f64,
}

impl BdDeal {
    /// Total deal cost: upfront plus all milestones
    pub fn total_deal_cost_usd_m(&self) -> f64 {
        self.upfront_usd_m + self.milestone_payments.iter().map(|m| m.cost_usd_m.abs()).sum::<f64>()
    }

    /// Effective peak sales after revenue share and royalty
    pub fn effective_peak_usd_m(&self) -> f64 {
        self.peak_sales_usd_m * self.revenue_share_pct * (1.0 - self.royalty_rate)
    }

    /// Build the evaluation snapshot for this deal
    pub fn to_snapshot(&self, valuation_year: i32) -> Snapshot {
        let mut snap = Snapshot::new(0, 0, format!("bd:{}", self.deal_name));
        snap.valuation_year = valuation_year;
        snap.horizon_years = (self.patent_expiry_year - valuation_year + 5).max(20);
        snap.approval_date = Some(self.launch_year as f64);
        snap.uptake_curve = UptakeCurve::Logistic;
        snap.time_to_peak_years = self.time_to_peak_years;
        snap.generic_erosion_pct = self.generic_erosion_pct;
        snap.cogs_pct = self.cogs_pct;
        snap.sga_pct = self.sga_pct;
        snap.tax_rate = self.tax_rate;
        snap.discount_rate = self.discount_rate;
        snap.peak_sales_usd_m = self.effective_peak_usd_m();
        snap.launch_year = self.launch_year;
        snap.patent_expiry_year = self.patent_expiry_year;

        let registration_years = (self.launch_year - valuation_year).max(1) as f64;
        snap.phase_inputs = vec![PhaseInput::new(
            "Registration",
            self.ptrs_assumed,
            registration_years,
            valuation_year as f64,
        )];

        let mut rd_costs = Vec::new();
        if self.upfront_usd_m > 0.0 {
            rd_costs.push(RdCost::new(valuation_year, self.upfront_usd_m));
        }
        for m in &self.milestone_payments {
            rd_costs.push(RdCost::new(m.year, m.cost_usd_m.abs()));
        }
        for rc in &self.rd_cost_remaining {
            rd_costs.push(RdCost::new(rc.year, rc.cost_usd_m.abs() * self.cost_share_pct));
        }
        snap.rd_costs = rd_costs;
        snap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_deal() -> BdDeal {
        BdDeal {
            deal_name: "XK-301 in-licence".to_string(),
            therapeutic_area: "Oncology".to_string(),
            upfront_usd_m: 50.0,
            milestone_payments: vec![RdCost::new(2027, 30.0), RdCost::new(2029, 40.0)],
            rd_cost_remaining: vec![RdCost::new(2026, 80.0)],
            cost_share_pct: 0.5,
            revenue_share_pct: 0.6,
            royalty_rate: 0.10,
            ptrs_assumed: 0.65,
            peak_sales_usd_m: 900.0,
            launch_year: 2030,
            patent_expiry_year: 2041,
            time_to_peak_years: 4.0,
            generic_erosion_pct: 0.75,
            cogs_pct: 0.20,
            sga_pct: 0.25,
            tax_rate: 0.21,
            discount_rate: 0.10,
        }
    }

    #[test]
    fn test_deal_economics() {
        let deal = sample_deal();
        assert_relative_eq!(deal.total_deal_cost_usd_m(), 120.0, epsilon = 1e-12);
        assert_relative_eq!(deal.effective_peak_usd_m(), 900.0 * 0.6 * 0.9, epsilon = 1e-9);
    }

    #[test]
    fn test_deal_snapshot_is_valid_and_carries_payments() {
        let deal = sample_deal();
        let snap = deal.to_snapshot(2025);
        assert!(snap.validate().is_ok());

        assert_eq!(snap.phase_inputs.len(), 1);
        assert_eq!(snap.phase_inputs[0].phase_name, "Registration");
        assert_relative_eq!(snap.phase_inputs[0].probability_of_success, 0.65, epsilon = 1e-12);

        // Upfront in the valuation year, milestones in theirs, remaining
        // spend at cost share
        assert_relative_eq!(snap.rd_cost_at(2025), 50.0, epsilon = 1e-12);
        assert_relative_eq!(snap.rd_cost_at(2027), 30.0, epsilon = 1e-12);
        assert_relative_eq!(snap.rd_cost_at(2026), 40.0, epsilon = 1e-12);
    }

    #[test]
    fn test_hypothetical_snapshot_is_valid() {
        let project = HypotheticalProject {
            compound_name: "NewCo-17".to_string(),
            therapeutic_area: "Immunology".to_string(),
            phases: vec![PhaseInput::new("P1", 0.6, 2.0, 2026.0)],
            rd_costs: vec![RdCost::new(2026, 15.0)],
            peak_sales_usd_m: 400.0,
            launch_year: 2032,
            patent_expiry_year: 2042,
            time_to_peak_years: 5.0,
            generic_erosion_pct: 0.80,
            cogs_pct: 0.20,
            sga_pct: 0.25,
            tax_rate: 0.21,
            discount_rate: 0.10,
        };
        let snap = project.to_snapshot(2025);
        assert!(snap.validate().is_ok());
        assert_eq!(snap.uptake_curve, UptakeCurve::Logistic);
        assert_eq!(snap.launch_year, 2032);
    }
}
