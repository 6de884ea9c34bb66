//! Asset and snapshot data structures for valuation inputs
//!
//! A `Snapshot` is the complete, versioned valuation input for one asset.
//! All monetary values are USD millions, all rates are fractions in [0, 1],
//! and years are integer calendar years except `approval_date`, which may
//! be fractional to represent mid-year events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Revenue uptake curve shape from launch to peak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UptakeCurve {
    /// Linear ramp to peak over `time_to_peak_years`
    Linear,
    /// Logistic (S-curve) ramp, ~95% of peak at `time_to_peak_years`
    Logistic,
}

impl UptakeCurve {
    pub fn as_str(&self) -> &'static str {
        match self {
            UptakeCurve::Linear => "linear",
            UptakeCurve::Logistic => "logistic",
        }
    }
}

/// A development asset (compound) owning zero or more snapshots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    /// Unique asset identifier
    pub id: u32,

    /// Compound or program name
    pub compound_name: String,

    /// Therapeutic area (e.g. Oncology, Immunology)
    pub therapeutic_area: String,

    /// Target indication
    pub indication: String,

    /// Current development phase label (e.g. "Phase 2")
    pub current_phase: String,

    /// Internally originated vs in-licensed
    pub is_internal: bool,

    /// Innovation class label (e.g. "First-in-class")
    pub innovation_class: String,

    pub created_at: DateTime<Utc>,
}

impl Asset {
    pub fn new(id: u32, compound_name: impl Into<String>, therapeutic_area: impl Into<String>) -> Self {
        Self {
            id,
            compound_name: compound_name.into(),
            therapeutic_area: therapeutic_area.into(),
            indication: String::new(),
            current_phase: String::new(),
            is_internal: true,
            innovation_class: "Standard".to_string(),
            created_at: Utc::now(),
        }
    }
}

/// One R&D phase: success probability, duration, and start
///
/// `start_year` is fractional so that month-denominated scenario shifts
/// apply exactly; the deterministic year grid floors it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseInput {
    /// Phase label: P1, P2, P3, Filing, Approval, Registration
    pub phase_name: String,

    /// Probability of technical and regulatory success for this phase
    pub probability_of_success: f64,

    /// Phase duration in years
    pub duration_years: f64,

    /// Calendar year the phase starts (fractional after scenario shifts)
    pub start_year: f64,
}

impl PhaseInput {
    pub fn new(phase_name: impl Into<String>, probability_of_success: f64, duration_years: f64, start_year: f64) -> Self {
        Self {
            phase_name: phase_name.into(),
            probability_of_success,
            duration_years,
            start_year,
        }
    }

    /// Inclusive calendar-year range this phase spans, for cost attribution
    pub fn year_range(&self) -> (i32, i32) {
        let first = self.start_year.floor() as i32;
        let last = (self.start_year + self.duration_years).ceil() as i32 - 1;
        (first, last.max(first))
    }

    /// Whether a calendar year falls inside this phase
    pub fn covers_year(&self, year: i32) -> bool {
        let y = year as f64;
        y >= self.start_year.floor() && y < self.start_year + self.duration_years
    }
}

/// R&D spend in one calendar year (non-negative; the engine subtracts it)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RdCost {
    pub year: i32,
    pub cost_usd_m: f64,
}

impl RdCost {
    pub fn new(year: i32, cost_usd_m: f64) -> Self {
        Self { year, cost_usd_m }
    }
}

/// Commercial P&L row for one calendar year
///
/// Generated by the engine from the modelled revenue curve, or supplied by
/// the caller to override the modelled commercial cashflow for that year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommercialRow {
    pub year: i32,
    pub gross_sales_usd_m: f64,
    pub net_sales_usd_m: f64,
    pub cogs_usd_m: f64,
    pub sga_usd_m: f64,
    pub operating_profit_usd_m: f64,
    pub tax_usd_m: f64,
    pub net_cashflow_usd_m: f64,
}

/// Monte Carlo simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McConfig {
    /// Number of simulation iterations
    pub n_iterations: usize,

    /// Std deviation of the relative peak-sales shock
    pub peak_sales_std_pct: f64,

    /// Std deviation of the launch delay in years (quantised per draw)
    pub launch_delay_std_years: f64,

    /// Std deviation of the relative per-phase PoS shock
    pub pos_variation_pct: f64,

    /// PRNG seed; entropy-seeded when absent
    pub seed: Option<u64>,
}

impl Default for McConfig {
    fn default() -> Self {
        Self {
            n_iterations: 10_000,
            peak_sales_std_pct: 0.20,
            launch_delay_std_years: 1.0,
            pos_variation_pct: 0.10,
            seed: None,
        }
    }
}

/// Asset-level what-if levers, applied as a pure transform before valuation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhatIfLevers {
    /// Multiplier on peak sales (1.0 = unchanged)
    pub peak_sales_multiplier: f64,

    /// Whole-year shift applied to launch and patent expiry jointly
    pub launch_delay_years: i32,

    /// Replacement PoS per phase name; phases not listed are unchanged
    #[serde(default)]
    pub pos_override: std::collections::BTreeMap<String, f64>,

    pub discount_rate_override: Option<f64>,
    pub cogs_pct_override: Option<f64>,
    pub sga_pct_override: Option<f64>,
}

impl Default for WhatIfLevers {
    fn default() -> Self {
        Self {
            peak_sales_multiplier: 1.0,
            launch_delay_years: 0,
            pos_override: std::collections::BTreeMap::new(),
            discount_rate_override: None,
            cogs_pct_override: None,
            sga_pct_override: None,
        }
    }
}

/// Complete valuation input for one asset at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unique snapshot identifier
    pub id: u32,

    /// Owning asset
    pub asset_id: u32,

    /// Dense monotonically increasing version per asset
    pub version: u32,

    /// Human-readable label (e.g. "Base Case")
    pub label: String,

    /// Year the valuation is stated as of
    pub valuation_year: i32,

    /// Modelling horizon in years; must cover the patent expiry
    pub horizon_years: i32,

    /// Discount rate applied to the R&D stage
    pub wacc_rd: f64,

    /// Expected approval date, fractional years allowed for mid-year events
    pub approval_date: Option<f64>,

    /// Revenue ramp shape
    pub uptake_curve: UptakeCurve,

    /// Years from launch to peak sales
    pub time_to_peak_years: f64,

    /// Fraction of sales lost in the first year post-expiry
    pub generic_erosion_pct: f64,

    /// Cost of goods as a fraction of gross sales
    pub cogs_pct: f64,

    /// SG&A as a fraction of gross sales
    pub sga_pct: f64,

    /// Tax rate on positive operating profit
    pub tax_rate: f64,

    /// Discount rate for the commercial cashflow stream
    pub discount_rate: f64,

    /// Peak annual sales, USD millions
    pub peak_sales_usd_m: f64,

    /// Calendar year of commercial launch
    pub launch_year: i32,

    /// Calendar year generic erosion begins
    pub patent_expiry_year: i32,

    /// R&D phases, ordered by start year
    pub phase_inputs: Vec<PhaseInput>,

    /// R&D spend by year
    pub rd_costs: Vec<RdCost>,

    /// Caller-supplied commercial rows overriding the modelled curve
    #[serde(default)]
    pub commercial_rows: Vec<CommercialRow>,

    /// Attached Monte Carlo defaults for this snapshot
    #[serde(default)]
    pub mc_config: Option<McConfig>,

    /// Attached what-if levers, applied only on the what-if path
    #[serde(default)]
    pub whatif_levers: Option<WhatIfLevers>,

    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    /// Create a snapshot with default commercial assumptions
    pub fn new(id: u32, asset_id: u32, label: impl Into<String>) -> Self {
        Self {
            id,
            asset_id,
            version: 1,
            label: label.into(),
            valuation_year: 2025,
            horizon_years: 20,
            wacc_rd: 0.10,
            approval_date: None,
            uptake_curve: UptakeCurve::Linear,
            time_to_peak_years: 5.0,
            generic_erosion_pct: 0.80,
            cogs_pct: 0.20,
            sga_pct: 0.25,
            tax_rate: 0.21,
            discount_rate: 0.10,
            peak_sales_usd_m: 500.0,
            launch_year: 2030,
            patent_expiry_year: 2040,
            phase_inputs: Vec::new(),
            rd_costs: Vec::new(),
            commercial_rows: Vec::new(),
            mc_config: None,
            whatif_levers: None,
            created_at: Utc::now(),
        }
    }

    /// Total R&D spend recorded for a calendar year
    pub fn rd_cost_at(&self, year: i32) -> f64 {
        self.rd_costs
            .iter()
            .filter(|rc| rc.year == year)
            .map(|rc| rc.cost_usd_m)
            .sum()
    }

    /// Caller-supplied commercial row for a year, if any
    pub fn commercial_row_at(&self, year: i32) -> Option<&CommercialRow> {
        self.commercial_rows.iter().find(|cr| cr.year == year)
    }

    /// Find a phase by name
    pub fn phase(&self, name: &str) -> Option<&PhaseInput> {
        self.phase_inputs.iter().find(|pi| pi.phase_name == name)
    }

    /// Phases in stable ascending start-year order
    pub fn sorted_phases(&self) -> Vec<PhaseInput> {
        let mut phases = self.phase_inputs.clone();
        phases.sort_by(|a, b| {
            a.start_year
                .partial_cmp(&b.start_year)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        phases
    }

    /// Check the snapshot invariants, refusing to evaluate on violation
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.horizon_years <= 0 {
            return Err(EngineError::Config(format!(
                "horizon_years must be positive, got {}",
                self.horizon_years
            )));
        }
        if self.horizon_years < self.patent_expiry_year - self.valuation_year {
            return Err(EngineError::Config(format!(
                "horizon_years {} does not cover patent expiry {} from valuation year {}",
                self.horizon_years, self.patent_expiry_year, self.valuation_year
            )));
        }
        if self.launch_year > self.patent_expiry_year {
            return Err(EngineError::Config(format!(
                "launch_year {} is after patent_expiry_year {}",
                self.launch_year, self.patent_expiry_year
            )));
        }
        let rates = [
            ("generic_erosion_pct", self.generic_erosion_pct),
            ("cogs_pct", self.cogs_pct),
            ("sga_pct", self.sga_pct),
            ("tax_rate", self.tax_rate),
            ("discount_rate", self.discount_rate),
            ("wacc_rd", self.wacc_rd),
        ];
        for (name, rate) in rates {
            if !(0.0..=1.0).contains(&rate) {
                return Err(EngineError::Config(format!(
                    "{} must be in [0, 1], got {}",
                    name, rate
                )));
            }
        }
        for pi in &self.phase_inputs {
            if !(0.0..=1.0).contains(&pi.probability_of_success) {
                return Err(EngineError::Config(format!(
                    "probability_of_success for {} must be in [0, 1], got {}",
                    pi.phase_name, pi.probability_of_success
                )));
            }
        }
        for rc in &self.rd_costs {
            if rc.cost_usd_m < 0.0 {
                return Err(EngineError::Config(format!(
                    "rd cost for {} must be non-negative, got {}",
                    rc.year, rc.cost_usd_m
                )));
            }
        }
        Ok(())
    }
}
