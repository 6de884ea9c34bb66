//! Scenario override pipeline
//!
//! An override is an evaluation-time transform answering a "what-if"
//! question. Snapshot-level kinds compose into a pure
//! `Snapshot -> Snapshot` pipeline applied to a deep copy; `kill` and the
//! `add_*` kinds operate at the portfolio layer and are rejected here.
//!
//! Kinds apply in a fixed order regardless of list position, so later
//! kinds always see earlier kinds' results: peak_sales_change,
//! sr_override, phase_delay, launch_delay, time_to_peak_change,
//! accelerate, budget_realloc.

use serde::{Deserialize, Serialize};

use super::acceleration::{acceleration_curve, MAX_TIMELINE_REDUCTION};
use crate::asset::{PhaseInput, Snapshot};
use crate::error::EngineError;
use crate::portfolio::{BdDeal, HypotheticalProject};

/// One scenario override: what to change, on which member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOverride {
    /// Snapshot id of the targeted member; `None` for portfolio-level
    /// structural kinds
    pub target: Option<u32>,

    #[serde(flatten)]
    pub kind: OverrideKind,

    #[serde(default)]
    pub description: Option<String>,
}

impl ScenarioOverride {
    pub fn new(target: Option<u32>, kind: OverrideKind) -> Self {
        Self {
            target,
            kind,
            description: None,
        }
    }
}

/// The tagged sum of override kinds
///
/// Durations arrive in months at this boundary and are converted to years
/// internally. Unknown kinds fail deserialization, surfacing as a
/// configuration error at the edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverrideKind {
    /// Multiply peak sales by `1 + pct/100`, commercial rows likewise
    PeakSalesChange { pct: f64 },

    /// Replace the PoS of the named phase
    SrOverride { phase: String, pos: f64 },

    /// Shift every phase start, the approval date, and the launch by
    /// `months / 12` years; patent expiry stays put
    PhaseDelay { months: f64 },

    /// Shift only the commercial launch
    LaunchDelay { months: f64 },

    /// Add years to time-to-peak, floored at 0.5
    TimeToPeakChange { years: f64 },

    /// Shorten the named phase, pulling later phases and launch earlier.
    /// Explicit `months`, or a `budget_multiplier` driving the concave
    /// acceleration curve (which also uplifts that phase's R&D spend).
    Accelerate {
        phase: String,
        #[serde(default)]
        months: Option<f64>,
        #[serde(default)]
        budget_multiplier: Option<f64>,
    },

    /// Multiply R&D spend, portfolio-wide or for one phase's years
    BudgetRealloc {
        factor: f64,
        #[serde(default)]
        phase: Option<String>,
    },

    /// Deactivate the member: zero contribution, cashflows excluded
    Kill,

    /// Attach a hypothetical project to the portfolio for this evaluation
    AddHypothetical { project: HypotheticalProject },

    /// Attach a BD deal placeholder to the portfolio for this evaluation
    AddBdDeal { deal: BdDeal },
}

impl OverrideKind {
    /// Whether this kind transforms a single snapshot (as opposed to the
    /// portfolio structure)
    pub fn is_snapshot_transform(&self) -> bool {
        !matches!(
            self,
            OverrideKind::Kill | OverrideKind::AddHypothetical { .. } | OverrideKind::AddBdDeal { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            OverrideKind::PeakSalesChange { .. } => "peak_sales_change",
            OverrideKind::SrOverride { .. } => "sr_override",
            OverrideKind::PhaseDelay { .. } => "phase_delay",
            OverrideKind::LaunchDelay { .. } => "launch_delay",
            OverrideKind::TimeToPeakChange { .. } => "time_to_peak_change",
            OverrideKind::Accelerate { .. } => "accelerate",
            OverrideKind::BudgetRealloc { .. } => "budget_realloc",
            OverrideKind::Kill => "kill",
            OverrideKind::AddHypothetical { .. } => "add_hypothetical",
            OverrideKind::AddBdDeal { .. } => "add_bd_deal",
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            OverrideKind::PeakSalesChange { .. } => 0,
            OverrideKind::SrOverride { .. } => 1,
            OverrideKind::PhaseDelay { .. } => 2,
            OverrideKind::LaunchDelay { .. } => 3,
            OverrideKind::TimeToPeakChange { .. } => 4,
            OverrideKind::Accelerate { .. } => 5,
            OverrideKind::BudgetRealloc { .. } => 6,
            OverrideKind::Kill => 7,
            OverrideKind::AddHypothetical { .. } | OverrideKind::AddBdDeal { .. } => 8,
        }
    }
}

/// Apply snapshot-level overrides, returning the effective copy
///
/// The source snapshot is never modified. Portfolio-level kinds in the
/// list are a configuration error; a kind referencing a phase the
/// snapshot does not have is a scenario conflict.
pub fn apply_overrides(
    snapshot: &Snapshot,
    overrides: &[ScenarioOverride],
) -> Result<Snapshot, EngineError> {
    let kinds: Vec<&OverrideKind> = overrides.iter().map(|ov| &ov.kind).collect();
    apply_kinds(snapshot, &kinds)
}

/// Apply a set of override kinds to a snapshot copy, in precedence order
pub(crate) fn apply_kinds(
    snapshot: &Snapshot,
    kinds: &[&OverrideKind],
) -> Result<Snapshot, EngineError> {
    let mut ordered: Vec<&OverrideKind> = kinds.to_vec();
    ordered.sort_by_key(|k| k.precedence());

    let mut effective = snapshot.clone();
    for kind in ordered {
        apply_one(&mut effective, kind)?;
    }
    Ok(effective)
}

fn apply_one(snap: &mut Snapshot, kind: &OverrideKind) -> Result<(), EngineError> {
    match kind {
        OverrideKind::PeakSalesChange { pct } => {
            let multiplier = 1.0 + pct / 100.0;
            snap.peak_sales_usd_m *= multiplier;
            for cr in &mut snap.commercial_rows {
                cr.gross_sales_usd_m *= multiplier;
                cr.net_sales_usd_m *= multiplier;
                cr.cogs_usd_m *= multiplier;
                cr.sga_usd_m *= multiplier;
                cr.operating_profit_usd_m *= multiplier;
                cr.tax_usd_m *= multiplier;
                cr.net_cashflow_usd_m *= multiplier;
            }
            Ok(())
        }

        OverrideKind::SrOverride { phase, pos } => {
            let pi = find_phase_mut(snap, phase)?;
            pi.probability_of_success = *pos;
            Ok(())
        }

        OverrideKind::PhaseDelay { months } => {
            let dy = months / 12.0;
            for pi in &mut snap.phase_inputs {
                pi.start_year += dy;
            }
            if let Some(approval) = snap.approval_date.as_mut() {
                *approval += dy;
            }
            snap.launch_year = shift_calendar_year(snap.launch_year, dy);
            Ok(())
        }

        OverrideKind::LaunchDelay { months } => {
            snap.launch_year = shift_calendar_year(snap.launch_year, months / 12.0);
            Ok(())
        }

        OverrideKind::TimeToPeakChange { years } => {
            snap.time_to_peak_years = (snap.time_to_peak_years + years).max(0.5);
            Ok(())
        }

        OverrideKind::Accelerate {
            phase,
            months,
            budget_multiplier,
        } => {
            let accelerated = find_phase_mut(snap, phase)?.clone();

            let requested = match (months, budget_multiplier) {
                (_, Some(bm)) => acceleration_curve(*bm) * accelerated.duration_years,
                (Some(m), None) => m.abs() / 12.0,
                (None, None) => {
                    return Err(EngineError::Config(format!(
                        "accelerate on '{}' requires months or budget_multiplier",
                        phase
                    )))
                }
            };
            let reduction = requested.min(MAX_TIMELINE_REDUCTION * accelerated.duration_years);

            for pi in &mut snap.phase_inputs {
                if pi.phase_name == accelerated.phase_name {
                    pi.duration_years -= reduction;
                } else if pi.start_year > accelerated.start_year {
                    pi.start_year -= reduction;
                }
            }
            if let Some(approval) = snap.approval_date.as_mut() {
                *approval -= reduction;
            }
            snap.launch_year = shift_calendar_year(snap.launch_year, -reduction);

            if let Some(bm) = budget_multiplier {
                for rc in &mut snap.rd_costs {
                    if accelerated.covers_year(rc.year) {
                        rc.cost_usd_m *= bm;
                    }
                }
            }
            Ok(())
        }

        OverrideKind::BudgetRealloc { factor, phase } => {
            let window: Option<PhaseInput> = match phase {
                Some(name) => Some(find_phase_mut(snap, name)?.clone()),
                None => None,
            };
            for rc in &mut snap.rd_costs {
                let in_scope = window.as_ref().map(|pi| pi.covers_year(rc.year)).unwrap_or(true);
                if in_scope {
                    rc.cost_usd_m *= factor;
                }
            }
            Ok(())
        }

        OverrideKind::Kill
        | OverrideKind::AddHypothetical { .. }
        | OverrideKind::AddBdDeal { .. } => Err(EngineError::Config(format!(
            "portfolio-level override '{}' cannot be applied to a single snapshot",
            kind.name()
        ))),
    }
}

fn find_phase_mut<'a>(snap: &'a mut Snapshot, name: &str) -> Result<&'a mut PhaseInput, EngineError> {
    let snapshot_id = snap.id;
    snap.phase_inputs
        .iter_mut()
        .find(|pi| pi.phase_name == name)
        .ok_or_else(|| {
            EngineError::ScenarioConflict(format!(
                "phase '{}' not present in snapshot {}",
                name, snapshot_id
            ))
        })
}

/// Shift an integer calendar year by a fractional year amount, quantising
/// by round-half-away-from-zero (the same quantisation the Monte Carlo
/// sampler applies to launch delays)
fn shift_calendar_year(year: i32, dy: f64) -> i32 {
    (year as f64 + dy).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::RdCost;
    use crate::valuation::ValuationEngine;
    use approx::assert_relative_eq;

    fn base_snapshot() -> Snapshot {
        let mut snap = Snapshot::new(1, 1, "Base Case");
        snap.peak_sales_usd_m = 1000.0;
        snap.launch_year = 2030;
        snap.patent_expiry_year = 2040;
        snap.approval_date = Some(2029.5);
        snap.phase_inputs = vec![
            PhaseInput::new("P2", 0.40, 3.0, 2025.0),
            PhaseInput::new("P3", 0.55, 3.0, 2028.0),
            PhaseInput::new("Filing", 0.90, 1.0, 2031.0),
        ];
        snap.rd_costs = vec![
            RdCost::new(2025, 10.0),
            RdCost::new(2028, 40.0),
            RdCost::new(2031, 5.0),
        ];
        snap
    }

    fn ov(kind: OverrideKind) -> ScenarioOverride {
        ScenarioOverride::new(Some(1), kind)
    }

    #[test]
    fn test_peak_sales_change_scales_without_mutating_source() {
        let snap = base_snapshot();
        let engine = ValuationEngine::default();
        let before = engine.value_snapshot(&snap).unwrap();

        let effective =
            apply_overrides(&snap, &[ov(OverrideKind::PeakSalesChange { pct: 20.0 })]).unwrap();
        assert_relative_eq!(effective.peak_sales_usd_m, 1200.0, epsilon = 1e-9);
        assert_relative_eq!(snap.peak_sales_usd_m, 1000.0, epsilon = 1e-9);

        let after = engine.value_snapshot(&snap).unwrap();
        assert_eq!(before.enpv_usd_m, after.enpv_usd_m);
        assert_eq!(before.cashflows, after.cashflows);

        let uplifted = engine.value_snapshot(&effective).unwrap();
        assert!(uplifted.enpv_usd_m > before.enpv_usd_m);
    }

    #[test]
    fn test_sr_override_replaces_named_phase() {
        let snap = base_snapshot();
        let effective = apply_overrides(
            &snap,
            &[ov(OverrideKind::SrOverride {
                phase: "P3".to_string(),
                pos: 0.70,
            })],
        )
        .unwrap();
        assert_relative_eq!(
            effective.phase("P3").unwrap().probability_of_success,
            0.70,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            effective.phase("P2").unwrap().probability_of_success,
            0.40,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_sr_override_unknown_phase_conflicts() {
        let snap = base_snapshot();
        let result = apply_overrides(
            &snap,
            &[ov(OverrideKind::SrOverride {
                phase: "P9".to_string(),
                pos: 0.70,
            })],
        );
        assert!(matches!(result, Err(EngineError::ScenarioConflict(_))));
    }

    #[test]
    fn test_phase_delay_shifts_phases_exactly_and_quantises_launch() {
        let snap = base_snapshot();
        let effective =
            apply_overrides(&snap, &[ov(OverrideKind::PhaseDelay { months: 18.0 })]).unwrap();

        assert_relative_eq!(effective.phase("P2").unwrap().start_year, 2026.5, epsilon = 1e-12);
        assert_relative_eq!(effective.approval_date.unwrap(), 2031.0, epsilon = 1e-12);
        // 1.5 years on an integer calendar year rounds away from zero
        assert_eq!(effective.launch_year, 2032);
        // Delay erodes the exclusivity window: expiry stays put
        assert_eq!(effective.patent_expiry_year, 2040);
    }

    #[test]
    fn test_small_phase_delay_leaves_launch_year() {
        let snap = base_snapshot();
        let effective =
            apply_overrides(&snap, &[ov(OverrideKind::PhaseDelay { months: 3.0 })]).unwrap();
        assert_eq!(effective.launch_year, 2030);
        assert_relative_eq!(effective.phase("P2").unwrap().start_year, 2025.25, epsilon = 1e-12);
    }

    #[test]
    fn test_launch_delay_touches_only_launch() {
        let snap = base_snapshot();
        let effective =
            apply_overrides(&snap, &[ov(OverrideKind::LaunchDelay { months: 12.0 })]).unwrap();
        assert_eq!(effective.launch_year, 2031);
        assert_eq!(effective.patent_expiry_year, 2040);
        assert_relative_eq!(effective.phase("P2").unwrap().start_year, 2025.0, epsilon = 1e-12);
        assert_relative_eq!(effective.approval_date.unwrap(), 2029.5, epsilon = 1e-12);
    }

    #[test]
    fn test_time_to_peak_floored() {
        let snap = base_snapshot();
        let effective =
            apply_overrides(&snap, &[ov(OverrideKind::TimeToPeakChange { years: -10.0 })]).unwrap();
        assert_relative_eq!(effective.time_to_peak_years, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_accelerate_by_months_pulls_later_phases_and_launch() {
        let snap = base_snapshot();
        let effective = apply_overrides(
            &snap,
            &[ov(OverrideKind::Accelerate {
                phase: "P3".to_string(),
                months: Some(-12.0),
                budget_multiplier: None,
            })],
        )
        .unwrap();

        assert_relative_eq!(effective.phase("P3").unwrap().duration_years, 2.0, epsilon = 1e-12);
        // Earlier phases untouched, later phases pulled in
        assert_relative_eq!(effective.phase("P2").unwrap().start_year, 2025.0, epsilon = 1e-12);
        assert_relative_eq!(effective.phase("Filing").unwrap().start_year, 2030.0, epsilon = 1e-12);
        assert_eq!(effective.launch_year, 2029);
        assert_relative_eq!(effective.approval_date.unwrap(), 2028.5, epsilon = 1e-12);
        assert_eq!(effective.patent_expiry_year, 2040);
    }

    #[test]
    fn test_accelerate_reduction_capped_at_half_duration() {
        let snap = base_snapshot();
        let effective = apply_overrides(
            &snap,
            &[ov(OverrideKind::Accelerate {
                phase: "P3".to_string(),
                months: Some(-60.0),
                budget_multiplier: None,
            })],
        )
        .unwrap();
        // 5 requested years clamp to half of the 3-year phase
        assert_relative_eq!(effective.phase("P3").unwrap().duration_years, 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_accelerate_with_budget_uplifts_phase_costs() {
        let snap = base_snapshot();
        let effective = apply_overrides(
            &snap,
            &[ov(OverrideKind::Accelerate {
                phase: "P3".to_string(),
                months: None,
                budget_multiplier: Some(1.5),
            })],
        )
        .unwrap();

        let expected_reduction = 0.5 * 1.5_f64.ln() * 3.0;
        assert_relative_eq!(
            effective.phase("P3").unwrap().duration_years,
            3.0 - expected_reduction,
            epsilon = 1e-12
        );
        // Spend in the P3 window (2028..2031) is uplifted; other years not
        assert_relative_eq!(effective.rd_cost_at(2028), 60.0, epsilon = 1e-9);
        assert_relative_eq!(effective.rd_cost_at(2025), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_accelerate_requires_a_parameter() {
        let snap = base_snapshot();
        let result = apply_overrides(
            &snap,
            &[ov(OverrideKind::Accelerate {
                phase: "P3".to_string(),
                months: None,
                budget_multiplier: None,
            })],
        );
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_budget_realloc_scoped_to_phase() {
        let snap = base_snapshot();
        let effective = apply_overrides(
            &snap,
            &[ov(OverrideKind::BudgetRealloc {
                factor: 0.5,
                phase: Some("P2".to_string()),
            })],
        )
        .unwrap();
        assert_relative_eq!(effective.rd_cost_at(2025), 5.0, epsilon = 1e-12);
        assert_relative_eq!(effective.rd_cost_at(2028), 40.0, epsilon = 1e-12);
    }

    #[test]
    fn test_budget_realloc_portfolio_wide() {
        let snap = base_snapshot();
        let effective = apply_overrides(
            &snap,
            &[ov(OverrideKind::BudgetRealloc {
                factor: 2.0,
                phase: None,
            })],
        )
        .unwrap();
        assert_relative_eq!(effective.rd_cost_at(2025), 20.0, epsilon = 1e-12);
        assert_relative_eq!(effective.rd_cost_at(2028), 80.0, epsilon = 1e-12);
    }

    #[test]
    fn test_kinds_apply_in_precedence_order_regardless_of_list_order() {
        // Realloc listed first must still see the acceleration uplift
        let snap = base_snapshot();
        let effective = apply_overrides(
            &snap,
            &[
                ov(OverrideKind::BudgetRealloc {
                    factor: 2.0,
                    phase: Some("P3".to_string()),
                }),
                ov(OverrideKind::Accelerate {
                    phase: "P3".to_string(),
                    months: None,
                    budget_multiplier: Some(1.5),
                }),
            ],
        )
        .unwrap();
        assert_relative_eq!(effective.rd_cost_at(2028), 40.0 * 1.5 * 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_portfolio_level_kind_rejected_on_snapshot() {
        let snap = base_snapshot();
        let result = apply_overrides(&snap, &[ov(OverrideKind::Kill)]);
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_unknown_kind_fails_deserialization() {
        let json = r#"{"target": 1, "kind": "teleport", "value": 3}"#;
        let parsed: Result<ScenarioOverride, _> = serde_json::from_str(json);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_kind_round_trips_through_json() {
        let original = ov(OverrideKind::Accelerate {
            phase: "P3".to_string(),
            months: Some(-6.0),
            budget_multiplier: None,
        });
        let json = serde_json::to_string(&original).unwrap();
        let restored: ScenarioOverride = serde_json::from_str(&json).unwrap();
        assert_eq!(original, restored);
    }
}
