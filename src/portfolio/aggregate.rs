//! Deterministic portfolio aggregation
//!
//! Values every member on its effective snapshot (base snapshot plus any
//! scenario overrides routed to it), appends synthetic members from
//! structural overrides, zeroes killed members, and aggregates totals and
//! the yearly cash-flow timeline.

use std::collections::BTreeMap;

use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::data::Portfolio;
use crate::asset::{Asset, Snapshot, SnapshotStore};
use crate::error::EngineError;
use crate::montecarlo::stats::{mean, percentile};
use crate::scenario::{apply_kinds, OverrideKind, ScenarioOverride};
use crate::valuation::{ValuationEngine, ValuationResult};

/// Per-member block of the portfolio summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberValuation {
    pub asset_id: u32,
    pub compound_name: String,
    pub therapeutic_area: String,
    pub current_phase: String,
    pub snapshot_id: u32,

    /// False once a kill override has deactivated the member
    pub is_active: bool,

    pub enpv_original_usd_m: f64,
    pub enpv_simulated_usd_m: f64,

    /// Contribution counted in the portfolio total: simulated when
    /// active, 0 when killed
    pub enpv_used_usd_m: f64,

    pub terminal_pos: f64,
    pub peak_sales_usd_m: f64,
    pub launch_year: i32,
    pub patent_expiry_year: i32,
    pub overrides_applied: usize,
}

/// A synthetic member's contribution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticValuation {
    pub name: String,
    pub enpv_usd_m: f64,
}

/// Deterministic portfolio summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub portfolio_id: u32,
    pub name: String,
    pub num_assets: usize,
    pub active_assets: usize,
    pub total_enpv_usd_m: f64,
    pub mean_enpv_usd_m: f64,
    pub median_enpv_usd_m: f64,
    pub total_peak_sales_usd_m: f64,
    pub members: Vec<MemberValuation>,
    pub synthetic: Vec<SyntheticValuation>,
}

/// Yearly totals across active members and synthetics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyTotals {
    pub year: i32,
    pub total_rd_cost_usd_m: f64,
    pub total_commercial_cf_usd_m: f64,
    pub total_net_cf_usd_m: f64,
    pub total_risk_adjusted_cf_usd_m: f64,
    pub total_pv_usd_m: f64,
    pub cumulative_pv_usd_m: f64,
}

/// Deterministic portfolio aggregator
#[derive(Debug, Clone, Default)]
pub struct PortfolioAggregator {
    engine: ValuationEngine,
}

struct EvaluatedMember {
    asset: Asset,
    snapshot_id: u32,
    is_active: bool,
    original: ValuationResult,
    simulated: ValuationResult,
    patent_expiry_year: i32,
    overrides_applied: usize,
}

struct EvaluatedSynthetic {
    name: String,
    result: ValuationResult,
}

impl PortfolioAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the deterministic summary for a portfolio under a set of
    /// scenario overrides
    pub fn summarize(
        &self,
        store: &dyn SnapshotStore,
        portfolio: &Portfolio,
        overrides: &[ScenarioOverride],
    ) -> Result<PortfolioSummary, EngineError> {
        let (members, synthetics) = self.evaluate(store, portfolio, overrides)?;

        let member_blocks: Vec<MemberValuation> = members
            .iter()
            .map(|m| MemberValuation {
                asset_id: m.asset.id,
                compound_name: m.asset.compound_name.clone(),
                therapeutic_area: m.asset.therapeutic_area.clone(),
                current_phase: m.asset.current_phase.clone(),
                snapshot_id: m.snapshot_id,
                is_active: m.is_active,
                enpv_original_usd_m: m.original.enpv_usd_m,
                enpv_simulated_usd_m: m.simulated.enpv_usd_m,
                enpv_used_usd_m: if m.is_active { m.simulated.enpv_usd_m } else { 0.0 },
                terminal_pos: m.original.terminal_pos,
                peak_sales_usd_m: m.simulated.peak_sales_usd_m,
                launch_year: m.simulated.launch_year,
                patent_expiry_year: m.patent_expiry_year,
                overrides_applied: m.overrides_applied,
            })
            .collect();

        let synthetic_blocks: Vec<SyntheticValuation> = synthetics
            .iter()
            .map(|s| SyntheticValuation {
                name: s.name.clone(),
                enpv_usd_m: s.result.enpv_usd_m,
            })
            .collect();

        let active_enpvs: Vec<f64> = member_blocks
            .iter()
            .filter(|m| m.is_active)
            .map(|m| m.enpv_used_usd_m)
            .collect();
        let mut sorted_enpvs = active_enpvs.clone();
        sorted_enpvs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let total_members: f64 = member_blocks.iter().map(|m| m.enpv_used_usd_m).sum();
        let total_synthetic: f64 = synthetic_blocks.iter().map(|s| s.enpv_usd_m).sum();

        Ok(PortfolioSummary {
            portfolio_id: portfolio.id,
            name: portfolio.name.clone(),
            num_assets: member_blocks.len(),
            active_assets: active_enpvs.len(),
            total_enpv_usd_m: total_members + total_synthetic,
            mean_enpv_usd_m: mean(&active_enpvs),
            median_enpv_usd_m: percentile(&sorted_enpvs, 50.0),
            total_peak_sales_usd_m: member_blocks
                .iter()
                .filter(|m| m.is_active)
                .map(|m| m.peak_sales_usd_m)
                .sum(),
            members: member_blocks,
            synthetic: synthetic_blocks,
        })
    }

    /// Aggregate yearly cashflows across active members and synthetics
    pub fn timeline(
        &self,
        store: &dyn SnapshotStore,
        portfolio: &Portfolio,
        overrides: &[ScenarioOverride],
    ) -> Result<Vec<YearlyTotals>, EngineError> {
        let (members, synthetics) = self.evaluate(store, portfolio, overrides)?;

        let mut yearly: BTreeMap<i32, YearlyTotals> = BTreeMap::new();
        let active_results = members
            .iter()
            .filter(|m| m.is_active)
            .map(|m| &m.simulated)
            .chain(synthetics.iter().map(|s| &s.result));

        for result in active_results {
            for row in &result.cashflows {
                let entry = yearly.entry(row.year).or_insert_with(|| YearlyTotals {
                    year: row.year,
                    total_rd_cost_usd_m: 0.0,
                    total_commercial_cf_usd_m: 0.0,
                    total_net_cf_usd_m: 0.0,
                    total_risk_adjusted_cf_usd_m: 0.0,
                    total_pv_usd_m: 0.0,
                    cumulative_pv_usd_m: 0.0,
                });
                entry.total_rd_cost_usd_m += row.rd_cost_usd_m;
                entry.total_commercial_cf_usd_m += row.commercial_cf_usd_m;
                entry.total_net_cf_usd_m += row.net_cashflow_usd_m;
                entry.total_risk_adjusted_cf_usd_m += row.risk_adjusted_cf_usd_m;
                entry.total_pv_usd_m += row.pv_usd_m;
            }
        }

        let mut rows: Vec<YearlyTotals> = yearly.into_values().collect();
        let mut cum_pv = 0.0;
        for row in &mut rows {
            cum_pv += row.total_pv_usd_m;
            row.cumulative_pv_usd_m = cum_pv;
        }
        Ok(rows)
    }

    /// Route overrides, build effective snapshots, and value everything
    fn evaluate(
        &self,
        store: &dyn SnapshotStore,
        portfolio: &Portfolio,
        overrides: &[ScenarioOverride],
    ) -> Result<(Vec<EvaluatedMember>, Vec<EvaluatedSynthetic>), EngineError> {
        for ov in overrides {
            if let Some(target) = ov.target {
                if !portfolio.has_member(target) {
                    return Err(EngineError::ScenarioConflict(format!(
                        "snapshot {} targeted by '{}' is not a member of portfolio {}",
                        target,
                        ov.kind.name(),
                        portfolio.id
                    )));
                }
            } else if !matches!(
                ov.kind,
                OverrideKind::AddHypothetical { .. } | OverrideKind::AddBdDeal { .. }
            ) {
                return Err(EngineError::Config(format!(
                    "override '{}' requires a target snapshot",
                    ov.kind.name()
                )));
            }
        }

        // Build each member's effective snapshot
        let mut prepared: Vec<(Asset, Snapshot, Snapshot, bool, usize)> = Vec::new();
        for member in &portfolio.members {
            let snapshot = store.load_snapshot(member.snapshot_id)?;
            let asset = store
                .load_asset(snapshot.asset_id)
                .unwrap_or_else(|_| Asset::new(snapshot.asset_id, format!("Asset {}", snapshot.asset_id), ""));

            let member_kinds: Vec<&OverrideKind> = overrides
                .iter()
                .filter(|ov| ov.target == Some(member.snapshot_id))
                .map(|ov| &ov.kind)
                .filter(|k| k.is_snapshot_transform())
                .collect();
            let killed = overrides
                .iter()
                .any(|ov| ov.target == Some(member.snapshot_id) && matches!(ov.kind, OverrideKind::Kill));

            let overrides_applied = member_kinds.len() + usize::from(killed);
            let effective = apply_kinds(&snapshot, &member_kinds)?;
            prepared.push((asset, snapshot, effective, !killed, overrides_applied));
        }

        debug!(
            "portfolio {}: valuing {} members, {} overrides",
            portfolio.id,
            prepared.len(),
            overrides.len()
        );

        let members: Vec<EvaluatedMember> = prepared
            .par_iter()
            .map(|(asset, snapshot, effective, is_active, overrides_applied)| {
                let original = self.engine.value_snapshot(snapshot)?;
                let simulated = self.engine.value_snapshot(effective)?;
                Ok(EvaluatedMember {
                    asset: asset.clone(),
                    snapshot_id: snapshot.id,
                    is_active: *is_active,
                    original,
                    simulated,
                    patent_expiry_year: effective.patent_expiry_year,
                    overrides_applied: *overrides_applied,
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;

        // Synthetic members are valued as of the first member's valuation
        // year (or the engine default for an empty portfolio)
        let valuation_year = prepared
            .first()
            .map(|(_, snapshot, _, _, _)| snapshot.valuation_year)
            .unwrap_or(2025);

        let mut synthetics = Vec::new();
        for ov in overrides {
            match &ov.kind {
                OverrideKind::AddHypothetical { project } => {
                    let snap = project.to_snapshot(valuation_year);
                    synthetics.push(EvaluatedSynthetic {
                        name: project.compound_name.clone(),
                        result: self.engine.value_snapshot(&snap)?,
                    });
                }
                OverrideKind::AddBdDeal { deal } => {
                    let snap = deal.to_snapshot(valuation_year);
                    synthetics.push(EvaluatedSynthetic {
                        name: deal.deal_name.clone(),
                        result: self.engine.value_snapshot(&snap)?,
                    });
                }
                _ => {}
            }
        }

        Ok((members, synthetics))
    }
}
