//! Asset-level what-if lever application
//!
//! Produces a modified copy of a snapshot with the lever set applied; the
//! source snapshot is never touched. Unlike the portfolio override
//! pipeline, the launch delay here shifts launch and patent expiry
//! jointly, preserving the exclusivity window.

use crate::asset::{Snapshot, WhatIfLevers};

/// Apply what-if levers to a snapshot, returning the effective copy
///
/// When `levers` is `None`, the snapshot's attached lever set is used; a
/// snapshot with no levers at all is returned unchanged.
pub fn apply_whatif_levers(snapshot: &Snapshot, levers: Option<&WhatIfLevers>) -> Snapshot {
    let mut effective = snapshot.clone();
    let Some(levers) = levers.or(snapshot.whatif_levers.as_ref()) else {
        return effective;
    };

    effective.peak_sales_usd_m *= levers.peak_sales_multiplier;
    effective.launch_year += levers.launch_delay_years;
    effective.patent_expiry_year += levers.launch_delay_years;

    if let Some(rate) = levers.discount_rate_override {
        effective.discount_rate = rate;
    }
    if let Some(cogs) = levers.cogs_pct_override {
        effective.cogs_pct = cogs;
    }
    if let Some(sga) = levers.sga_pct_override {
        effective.sga_pct = sga;
    }

    for pi in &mut effective.phase_inputs {
        if let Some(&pos) = levers.pos_override.get(&pi.phase_name) {
            pi.probability_of_success = pos;
        }
    }

    effective
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{PhaseInput, RdCost};
    use crate::valuation::ValuationEngine;
    use approx::assert_relative_eq;

    fn snapshot_with_levers(levers: Option<WhatIfLevers>) -> Snapshot {
        let mut snap = Snapshot::new(1, 1, "Base Case");
        snap.peak_sales_usd_m = 1000.0;
        snap.phase_inputs = vec![
            PhaseInput::new("P2", 0.40, 3.0, 2025.0),
            PhaseInput::new("P3", 0.55, 3.0, 2028.0),
        ];
        snap.rd_costs = vec![RdCost::new(2025, 10.0)];
        snap.whatif_levers = levers;
        snap
    }

    #[test]
    fn test_peak_multiplier_applied() {
        let levers = WhatIfLevers {
            peak_sales_multiplier: 1.2,
            ..Default::default()
        };
        let snap = snapshot_with_levers(None);
        let effective = apply_whatif_levers(&snap, Some(&levers));
        assert_relative_eq!(effective.peak_sales_usd_m, 1200.0, epsilon = 1e-9);
        // Source is untouched
        assert_relative_eq!(snap.peak_sales_usd_m, 1000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_launch_delay_shifts_launch_and_expiry_jointly() {
        let levers = WhatIfLevers {
            launch_delay_years: 2,
            ..Default::default()
        };
        let snap = snapshot_with_levers(None);
        let effective = apply_whatif_levers(&snap, Some(&levers));
        assert_eq!(effective.launch_year, snap.launch_year + 2);
        assert_eq!(effective.patent_expiry_year, snap.patent_expiry_year + 2);
    }

    #[test]
    fn test_rate_overrides_and_pos_map() {
        let mut levers = WhatIfLevers::default();
        levers.discount_rate_override = Some(0.12);
        levers.cogs_pct_override = Some(0.25);
        levers.pos_override.insert("P3".to_string(), 0.70);
        // Names matching no phase are ignored
        levers.pos_override.insert("P9".to_string(), 0.99);

        let snap = snapshot_with_levers(None);
        let effective = apply_whatif_levers(&snap, Some(&levers));
        assert_relative_eq!(effective.discount_rate, 0.12, epsilon = 1e-12);
        assert_relative_eq!(effective.cogs_pct, 0.25, epsilon = 1e-12);
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
    fn test_attached_levers_used_when_none_supplied() {
        let snap = snapshot_with_levers(Some(WhatIfLevers {
            peak_sales_multiplier: 1.5,
            ..Default::default()
        }));
        let effective = apply_whatif_levers(&snap, None);
        assert_relative_eq!(effective.peak_sales_usd_m, 1500.0, epsilon = 1e-9);
    }

    #[test]
    fn test_valuation_unchanged_after_lever_application() {
        let engine = ValuationEngine::default();
        let snap = snapshot_with_levers(None);
        let before = engine.value_snapshot(&snap).unwrap();

        let levers = WhatIfLevers {
            peak_sales_multiplier: 1.2,
            ..Default::default()
        };
        let effective = apply_whatif_levers(&snap, Some(&levers));
        let after_levers = engine.value_snapshot(&effective).unwrap();
        let after = engine.value_snapshot(&snap).unwrap();

        assert_eq!(before.enpv_usd_m, after.enpv_usd_m);
        assert!(after_levers.enpv_usd_m > before.enpv_usd_m);
    }
}
