//! Run portfolio aggregation and correlated Monte Carlo for a demo
//! pipeline
//!
//! Builds a three-asset portfolio in the in-memory store, prints the
//! deterministic summary and yearly timeline, then sweeps the demand
//! correlation to show its effect on the portfolio distribution.

use std::time::Instant;

use pharma_npv::portfolio::{Portfolio, PortfolioAggregator, PortfolioSimulator};
use pharma_npv::{
    Asset, InMemoryStore, McConfig, OverrideKind, PhaseInput, RdCost, ScenarioOverride, Snapshot,
    SnapshotStore, UptakeCurve,
};

struct DemoAsset {
    name: &'static str,
    therapeutic_area: &'static str,
    peak_sales: f64,
    launch_year: i32,
    patent_expiry_year: i32,
    phases: Vec<PhaseInput>,
    rd_costs: Vec<RdCost>,
}

fn demo_assets() -> Vec<DemoAsset> {
    vec![
        DemoAsset {
            name: "Alphazumab",
            therapeutic_area: "Oncology",
            peak_sales: 1200.0,
            launch_year: 2032,
            patent_expiry_year: 2042,
            phases: vec![
                PhaseInput::new("P2", 0.42, 3.0, 2025.0),
                PhaseInput::new("P3", 0.58, 3.0, 2028.0),
                PhaseInput::new("Filing", 0.90, 1.0, 2031.0),
            ],
            rd_costs: vec![
                RdCost::new(2025, 20.0),
                RdCost::new(2027, 30.0),
                RdCost::new(2028, 90.0),
                RdCost::new(2030, 60.0),
            ],
        },
        DemoAsset {
            name: "Betascine",
            therapeutic_area: "Immunology",
            peak_sales: 800.0,
            launch_year: 2030,
            patent_expiry_year: 2041,
            phases: vec![
                PhaseInput::new("P3", 0.60, 3.0, 2025.0),
                PhaseInput::new("Filing", 0.92, 1.0, 2028.0),
                PhaseInput::new("Approval", 0.95, 1.0, 2029.0),
            ],
            rd_costs: vec![RdCost::new(2025, 70.0), RdCost::new(2026, 70.0), RdCost::new(2027, 40.0)],
        },
        DemoAsset {
            name: "Gammatinib",
            therapeutic_area: "Neurology",
            peak_sales: 500.0,
            launch_year: 2034,
            patent_expiry_year: 2044,
            phases: vec![
                PhaseInput::new("P1", 0.55, 2.0, 2025.0),
                PhaseInput::new("P2", 0.38, 3.0, 2027.0),
                PhaseInput::new("P3", 0.55, 3.0, 2030.0),
            ],
            rd_costs: vec![RdCost::new(2025, 10.0), RdCost::new(2027, 25.0), RdCost::new(2030, 85.0)],
        },
    ]
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let start = Instant::now();
    let mut store = InMemoryStore::new();
    let mut snapshot_ids = Vec::new();

    for demo in demo_assets() {
        let asset_id = store.insert_asset(Asset::new(0, demo.name, demo.therapeutic_area));
        let mut snap = Snapshot::new(0, asset_id, "Base Case");
        snap.valuation_year = 2025;
        snap.horizon_years = 25;
        snap.uptake_curve = UptakeCurve::Logistic;
        snap.peak_sales_usd_m = demo.peak_sales;
        snap.launch_year = demo.launch_year;
        snap.patent_expiry_year = demo.patent_expiry_year;
        snap.phase_inputs = demo.phases;
        snap.rd_costs = demo.rd_costs;
        snap.mc_config = Some(McConfig::default());
        snapshot_ids.push(store.insert_snapshot(snap)?);
    }

    let portfolio_id = store.insert_portfolio(Portfolio::with_members(0, "Demo pipeline", &snapshot_ids))?;
    let portfolio = store.load_portfolio(portfolio_id)?;
    println!("Built portfolio '{}' with {} members in {:?}", portfolio.name, portfolio.members.len(), start.elapsed());

    // Deterministic summary with one what-if: delay Gammatinib 12 months
    let overrides = vec![ScenarioOverride::new(
        Some(snapshot_ids[2]),
        OverrideKind::PhaseDelay { months: 12.0 },
    )];

    let aggregator = PortfolioAggregator::new();
    let summary = aggregator.summarize(&store, &portfolio, &overrides)?;

    println!("\nDeterministic summary:");
    println!(
        "{:<14} {:>10} {:>12} {:>12} {:>8}",
        "Asset", "PoS", "Original", "Simulated", "Active"
    );
    println!("{}", "-".repeat(60));
    for member in &summary.members {
        println!(
            "{:<14} {:>10.4} {:>12.1} {:>12.1} {:>8}",
            member.compound_name,
            member.terminal_pos,
            member.enpv_original_usd_m,
            member.enpv_simulated_usd_m,
            member.is_active,
        );
    }
    println!("\nTotal eNPV: ${:.1}M", summary.total_enpv_usd_m);

    // Yearly timeline
    let timeline = aggregator.timeline(&store, &portfolio, &overrides)?;
    println!("\nYearly totals (first 10 years):");
    println!(
        "{:>6} {:>10} {:>12} {:>10} {:>12}",
        "Year", "R&D", "Commercial", "PV", "Cum PV"
    );
    for row in timeline.iter().take(10) {
        println!(
            "{:>6} {:>10.1} {:>12.1} {:>10.1} {:>12.1}",
            row.year,
            row.total_rd_cost_usd_m,
            row.total_commercial_cf_usd_m,
            row.total_pv_usd_m,
            row.cumulative_pv_usd_m,
        );
    }

    // Cache derived rows: persistence happens after the engine returns
    let engine = pharma_npv::ValuationEngine::default();
    for &snapshot_id in &snapshot_ids {
        let snapshot = store.load_snapshot(snapshot_id)?;
        let rows = engine.value_snapshot(&snapshot)?.cashflows;
        store.save_cashflows(snapshot_id, rows)?;
    }
    println!("\nCached cash-flow rows for {} snapshots", snapshot_ids.len());

    // Correlation sweep
    let simulator = PortfolioSimulator::new();
    println!("\nCorrelated Monte Carlo (20,000 iterations, seed 42):");
    println!(
        "{:>6} {:>12} {:>12} {:>12} {:>12}",
        "Rho", "Mean", "Std", "P5", "P95"
    );
    for rho in [0.0, 0.3, 0.6] {
        let mc_start = Instant::now();
        let result = simulator.run(&store, &portfolio, 20_000, rho, Some(42))?;
        println!(
            "{:>6.1} {:>12.1} {:>12.1} {:>12.1} {:>12.1}   ({:?})",
            rho,
            result.stats.mean_npv,
            result.stats.std_npv,
            result.stats.p5,
            result.stats.p95,
            mc_start.elapsed(),
        );
    }

    Ok(())
}
