//! Pharma NPV CLI
//!
//! Values a demonstration asset end-to-end: deterministic cash-flow
//! table, CSV export, and a seeded Monte Carlo summary.

use anyhow::Context;
use clap::Parser;
use pharma_npv::{
    McConfig, MonteCarloEngine, PhaseInput, RdCost, Snapshot, UptakeCurve, ValuationEngine,
};

#[derive(Parser, Debug)]
#[command(name = "pharma_npv", about = "Risk-adjusted NPV valuation engine")]
struct Args {
    /// Monte Carlo iterations
    #[arg(long, default_value_t = 10_000)]
    iterations: usize,

    /// PRNG seed for reproducible simulation output
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Path for the cash-flow CSV export
    #[arg(long, default_value = "cashflow_output.csv")]
    output: String,

    /// Emit the Monte Carlo result as JSON instead of the text summary
    #[arg(long)]
    json: bool,
}

fn demo_snapshot() -> Snapshot {
    // Phase 2 oncology asset, $1B peak, launching 2033
    let mut snap = Snapshot::new(1, 1, "Base Case");
    snap.valuation_year = 2025;
    snap.horizon_years = 20;
    snap.launch_year = 2033;
    snap.patent_expiry_year = 2043;
    snap.approval_date = Some(2032.5);
    snap.peak_sales_usd_m = 1000.0;
    snap.time_to_peak_years = 5.0;
    snap.generic_erosion_pct = 0.80;
    snap.cogs_pct = 0.20;
    snap.sga_pct = 0.25;
    snap.tax_rate = 0.21;
    snap.discount_rate = 0.10;
    snap.uptake_curve = UptakeCurve::Linear;
    snap.phase_inputs = vec![
        PhaseInput::new("P2", 0.40, 3.0, 2025.0),
        PhaseInput::new("P3", 0.55, 3.0, 2028.0),
        PhaseInput::new("Filing", 0.90, 1.0, 2031.0),
        PhaseInput::new("Approval", 0.95, 1.0, 2032.0),
    ];
    snap.rd_costs = vec![
        RdCost::new(2025, 15.0),
        RdCost::new(2026, 20.0),
        RdCost::new(2027, 20.0),
        RdCost::new(2028, 60.0),
        RdCost::new(2029, 80.0),
        RdCost::new(2030, 80.0),
        RdCost::new(2031, 10.0),
        RdCost::new(2032, 5.0),
    ];
    snap
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("Pharma NPV v0.1.0");
    println!("=================\n");

    let snapshot = demo_snapshot();
    println!("Snapshot: {} ({})", snapshot.id, snapshot.label);
    println!("  Launch Year: {}", snapshot.launch_year);
    println!("  Patent Expiry: {}", snapshot.patent_expiry_year);
    println!("  Peak Sales: ${:.0}M", snapshot.peak_sales_usd_m);
    println!("  Phases: {}", snapshot.phase_inputs.len());
    println!();

    // Deterministic valuation
    let engine = ValuationEngine::default();
    let result = engine.value_snapshot(&snapshot)?;

    println!("Cash-flow table ({} years):", result.cashflows.len());
    println!(
        "{:>6} {:>10} {:>12} {:>10} {:>8} {:>12} {:>8} {:>10} {:>12}",
        "Year", "R&D", "Commercial", "Net CF", "CumPoS", "RiskAdj", "DF", "PV", "CumNPV"
    );
    println!("{}", "-".repeat(96));
    for row in &result.cashflows {
        println!(
            "{:>6} {:>10.1} {:>12.1} {:>10.1} {:>8.4} {:>12.1} {:>8.4} {:>10.1} {:>12.1}",
            row.year,
            row.rd_cost_usd_m,
            row.commercial_cf_usd_m,
            row.net_cashflow_usd_m,
            row.cumulative_pos,
            row.risk_adjusted_cf_usd_m,
            row.discount_factor,
            row.pv_usd_m,
            row.cumulative_npv_usd_m,
        );
    }

    // Write full table to CSV
    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("unable to create {}", args.output))?;
    for row in &result.cashflows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    println!("\nFull table written to: {}", args.output);

    let summary = result.summary();
    println!("\nSummary:");
    println!("  Terminal PoS: {:.4}", result.terminal_pos);
    println!("  eNPV: ${:.1}M", result.enpv_usd_m);
    println!("  Unadjusted NPV: ${:.1}M", result.unadjusted_npv_usd_m);
    println!("  Total R&D Spend: ${:.1}M", summary.total_rd_cost_usd_m);
    match summary.breakeven_year {
        Some(year) => println!("  Breakeven Year: {}", year),
        None => println!("  Breakeven Year: never"),
    }

    let commercial = engine.commercial_rows(&snapshot);
    if let Some(peak_row) = commercial
        .iter()
        .max_by(|a, b| a.gross_sales_usd_m.total_cmp(&b.gross_sales_usd_m))
    {
        println!(
            "  Commercial Years: {} (peak ${:.0}M gross in {})",
            commercial.len(),
            peak_row.gross_sales_usd_m,
            peak_row.year
        );
    }

    // Monte Carlo around the same snapshot
    let mc_config = McConfig {
        n_iterations: args.iterations,
        seed: Some(args.seed),
        ..Default::default()
    };
    let mc = MonteCarloEngine::new().run(&snapshot, Some(&mc_config))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&mc)?);
        return Ok(());
    }

    println!("\nMonte Carlo ({} iterations, seed {}):", mc.n_iterations, args.seed);
    println!("  Mean: ${:.1}M", mc.stats.mean_npv);
    println!("  Median: ${:.1}M", mc.stats.median_npv);
    println!("  Std: ${:.1}M", mc.stats.std_npv);
    println!("  P5 / P95: ${:.1}M / ${:.1}M", mc.stats.p5, mc.stats.p95);
    println!("  P(NPV > 0): {:.1}%", mc.stats.prob_positive * 100.0);

    Ok(())
}
