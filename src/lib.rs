//! Pharma NPV - Risk-adjusted valuation engine for pharmaceutical R&D portfolios
//!
//! This library provides:
//! - Deterministic rNPV valuation (phase PoS, revenue curves, LOE erosion,
//!   mid-year discounting) producing a full cash-flow table per asset
//! - Scenario overrides (delays, acceleration, success-rate changes,
//!   budget reallocation, kills, deal additions) as pure transforms
//! - Single-asset Monte Carlo simulation with seeded, reproducible draws
//! - Portfolio aggregation with correlated demand via a Gaussian copula

pub mod asset;
pub mod error;
pub mod montecarlo;
pub mod portfolio;
pub mod scenario;
pub mod valuation;

// Re-export commonly used types
pub use asset::{
    Asset, InMemoryStore, McConfig, PhaseInput, RdCost, Snapshot, SnapshotStore, UptakeCurve,
};
pub use error::{EngineError, NumericWarning};
pub use montecarlo::{DistributionStats, McResult, MonteCarloEngine};
pub use scenario::{apply_overrides, apply_whatif_levers, OverrideKind, ScenarioOverride};
pub use valuation::{CashflowRow, ValuationEngine, ValuationResult};

// Re-export portfolio types
pub use portfolio::{
    Portfolio,
    PortfolioAggregator,
    PortfolioMcResult,
    PortfolioSimulator,
    PortfolioSummary,
};
