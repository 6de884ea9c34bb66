//! Deterministic valuation pipeline: revenue curves, discounting, risk
//! adjustment, and the per-year cash-flow engine

pub mod discount;
pub mod revenue;
pub mod risk;

mod cashflows;
mod engine;

pub use cashflows::{CashflowRow, ValuationResult, ValuationSummary};
pub use engine::{ValuationConfig, ValuationEngine, MC_TAIL_YEARS};

pub(crate) use engine::MC_LAUNCH_MARGIN_YEARS;
