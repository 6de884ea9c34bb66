//! Scenario machinery: override pipeline, what-if levers, and the
//! acceleration trade-off curve
//!
//! Everything here is an evaluation-time transform. Source snapshots are
//! deep-copied; nothing mutates stored state, so retrying an evaluation
//! with the same overrides yields identical outputs.

pub mod acceleration;

mod levers;
mod overrides;

pub use acceleration::{acceleration_curve, acceleration_curve_points, AccelerationPoint};
pub use levers::apply_whatif_levers;
pub use overrides::{apply_overrides, OverrideKind, ScenarioOverride};

pub(crate) use overrides::apply_kinds;
