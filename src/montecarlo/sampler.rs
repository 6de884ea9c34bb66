//! Single-asset Monte Carlo sampler
//!
//! Wraps the deterministic evaluator in a sample loop perturbing peak
//! sales, launch timing, and per-phase PoS. Every random draw is made
//! up-front on one thread from a seeded generator; the evaluation then
//! fans out over rayon, so results are identical regardless of thread
//! count.
//!
//! All iterations share one year grid derived from the unperturbed
//! snapshot (with margin for sampled delays), keeping the discount base
//! fixed across the sample.

use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::stats::{subsample, DistributionStats};
use crate::asset::{McConfig, Snapshot};
use crate::error::EngineError;
use crate::valuation::{ValuationConfig, ValuationEngine, MC_LAUNCH_MARGIN_YEARS, MC_TAIL_YEARS};

/// Target length of the sub-sampled distribution returned for plotting
const HISTOGRAM_TARGET: usize = 200;

/// Result of a Monte Carlo run on one snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McResult {
    pub snapshot_id: u32,
    pub n_iterations: usize,

    #[serde(flatten)]
    pub stats: DistributionStats,

    /// rNPV samples sub-sampled at a fixed stride, in iteration order
    pub histogram: Vec<f64>,
}

/// Pre-drawn random inputs for one iteration
pub(crate) struct IterationDraw {
    /// Relative peak-sales deviation (already scaled by its std)
    pub peak_eps: f64,
    /// Launch delay quantised to whole years
    pub delay_years: i32,
    /// Relative PoS deviation per phase, in snapshot phase order
    pub pos_eps: Vec<f64>,
}

/// Monte Carlo engine for single-asset simulations
#[derive(Debug, Clone)]
pub struct MonteCarloEngine {
    engine: ValuationEngine,
}

impl Default for MonteCarloEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MonteCarloEngine {
    pub fn new() -> Self {
        Self {
            engine: ValuationEngine::new(ValuationConfig::monte_carlo()),
        }
    }

    /// Run the simulation for a snapshot
    ///
    /// A call-supplied `config` overrides the snapshot-attached one for
    /// this call only; with neither present the engine defaults apply.
    pub fn run(
        &self,
        snapshot: &Snapshot,
        config: Option<&McConfig>,
    ) -> Result<McResult, EngineError> {
        snapshot.validate()?;
        let cfg = config
            .cloned()
            .or_else(|| snapshot.mc_config.clone())
            .unwrap_or_default();
        validate_mc_config(&cfg)?;

        let mut rng = seeded_rng(cfg.seed);
        let draws = draw_plan(&mut rng, &cfg, snapshot.phase_inputs.len())?;
        let (year_min, year_max) = mc_span(snapshot);
        debug!(
            "mc run: snapshot {}, {} iterations over [{}, {}]",
            snapshot.id, cfg.n_iterations, year_min, year_max
        );

        let samples: Vec<f64> = draws
            .par_iter()
            .map(|draw| {
                let sim = perturbed_snapshot(snapshot, draw.peak_eps, draw.delay_years, &draw.pos_eps);
                self.engine
                    .value_over_span(&sim, year_min, year_max)
                    .enpv_usd_m
            })
            .collect();

        Ok(McResult {
            snapshot_id: snapshot.id,
            n_iterations: cfg.n_iterations,
            stats: DistributionStats::from_samples(&samples),
            histogram: subsample(&samples, HISTOGRAM_TARGET),
        })
    }
}

/// Draw the full iteration plan sequentially from one generator
pub(crate) fn draw_plan(
    rng: &mut StdRng,
    cfg: &McConfig,
    n_phases: usize,
) -> Result<Vec<IterationDraw>, EngineError> {
    let peak_dist = normal(cfg.peak_sales_std_pct)?;
    let delay_dist = normal(cfg.launch_delay_std_years)?;
    let pos_dist = normal(cfg.pos_variation_pct)?;

    Ok((0..cfg.n_iterations)
        .map(|_| IterationDraw {
            peak_eps: peak_dist.sample(rng),
            delay_years: delay_dist.sample(rng).round() as i32,
            pos_eps: (0..n_phases).map(|_| pos_dist.sample(rng)).collect(),
        })
        .collect())
}

/// Build the perturbed copy of a snapshot for one iteration
///
/// Launch and expiry shift together, preserving the exclusivity window;
/// each phase PoS is clamped to [0.01, 1.0].
pub(crate) fn perturbed_snapshot(
    base: &Snapshot,
    peak_eps: f64,
    delay_years: i32,
    pos_eps: &[f64],
) -> Snapshot {
    let mut sim = base.clone();
    sim.peak_sales_usd_m = (base.peak_sales_usd_m * (1.0 + peak_eps)).max(0.0);
    sim.launch_year += delay_years;
    sim.patent_expiry_year += delay_years;
    for (pi, eps) in sim.phase_inputs.iter_mut().zip(pos_eps) {
        pi.probability_of_success = (pi.probability_of_success * (1.0 + eps)).clamp(0.01, 1.0);
    }
    sim
}

/// Fixed year grid shared by every iteration of a run
///
/// Extends the deterministic span before the nominal launch and past
/// expiry so sampled delays in either direction stay on the grid.
pub(crate) fn mc_span(snapshot: &Snapshot) -> (i32, i32) {
    let mut year_min = snapshot.launch_year - MC_LAUNCH_MARGIN_YEARS;
    for pi in &snapshot.phase_inputs {
        year_min = year_min.min(pi.start_year.floor() as i32);
    }
    for rc in &snapshot.rd_costs {
        year_min = year_min.min(rc.year);
    }
    let year_max = (snapshot.patent_expiry_year + MC_TAIL_YEARS).max(year_min);
    (year_min, year_max)
}

pub(crate) fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn validate_mc_config(cfg: &McConfig) -> Result<(), EngineError> {
    if cfg.n_iterations == 0 {
        return Err(EngineError::Config(
            "n_iterations must be positive".to_string(),
        ));
    }
    Ok(())
}

fn normal(std_dev: f64) -> Result<Normal<f64>, EngineError> {
    Normal::new(0.0, std_dev)
        .map_err(|e| EngineError::Config(format!("invalid std deviation {}: {}", std_dev, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{PhaseInput, RdCost};
    use approx::assert_relative_eq;

    fn mc_snapshot(seed: Option<u64>) -> Snapshot {
        let mut snap = Snapshot::new(1, 1, "Base Case");
        snap.peak_sales_usd_m = 1000.0;
        snap.phase_inputs = vec![
            PhaseInput::new("P2", 0.40, 3.0, 2025.0),
            PhaseInput::new("P3", 0.55, 3.0, 2028.0),
        ];
        snap.rd_costs = vec![RdCost::new(2025, 10.0), RdCost::new(2028, 40.0)];
        snap.mc_config = Some(McConfig {
            n_iterations: 1000,
            seed,
            ..Default::default()
        });
        snap
    }

    #[test]
    fn test_same_seed_reproduces_statistics() {
        let engine = MonteCarloEngine::new();
        let snap = mc_snapshot(Some(42));

        let a = engine.run(&snap, None).unwrap();
        let b = engine.run(&snap, None).unwrap();

        assert_eq!(a.stats.mean_npv, b.stats.mean_npv);
        assert_eq!(a.stats.p5, b.stats.p5);
        assert_eq!(a.stats.p95, b.stats.p95);
        assert_eq!(a.histogram, b.histogram);
    }

    #[test]
    fn test_different_seeds_differ() {
        let engine = MonteCarloEngine::new();
        let a = engine.run(&mc_snapshot(Some(1)), None).unwrap();
        let b = engine.run(&mc_snapshot(Some(2)), None).unwrap();
        assert_ne!(a.stats.mean_npv, b.stats.mean_npv);
    }

    #[test]
    fn test_call_config_overrides_snapshot_config() {
        let engine = MonteCarloEngine::new();
        let snap = mc_snapshot(Some(7));
        let call_cfg = McConfig {
            n_iterations: 64,
            seed: Some(7),
            ..Default::default()
        };
        let result = engine.run(&snap, Some(&call_cfg)).unwrap();
        assert_eq!(result.n_iterations, 64);
        // The snapshot keeps its own attached configuration
        assert_eq!(snap.mc_config.as_ref().unwrap().n_iterations, 1000);
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let engine = MonteCarloEngine::new();
        let snap = mc_snapshot(None);
        let cfg = McConfig {
            n_iterations: 0,
            ..Default::default()
        };
        assert!(matches!(
            engine.run(&snap, Some(&cfg)),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_zero_volatility_collapses_distribution() {
        let engine = MonteCarloEngine::new();
        let snap = mc_snapshot(None);
        let cfg = McConfig {
            n_iterations: 100,
            peak_sales_std_pct: 0.0,
            launch_delay_std_years: 0.0,
            pos_variation_pct: 0.0,
            seed: Some(3),
        };
        let result = engine.run(&snap, Some(&cfg)).unwrap();
        assert_relative_eq!(result.stats.std_npv, 0.0, epsilon = 1e-9);
        assert_eq!(result.stats.p5, result.stats.p95);
    }

    #[test]
    fn test_histogram_capped_by_stride() {
        let engine = MonteCarloEngine::new();
        let snap = mc_snapshot(Some(11));
        let result = engine.run(&snap, None).unwrap();
        assert_eq!(result.histogram.len(), 200);
    }

    #[test]
    fn test_perturbation_preserves_exclusivity_window() {
        let snap = mc_snapshot(None);
        let gap = snap.patent_expiry_year - snap.launch_year;
        let sim = perturbed_snapshot(&snap, 0.1, 2, &[0.0, 0.0]);
        assert_eq!(sim.patent_expiry_year - sim.launch_year, gap);
        assert_eq!(sim.launch_year, snap.launch_year + 2);
    }

    #[test]
    fn test_perturbation_clamps_pos_and_peak() {
        let snap = mc_snapshot(None);
        let sim = perturbed_snapshot(&snap, -2.0, 0, &[-5.0, 5.0]);
        assert_eq!(sim.peak_sales_usd_m, 0.0);
        assert_relative_eq!(sim.phase_inputs[0].probability_of_success, 0.01, epsilon = 1e-12);
        assert_relative_eq!(sim.phase_inputs[1].probability_of_success, 1.0, epsilon = 1e-12);
    }
}
