//! Correlated portfolio Monte Carlo
//!
//! A Gaussian copula couples member demand: one shared factor vector,
//! built from an equicorrelation matrix via Cholesky, drives every
//! member's peak-sales deviate. Launch delays and PoS shocks stay
//! idiosyncratic per member; only demand is correlated across assets.
//!
//! As in the single-asset sampler, the full draw plan is generated
//! sequentially from one seeded generator before evaluation fans out.

use log::debug;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal, StandardNormal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::data::Portfolio;
use crate::asset::{McConfig, Snapshot, SnapshotStore};
use crate::error::EngineError;
use crate::montecarlo::stats::{subsample, DistributionStats};
use crate::montecarlo::{mc_span, perturbed_snapshot, seeded_rng};
use crate::valuation::{ValuationConfig, ValuationEngine};

const HISTOGRAM_TARGET: usize = 200;

/// Result of a correlated portfolio simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioMcResult {
    pub portfolio_id: u32,
    pub name: String,
    pub n_iterations: usize,
    pub correlation: f64,
    pub num_assets: usize,

    #[serde(flatten)]
    pub stats: DistributionStats,

    pub histogram: Vec<f64>,
}

/// Lower-triangular Cholesky factor of the `m x m` equicorrelation matrix
/// (unit diagonal, `rho` elsewhere)
///
/// `rho = 1` makes the matrix singular; zero pivots are clamped so the
/// factor degenerates to perfect correlation (every component follows the
/// first) instead of failing.
pub fn cholesky_equicorrelated(m: usize, rho: f64) -> Result<Vec<Vec<f64>>, EngineError> {
    if !(0.0..=1.0).contains(&rho) {
        return Err(EngineError::Config(format!(
            "correlation must be in [0, 1], got {}",
            rho
        )));
    }

    let mut l = vec![vec![0.0; m]; m];
    for i in 0..m {
        for j in 0..=i {
            let c = if i == j { 1.0 } else { rho };
            let mut sum = c;
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                l[i][j] = sum.max(0.0).sqrt();
            } else if l[j][j].abs() < 1e-12 {
                l[i][j] = 0.0;
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }
    Ok(l)
}

struct MemberDraw {
    delay_years: i32,
    pos_eps: Vec<f64>,
}

struct PortfolioDraw {
    z: Vec<f64>,
    members: Vec<MemberDraw>,
}

/// Correlated Monte Carlo simulator over portfolio members
#[derive(Debug, Clone)]
pub struct PortfolioSimulator {
    engine: ValuationEngine,
}

impl Default for PortfolioSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl PortfolioSimulator {
    pub fn new() -> Self {
        Self {
            engine: ValuationEngine::new(ValuationConfig::monte_carlo()),
        }
    }

    /// Run the correlated simulation
    pub fn run(
        &self,
        store: &dyn SnapshotStore,
        portfolio: &Portfolio,
        n_iterations: usize,
        correlation: f64,
        seed: Option<u64>,
    ) -> Result<PortfolioMcResult, EngineError> {
        if n_iterations == 0 {
            return Err(EngineError::Config(
                "n_iterations must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&correlation) {
            return Err(EngineError::Config(format!(
                "correlation must be in [0, 1], got {}",
                correlation
            )));
        }
        if portfolio.members.is_empty() {
            return Err(EngineError::Config(format!(
                "portfolio {} has no members to simulate",
                portfolio.id
            )));
        }

        let mut snapshots: Vec<Snapshot> = Vec::with_capacity(portfolio.members.len());
        for member in &portfolio.members {
            let snapshot = store.load_snapshot(member.snapshot_id)?;
            snapshot.validate()?;
            snapshots.push(snapshot);
        }
        let m = snapshots.len();

        let configs: Vec<McConfig> = snapshots
            .iter()
            .map(|s| s.mc_config.clone().unwrap_or_default())
            .collect();
        let spans: Vec<(i32, i32)> = snapshots.iter().map(mc_span).collect();

        let factor = if correlation > 0.0 && m > 1 {
            Some(cholesky_equicorrelated(m, correlation)?)
        } else {
            None
        };

        let mut rng = seeded_rng(seed);
        let draws = self.draw_plan(&mut rng, &configs, &snapshots, n_iterations)?;
        debug!(
            "portfolio mc: {} members, {} iterations, rho {}",
            m, n_iterations, correlation
        );

        let samples: Vec<f64> = draws
            .par_iter()
            .map(|draw| {
                let w = correlate(factor.as_deref(), &draw.z);
                snapshots
                    .iter()
                    .enumerate()
                    .map(|(j, base)| {
                        let peak_eps = configs[j].peak_sales_std_pct * w[j];
                        let member = &draw.members[j];
                        let sim =
                            perturbed_snapshot(base, peak_eps, member.delay_years, &member.pos_eps);
                        let (year_min, year_max) = spans[j];
                        self.engine.value_over_span(&sim, year_min, year_max).enpv_usd_m
                    })
                    .sum()
            })
            .collect();

        Ok(PortfolioMcResult {
            portfolio_id: portfolio.id,
            name: portfolio.name.clone(),
            n_iterations,
            correlation,
            num_assets: m,
            stats: DistributionStats::from_samples(&samples),
            histogram: subsample(&samples, HISTOGRAM_TARGET),
        })
    }

    fn draw_plan(
        &self,
        rng: &mut StdRng,
        configs: &[McConfig],
        snapshots: &[Snapshot],
        n_iterations: usize,
    ) -> Result<Vec<PortfolioDraw>, EngineError> {
        let delay_dists: Vec<Normal<f64>> = configs
            .iter()
            .map(|c| {
                Normal::new(0.0, c.launch_delay_std_years).map_err(|e| {
                    EngineError::Config(format!("invalid launch delay std: {}", e))
                })
            })
            .collect::<Result<_, _>>()?;
        let pos_dists: Vec<Normal<f64>> = configs
            .iter()
            .map(|c| {
                Normal::new(0.0, c.pos_variation_pct)
                    .map_err(|e| EngineError::Config(format!("invalid pos variation std: {}", e)))
            })
            .collect::<Result<_, _>>()?;

        Ok((0..n_iterations)
            .map(|_| PortfolioDraw {
                z: (0..snapshots.len())
                    .map(|_| rng.sample::<f64, _>(StandardNormal))
                    .collect(),
                members: snapshots
                    .iter()
                    .enumerate()
                    .map(|(j, s)| MemberDraw {
                        delay_years: delay_dists[j].sample(rng).round() as i32,
                        pos_eps: (0..s.phase_inputs.len())
                            .map(|_| pos_dists[j].sample(rng))
                            .collect(),
                    })
                    .collect(),
            })
            .collect())
    }
}

/// Apply the Cholesky factor to an independent normal vector
fn correlate(factor: Option<&[Vec<f64>]>, z: &[f64]) -> Vec<f64> {
    match factor {
        Some(l) => (0..z.len())
            .map(|j| (0..=j).map(|k| l[j][k] * z[k]).sum())
            .collect(),
        None => z.to_vec(),
    }
}
