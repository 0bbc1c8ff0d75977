//! Monte Carlo sweep over scenario valuations.
//!
//! The engine is a deterministic fold, so all sampling lives out here: each
//! run perturbs priced-round and exit valuations with seeded Gaussian
//! noise, replays the engine, and folds founder ownership and exit
//! proceeds into summary statistics. A fixed seed reproduces the sweep
//! bit for bit.

use captable_core::{run, RunOptions, Scenario, StageParams};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for a sweep.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Number of perturbed runs
    pub runs: u32,
    /// Master seed for determinism
    pub seed: u64,
    /// Relative standard deviation applied to valuations
    pub valuation_noise: f64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            runs: 100,
            seed: 42,
            valuation_noise: 0.2,
        }
    }
}

/// Five-number-ish summary of one sampled metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatSummary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub p05: f64,
    pub p50: f64,
    pub p95: f64,
}

impl StatSummary {
    fn from_samples(mut samples: Vec<f64>) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let count = samples.len();
        let mean = samples.iter().sum::<f64>() / count as f64;
        Self {
            mean,
            min: samples[0],
            max: samples[count - 1],
            p05: percentile(&samples, 0.05),
            p50: percentile(&samples, 0.50),
            p95: percentile(&samples, 0.95),
        }
    }
}

fn percentile(sorted: &[f64], fraction: f64) -> f64 {
    let index = (fraction * sorted.len() as f64) as usize;
    sorted[index.min(sorted.len() - 1)]
}

/// Results of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepSummary {
    pub runs: u32,
    pub seed: u64,
    /// Combined final ownership of all Common rows
    pub founder_ownership: StatSummary,
    /// Total exit waterfall proceeds (0 when no exit stage ran)
    pub exit_proceeds: StatSummary,
    /// Runs that produced at least one warning
    pub runs_with_warnings: u32,
}

/// Runs the sweep. Deterministic for a fixed `(scenario, config)` pair.
pub fn sweep(scenario: &Scenario, config: &SweepConfig) -> SweepSummary {
    let sigma = if config.valuation_noise.is_finite() && config.valuation_noise > 0.0 {
        config.valuation_noise
    } else {
        0.0
    };
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

    let mut founder_samples = Vec::with_capacity(config.runs as usize);
    let mut proceeds_samples = Vec::with_capacity(config.runs as usize);
    let mut runs_with_warnings = 0;

    for index in 0..config.runs {
        let sample = perturbed(scenario, &mut rng, sigma);
        let result = run(&sample, &RunOptions::default());

        let founder_ownership: f64 = result
            .cap_table
            .iter()
            .filter(|row| row.share_class == "Common")
            .map(|row| row.percent)
            .sum();
        let proceeds: f64 = result
            .exit_waterfall
            .as_ref()
            .map(|waterfall| waterfall.iter().map(|row| row.payout).sum())
            .unwrap_or(0.0);

        founder_samples.push(founder_ownership);
        proceeds_samples.push(proceeds);
        if !result.warnings.is_empty() {
            runs_with_warnings += 1;
        }

        if (index + 1) % 50 == 0 {
            debug!("completed {}/{} sweep runs", index + 1, config.runs);
        }
    }

    SweepSummary {
        runs: config.runs,
        seed: config.seed,
        founder_ownership: StatSummary::from_samples(founder_samples),
        exit_proceeds: StatSummary::from_samples(proceeds_samples),
        runs_with_warnings,
    }
}

/// Clones the scenario with every valuation scaled by an independent
/// Gaussian factor. The factor floor keeps valuations positive.
fn perturbed(scenario: &Scenario, rng: &mut ChaCha8Rng, sigma: f64) -> Scenario {
    let mut sample = scenario.clone();
    for stage in &mut sample.timeline {
        match &mut stage.params {
            StageParams::PricedRound(params) => {
                params.post_money_valuation *= noise_factor(rng, sigma);
            }
            StageParams::Exit(params) => {
                let factor = noise_factor(rng, sigma);
                params.sale_price *= factor;
                params.ipo_price_per_share *= factor;
            }
            _ => {}
        }
    }
    sample
}

fn noise_factor(rng: &mut ChaCha8Rng, sigma: f64) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    (1.0 + sigma * z).max(0.05)
}
