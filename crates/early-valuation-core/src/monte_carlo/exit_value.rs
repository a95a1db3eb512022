use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use statrs::distribution::LogNormal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::error::ValuationError;
use crate::monte_carlo::stats::{summarize, DistributionSummary};
use crate::time_value::discount_factor_f64;
use crate::types::{with_metadata, ComputationOutput, Precision};
use crate::ValuationResult;

/// Number of draws between cancellation checks, and per parallel work unit.
pub const BATCH_SIZE: usize = 1_000;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Configuration of an exit-value simulation. Missing fields fall back to the
/// reference VC-style investment, except `seed`: without one the draws come
/// from fresh entropy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of independent samples.
    #[serde(default = "default_n_sims")]
    pub n_sims: u32,
    /// Mean of the logarithm of the survival exit value.
    #[serde(default = "default_mu")]
    pub mu: f64,
    /// Standard deviation of the logarithm of the survival exit value.
    #[serde(default = "default_sigma")]
    pub sigma: f64,
    /// Probability of outright failure (zero equity value).
    #[serde(default = "default_failure_prob")]
    pub failure_prob: f64,
    /// Annual required return used to discount the exit value.
    #[serde(default = "default_required_return")]
    pub required_return: f64,
    /// Years until exit.
    #[serde(default = "default_horizon")]
    pub horizon: u32,
    /// Optional seed for reproducibility.
    #[serde(default)]
    pub seed: Option<u64>,
}

const REFERENCE_TARGET_VALUE: f64 = 100.0;

fn default_n_sims() -> u32 {
    10_000
}

fn default_sigma() -> f64 {
    0.8
}

fn default_mu() -> f64 {
    let sigma = default_sigma();
    REFERENCE_TARGET_VALUE.ln() - 0.5 * sigma * sigma
}

fn default_failure_prob() -> f64 {
    0.40
}

fn default_required_return() -> f64 {
    0.35
}

fn default_horizon() -> u32 {
    7
}

const REFERENCE_SEED: u64 = 42;

impl SimulationConfig {
    /// Seven-year VC-style investment: 40% outright failure, survivors
    /// lognormal around 100 (USD m) with sigma 0.8, discounted at 35%,
    /// seeded with 42.
    pub fn reference() -> Self {
        Self {
            n_sims: default_n_sims(),
            mu: default_mu(),
            sigma: default_sigma(),
            failure_prob: default_failure_prob(),
            required_return: default_required_return(),
            horizon: default_horizon(),
            seed: Some(REFERENCE_SEED),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::reference()
    }
}

/// One simulated exit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitValueSample {
    /// Exit equity value at the horizon; zero on failure.
    pub raw_value: f64,
    /// `raw_value * (1 + R)^(-T)`
    pub discounted_value: f64,
    /// Outcome of the failure draw (`u < failure_prob`).
    pub failed: bool,
}

impl ExitValueSample {
    pub fn is_failure(&self) -> bool {
        self.failed
    }
}

/// Exactly `n_sims` samples together with the discount factor applied to each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    samples: Vec<ExitValueSample>,
    discount_factor: f64,
}

impl SimulationResult {
    pub fn samples(&self) -> &[ExitValueSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// `(1 + R)^(-T)`, shared by every sample.
    pub fn discount_factor(&self) -> f64 {
        self.discount_factor
    }

    pub fn discounted_values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.discounted_value).collect()
    }

    pub fn failure_count(&self) -> usize {
        self.samples.iter().filter(|s| s.is_failure()).count()
    }

    pub fn into_samples(self) -> Vec<ExitValueSample> {
        self.samples
    }
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

/// The failure mixture for one sample, given a lognormal draw `x` and a
/// uniform draw `u`: zero with probability `failure_prob`, `x` otherwise.
pub fn exit_sample(x: f64, u: f64, failure_prob: f64, discount_factor: f64) -> ExitValueSample {
    let failed = u < failure_prob;
    let raw_value = if failed { 0.0 } else { x };
    ExitValueSample {
        raw_value,
        discounted_value: raw_value * discount_factor,
        failed,
    }
}

/// Lognormal location `mu` for which survival values have mean `target`:
/// `ln(target) - sigma^2 / 2`.
pub fn lognormal_mu_for_mean(target: f64, sigma: f64) -> ValuationResult<f64> {
    if !target.is_finite() || target <= 0.0 {
        return Err(ValuationError::InvalidInput {
            field: "target_value".into(),
            reason: "Target survival value must be positive and finite".into(),
        });
    }
    validate_sigma(sigma)?;
    Ok(target.ln() - 0.5 * sigma * sigma)
}

/// Validated configuration, ready to draw from.
struct Sampler {
    survival: LogNormal,
    failure_prob: f64,
    discount_factor: f64,
}

impl Sampler {
    fn new(config: &SimulationConfig) -> ValuationResult<Self> {
        if !config.mu.is_finite() {
            return Err(ValuationError::InvalidInput {
                field: "mu".into(),
                reason: "Must be finite".into(),
            });
        }
        validate_sigma(config.sigma)?;
        if !(0.0..=1.0).contains(&config.failure_prob) {
            return Err(ValuationError::InvalidInput {
                field: "failure_prob".into(),
                reason: format!("Must be in [0, 1], got {}", config.failure_prob),
            });
        }
        if !config.required_return.is_finite() || config.required_return <= -1.0 {
            return Err(ValuationError::InvalidInput {
                field: "required_return".into(),
                reason: "Required return must be finite and greater than -100%".into(),
            });
        }

        let discount_factor = discount_factor_f64(config.required_return, config.horizon)?;
        let survival =
            LogNormal::new(config.mu, config.sigma).map_err(|e| ValuationError::InvalidInput {
                field: "sigma".into(),
                reason: format!("Invalid LogNormal parameters: {e}"),
            })?;

        Ok(Self {
            survival,
            failure_prob: config.failure_prob,
            discount_factor,
        })
    }

    /// Lognormal draw first, then the uniform failure draw.
    ///
    /// A survivor must stay strictly positive and finite through discounting;
    /// anything else is reported as `NumericOverflow`.
    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> ValuationResult<ExitValueSample> {
        let x = self.survival.sample(rng);
        let u: f64 = rng.gen();
        let sample = exit_sample(x, u, self.failure_prob, self.discount_factor);
        if !sample.discounted_value.is_finite() {
            return Err(ValuationError::NumericOverflow {
                context: "discounted exit value".into(),
            });
        }
        if !sample.failed && (sample.raw_value == 0.0 || sample.discounted_value == 0.0) {
            return Err(ValuationError::NumericOverflow {
                context: "surviving exit value underflowed to zero".into(),
            });
        }
        Ok(sample)
    }

    fn draw_batch<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        len: usize,
        out: &mut Vec<ExitValueSample>,
    ) -> ValuationResult<()> {
        for _ in 0..len {
            out.push(self.draw(rng)?);
        }
        Ok(())
    }
}

fn validate_sigma(sigma: f64) -> ValuationResult<()> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(ValuationError::InvalidInput {
            field: "sigma".into(),
            reason: format!("Must be positive and finite, got {sigma}"),
        });
    }
    Ok(())
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

// ---------------------------------------------------------------------------
// Public API: simulation
// ---------------------------------------------------------------------------

/// Draw `n_sims` discounted exit values.
///
/// With a seed, repeated calls return the same samples in the same order.
/// Without one, a fresh entropy-seeded source is used per call.
pub fn simulate(config: &SimulationConfig) -> ValuationResult<SimulationResult> {
    let mut rng = seeded_rng(config.seed);
    simulate_with_rng(config, &mut rng)
}

/// Like [`simulate`], drawing from a caller-owned random source. `config.seed`
/// is ignored.
pub fn simulate_with_rng<R: Rng + ?Sized>(
    config: &SimulationConfig,
    rng: &mut R,
) -> ValuationResult<SimulationResult> {
    let sampler = Sampler::new(config)?;
    let n = config.n_sims as usize;
    let mut samples = Vec::with_capacity(n);
    sampler.draw_batch(rng, n, &mut samples)?;
    Ok(SimulationResult {
        samples,
        discount_factor: sampler.discount_factor,
    })
}

/// Like [`simulate`], checking `cancel` before every batch of [`BATCH_SIZE`]
/// draws. Produces the same samples as `simulate` when never cancelled.
pub fn simulate_cancellable(
    config: &SimulationConfig,
    cancel: &AtomicBool,
) -> ValuationResult<SimulationResult> {
    simulate_batched(config, |_| cancel.load(Ordering::SeqCst))
}

/// Sequential draws in batches of [`BATCH_SIZE`]; `should_stop` sees the
/// number of completed samples before each batch.
fn simulate_batched(
    config: &SimulationConfig,
    mut should_stop: impl FnMut(usize) -> bool,
) -> ValuationResult<SimulationResult> {
    let sampler = Sampler::new(config)?;
    let mut rng = seeded_rng(config.seed);
    let n = config.n_sims as usize;
    let mut samples = Vec::with_capacity(n);

    while samples.len() < n {
        if should_stop(samples.len()) {
            return Err(ValuationError::Cancelled {
                completed: samples.len(),
            });
        }
        let len = BATCH_SIZE.min(n - samples.len());
        sampler.draw_batch(&mut rng, len, &mut samples)?;
    }

    Ok(SimulationResult {
        samples,
        discount_factor: sampler.discount_factor,
    })
}

/// Draw the samples on the rayon thread pool.
///
/// Each batch of [`BATCH_SIZE`] draws gets its own `StdRng`, seeded from a
/// master stream derived from `config.seed`. The result is deterministic for a
/// given seed regardless of thread count, but differs from [`simulate`].
#[cfg(feature = "parallel")]
pub fn simulate_parallel(config: &SimulationConfig) -> ValuationResult<SimulationResult> {
    use rayon::prelude::*;

    let sampler = Sampler::new(config)?;
    let n = config.n_sims as usize;
    let num_batches = n.div_ceil(BATCH_SIZE);

    let mut master = seeded_rng(config.seed);
    let batch_seeds: Vec<u64> = (0..num_batches).map(|_| master.gen()).collect();

    let batches = batch_seeds
        .into_par_iter()
        .enumerate()
        .map(|(i, seed)| -> ValuationResult<Vec<ExitValueSample>> {
            let mut rng = StdRng::seed_from_u64(seed);
            let len = BATCH_SIZE.min(n - i * BATCH_SIZE);
            let mut out = Vec::with_capacity(len);
            sampler.draw_batch(&mut rng, len, &mut out)?;
            Ok(out)
        })
        .collect::<ValuationResult<Vec<_>>>()?;

    Ok(SimulationResult {
        samples: batches.into_iter().flatten().collect(),
        discount_factor: sampler.discount_factor,
    })
}

// ---------------------------------------------------------------------------
// Public API: simulation with summary
// ---------------------------------------------------------------------------

/// Input for a summarised exit-value simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitSimulationInput {
    #[serde(flatten)]
    pub config: SimulationConfig,
    /// Histogram bins over discounted values.
    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,
    /// Return every sample alongside the summary.
    #[serde(default = "default_include_samples")]
    pub include_samples: bool,
    /// Draw on the rayon thread pool (requires the `parallel` feature).
    #[serde(default)]
    pub parallel: bool,
}

fn default_histogram_bins() -> usize {
    60
}

fn default_include_samples() -> bool {
    true
}

impl Default for ExitSimulationInput {
    fn default() -> Self {
        Self {
            config: SimulationConfig::reference(),
            histogram_bins: default_histogram_bins(),
            include_samples: default_include_samples(),
            parallel: false,
        }
    }
}

/// Summary of discounted exit values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitValueSummary {
    pub n_sims: u32,
    pub discount_factor: f64,
    pub failure_count: usize,
    /// Observed share of zero-valued samples.
    pub failure_rate: f64,
    /// Mean discounted value across all samples, failures included.
    pub expected_value: f64,
    /// Mean discounted value among surviving samples.
    pub survivor_mean: f64,
    pub distribution: DistributionSummary,
}

/// Output of a summarised exit-value simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitSimulationOutput {
    pub summary: ExitValueSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<Vec<ExitValueSample>>,
}

/// Run the exit-value simulation and summarise the discounted values.
pub fn run_exit_value_simulation(
    input: &ExitSimulationInput,
) -> ValuationResult<ComputationOutput<ExitSimulationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let config = &input.config;

    if input.histogram_bins == 0 {
        return Err(ValuationError::InvalidInput {
            field: "histogram_bins".into(),
            reason: "Must be at least 1".into(),
        });
    }

    let result = if input.parallel {
        run_parallel(config, &mut warnings)?
    } else {
        simulate(config)?
    };

    if config.n_sims < 1_000 {
        warnings.push(format!(
            "Only {} simulations; summary statistics will be noisy",
            config.n_sims
        ));
    }
    if config.failure_prob == 0.0 || config.failure_prob == 1.0 {
        warnings.push(format!(
            "failure_prob = {} makes the failure mixture degenerate",
            config.failure_prob
        ));
    }

    let discounted = result.discounted_values();
    let failure_count = result.failure_count();
    let survivors: Vec<f64> = result
        .samples()
        .iter()
        .filter(|s| !s.is_failure())
        .map(|s| s.discounted_value)
        .collect();
    let survivor_mean = if survivors.is_empty() {
        0.0
    } else {
        survivors.iter().sum::<f64>() / survivors.len() as f64
    };
    let failure_rate = if result.is_empty() {
        0.0
    } else {
        failure_count as f64 / result.len() as f64
    };

    let distribution = summarize(&discounted, input.histogram_bins);
    let summary = ExitValueSummary {
        n_sims: config.n_sims,
        discount_factor: result.discount_factor(),
        failure_count,
        failure_rate,
        expected_value: distribution.mean,
        survivor_mean,
        distribution,
    };

    let output = ExitSimulationOutput {
        summary,
        samples: input.include_samples.then(|| result.into_samples()),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monte Carlo Exit Value Simulation (failure / lognormal mixture)",
        &serde_json::json!({
            "n_sims": config.n_sims,
            "mu": config.mu,
            "sigma": config.sigma,
            "failure_prob": config.failure_prob,
            "required_return": config.required_return,
            "horizon": config.horizon,
            "seed": config.seed,
            "parallel": input.parallel,
        }),
        warnings,
        elapsed,
        Precision::Float,
        output,
    ))
}

#[cfg(feature = "parallel")]
fn run_parallel(
    config: &SimulationConfig,
    _warnings: &mut Vec<String>,
) -> ValuationResult<SimulationResult> {
    simulate_parallel(config)
}

#[cfg(not(feature = "parallel"))]
fn run_parallel(
    config: &SimulationConfig,
    warnings: &mut Vec<String>,
) -> ValuationResult<SimulationResult> {
    warnings.push("Built without the `parallel` feature; ran single-threaded".into());
    simulate(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
