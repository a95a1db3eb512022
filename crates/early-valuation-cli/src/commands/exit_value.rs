use clap::Args;
use serde_json::Value;
use std::time::Instant;

use early_valuation_core::monte_carlo::exit_value::{
    self, lognormal_mu_for_mean, ExitSimulationInput, SimulationConfig,
};

use crate::input;

/// Survival value targeted by the reference scenario (USD m).
const REFERENCE_TARGET_VALUE: f64 = 100.0;

/// Arguments for the exit-value Monte Carlo simulation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ExitSimArgs {
    /// Number of simulated exits
    #[arg(long)]
    pub n_sims: Option<u32>,

    /// Mean survival exit value; sets mu = ln(V) - sigma^2 / 2
    #[arg(long, conflicts_with = "mu")]
    pub target_value: Option<f64>,

    /// Log-space mean of survival exit values
    #[arg(long)]
    pub mu: Option<f64>,

    /// Log-space standard deviation of survival exit values
    #[arg(long)]
    pub sigma: Option<f64>,

    /// Probability of outright failure (0 to 1)
    #[arg(long)]
    pub failure_prob: Option<f64>,

    /// Annual required return used for discounting
    #[arg(long, alias = "rate")]
    pub required_return: Option<f64>,

    /// Years until exit
    #[arg(long)]
    pub horizon: Option<u32>,

    /// Seed for reproducible draws
    #[arg(long, conflicts_with = "unseeded")]
    pub seed: Option<u64>,

    /// Draw from fresh entropy instead of the reference seed
    #[arg(long)]
    pub unseeded: bool,

    /// Histogram bins over discounted values
    #[arg(long)]
    pub bins: Option<usize>,

    /// Omit individual samples from the output
    #[arg(long)]
    pub summary_only: bool,

    /// Spread the draws across threads
    #[arg(long)]
    pub parallel: bool,

    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

impl ExitSimArgs {
    fn into_input(self) -> Result<ExitSimulationInput, Box<dyn std::error::Error>> {
        let reference = ExitSimulationInput::default();
        let sigma = self.sigma.unwrap_or(reference.config.sigma);
        let mu = match (self.mu, self.target_value) {
            (Some(mu), _) => mu,
            (None, Some(target)) => lognormal_mu_for_mean(target, sigma)?,
            (None, None) if self.sigma.is_some() => {
                lognormal_mu_for_mean(REFERENCE_TARGET_VALUE, sigma)?
            }
            (None, None) => reference.config.mu,
        };
        let seed = if self.unseeded {
            None
        } else {
            self.seed.or(reference.config.seed)
        };

        Ok(ExitSimulationInput {
            config: SimulationConfig {
                n_sims: self.n_sims.unwrap_or(reference.config.n_sims),
                mu,
                sigma,
                failure_prob: self.failure_prob.unwrap_or(reference.config.failure_prob),
                required_return: self
                    .required_return
                    .unwrap_or(reference.config.required_return),
                horizon: self.horizon.unwrap_or(reference.config.horizon),
                seed,
            },
            histogram_bins: self.bins.unwrap_or(reference.histogram_bins),
            include_samples: !self.summary_only,
            parallel: self.parallel,
        })
    }
}

pub fn run_exit_sim(args: ExitSimArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let sim_input = match input::resolve::<ExitSimulationInput>(args.input.as_deref())? {
        Some(from_input) => from_input,
        None => args.into_input()?,
    };

    let config = &sim_input.config;
    tracing::info!(
        n_sims = config.n_sims,
        mu = config.mu,
        sigma = config.sigma,
        failure_prob = config.failure_prob,
        required_return = config.required_return,
        horizon = config.horizon,
        seed = ?config.seed,
        parallel = sim_input.parallel,
        "running exit-value simulation"
    );
    let start = Instant::now();
    let result = exit_value::run_exit_value_simulation(&sim_input)?;
    tracing::debug!(
        elapsed_us = start.elapsed().as_micros() as u64,
        "simulation complete"
    );

    for warning in &result.warnings {
        tracing::warn!("{warning}");
    }

    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ExitSimArgs {
        ExitSimArgs {
            n_sims: None,
            target_value: None,
            mu: None,
            sigma: None,
            failure_prob: None,
            required_return: None,
            horizon: None,
            seed: None,
            unseeded: false,
            bins: None,
            summary_only: false,
            parallel: false,
            input: None,
        }
    }

    #[test]
    fn test_no_flags_is_reference() {
        let input = args().into_input().unwrap();
        assert_eq!(input.config, SimulationConfig::reference());
        assert_eq!(input.histogram_bins, 60);
        assert!(input.include_samples);
    }

    #[test]
    fn test_sigma_rescales_mu_around_reference_target() {
        let input = ExitSimArgs {
            sigma: Some(0.5),
            ..args()
        }
        .into_input()
        .unwrap();
        assert_eq!(input.config.mu, lognormal_mu_for_mean(100.0, 0.5).unwrap());
    }

    #[test]
    fn test_explicit_mu_wins() {
        let input = ExitSimArgs {
            mu: Some(3.0),
            sigma: Some(0.5),
            ..args()
        }
        .into_input()
        .unwrap();
        assert_eq!(input.config.mu, 3.0);
    }

    #[test]
    fn test_unseeded_and_summary_only() {
        let input = ExitSimArgs {
            unseeded: true,
            summary_only: true,
            ..args()
        }
        .into_input()
        .unwrap();
        assert_eq!(input.config.seed, None);
        assert!(!input.include_samples);
    }

    #[test]
    fn test_bad_target_value_rejected() {
        let err = ExitSimArgs {
            target_value: Some(-5.0),
            ..args()
        }
        .into_input();
        assert!(err.is_err());
    }
}
