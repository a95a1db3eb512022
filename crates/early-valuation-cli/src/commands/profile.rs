use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use std::time::Instant;

use early_valuation_core::valuation::profile::{self, DcfProfileInput};

use crate::input;

/// Arguments for a discounted cash flow profile
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct DcfProfileArgs {
    /// Discount rate (e.g. 0.25 for 25%); defaults to the reference 25%
    #[arg(long, alias = "discount-rate")]
    pub rate: Option<Decimal>,

    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_dcf_profile(args: DcfProfileArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let profile_input = match input::resolve::<DcfProfileInput>(args.input.as_deref())? {
        Some(from_input) => from_input,
        None => DcfProfileInput {
            discount_rate: args.rate.unwrap_or_else(|| DcfProfileInput::default().discount_rate),
            ..DcfProfileInput::default()
        },
    };

    tracing::info!(
        discount_rate = %profile_input.discount_rate,
        years = profile_input.cash_flows.len(),
        "building cash flow profile"
    );
    let start = Instant::now();
    let result = profile::run_dcf_profile(&profile_input)?;
    tracing::debug!(elapsed_us = start.elapsed().as_micros() as u64, "profile complete");

    Ok(serde_json::to_value(result)?)
}
