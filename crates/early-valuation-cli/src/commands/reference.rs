use serde_json::{json, Value};

use early_valuation_core::monte_carlo::exit_value::{self, ExitSimulationInput};
use early_valuation_core::valuation::profile::{self, DcfProfileInput};

/// Run both reference scenarios: the 25% cash flow profile over years 0..=10
/// and the seven-year exit-value simulation with seed 42.
pub fn run_reference(summary_only: bool) -> Result<Value, Box<dyn std::error::Error>> {
    tracing::info!("running reference scenarios");

    let dcf_profile = profile::run_dcf_profile(&DcfProfileInput::default())?;
    let exit_values = exit_value::run_exit_value_simulation(&ExitSimulationInput {
        include_samples: !summary_only,
        ..ExitSimulationInput::default()
    })?;

    Ok(json!({
        "dcf_profile": dcf_profile,
        "exit_values": exit_values,
    }))
}
