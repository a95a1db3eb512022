mod commands;
mod input;
mod logging;
mod output;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::exit_value::ExitSimArgs;
use commands::profile::DcfProfileArgs;

/// Valuation profiles and exit-value simulations for early-stage companies
#[derive(Parser)]
#[command(
    name = "earlyval",
    version,
    about = "Valuation profiles and exit-value simulations for early-stage companies",
    long_about = "Computes the numbers behind early-stage valuation charts: free cash flow \
                  against discounted free cash flow under a constant required return, and a \
                  Monte Carlo distribution of discounted exit values with an outright-failure \
                  probability. Output is data for plotting, not images."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Increase log verbosity on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Free cash flow vs. discounted free cash flow by year
    DcfProfile(DcfProfileArgs),
    /// Simulate discounted exit values under a failure / lognormal mixture
    ExitSim(ExitSimArgs),
    /// Run both reference scenarios
    Reference(ReferenceArgs),
    /// Print version information
    Version,
}

#[derive(Args)]
struct ReferenceArgs {
    /// Omit individual simulated samples
    #[arg(long)]
    summary_only: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::DcfProfile(args) => commands::profile::run_dcf_profile(args),
        Commands::ExitSim(args) => commands::exit_value::run_exit_sim(args),
        Commands::Reference(args) => commands::reference::run_reference(args.summary_only),
        Commands::Version => {
            println!("earlyval {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
