mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::export::ExportArgs;
use commands::scenarios::{ScenarioArgs, SensitivityArgs};
use commands::valuation::ValueArgs;

/// Discounted cash flow valuation engine
#[derive(Parser)]
#[command(
    name = "dcf",
    version,
    about = "Discounted cash flow valuation with scenario and sensitivity analysis",
    long_about = "Projects ten years of free cash flow from a set of operating assumptions, \
                  discounts them at WACC, and derives enterprise, equity and per-share value. \
                  Supports one-way sensitivity sweeps, Bear/Base/Bull scenarios and CSV export."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log pipeline stages to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the DCF valuation
    Value(ValueArgs),
    /// Sweep one assumption and report value per share at each point
    Sensitivity(SensitivityArgs),
    /// Run Bear/Base/Bull (or custom) scenarios
    Scenarios(ScenarioArgs),
    /// Write assumptions, projections and valuation as CSV files
    Export(ExportArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Value(args) => commands::valuation::run_value(args),
        Commands::Sensitivity(args) => commands::scenarios::run_sensitivity(args),
        Commands::Scenarios(args) => commands::scenarios::run_scenarios(args),
        Commands::Export(args) => commands::export::run_export(args),
        Commands::Version => {
            println!("dcf {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
