mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::bond::{AnalyzeArgs, ScheduleArgs, SensitivityArgs, ValueArgs};

/// Fixed-income valuation and yield-sensitivity calculations
#[derive(Parser)]
#[command(
    name = "bondx",
    version,
    about = "Bond valuation, cash-flow schedules and yield sensitivity",
    long_about = "A CLI for pricing plain-vanilla bullet bonds with decimal precision. \
                  Computes price, Macaulay and modified duration, convexity, the dated \
                  cash-flow schedule and a price-vs-yield curve under parallel shifts."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Enable debug logging on stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Price a bond: price, durations, convexity, classification
    Value(ValueArgs),
    /// Dated coupon and principal schedule with present values
    Schedule(ScheduleArgs),
    /// Price-vs-yield curve under parallel yield shifts
    Sensitivity(SensitivityArgs),
    /// Valuation, schedule and sensitivity curve in one report
    Analyze(AnalyzeArgs),
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
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Value(args) => commands::bond::run_value(args),
        Commands::Schedule(args) => commands::bond::run_schedule(args),
        Commands::Sensitivity(args) => commands::bond::run_sensitivity(args),
        Commands::Analyze(args) => commands::bond::run_analyze(args),
        Commands::Version => {
            println!("bondx {}", env!("CARGO_PKG_VERSION"));
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
