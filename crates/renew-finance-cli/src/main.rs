mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::debt::SizeDebtArgs;
use commands::irr::IrrArgs;
use commands::model::ModelArgs;
use commands::statements::{BalanceSheetArgs, StatementsArgs, WaterfallArgs};

/// Renewable portfolio project-finance calculations
#[derive(Parser)]
#[command(
    name = "rfa",
    version,
    about = "Renewable portfolio project-finance calculations",
    long_about = "A CLI for the renewable asset project-finance engine with decimal \
                  precision. Sizes DSCR-constrained project debt, solves equity IRRs, \
                  consolidates platform P&L statements, runs the dividend waterfall \
                  and reconstructs the balance sheet."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Size project debt (amortizing or DSCR-sculpted with auto-solve)
    SizeDebt(SizeDebtArgs),
    /// Solve the IRR of an equity cash-flow vector
    Irr(IrrArgs),
    /// Build consolidated platform P&L statements
    Statements(StatementsArgs),
    /// Run the dividend cash-flow waterfall
    Waterfall(WaterfallArgs),
    /// Reconstruct the period-end balance sheet
    BalanceSheet(BalanceSheetArgs),
    /// Run the full portfolio pipeline
    Model(ModelArgs),
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

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::SizeDebt(args) => commands::debt::run_size_debt(args),
        Commands::Irr(args) => commands::irr::run_irr(args),
        Commands::Statements(args) => commands::statements::run_statements(args),
        Commands::Waterfall(args) => commands::statements::run_waterfall(args),
        Commands::BalanceSheet(args) => commands::statements::run_balance_sheet(args),
        Commands::Model(args) => commands::model::run_model(args),
        Commands::Version => {
            println!("rfa {}", env!("CARGO_PKG_VERSION"));
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
