use clap::Args;
use serde_json::Value;

use renew_finance_core::pipeline::{run_portfolio_model, PortfolioModelInput};
use renew_finance_core::revenue::StaticPriceBook;

use crate::input;

/// Arguments for the full portfolio pipeline.
#[derive(Args)]
pub struct ModelArgs {
    /// Path to JSON input (assets, cost profiles, constants, equity split)
    #[arg(long)]
    pub input: Option<String>,

    /// Path to a JSON merchant price book (defaults to the built-in book)
    #[arg(long)]
    pub prices: Option<String>,
}

pub fn run_model(args: ModelArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: PortfolioModelInput = if let Some(ref path) = args.input {
        input::read_json(path)?
    } else if let Some(request) = input::read_stdin_json()? {
        request
    } else {
        return Err("--input is required (or pipe JSON on stdin)".into());
    };

    let price_book: StaticPriceBook = match args.prices {
        Some(ref path) => input::read_json(path)?,
        None => StaticPriceBook::default(),
    };

    let output = run_portfolio_model(&request, &price_book)?;
    Ok(serde_json::to_value(&output)?)
}
