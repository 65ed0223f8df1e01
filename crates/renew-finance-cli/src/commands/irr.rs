use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::{json, Value};

use renew_finance_core::time_value::solve_irr;

use crate::input;

/// Arguments for the IRR solver.
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct IrrArgs {
    /// Path to JSON input {cashflows: [..], guess}
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated cash flows, first entry negative (e.g. "-100,30,30")
    #[arg(long)]
    pub cashflows: Option<String>,

    /// Initial guess
    #[arg(long, default_value = "0.10")]
    pub guess: Decimal,
}

#[derive(Deserialize)]
struct IrrRequest {
    cashflows: Vec<Decimal>,
    #[serde(default = "default_guess")]
    guess: Decimal,
}

fn default_guess() -> Decimal {
    dec!(0.10)
}

pub fn run_irr(args: IrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: IrrRequest = if let Some(ref path) = args.input {
        input::read_json(path)?
    } else if let Some(request) = input::read_stdin_json()? {
        request
    } else if let Some(ref raw) = args.cashflows {
        let cashflows = raw
            .split(',')
            .map(|s| s.trim().parse::<Decimal>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("Cannot parse cash flows: {e}"))?;
        IrrRequest {
            cashflows,
            guess: args.guess,
        }
    } else {
        return Err("--cashflows is required (or provide --input)".into());
    };

    let irr = solve_irr(&request.cashflows, request.guess);
    Ok(json!({
        "irr": irr,
        "converged": irr.is_some(),
        "periods": request.cashflows.len(),
    }))
}
