use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use renew_finance_core::debt::{size_debt, DebtBasisYear};
use renew_finance_core::types::{DebtParams, DebtStructure};

use crate::input;

/// Arguments for debt sizing. Either a JSON request, or flags describing a
/// flat cash-flow profile.
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct SizeDebtArgs {
    /// Path to JSON input {capex, basis: [..], params: {..}}
    #[arg(long)]
    pub input: Option<String>,

    /// Total capex, $M
    #[arg(long)]
    pub capex: Option<Decimal>,

    /// Flat annual CFADS, $M
    #[arg(long)]
    pub cfads: Option<Decimal>,

    /// Flat annual revenue backing the DSCR blend, $M (defaults to CFADS)
    #[arg(long)]
    pub revenue: Option<Decimal>,

    /// Share of revenue under contract, percent
    #[arg(long, default_value = "100")]
    pub contracted_pct: Decimal,

    /// Number of operating years in the profile
    #[arg(long, default_value = "20")]
    pub years: u32,

    /// Maximum debt / capex
    #[arg(long, default_value = "0.70")]
    pub max_gearing: Decimal,

    /// Target DSCR on contracted revenue
    #[arg(long, default_value = "1.35")]
    pub dscr_contract: Decimal,

    /// Target DSCR on merchant revenue
    #[arg(long, default_value = "1.80")]
    pub dscr_merchant: Decimal,

    /// Annual interest rate
    #[arg(long, default_value = "0.06")]
    pub interest_rate: Decimal,

    /// Repayment tenor in years
    #[arg(long, default_value = "15")]
    pub tenor: u32,

    /// Debt structure: amortization | sculpting
    #[arg(long, default_value = "sculpting")]
    pub structure: String,
}

#[derive(Deserialize)]
struct SizeDebtRequest {
    capex: Decimal,
    basis: Vec<DebtBasisYear>,
    params: DebtParams,
}

pub fn run_size_debt(args: SizeDebtArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: SizeDebtRequest = if let Some(ref path) = args.input {
        input::read_json(path)?
    } else if let Some(request) = input::read_stdin_json()? {
        request
    } else {
        request_from_flags(&args)?
    };

    let sized = size_debt(request.capex, &request.basis, &request.params)?;
    Ok(serde_json::to_value(&sized)?)
}

fn request_from_flags(args: &SizeDebtArgs) -> Result<SizeDebtRequest, Box<dyn std::error::Error>> {
    let capex = args.capex.ok_or("--capex is required (or provide --input)")?;
    let cfads = args.cfads.ok_or("--cfads is required (or provide --input)")?;
    let revenue = args.revenue.unwrap_or(cfads);
    let contracted = revenue * args.contracted_pct / Decimal::from(100);

    let basis = (0..args.years)
        .map(|_| DebtBasisYear {
            contracted_revenue: contracted,
            merchant_revenue: revenue - contracted,
            opex: revenue - cfads,
            operating_cash_flow: cfads,
        })
        .collect();

    let structure = match args.structure.as_str() {
        "amortization" => DebtStructure::Amortization,
        "sculpting" => DebtStructure::Sculpting,
        other => return Err(format!("Unknown debt structure '{other}'").into()),
    };

    Ok(SizeDebtRequest {
        capex,
        basis,
        params: DebtParams {
            max_gearing: args.max_gearing,
            target_dscr_contract: args.dscr_contract,
            target_dscr_merchant: args.dscr_merchant,
            interest_rate: args.interest_rate,
            tenor_years: args.tenor,
            structure,
        },
    })
}
