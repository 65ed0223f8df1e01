use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use renew_finance_core::balance_sheet::{build_balance_sheet, BalanceSheetParams};
use renew_finance_core::statements::{
    build_statements, AssetStatementBasis, PlatformPeriodStatement, StatementParams,
};
use renew_finance_core::types::Money;
use renew_finance_core::waterfall::{self, CashFlowStatementRecord};

use crate::input;

/// Arguments for the P&L aggregator.
#[derive(Args)]
pub struct StatementsArgs {
    /// Path to JSON input {assets: [..], params: {..}}
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Deserialize)]
struct StatementsRequest {
    assets: Vec<AssetStatementBasis>,
    params: StatementParams,
}

pub fn run_statements(args: StatementsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: StatementsRequest = read_request(&args.input)?;
    let statements = build_statements(&request.assets, &request.params)?;
    Ok(serde_json::to_value(&statements)?)
}

/// Arguments for the dividend waterfall.
#[derive(Args)]
pub struct WaterfallArgs {
    /// Path to JSON input {statements: [..], dividend_policy_pct,
    /// minimum_cash_balance, quarterly}
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Deserialize)]
struct WaterfallRequest {
    statements: Vec<PlatformPeriodStatement>,
    dividend_policy_pct: Decimal,
    minimum_cash_balance: Money,
    #[serde(default)]
    quarterly: bool,
}

pub fn run_waterfall(args: WaterfallArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: WaterfallRequest = read_request(&args.input)?;
    let records = if request.quarterly {
        waterfall::run_quarterly_waterfall(
            &request.statements,
            request.dividend_policy_pct,
            request.minimum_cash_balance,
        )
    } else {
        waterfall::run_waterfall(
            &request.statements,
            request.dividend_policy_pct,
            request.minimum_cash_balance,
        )
    };
    Ok(serde_json::to_value(&records)?)
}

/// Arguments for the balance-sheet reconstructor.
#[derive(Args)]
pub struct BalanceSheetArgs {
    /// Path to JSON input {statements, records, total_capex,
    /// opening_senior_debt, params}
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Deserialize)]
struct BalanceSheetRequest {
    statements: Vec<PlatformPeriodStatement>,
    records: Vec<CashFlowStatementRecord>,
    total_capex: Money,
    opening_senior_debt: Money,
    params: BalanceSheetParams,
}

pub fn run_balance_sheet(args: BalanceSheetArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: BalanceSheetRequest = read_request(&args.input)?;
    let sheets = build_balance_sheet(
        &request.statements,
        &request.records,
        request.total_capex,
        request.opening_senior_debt,
        &request.params,
    )?;
    Ok(serde_json::to_value(&sheets)?)
}

fn read_request<T: serde::de::DeserializeOwned>(
    path: &Option<String>,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        input::read_json(path)
    } else if let Some(request) = input::read_stdin_json()? {
        Ok(request)
    } else {
        Err("--input is required (or pipe JSON on stdin)".into())
    }
}
