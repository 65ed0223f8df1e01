use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

use renew_finance_core::balance_sheet::BalanceSheetParams;
use renew_finance_core::debt::DebtBasisYear;
use renew_finance_core::pipeline::PortfolioModelInput;
use renew_finance_core::revenue::StaticPriceBook;
use renew_finance_core::statements::{AssetStatementBasis, PlatformPeriodStatement, StatementParams};
use renew_finance_core::types::DebtParams;
use renew_finance_core::waterfall::CashFlowStatementRecord;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Debt sizing
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SizeDebtRequest {
    capex: Decimal,
    basis: Vec<DebtBasisYear>,
    params: DebtParams,
}

#[napi]
pub fn size_debt(input_json: String) -> NapiResult<String> {
    let request: SizeDebtRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = renew_finance_core::debt::size_debt(request.capex, &request.basis, &request.params)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// IRR
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct IrrRequest {
    cashflows: Vec<Decimal>,
    guess: Option<Decimal>,
}

#[napi]
pub fn solve_irr(input_json: String) -> NapiResult<String> {
    let request: IrrRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let guess = request
        .guess
        .unwrap_or(renew_finance_core::time_value::DEFAULT_IRR_GUESS);
    let irr = renew_finance_core::time_value::solve_irr(&request.cashflows, guess);
    serde_json::to_string(&serde_json::json!({ "irr": irr })).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Statements, waterfall, balance sheet
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct StatementsRequest {
    assets: Vec<AssetStatementBasis>,
    params: StatementParams,
}

#[napi]
pub fn build_statements(input_json: String) -> NapiResult<String> {
    let request: StatementsRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = renew_finance_core::statements::build_statements(&request.assets, &request.params)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct WaterfallRequest {
    statements: Vec<PlatformPeriodStatement>,
    dividend_policy_pct: Decimal,
    minimum_cash_balance: Decimal,
    #[serde(default)]
    quarterly: bool,
}

#[napi]
pub fn run_waterfall(input_json: String) -> NapiResult<String> {
    let request: WaterfallRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let records = if request.quarterly {
        renew_finance_core::waterfall::run_quarterly_waterfall(
            &request.statements,
            request.dividend_policy_pct,
            request.minimum_cash_balance,
        )
    } else {
        renew_finance_core::waterfall::run_waterfall(
            &request.statements,
            request.dividend_policy_pct,
            request.minimum_cash_balance,
        )
    };
    serde_json::to_string(&records).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct BalanceSheetRequest {
    statements: Vec<PlatformPeriodStatement>,
    records: Vec<CashFlowStatementRecord>,
    total_capex: Decimal,
    opening_senior_debt: Decimal,
    params: BalanceSheetParams,
}

#[napi]
pub fn build_balance_sheet(input_json: String) -> NapiResult<String> {
    let request: BalanceSheetRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = renew_finance_core::balance_sheet::build_balance_sheet(
        &request.statements,
        &request.records,
        request.total_capex,
        request.opening_senior_debt,
        &request.params,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ModelRequest {
    #[serde(flatten)]
    input: PortfolioModelInput,
    /// Optional merchant price book; defaults to the built-in book
    #[serde(default)]
    prices: Option<StaticPriceBook>,
}

#[napi]
pub fn run_portfolio_model(input_json: String) -> NapiResult<String> {
    let request: ModelRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let price_book = request.prices.unwrap_or_default();
    let output = renew_finance_core::pipeline::run_portfolio_model(&request.input, &price_book)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
