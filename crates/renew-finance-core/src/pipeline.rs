use std::collections::BTreeMap;
use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::balance_sheet::{build_balance_sheet, BalanceSheetParams, BalanceSheetRecord};
use crate::debt::{
    construction_equity_outlays, debt_basis_years, equity_cash_flow_vector, period_cashflows,
    size_debt, DebtBasisYear, PeriodCashFlow, SizedDebt,
};
use crate::period::{parse_start_year, PeriodKey};
use crate::revenue::{revenue_breakdown, MerchantPriceProvider, Scenario};
use crate::statements::{
    build_statements, AssetStatementBasis, ConsolidatedStatements, DepreciationPeriods,
    StatementParams,
};
use crate::time_value::{solve_irr, DEFAULT_IRR_GUESS};
use crate::types::{
    with_metadata, Asset, AssetCostProfile, ComputationOutput, Money, Rate, RevenueBreakdown,
};
use crate::waterfall::{run_quarterly_waterfall, run_waterfall, CashFlowStatementRecord};
use crate::RenewFinanceResult;

/// Cost-profile key for the portfolio-level refinancing facility.
pub const PORTFOLIO_PROFILE_KEY: &str = "portfolio";

/// Global assumptions shared by every stage of a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConstants {
    /// First analysis year
    pub start_year: i32,
    /// Last analysis year, inclusive
    pub end_year: i32,
    /// Corporate tax rate as a decimal
    pub tax_rate: Rate,
    /// Year-one platform overhead, $M
    pub platform_opex: Money,
    #[serde(default)]
    pub platform_opex_escalation_pct: Decimal,
    /// Dividend payout, percent of NPAT
    pub dividend_policy_pct: Decimal,
    /// Cash floor for the dividend waterfall, $M
    pub minimum_cash_balance: Money,
    #[serde(default)]
    pub depreciation_periods: DepreciationPeriods,
    #[serde(default)]
    pub scenario: Scenario,
}

/// Full input to one pipeline run. The engine is a pure function of this
/// value plus the injected price provider; there is no ambient scenario
/// state anywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioModelInput {
    pub assets: Vec<Asset>,
    /// Keyed by asset name, plus the optional `"portfolio"` entry
    pub cost_profiles: BTreeMap<String, AssetCostProfile>,
    pub constants: ModelConstants,
    pub balance_sheet: BalanceSheetParams,
}

/// Per-asset results: sized debt, the operating cash-flow history, the
/// equity vector and its IRR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetModelResult {
    pub name: String,
    pub debt: SizedDebt,
    pub cashflows: Vec<PeriodCashFlow>,
    pub equity_cash_flows: Vec<Money>,
    pub irr: Option<Rate>,
}

/// Portfolio roll-up metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub total_capacity_mw: Decimal,
    pub total_revenue: Money,
    pub average_annual_revenue: Money,
    pub contracted_revenue_pct: Decimal,
    pub merchant_revenue_pct: Decimal,
    pub asset_count: usize,
    pub period_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioModelOutput {
    pub assets: Vec<AssetModelResult>,
    /// Element-wise sum of asset equity vectors on the common calendar
    pub portfolio_equity_cash_flows: Vec<Money>,
    pub portfolio_irr: Option<Rate>,
    /// Refinancing facility sized on combined cash flows, when ≥2 assets
    /// and a `"portfolio"` cost profile exist
    pub portfolio_refinance: Option<SizedDebt>,
    pub statements: ConsolidatedStatements,
    pub waterfall_annual: Vec<CashFlowStatementRecord>,
    pub waterfall_quarterly: Vec<CashFlowStatementRecord>,
    pub balance_sheet: Vec<BalanceSheetRecord>,
    pub summary: SummaryMetrics,
}

struct PreparedAsset {
    statement_basis: AssetStatementBasis,
    debt_basis: Vec<DebtBasisYear>,
    start_year: i32,
    capacity_mw: Decimal,
    capex: Money,
    contracted_revenue: Money,
    merchant_revenue: Money,
    sized: SizedDebt,
    result: AssetModelResult,
}

/// Run the full pipeline: per-asset revenue, debt sizing and IRR, then the
/// consolidated statements, waterfalls and balance sheet.
///
/// Assets with a missing cost profile, non-positive capex or an unparseable
/// start date are skipped with a warning; they never abort the portfolio
/// run. Every invocation recomputes everything from scratch.
pub fn run_portfolio_model(
    input: &PortfolioModelInput,
    provider: &dyn MerchantPriceProvider,
) -> RenewFinanceResult<ComputationOutput<PortfolioModelOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_constants(&input.constants)?;

    let mut prepared: Vec<PreparedAsset> = Vec::with_capacity(input.assets.len());
    for asset in &input.assets {
        match prepare_asset(asset, input, provider, &mut warnings) {
            Some(p) => prepared.push(p),
            None => continue,
        }
    }

    if prepared.is_empty() {
        warnings.push("No assets contributed to the portfolio computation".to_string());
    }

    // Portfolio equity vector on the common calendar, then its IRR.
    let portfolio_equity_cash_flows = combine_equity_vectors(&prepared);
    let portfolio_irr = solve_irr(&portfolio_equity_cash_flows, DEFAULT_IRR_GUESS);
    if portfolio_irr.is_none() && !prepared.is_empty() {
        warnings.push("Portfolio IRR is not meaningful for these cash flows".to_string());
    }

    let portfolio_refinance = size_portfolio_refinance(input, &prepared, &mut warnings);

    // Consolidated statements and downstream stages.
    let statement_params = StatementParams {
        start_year: input.constants.start_year,
        end_year: input.constants.end_year,
        tax_rate: input.constants.tax_rate,
        platform_opex: input.constants.platform_opex,
        platform_opex_escalation_pct: input.constants.platform_opex_escalation_pct,
        depreciation_periods: input.constants.depreciation_periods.clone(),
    };
    let bases: Vec<AssetStatementBasis> = prepared
        .iter()
        .map(|p| p.statement_basis.clone())
        .collect();
    let statements = build_statements(&bases, &statement_params)?;

    let waterfall_annual = run_waterfall(
        &statements.annual,
        input.constants.dividend_policy_pct,
        input.constants.minimum_cash_balance,
    );
    let waterfall_quarterly = run_quarterly_waterfall(
        &statements.quarterly,
        input.constants.dividend_policy_pct,
        input.constants.minimum_cash_balance,
    );

    let total_capex: Money = prepared.iter().map(|p| p.capex).sum();
    let opening_senior_debt: Money = prepared.iter().map(|p| p.sized.debt_amount).sum();
    let balance_sheet = build_balance_sheet(
        &statements.annual,
        &waterfall_annual,
        total_capex,
        opening_senior_debt,
        &input.balance_sheet,
    )?;
    for sheet in &balance_sheet {
        if !sheet.balanced {
            warnings.push(format!(
                "Balance sheet does not balance in period {} (assets {}, liabilities+equity {})",
                sheet.period,
                sheet.total_assets,
                sheet.total_liabilities + sheet.total_equity
            ));
        }
    }

    let summary = build_summary(&prepared, &statements);

    let output = PortfolioModelOutput {
        assets: prepared.into_iter().map(|p| p.result).collect(),
        portfolio_equity_cash_flows,
        portfolio_irr,
        portfolio_refinance,
        statements,
        waterfall_annual,
        waterfall_quarterly,
        balance_sheet,
        summary,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Renewable Portfolio Project Finance & Consolidated Statements",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Build one asset's revenue series, debt sizing and IRR. Returns None when
/// the asset cannot contribute; the reason is appended to `warnings`.
fn prepare_asset(
    asset: &Asset,
    input: &PortfolioModelInput,
    provider: &dyn MerchantPriceProvider,
    warnings: &mut Vec<String>,
) -> Option<PreparedAsset> {
    let constants = &input.constants;

    let Some(profile) = input.cost_profiles.get(&asset.name) else {
        warnings.push(format!(
            "Asset '{}' skipped: no cost profile found",
            asset.name
        ));
        return None;
    };

    if profile.capex <= Decimal::ZERO {
        warnings.push(format!(
            "Asset '{}' skipped: capex must be positive",
            asset.name
        ));
        return None;
    }

    let start_year = match parse_start_year(&asset.operations_start) {
        Ok(year) => year,
        Err(e) => {
            warnings.push(format!("Asset '{}' skipped: {e}", asset.name));
            return None;
        }
    };

    if start_year > constants.end_year {
        warnings.push(format!(
            "Asset '{}' skipped: operations start {} is after the analysis window",
            asset.name, start_year
        ));
        return None;
    }
    let start_year = if start_year < constants.start_year {
        warnings.push(format!(
            "Asset '{}' starts before the analysis window; clamped to {}",
            asset.name, constants.start_year
        ));
        constants.start_year
    } else {
        start_year
    };

    // Revenue series over the full analysis window; the breakdown engine
    // zeroes periods outside the asset's operating life by itself.
    let years: Vec<i32> = (constants.start_year..=constants.end_year).collect();
    let mut annual_breakdowns: Vec<RevenueBreakdown> = Vec::with_capacity(years.len());
    let mut quarterly_revenue: Vec<Money> = Vec::with_capacity(years.len() * 4);
    for &year in &years {
        let annual = match revenue_breakdown(
            asset,
            &PeriodKey::Year(year),
            provider,
            constants.scenario,
        ) {
            Ok(b) => b,
            Err(e) => {
                warnings.push(format!("Asset '{}' skipped: {e}", asset.name));
                return None;
            }
        };
        annual_breakdowns.push(annual);

        for quarter in 1..=4u8 {
            let key = PeriodKey::Quarter { year, quarter };
            let breakdown = revenue_breakdown(asset, &key, provider, constants.scenario)
                .unwrap_or_default();
            quarterly_revenue.push(breakdown.total());
        }
    }

    // Debt is sized against the asset's own operating timeline.
    let start_index = (start_year - constants.start_year) as usize;
    let operating_years =
        (years.len() - start_index).min(asset.asset_life_years as usize);
    let operating_breakdowns = &annual_breakdowns[start_index..start_index + operating_years];
    let debt_basis = debt_basis_years(
        operating_breakdowns,
        profile.operating_cost,
        profile.operating_cost_escalation_pct,
        profile.terminal_value,
    );

    let sized = match size_debt(profile.capex, &debt_basis, &profile.debt) {
        Ok(s) => s,
        Err(e) => {
            warnings.push(format!("Asset '{}' skipped: {e}", asset.name));
            return None;
        }
    };
    if sized.debt_amount.is_zero() && profile.debt.max_gearing > Decimal::ZERO {
        warnings.push(format!(
            "Asset '{}': no sculpted debt amount is serviceable; proceeding unlevered",
            asset.name
        ));
    }

    let cashflows = period_cashflows(start_year, &debt_basis, &sized.schedule);
    let equity = profile.capex - sized.debt_amount;
    let outlays = construction_equity_outlays(equity, &profile.equity_timing);
    let equity_cash_flows = equity_cash_flow_vector(&outlays, &cashflows);

    let irr = solve_irr(&equity_cash_flows, DEFAULT_IRR_GUESS);
    if irr.is_none() {
        warnings.push(format!(
            "Asset '{}': equity IRR is not meaningful for these cash flows",
            asset.name
        ));
    }

    let contracted_revenue: Money = annual_breakdowns.iter().map(|b| b.contracted()).sum();
    let merchant_revenue: Money = annual_breakdowns.iter().map(|b| b.merchant()).sum();

    let statement_basis = AssetStatementBasis {
        name: asset.name.clone(),
        technology: asset.technology,
        start_year,
        asset_life_years: asset.asset_life_years,
        capex: profile.capex,
        operating_cost: profile.operating_cost,
        operating_cost_escalation_pct: profile.operating_cost_escalation_pct,
        annual_revenue: annual_breakdowns.iter().map(|b| b.total()).collect(),
        quarterly_revenue,
        schedule: sized.schedule.clone(),
    };

    Some(PreparedAsset {
        statement_basis,
        debt_basis,
        start_year,
        capacity_mw: asset.capacity_mw,
        capex: profile.capex,
        contracted_revenue,
        merchant_revenue,
        sized: sized.clone(),
        result: AssetModelResult {
            name: asset.name.clone(),
            debt: sized,
            cashflows,
            equity_cash_flows,
            irr,
        },
    })
}

/// Sum per-asset equity vectors onto the shared calendar. Construction
/// outlays occupy the years immediately before each asset's operations
/// start.
fn combine_equity_vectors(prepared: &[PreparedAsset]) -> Vec<Money> {
    let mut by_year: BTreeMap<i32, Money> = BTreeMap::new();

    for p in prepared {
        let operating_len = p.result.cashflows.len();
        let outlay_len = p.result.equity_cash_flows.len() - operating_len;
        for (i, flow) in p.result.equity_cash_flows.iter().enumerate() {
            let year = p.start_year - outlay_len as i32 + i as i32;
            *by_year.entry(year).or_insert(Decimal::ZERO) += *flow;
        }
    }

    // Years with no entries still occupy a discounting period.
    let (Some(&first), Some(&last)) = (by_year.keys().next(), by_year.keys().last()) else {
        return Vec::new();
    };
    (first..=last)
        .map(|year| by_year.get(&year).copied().unwrap_or(Decimal::ZERO))
        .collect()
}

/// Size the portfolio refinancing facility against the combined cash flows
/// of all contributing assets, when the refinancing case applies.
fn size_portfolio_refinance(
    input: &PortfolioModelInput,
    prepared: &[PreparedAsset],
    warnings: &mut Vec<String>,
) -> Option<SizedDebt> {
    if prepared.len() < 2 {
        return None;
    }
    let profile = input.cost_profiles.get(PORTFOLIO_PROFILE_KEY)?;

    // Align each asset's basis on the analysis calendar and sum.
    let n_years = (input.constants.end_year - input.constants.start_year + 1) as usize;
    let mut combined: Vec<DebtBasisYear> = (0..n_years)
        .map(|_| DebtBasisYear {
            contracted_revenue: Decimal::ZERO,
            merchant_revenue: Decimal::ZERO,
            opex: Decimal::ZERO,
            operating_cash_flow: Decimal::ZERO,
        })
        .collect();
    for p in prepared {
        let offset = (p.start_year - input.constants.start_year) as usize;
        for (i, year_basis) in p.debt_basis.iter().enumerate() {
            let slot = &mut combined[offset + i];
            slot.contracted_revenue += year_basis.contracted_revenue;
            slot.merchant_revenue += year_basis.merchant_revenue;
            slot.opex += year_basis.opex;
            slot.operating_cash_flow += year_basis.operating_cash_flow;
        }
    }

    let total_capex: Money = prepared.iter().map(|p| p.capex).sum();
    match size_debt(total_capex, &combined, &profile.debt) {
        Ok(sized) => Some(sized),
        Err(e) => {
            warnings.push(format!("Portfolio refinancing skipped: {e}"));
            None
        }
    }
}

fn build_summary(prepared: &[PreparedAsset], statements: &ConsolidatedStatements) -> SummaryMetrics {
    let total_revenue: Money = statements.annual.iter().map(|s| s.revenue).sum();
    let period_count = statements.annual.len();
    let average_annual_revenue = if period_count > 0 {
        total_revenue / Decimal::from(period_count as i64)
    } else {
        Decimal::ZERO
    };

    let contracted: Money = prepared.iter().map(|p| p.contracted_revenue).sum();
    let merchant: Money = prepared.iter().map(|p| p.merchant_revenue).sum();
    let (contracted_revenue_pct, merchant_revenue_pct) = if total_revenue > Decimal::ZERO {
        (
            contracted / total_revenue * dec!(100),
            merchant / total_revenue * dec!(100),
        )
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    };

    SummaryMetrics {
        total_capacity_mw: prepared.iter().map(|p| p.capacity_mw).sum(),
        total_revenue,
        average_annual_revenue,
        contracted_revenue_pct,
        merchant_revenue_pct,
        asset_count: prepared.len(),
        period_count,
    }
}

fn validate_constants(constants: &ModelConstants) -> RenewFinanceResult<()> {
    if constants.end_year < constants.start_year {
        return Err(crate::error::RenewFinanceError::InvalidInput {
            field: "end_year".into(),
            reason: format!(
                "Analysis window is empty: {}..{}",
                constants.start_year, constants.end_year
            ),
        });
    }
    if constants.tax_rate < Decimal::ZERO || constants.tax_rate > Decimal::ONE {
        return Err(crate::error::RenewFinanceError::InvalidInput {
            field: "tax_rate".into(),
            reason: format!("Tax rate must be between 0 and 1, got {}", constants.tax_rate),
        });
    }
    if constants.dividend_policy_pct < Decimal::ZERO {
        return Err(crate::error::RenewFinanceError::InvalidInput {
            field: "dividend_policy_pct".into(),
            reason: "Dividend policy cannot be negative".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance_sheet::{CarryingValues, EquityStructure};
    use crate::contracts::{ContractBook, RenewableContract, RenewableOfftake};
    use crate::revenue::StaticPriceBook;
    use crate::types::{DebtParams, DebtStructure, EquityTiming, Technology};

    fn solar_asset(name: &str) -> Asset {
        Asset {
            name: name.into(),
            technology: Technology::Solar,
            capacity_mw: dec!(100),
            storage_volume_mwh: Decimal::ZERO,
            region: "NSW".into(),
            operations_start: "1/01/2025".into(),
            asset_life_years: 30,
            annual_degradation_pct: dec!(0.4),
            volume_loss_pct: dec!(95),
            quarterly_capacity_factors: Some([dec!(28), dec!(26), dec!(27), dec!(29)]),
            contracts: ContractBook::Renewable(vec![RenewableContract {
                offtake: RenewableOfftake::Bundled {
                    green_price: dec!(30),
                    energy_price: dec!(55),
                    floor: None,
                },
                buyers_pct: dec!(70),
                indexation_pct: dec!(2),
                start_year: 2025,
                end_year: 2039,
            }]),
        }
    }

    fn profile(capex: Decimal) -> AssetCostProfile {
        AssetCostProfile {
            capex,
            operating_cost: capex / dec!(30),
            operating_cost_escalation_pct: dec!(2),
            terminal_value: capex / dec!(10),
            debt: DebtParams {
                max_gearing: dec!(0.70),
                target_dscr_contract: dec!(1.35),
                target_dscr_merchant: dec!(1.80),
                interest_rate: dec!(0.055),
                tenor_years: 15,
                structure: DebtStructure::Sculpting,
            },
            equity_timing: EquityTiming {
                upfront: true,
                construction_duration_months: 12,
            },
        }
    }

    fn constants() -> ModelConstants {
        ModelConstants {
            start_year: 2025,
            end_year: 2044,
            tax_rate: dec!(0.30),
            platform_opex: dec!(1.5),
            platform_opex_escalation_pct: dec!(2),
            dividend_policy_pct: dec!(60),
            minimum_cash_balance: dec!(5),
            depreciation_periods: DepreciationPeriods::default(),
            scenario: Scenario::Base,
        }
    }

    fn model_input() -> PortfolioModelInput {
        let mut cost_profiles = BTreeMap::new();
        cost_profiles.insert("Alpha".to_string(), profile(dec!(120)));
        cost_profiles.insert("Beta".to_string(), profile(dec!(90)));

        PortfolioModelInput {
            assets: vec![solar_asset("Alpha"), solar_asset("Beta")],
            cost_profiles,
            constants: constants(),
            balance_sheet: BalanceSheetParams {
                equity: EquityStructure {
                    total_investment: dec!(230),
                    investor_share_pct: dec!(80),
                    fixed_repayment_component: Decimal::ZERO,
                },
                carrying: CarryingValues::default(),
                opening_portfolio_financing: Decimal::ZERO,
            },
        }
    }

    #[test]
    fn test_full_pipeline_shapes() {
        let input = model_input();
        let book = StaticPriceBook::default();
        let output = run_portfolio_model(&input, &book).unwrap();
        let result = &output.result;

        assert_eq!(result.assets.len(), 2);
        assert_eq!(result.statements.annual.len(), 20);
        assert_eq!(result.statements.quarterly.len(), 80);
        assert_eq!(result.waterfall_annual.len(), 20);
        assert_eq!(result.waterfall_quarterly.len(), 80);
        assert_eq!(result.balance_sheet.len(), 21);
    }

    #[test]
    fn test_assets_get_levered_and_solved() {
        let input = model_input();
        let book = StaticPriceBook::default();
        let output = run_portfolio_model(&input, &book).unwrap();

        for asset in &output.result.assets {
            assert!(asset.debt.debt_amount > Decimal::ZERO, "{}", asset.name);
            assert!(asset.debt.schedule.fully_repaid);
            assert!(asset.irr.is_some(), "{} IRR missing", asset.name);
            // Upfront equity: vector leads with one negative outlay
            assert!(asset.equity_cash_flows[0] < Decimal::ZERO);
        }
    }

    #[test]
    fn test_portfolio_irr_present() {
        let input = model_input();
        let book = StaticPriceBook::default();
        let output = run_portfolio_model(&input, &book).unwrap();

        assert!(output.result.portfolio_irr.is_some());
        let first = output.result.portfolio_equity_cash_flows[0];
        assert!(first < Decimal::ZERO);
    }

    #[test]
    fn test_balance_sheet_balances_through_pipeline() {
        let input = model_input();
        let book = StaticPriceBook::default();
        let output = run_portfolio_model(&input, &book).unwrap();

        for sheet in &output.result.balance_sheet {
            assert!(sheet.balanced, "{} does not balance", sheet.period);
        }
        assert!(!output
            .warnings
            .iter()
            .any(|w| w.contains("does not balance")));
    }

    #[test]
    fn test_missing_profile_skips_with_warning() {
        let mut input = model_input();
        input.assets.push(solar_asset("Orphan"));
        let book = StaticPriceBook::default();
        let output = run_portfolio_model(&input, &book).unwrap();

        assert_eq!(output.result.assets.len(), 2);
        assert!(output
            .warnings
            .iter()
            .any(|w| w.contains("Orphan") && w.contains("no cost profile")));
    }

    #[test]
    fn test_zero_capex_skips_with_warning() {
        let mut input = model_input();
        input
            .cost_profiles
            .insert("Freebie".to_string(), profile(Decimal::ZERO));
        input.assets.push(solar_asset("Freebie"));
        let book = StaticPriceBook::default();
        let output = run_portfolio_model(&input, &book).unwrap();

        assert_eq!(output.result.assets.len(), 2);
        assert!(output.warnings.iter().any(|w| w.contains("Freebie")));
    }

    #[test]
    fn test_bad_start_date_skips_with_warning() {
        let mut input = model_input();
        let mut bad = solar_asset("Mystery");
        bad.operations_start = "someday".into();
        input
            .cost_profiles
            .insert("Mystery".to_string(), profile(dec!(50)));
        input.assets.push(bad);
        let book = StaticPriceBook::default();
        let output = run_portfolio_model(&input, &book).unwrap();

        assert_eq!(output.result.assets.len(), 2);
        assert!(output.warnings.iter().any(|w| w.contains("Mystery")));
    }

    #[test]
    fn test_empty_portfolio_warns_but_completes() {
        let mut input = model_input();
        input.assets.clear();
        let book = StaticPriceBook::default();
        let output = run_portfolio_model(&input, &book).unwrap();

        assert!(output.result.assets.is_empty());
        assert!(output
            .warnings
            .iter()
            .any(|w| w.contains("No assets contributed")));
    }

    #[test]
    fn test_portfolio_refinance_requires_profile() {
        let input = model_input();
        let book = StaticPriceBook::default();
        let output = run_portfolio_model(&input, &book).unwrap();
        assert!(output.result.portfolio_refinance.is_none());
    }

    #[test]
    fn test_portfolio_refinance_sized_when_profile_present() {
        let mut input = model_input();
        input
            .cost_profiles
            .insert(PORTFOLIO_PROFILE_KEY.to_string(), profile(dec!(210)));
        let book = StaticPriceBook::default();
        let output = run_portfolio_model(&input, &book).unwrap();

        let refinance = output.result.portfolio_refinance.as_ref().unwrap();
        assert!(refinance.debt_amount > Decimal::ZERO);
        assert!(refinance.schedule.fully_repaid);
    }

    #[test]
    fn test_refinance_skipped_for_single_asset() {
        let mut input = model_input();
        input.assets.truncate(1);
        input
            .cost_profiles
            .insert(PORTFOLIO_PROFILE_KEY.to_string(), profile(dec!(210)));
        let book = StaticPriceBook::default();
        let output = run_portfolio_model(&input, &book).unwrap();
        assert!(output.result.portfolio_refinance.is_none());
    }

    #[test]
    fn test_summary_metrics() {
        let input = model_input();
        let book = StaticPriceBook::default();
        let output = run_portfolio_model(&input, &book).unwrap();
        let summary = &output.result.summary;

        assert_eq!(summary.asset_count, 2);
        assert_eq!(summary.total_capacity_mw, dec!(200));
        assert_eq!(summary.period_count, 20);
        assert!(summary.total_revenue > Decimal::ZERO);
        // Bundled offtakes cover 70% of output for the first 15 years
        assert!(summary.contracted_revenue_pct > dec!(30));
        assert!(summary.merchant_revenue_pct > Decimal::ZERO);
        let combined = summary.contracted_revenue_pct + summary.merchant_revenue_pct;
        assert!((combined - dec!(100)).abs() < dec!(0.5));
    }

    #[test]
    fn test_spread_equity_outlays_extend_vector() {
        let mut input = model_input();
        for p in input.cost_profiles.values_mut() {
            p.equity_timing = EquityTiming {
                upfront: false,
                construction_duration_months: 30,
            };
        }
        let book = StaticPriceBook::default();
        let output = run_portfolio_model(&input, &book).unwrap();

        for asset in &output.result.assets {
            let outlay_years = asset.equity_cash_flows.len() - asset.cashflows.len();
            assert_eq!(outlay_years, 3);
        }
    }

    #[test]
    fn test_invalid_window_rejected() {
        let mut input = model_input();
        input.constants.end_year = 2020;
        let book = StaticPriceBook::default();
        assert!(run_portfolio_model(&input, &book).is_err());
    }

    #[test]
    fn test_stress_scenario_reduces_revenue() {
        let input = model_input();
        let book = StaticPriceBook::default();
        let base = run_portfolio_model(&input, &book).unwrap();

        let mut stressed_input = model_input();
        stressed_input.constants.scenario = Scenario::Worst;
        let stressed = run_portfolio_model(&stressed_input, &book).unwrap();

        assert!(
            stressed.result.summary.total_revenue < base.result.summary.total_revenue,
            "worst case should cut revenue"
        );
    }
}
