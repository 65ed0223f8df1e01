use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::debt::DebtSchedule;
use crate::error::RenewFinanceError;
use crate::types::{Money, Rate, Technology};
use crate::RenewFinanceResult;

/// Straight-line depreciation period in years, by technology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepreciationPeriods {
    pub solar: u32,
    pub wind: u32,
    pub storage: u32,
}

impl Default for DepreciationPeriods {
    fn default() -> Self {
        DepreciationPeriods {
            solar: 30,
            wind: 25,
            storage: 20,
        }
    }
}

impl DepreciationPeriods {
    pub fn for_technology(&self, technology: Technology) -> u32 {
        match technology {
            Technology::Solar => self.solar,
            Technology::Wind => self.wind,
            Technology::Storage => self.storage,
        }
    }
}

/// Everything the aggregator needs to know about one asset: identity,
/// costs, sized debt and precomputed revenue series aligned to the analysis
/// window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetStatementBasis {
    pub name: String,
    pub technology: Technology,
    /// First operating calendar year
    pub start_year: i32,
    pub asset_life_years: u32,
    pub capex: Money,
    /// Year-one operating cost magnitude, $M
    pub operating_cost: Money,
    pub operating_cost_escalation_pct: Decimal,
    /// Total revenue per analysis year
    pub annual_revenue: Vec<Money>,
    /// Total revenue per analysis quarter (4 entries per analysis year)
    pub quarterly_revenue: Vec<Money>,
    pub schedule: DebtSchedule,
}

/// Platform-level statement parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementParams {
    /// First analysis year
    pub start_year: i32,
    /// Last analysis year, inclusive
    pub end_year: i32,
    /// Corporate tax rate as a decimal
    pub tax_rate: Rate,
    /// Year-one platform overhead magnitude, $M
    pub platform_opex: Money,
    pub platform_opex_escalation_pct: Decimal,
    #[serde(default)]
    pub depreciation_periods: DepreciationPeriods,
}

/// One P&L period. Expense lines (opex, depreciation, interest, tax) are
/// stored as negative magnitudes, so each subtotal is a plain sum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformPeriodStatement {
    /// "2025" for annual periods, "2025-Q3" for quarters
    pub period: String,
    pub year: i32,
    pub quarter: Option<u8>,
    pub revenue: Money,
    pub asset_opex: Money,
    pub platform_opex: Money,
    pub ebitda: Money,
    pub depreciation: Money,
    pub ebit: Money,
    pub interest: Money,
    pub principal_repayment: Money,
    pub ebt: Money,
    pub tax: Money,
    pub npat: Money,
}

/// One asset-year P&L line-up, before platform overhead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetPeriodStatement {
    pub year: i32,
    pub revenue: Money,
    pub opex: Money,
    pub ebitda: Money,
    pub depreciation: Money,
    pub ebit: Money,
    pub interest: Money,
    pub principal_repayment: Money,
    pub ebt: Money,
    pub tax: Money,
    pub npat: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetStatements {
    pub name: String,
    pub annual: Vec<AssetPeriodStatement>,
}

/// Consolidated output: per-asset annual statements plus platform annual and
/// quarterly statements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatedStatements {
    pub per_asset: Vec<AssetStatements>,
    pub annual: Vec<PlatformPeriodStatement>,
    pub quarterly: Vec<PlatformPeriodStatement>,
}

/// Consolidate per-asset P&L into platform statements.
///
/// Platform EBITDA through NPAT are recomputed top-down from the summed
/// lines rather than by adding asset-level subtotals, so platform overhead
/// is applied exactly once. Quarterly statements recompute revenue per
/// quarter and carry every other line at a quarter of the annual figure.
pub fn build_statements(
    assets: &[AssetStatementBasis],
    params: &StatementParams,
) -> RenewFinanceResult<ConsolidatedStatements> {
    validate_params(assets, params)?;

    let years: Vec<i32> = (params.start_year..=params.end_year).collect();
    let n_years = years.len();

    let mut per_asset = Vec::with_capacity(assets.len());
    for asset in assets {
        let annual = asset_annual_statements(asset, &years, params);
        per_asset.push(AssetStatements {
            name: asset.name.clone(),
            annual,
        });
    }

    // Platform annual: sum the asset lines, subtract overhead, recompute.
    let mut annual = Vec::with_capacity(n_years);
    let platform_escalation = Decimal::ONE + params.platform_opex_escalation_pct / dec!(100);
    let mut overhead = params.platform_opex;

    for (i, &year) in years.iter().enumerate() {
        if i > 0 {
            overhead *= platform_escalation;
        }

        let mut revenue = Decimal::ZERO;
        let mut asset_opex = Decimal::ZERO;
        let mut depreciation = Decimal::ZERO;
        let mut interest = Decimal::ZERO;
        let mut principal = Decimal::ZERO;

        for statements in &per_asset {
            let line = &statements.annual[i];
            revenue += line.revenue;
            asset_opex += line.opex;
            depreciation += line.depreciation;
            interest += line.interest;
            principal += line.principal_repayment;
        }

        let platform_opex = -overhead;
        let ebitda = revenue + asset_opex + platform_opex;
        let ebit = ebitda + depreciation;
        let ebt = ebit + interest;
        let tax = tax_on(ebt, params.tax_rate);
        let npat = ebt + tax;

        annual.push(PlatformPeriodStatement {
            period: year.to_string(),
            year,
            quarter: None,
            revenue,
            asset_opex,
            platform_opex,
            ebitda,
            depreciation,
            ebit,
            interest,
            principal_repayment: principal,
            ebt,
            tax,
            npat,
        });
    }

    // Platform quarterly: revenue per quarter, all other lines annual / 4.
    let quarter = dec!(4);
    let mut quarterly = Vec::with_capacity(n_years * 4);
    for (i, year_statement) in annual.iter().enumerate() {
        for q in 1..=4u8 {
            let quarter_index = i * 4 + (q - 1) as usize;
            let revenue: Money = assets
                .iter()
                .map(|a| {
                    a.quarterly_revenue
                        .get(quarter_index)
                        .copied()
                        .unwrap_or(Decimal::ZERO)
                })
                .sum();

            let asset_opex = year_statement.asset_opex / quarter;
            let platform_opex = year_statement.platform_opex / quarter;
            let depreciation = year_statement.depreciation / quarter;
            let interest = year_statement.interest / quarter;
            let principal = year_statement.principal_repayment / quarter;
            let tax = year_statement.tax / quarter;

            let ebitda = revenue + asset_opex + platform_opex;
            let ebit = ebitda + depreciation;
            let ebt = ebit + interest;
            let npat = ebt + tax;

            quarterly.push(PlatformPeriodStatement {
                period: format!("{}-Q{q}", year_statement.year),
                year: year_statement.year,
                quarter: Some(q),
                revenue,
                asset_opex,
                platform_opex,
                ebitda,
                depreciation,
                ebit,
                interest,
                principal_repayment: principal,
                ebt,
                tax,
                npat,
            });
        }
    }

    Ok(ConsolidatedStatements {
        per_asset,
        annual,
        quarterly,
    })
}

fn asset_annual_statements(
    asset: &AssetStatementBasis,
    years: &[i32],
    params: &StatementParams,
) -> Vec<AssetPeriodStatement> {
    let depreciation_years = params.depreciation_periods.for_technology(asset.technology);
    let annual_depreciation = if depreciation_years > 0 {
        asset.capex / Decimal::from(depreciation_years)
    } else {
        Decimal::ZERO
    };
    let escalation = Decimal::ONE + asset.operating_cost_escalation_pct / dec!(100);

    years
        .iter()
        .enumerate()
        .map(|(i, &year)| {
            let revenue = asset
                .annual_revenue
                .get(i)
                .copied()
                .unwrap_or(Decimal::ZERO);
            let years_operating = year - asset.start_year;
            let operating = years_operating >= 0
                && years_operating < asset.asset_life_years as i32;

            let opex = if operating {
                let mut escalated = asset.operating_cost;
                for _ in 0..years_operating {
                    escalated *= escalation;
                }
                -escalated
            } else {
                Decimal::ZERO
            };

            let depreciation = if years_operating >= 0
                && years_operating < depreciation_years as i32
            {
                -annual_depreciation
            } else {
                Decimal::ZERO
            };

            let (interest, principal) = if years_operating >= 0 {
                asset.schedule.service_in_year((years_operating + 1) as u32)
            } else {
                (Decimal::ZERO, Decimal::ZERO)
            };

            let ebitda = revenue + opex;
            let ebit = ebitda + depreciation;
            let ebt = ebit - interest;
            let tax = tax_on(ebt, params.tax_rate);
            let npat = ebt + tax;

            AssetPeriodStatement {
                year,
                revenue,
                opex,
                ebitda,
                depreciation,
                ebit,
                interest: -interest,
                principal_repayment: -principal,
                ebt,
                tax,
                npat,
            }
        })
        .collect()
}

/// Zero below the line; −EBT × rate above it.
fn tax_on(ebt: Money, tax_rate: Rate) -> Money {
    if ebt <= Decimal::ZERO {
        Decimal::ZERO
    } else {
        -ebt * tax_rate
    }
}

fn validate_params(
    assets: &[AssetStatementBasis],
    params: &StatementParams,
) -> RenewFinanceResult<()> {
    if params.end_year < params.start_year {
        return Err(RenewFinanceError::InvalidInput {
            field: "end_year".into(),
            reason: format!(
                "Analysis window is empty: {}..{}",
                params.start_year, params.end_year
            ),
        });
    }
    if params.tax_rate < Decimal::ZERO || params.tax_rate > Decimal::ONE {
        return Err(RenewFinanceError::InvalidInput {
            field: "tax_rate".into(),
            reason: format!("Tax rate must be between 0 and 1, got {}", params.tax_rate),
        });
    }

    let n_years = (params.end_year - params.start_year + 1) as usize;
    for asset in assets {
        if asset.annual_revenue.len() < n_years {
            return Err(RenewFinanceError::InsufficientData(format!(
                "Asset '{}' has {} annual revenue entries for a {}-year window",
                asset.name,
                asset.annual_revenue.len(),
                n_years
            )));
        }
        if asset.quarterly_revenue.len() < n_years * 4 {
            return Err(RenewFinanceError::InsufficientData(format!(
                "Asset '{}' has {} quarterly revenue entries for a {}-year window",
                asset.name,
                asset.quarterly_revenue.len(),
                n_years
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debt::{build_amortization_schedule, DebtBasisYear};
    use pretty_assertions::assert_eq;

    fn flat_revenue_basis(name: &str, revenue: Decimal, debt: Decimal) -> AssetStatementBasis {
        let years = 10usize;
        let basis: Vec<DebtBasisYear> = (0..years)
            .map(|_| DebtBasisYear {
                contracted_revenue: revenue,
                merchant_revenue: Decimal::ZERO,
                opex: dec!(3),
                operating_cash_flow: revenue - dec!(3),
            })
            .collect();
        let schedule = build_amortization_schedule(debt, dec!(0.06), years as u32, &basis);

        AssetStatementBasis {
            name: name.into(),
            technology: Technology::Solar,
            start_year: 2025,
            asset_life_years: 30,
            capex: dec!(90),
            operating_cost: dec!(3),
            operating_cost_escalation_pct: Decimal::ZERO,
            annual_revenue: vec![revenue; years],
            quarterly_revenue: vec![revenue / dec!(4); years * 4],
            schedule,
        }
    }

    fn params() -> StatementParams {
        StatementParams {
            start_year: 2025,
            end_year: 2034,
            tax_rate: dec!(0.30),
            platform_opex: dec!(1),
            platform_opex_escalation_pct: Decimal::ZERO,
            depreciation_periods: DepreciationPeriods::default(),
        }
    }

    #[test]
    fn test_asset_statement_lines() {
        let asset = flat_revenue_basis("Sunfield", dec!(15), Decimal::ZERO);
        let out = build_statements(&[asset], &params()).unwrap();
        let line = &out.per_asset[0].annual[0];

        assert_eq!(line.revenue, dec!(15));
        assert_eq!(line.opex, dec!(-3));
        assert_eq!(line.ebitda, dec!(12));
        // Solar depreciates over 30 years: 90/30 = 3
        assert_eq!(line.depreciation, dec!(-3));
        assert_eq!(line.ebit, dec!(9));
        assert_eq!(line.ebt, dec!(9));
        assert_eq!(line.tax, dec!(-2.70));
        assert_eq!(line.npat, dec!(6.30));
    }

    #[test]
    fn test_platform_recomputes_top_down() {
        let a = flat_revenue_basis("A", dec!(15), Decimal::ZERO);
        let b = flat_revenue_basis("B", dec!(10), Decimal::ZERO);
        let out = build_statements(&[a, b], &params()).unwrap();
        let line = &out.annual[0];

        assert_eq!(line.revenue, dec!(25));
        assert_eq!(line.asset_opex, dec!(-6));
        assert_eq!(line.platform_opex, dec!(-1));
        assert_eq!(line.ebitda, dec!(18));
        // Platform tax applies after overhead; it is not the sum of asset taxes
        let summed_asset_tax: Decimal = out
            .per_asset
            .iter()
            .map(|a| a.annual[0].tax)
            .sum();
        assert!(line.tax.abs() < summed_asset_tax.abs());
    }

    #[test]
    fn test_interest_flows_from_schedule() {
        let asset = flat_revenue_basis("Levered", dec!(15), dec!(50));
        let out = build_statements(&[asset.clone()], &params()).unwrap();
        let line = &out.per_asset[0].annual[0];

        let entry = &asset.schedule.entries[0];
        assert_eq!(line.interest, -entry.interest);
        assert_eq!(line.principal_repayment, -entry.principal);
        assert_eq!(line.ebt, line.ebit - entry.interest);
    }

    #[test]
    fn test_no_tax_when_loss_making() {
        let mut asset = flat_revenue_basis("Marginal", dec!(4), dec!(50));
        asset.operating_cost = dec!(3);
        let out = build_statements(&[asset], &params()).unwrap();
        let line = &out.per_asset[0].annual[0];

        // Revenue 4, opex -3, depreciation -3, interest -3: EBT < 0
        assert!(line.ebt < Decimal::ZERO);
        assert_eq!(line.tax, Decimal::ZERO);
        assert_eq!(line.npat, line.ebt);
    }

    #[test]
    fn test_pre_operational_year_is_empty() {
        let mut asset = flat_revenue_basis("Late", dec!(15), Decimal::ZERO);
        asset.start_year = 2027;
        asset.annual_revenue = vec![Decimal::ZERO, Decimal::ZERO]
            .into_iter()
            .chain(std::iter::repeat(dec!(15)).take(8))
            .collect();
        let out = build_statements(&[asset], &params()).unwrap();
        let line = &out.per_asset[0].annual[0];

        assert_eq!(line.revenue, Decimal::ZERO);
        assert_eq!(line.opex, Decimal::ZERO);
        assert_eq!(line.depreciation, Decimal::ZERO);
        assert_eq!(line.interest, Decimal::ZERO);
    }

    #[test]
    fn test_opex_escalates_from_start_year() {
        let mut asset = flat_revenue_basis("Escalating", dec!(15), Decimal::ZERO);
        asset.operating_cost_escalation_pct = dec!(2);
        let out = build_statements(&[asset], &params()).unwrap();
        let lines = &out.per_asset[0].annual;

        assert_eq!(lines[0].opex, dec!(-3));
        assert_eq!(lines[1].opex, dec!(-3.06));
    }

    #[test]
    fn test_platform_opex_escalates() {
        let asset = flat_revenue_basis("A", dec!(15), Decimal::ZERO);
        let mut p = params();
        p.platform_opex_escalation_pct = dec!(3);
        let out = build_statements(&[asset], &p).unwrap();

        assert_eq!(out.annual[0].platform_opex, dec!(-1));
        assert_eq!(out.annual[1].platform_opex, dec!(-1.03));
    }

    #[test]
    fn test_quarterly_revenue_independent_other_lines_quartered() {
        let mut asset = flat_revenue_basis("Seasonal", dec!(16), Decimal::ZERO);
        // Uneven quarters that still sum to the annual figure
        let mut quarterly = Vec::new();
        for _ in 0..10 {
            quarterly.extend_from_slice(&[dec!(6), dec!(2), dec!(2), dec!(6)]);
        }
        asset.quarterly_revenue = quarterly;
        let out = build_statements(&[asset], &params()).unwrap();

        let q1 = &out.quarterly[0];
        let q2 = &out.quarterly[1];
        let annual = &out.annual[0];

        assert_eq!(q1.revenue, dec!(6));
        assert_eq!(q2.revenue, dec!(2));
        assert_eq!(q1.asset_opex, annual.asset_opex / dec!(4));
        assert_eq!(q1.depreciation, annual.depreciation / dec!(4));
        assert_eq!(q1.tax, annual.tax / dec!(4));
        // Subtotals still recomputed from the quarter's own revenue
        assert_eq!(q1.ebitda, q1.revenue + q1.asset_opex + q1.platform_opex);
        assert!(q1.ebitda != q2.ebitda);
    }

    #[test]
    fn test_quarterly_count() {
        let asset = flat_revenue_basis("A", dec!(15), Decimal::ZERO);
        let out = build_statements(&[asset], &params()).unwrap();
        assert_eq!(out.annual.len(), 10);
        assert_eq!(out.quarterly.len(), 40);
        assert_eq!(out.quarterly[4].period, "2026-Q1");
    }

    #[test]
    fn test_interest_stops_after_tenor() {
        let mut asset = flat_revenue_basis("ShortDebt", dec!(15), dec!(20));
        let basis: Vec<DebtBasisYear> = (0..5)
            .map(|_| DebtBasisYear {
                contracted_revenue: dec!(15),
                merchant_revenue: Decimal::ZERO,
                opex: dec!(3),
                operating_cash_flow: dec!(12),
            })
            .collect();
        asset.schedule = build_amortization_schedule(dec!(20), dec!(0.06), 5, &basis);
        let out = build_statements(&[asset], &params()).unwrap();
        let lines = &out.per_asset[0].annual;

        assert!(lines[4].interest < Decimal::ZERO);
        assert_eq!(lines[5].interest, Decimal::ZERO);
        assert_eq!(lines[5].principal_repayment, Decimal::ZERO);
    }

    #[test]
    fn test_empty_window_rejected() {
        let asset = flat_revenue_basis("A", dec!(15), Decimal::ZERO);
        let mut p = params();
        p.end_year = 2024;
        assert!(build_statements(&[asset], &p).is_err());
    }

    #[test]
    fn test_short_revenue_series_rejected() {
        let mut asset = flat_revenue_basis("A", dec!(15), Decimal::ZERO);
        asset.annual_revenue.truncate(3);
        assert!(build_statements(&[asset], &params()).is_err());
    }
}
