use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::debt::schedule::{DebtBasisYear, DebtSchedule};
use crate::types::{Money, RevenueBreakdown};

/// One operating year of an asset's cash-flow history. The sequence is
/// append-only and strictly chronological: each year's opening debt balance
/// is the prior year's closing balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodCashFlow {
    pub year: i32,
    pub contracted_revenue: Money,
    pub merchant_revenue: Money,
    /// Operating cost magnitude, $M
    pub opex: Money,
    /// Revenue − opex, plus terminal value in the final year
    pub operating_cash_flow: Money,
    pub debt_service: Money,
    pub equity_cash_flow: Money,
    pub dscr: Option<Decimal>,
}

/// Build the pre-debt sizing basis from per-year revenue breakdowns. Opex
/// escalates annually from its year-one figure; the terminal value lands in
/// the final year's cash flow.
pub fn debt_basis_years(
    breakdowns: &[RevenueBreakdown],
    operating_cost: Money,
    escalation_pct: Decimal,
    terminal_value: Money,
) -> Vec<DebtBasisYear> {
    let escalation = Decimal::ONE + escalation_pct / Decimal::from(100);
    let mut opex = operating_cost;
    let last = breakdowns.len().saturating_sub(1);

    breakdowns
        .iter()
        .enumerate()
        .map(|(i, breakdown)| {
            if i > 0 {
                opex *= escalation;
            }
            let mut operating_cash_flow = breakdown.total() - opex;
            if i == last {
                operating_cash_flow += terminal_value;
            }
            DebtBasisYear {
                contracted_revenue: breakdown.contracted(),
                merchant_revenue: breakdown.merchant(),
                opex,
                operating_cash_flow,
            }
        })
        .collect()
}

/// Merge the sizing basis with a sized schedule into the asset's operating
/// cash-flow history.
pub fn period_cashflows(
    start_year: i32,
    basis: &[DebtBasisYear],
    schedule: &DebtSchedule,
) -> Vec<PeriodCashFlow> {
    basis
        .iter()
        .enumerate()
        .map(|(i, year_basis)| {
            let (interest, principal) = schedule.service_in_year((i + 1) as u32);
            let debt_service = interest + principal;
            let dscr = if debt_service > Decimal::ZERO {
                Some(year_basis.operating_cash_flow / debt_service)
            } else {
                None
            };
            PeriodCashFlow {
                year: start_year + i as i32,
                contracted_revenue: year_basis.contracted_revenue,
                merchant_revenue: year_basis.merchant_revenue,
                opex: year_basis.opex,
                operating_cash_flow: year_basis.operating_cash_flow,
                debt_service,
                equity_cash_flow: year_basis.operating_cash_flow - debt_service,
                dscr,
            }
        })
        .collect()
}

/// Assemble the equity cash-flow vector: construction outlays first, then
/// one entry per operating period. Feeds the IRR solver directly.
pub fn equity_cash_flow_vector(
    construction_outlays: &[Money],
    cashflows: &[PeriodCashFlow],
) -> Vec<Money> {
    construction_outlays
        .iter()
        .copied()
        .chain(cashflows.iter().map(|cf| cf.equity_cash_flow))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debt::schedule::build_amortization_schedule;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn breakdowns(years: usize) -> Vec<RevenueBreakdown> {
        (0..years)
            .map(|_| RevenueBreakdown {
                contracted_green: dec!(6),
                contracted_energy: dec!(4),
                merchant_green: dec!(2),
                merchant_energy: dec!(3),
                volume_mwh: dec!(250000),
            })
            .collect()
    }

    #[test]
    fn test_basis_opex_escalates() {
        let basis = debt_basis_years(&breakdowns(3), dec!(3), dec!(2), Decimal::ZERO);
        assert_eq!(basis[0].opex, dec!(3));
        assert_eq!(basis[1].opex, dec!(3.06));
        assert_eq!(basis[2].opex, dec!(3.06) * dec!(1.02));
    }

    #[test]
    fn test_basis_revenue_split() {
        let basis = debt_basis_years(&breakdowns(2), dec!(3), Decimal::ZERO, Decimal::ZERO);
        assert_eq!(basis[0].contracted_revenue, dec!(10));
        assert_eq!(basis[0].merchant_revenue, dec!(5));
        assert_eq!(basis[0].operating_cash_flow, dec!(12));
    }

    #[test]
    fn test_terminal_value_lands_in_final_year() {
        let basis = debt_basis_years(&breakdowns(3), dec!(3), Decimal::ZERO, dec!(20));
        assert_eq!(basis[0].operating_cash_flow, dec!(12));
        assert_eq!(basis[1].operating_cash_flow, dec!(12));
        assert_eq!(basis[2].operating_cash_flow, dec!(32));
    }

    #[test]
    fn test_period_cashflows_thread_debt_service() {
        let basis = debt_basis_years(&breakdowns(10), dec!(3), Decimal::ZERO, Decimal::ZERO);
        let schedule = build_amortization_schedule(dec!(40), dec!(0.06), 10, &basis);
        let cashflows = period_cashflows(2025, &basis, &schedule);

        assert_eq!(cashflows.len(), 10);
        assert_eq!(cashflows[0].year, 2025);
        assert_eq!(cashflows[9].year, 2034);
        for (cf, entry) in cashflows.iter().zip(schedule.entries.iter()) {
            assert_eq!(cf.debt_service, entry.debt_service);
            assert_eq!(cf.equity_cash_flow, cf.operating_cash_flow - cf.debt_service);
        }
    }

    #[test]
    fn test_equity_flows_after_tenor_are_unlevered() {
        let basis = debt_basis_years(&breakdowns(12), dec!(3), Decimal::ZERO, Decimal::ZERO);
        let schedule = build_amortization_schedule(dec!(40), dec!(0.06), 10, &basis);
        let cashflows = period_cashflows(2025, &basis, &schedule);

        assert_eq!(cashflows[10].debt_service, Decimal::ZERO);
        assert_eq!(cashflows[10].equity_cash_flow, cashflows[10].operating_cash_flow);
        assert_eq!(cashflows[10].dscr, None);
    }

    #[test]
    fn test_equity_vector_leads_with_outlays() {
        let basis = debt_basis_years(&breakdowns(3), dec!(3), Decimal::ZERO, Decimal::ZERO);
        let schedule = DebtSchedule::unlevered();
        let cashflows = period_cashflows(2025, &basis, &schedule);
        let vector = equity_cash_flow_vector(&[dec!(-20), dec!(-20)], &cashflows);

        assert_eq!(vector.len(), 5);
        assert_eq!(vector[0], dec!(-20));
        assert_eq!(vector[1], dec!(-20));
        assert_eq!(vector[2], dec!(12));
    }
}
