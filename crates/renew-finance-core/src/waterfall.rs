use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::statements::PlatformPeriodStatement;
use crate::types::Money;

/// One period of the cash-flow statement. Outflow lines are negative;
/// `cash_balance` and `retained_earnings` are running state threaded from
/// the prior record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowStatementRecord {
    pub period: String,
    /// = EBITDA
    pub operating_cash_flow: Money,
    pub tax_payment: Money,
    pub interest_payment: Money,
    pub principal_payment: Money,
    pub total_debt_service: Money,
    pub fcfe: Money,
    pub dividend_payment: Money,
    pub net_cash_flow: Money,
    pub cash_balance: Money,
    pub retained_earnings: Money,
}

/// Run the dividend waterfall over a platform statement series.
///
/// Dividends are paid only out of positive NPAT and only down to the
/// minimum cash balance, so the cash floor holds by construction. The
/// opening state is cash = minimum balance, retained earnings = 0.
pub fn run_waterfall(
    statements: &[PlatformPeriodStatement],
    dividend_policy_pct: Decimal,
    minimum_cash_balance: Money,
) -> Vec<CashFlowStatementRecord> {
    let mut cash_balance = minimum_cash_balance;
    let mut retained_earnings = Decimal::ZERO;
    let mut records = Vec::with_capacity(statements.len());

    for statement in statements {
        let operating_cash_flow = statement.ebitda;
        // Tax, interest and principal are already negative, so adding them
        // subtracts the outflows.
        let fcfe = operating_cash_flow
            + statement.tax
            + statement.interest
            + statement.principal_repayment;
        let potential_cash_balance = cash_balance + fcfe;

        let dividend = if statement.npat > Decimal::ZERO
            && potential_cash_balance > minimum_cash_balance
        {
            let policy_amount = statement.npat * dividend_policy_pct / dec!(100);
            let headroom = potential_cash_balance - minimum_cash_balance;
            policy_amount.min(headroom).max(Decimal::ZERO)
        } else {
            Decimal::ZERO
        };

        cash_balance = potential_cash_balance - dividend;
        retained_earnings += statement.npat - dividend;

        records.push(CashFlowStatementRecord {
            period: statement.period.clone(),
            operating_cash_flow,
            tax_payment: statement.tax,
            interest_payment: statement.interest,
            principal_payment: statement.principal_repayment,
            total_debt_service: statement.interest + statement.principal_repayment,
            fcfe,
            dividend_payment: -dividend,
            net_cash_flow: fcfe - dividend,
            cash_balance,
            retained_earnings,
        });
    }

    records
}

/// Quarterly waterfall: the same rule with the dividend rate quartered.
pub fn run_quarterly_waterfall(
    statements: &[PlatformPeriodStatement],
    dividend_policy_pct: Decimal,
    minimum_cash_balance: Money,
) -> Vec<CashFlowStatementRecord> {
    run_waterfall(statements, dividend_policy_pct / dec!(4), minimum_cash_balance)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement(period: &str, ebitda: Decimal, npat: Decimal) -> PlatformPeriodStatement {
        PlatformPeriodStatement {
            period: period.into(),
            year: 2025,
            quarter: None,
            revenue: ebitda + dec!(3),
            asset_opex: dec!(-2),
            platform_opex: dec!(-1),
            ebitda,
            depreciation: Decimal::ZERO,
            ebit: ebitda,
            interest: Decimal::ZERO,
            principal_repayment: Decimal::ZERO,
            ebt: npat,
            tax: Decimal::ZERO,
            npat,
        }
    }

    fn levered_statement(
        period: &str,
        ebitda: Decimal,
        interest: Decimal,
        principal: Decimal,
        tax: Decimal,
        npat: Decimal,
    ) -> PlatformPeriodStatement {
        PlatformPeriodStatement {
            interest: -interest,
            principal_repayment: -principal,
            tax: -tax,
            npat,
            ..statement(period, ebitda, npat)
        }
    }

    #[test]
    fn test_fcfe_subtracts_outflows() {
        let statements = vec![levered_statement("2025", dec!(12), dec!(3), dec!(2), dec!(1), dec!(5))];
        let records = run_waterfall(&statements, Decimal::ZERO, dec!(5));

        assert_eq!(records[0].operating_cash_flow, dec!(12));
        assert_eq!(records[0].fcfe, dec!(6));
        assert_eq!(records[0].total_debt_service, dec!(-5));
    }

    #[test]
    fn test_dividend_follows_policy_when_unconstrained() {
        let statements = vec![statement("2025", dec!(12), dec!(8))];
        let records = run_waterfall(&statements, dec!(50), dec!(5));

        // 50% of NPAT 8 = 4; potential cash 5+12=17 leaves plenty of headroom
        assert_eq!(records[0].dividend_payment, dec!(-4));
        assert_eq!(records[0].cash_balance, dec!(13));
        assert_eq!(records[0].retained_earnings, dec!(4));
        assert_eq!(records[0].net_cash_flow, dec!(8));
    }

    #[test]
    fn test_no_dividend_on_negative_npat() {
        let statements = vec![statement("2025", dec!(12), dec!(-2))];
        let records = run_waterfall(&statements, dec!(50), dec!(5));

        assert_eq!(records[0].dividend_payment, Decimal::ZERO);
        assert_eq!(records[0].retained_earnings, dec!(-2));
    }

    #[test]
    fn test_dividend_capped_by_cash_headroom() {
        // FCFE of 1 on a full policy payout: headroom caps the dividend
        let statements = vec![statement("2025", dec!(1), dec!(10))];
        let records = run_waterfall(&statements, dec!(100), dec!(5));

        // Potential cash 5 + 1 = 6; headroom over the floor is 1, not 10
        assert_eq!(records[0].dividend_payment, dec!(-1));
        assert_eq!(records[0].cash_balance, dec!(5));
    }

    #[test]
    fn test_cash_floor_never_breached_by_dividends() {
        let statements: Vec<PlatformPeriodStatement> = (0..20)
            .map(|i| {
                let ebitda = if i % 3 == 0 { dec!(0.5) } else { dec!(6) };
                let npat = ebitda - dec!(1);
                statement(&format!("{}", 2025 + i), ebitda, npat)
            })
            .collect();
        let minimum = dec!(5);
        let records = run_waterfall(&statements, dec!(80), minimum);

        for record in &records {
            if record.dividend_payment < Decimal::ZERO {
                assert!(
                    record.cash_balance >= minimum,
                    "{}: dividend pushed cash to {}",
                    record.period,
                    record.cash_balance
                );
            }
        }
    }

    #[test]
    fn test_cash_can_fall_below_floor_without_dividends() {
        // Negative FCFE erodes cash; the floor binds dividends only
        let statements = vec![
            levered_statement("2025", dec!(2), dec!(3), dec!(2), Decimal::ZERO, dec!(-3)),
        ];
        let records = run_waterfall(&statements, dec!(50), dec!(5));

        assert_eq!(records[0].cash_balance, dec!(2));
        assert_eq!(records[0].dividend_payment, Decimal::ZERO);
    }

    #[test]
    fn test_state_threads_across_periods() {
        let statements = vec![
            statement("2025", dec!(10), dec!(6)),
            statement("2026", dec!(10), dec!(6)),
        ];
        let records = run_waterfall(&statements, dec!(50), dec!(5));

        // Year 1: cash 5+10-3 = 12; year 2 opens from 12
        assert_eq!(records[0].cash_balance, dec!(12));
        assert_eq!(records[1].cash_balance, dec!(19));
        assert_eq!(records[1].retained_earnings, dec!(6));
    }

    #[test]
    fn test_zero_policy_retains_everything() {
        let statements = vec![statement("2025", dec!(10), dec!(6))];
        let records = run_waterfall(&statements, Decimal::ZERO, dec!(5));

        assert_eq!(records[0].dividend_payment, Decimal::ZERO);
        assert_eq!(records[0].retained_earnings, dec!(6));
        assert_eq!(records[0].net_cash_flow, records[0].fcfe);
    }

    #[test]
    fn test_quarterly_rate_is_quartered() {
        let statements = vec![statement("2025-Q1", dec!(12), dec!(8))];
        let annual = run_waterfall(&statements, dec!(50), dec!(5));
        let quarterly = run_quarterly_waterfall(&statements, dec!(50), dec!(5));

        assert_eq!(annual[0].dividend_payment, dec!(-4));
        assert_eq!(quarterly[0].dividend_payment, dec!(-1));
    }
}
