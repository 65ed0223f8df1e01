use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::time_value::annuity_payment;
use crate::types::{Money, Rate};

/// Closing balance within this of zero counts as fully repaid, $M.
pub const REPAYMENT_TOLERANCE: Decimal = dec!(0.001);

/// One year of the pre-debt cash-flow basis a schedule is built against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtBasisYear {
    /// Contracted revenue, $M
    pub contracted_revenue: Money,
    /// Merchant revenue, $M
    pub merchant_revenue: Money,
    /// Operating cost magnitude, $M
    pub opex: Money,
    /// CFADS: revenue − opex, plus terminal value in the final year
    pub operating_cash_flow: Money,
}

impl DebtBasisYear {
    pub fn total_revenue(&self) -> Money {
        self.contracted_revenue + self.merchant_revenue
    }
}

/// One tenor year of a debt schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtScheduleEntry {
    /// Tenor year, 1-based
    pub year: u32,
    pub opening_balance: Money,
    pub interest: Money,
    pub principal: Money,
    pub debt_service: Money,
    pub closing_balance: Money,
    /// None when no debt service falls due in the year
    pub dscr: Option<Decimal>,
}

/// A full repayment schedule. `entries[0].opening_balance` is the drawn
/// amount; a valid schedule ends with a closing balance within
/// `REPAYMENT_TOLERANCE` of zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtSchedule {
    pub entries: Vec<DebtScheduleEntry>,
    pub fully_repaid: bool,
    pub avg_debt_service: Money,
    pub min_dscr: Option<Decimal>,
}

impl DebtSchedule {
    /// The empty schedule of a zero-debt (all-equity) asset.
    pub fn unlevered() -> DebtSchedule {
        DebtSchedule {
            entries: Vec::new(),
            fully_repaid: true,
            avg_debt_service: Decimal::ZERO,
            min_dscr: None,
        }
    }

    pub fn closing_balance(&self) -> Money {
        self.entries
            .last()
            .map(|e| e.closing_balance)
            .unwrap_or(Decimal::ZERO)
    }

    /// Interest and principal for a given tenor year (1-based); zero after
    /// the tenor ends.
    pub fn service_in_year(&self, year: u32) -> (Money, Money) {
        match self.entries.iter().find(|e| e.year == year) {
            Some(entry) => (entry.interest, entry.principal),
            None => (Decimal::ZERO, Decimal::ZERO),
        }
    }

    fn finalize(entries: Vec<DebtScheduleEntry>, debt_amount: Money) -> DebtSchedule {
        let closing = entries
            .last()
            .map(|e| e.closing_balance)
            .unwrap_or(debt_amount);
        let fully_repaid = closing.abs() <= REPAYMENT_TOLERANCE;

        let avg_debt_service = if entries.is_empty() {
            Decimal::ZERO
        } else {
            let total: Decimal = entries.iter().map(|e| e.debt_service).sum();
            total / Decimal::from(entries.len() as i64)
        };

        let min_dscr = entries
            .iter()
            .filter_map(|e| e.dscr)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        DebtSchedule {
            entries,
            fully_repaid,
            avg_debt_service,
            min_dscr,
        }
    }
}

/// Level-payment amortizing loan. Annual payment P·r·(1+r)^n/((1+r)^n − 1),
/// P/n at a zero rate. Truncates to the available cash-flow history when it
/// is shorter than the tenor.
pub fn build_amortization_schedule(
    debt_amount: Money,
    rate: Rate,
    tenor_years: u32,
    basis: &[DebtBasisYear],
) -> DebtSchedule {
    let tenor = effective_tenor(tenor_years, basis.len());
    if tenor == 0 || debt_amount <= Decimal::ZERO {
        return DebtSchedule::finalize(Vec::new(), debt_amount.max(Decimal::ZERO));
    }

    let payment = annuity_payment(debt_amount, rate, tenor);
    let mut entries = Vec::with_capacity(tenor as usize);
    let mut balance = debt_amount;

    for year in 1..=tenor {
        let interest = balance * rate;
        let principal = (payment - interest).max(Decimal::ZERO).min(balance);
        let debt_service = interest + principal;
        let closing = balance - principal;

        let ocf = basis[(year - 1) as usize].operating_cash_flow;
        let dscr = if debt_service > Decimal::ZERO {
            Some(ocf / debt_service)
        } else {
            None
        };

        entries.push(DebtScheduleEntry {
            year,
            opening_balance: balance,
            interest,
            principal,
            debt_service,
            closing_balance: closing,
            dscr,
        });
        balance = closing;
    }

    DebtSchedule::finalize(entries, debt_amount)
}

/// DSCR-sculpted schedule. Each year the permitted debt service is
/// CFADS / target, where the target blends the contracted and merchant DSCR
/// targets by that year's revenue mix; principal is whatever headroom
/// remains after interest, clamped to [0, opening balance]. Debt service
/// therefore never exceeds the DSCR ceiling and never over-repays.
pub fn build_sculpted_schedule(
    debt_amount: Money,
    rate: Rate,
    tenor_years: u32,
    basis: &[DebtBasisYear],
    target_dscr_contract: Decimal,
    target_dscr_merchant: Decimal,
) -> DebtSchedule {
    let tenor = effective_tenor(tenor_years, basis.len());
    if tenor == 0 || debt_amount <= Decimal::ZERO {
        return DebtSchedule::finalize(Vec::new(), debt_amount.max(Decimal::ZERO));
    }

    let mut entries = Vec::with_capacity(tenor as usize);
    let mut balance = debt_amount;

    for year in 1..=tenor {
        let year_basis = &basis[(year - 1) as usize];
        let interest = balance * rate;

        let target = blended_target_dscr(
            year_basis.contracted_revenue,
            year_basis.merchant_revenue,
            target_dscr_contract,
            target_dscr_merchant,
        );
        let max_debt_service = if target > Decimal::ZERO {
            year_basis.operating_cash_flow / target
        } else {
            year_basis.operating_cash_flow
        };

        let principal = (max_debt_service - interest)
            .max(Decimal::ZERO)
            .min(balance);
        let debt_service = interest + principal;
        let closing = balance - principal;

        let dscr = if debt_service > Decimal::ZERO {
            Some(year_basis.operating_cash_flow / debt_service)
        } else {
            None
        };

        entries.push(DebtScheduleEntry {
            year,
            opening_balance: balance,
            interest,
            principal,
            debt_service,
            closing_balance: closing,
            dscr,
        });
        balance = closing;
    }

    DebtSchedule::finalize(entries, debt_amount)
}

/// Revenue-mix-weighted DSCR target. Zero total revenue defaults to the
/// merchant target.
pub fn blended_target_dscr(
    contracted_revenue: Money,
    merchant_revenue: Money,
    target_contract: Decimal,
    target_merchant: Decimal,
) -> Decimal {
    let total = contracted_revenue + merchant_revenue;
    if total <= Decimal::ZERO {
        return target_merchant;
    }
    (contracted_revenue / total) * target_contract + (merchant_revenue / total) * target_merchant
}

fn effective_tenor(tenor_years: u32, available_periods: usize) -> u32 {
    tenor_years.min(available_periods as u32)
}
