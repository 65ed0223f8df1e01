use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::RenewFinanceError;
use crate::types::{Money, Rate};
use crate::RenewFinanceResult;

const IRR_TOLERANCE: Decimal = dec!(0.000001);
const MAX_IRR_ITERATIONS: u32 = 1000;
/// Realistic band for an equity IRR; a Newton step leaving it means the
/// search has diverged.
const IRR_MIN_RATE: Decimal = dec!(-0.99);
const IRR_MAX_RATE: Decimal = dec!(5.0);

pub const DEFAULT_IRR_GUESS: Decimal = dec!(0.10);

/// Net Present Value of a series of cash flows
pub fn npv(rate: Rate, cash_flows: &[Money]) -> RenewFinanceResult<Money> {
    if rate <= dec!(-1) {
        return Err(RenewFinanceError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount *= one_plus_r;
        }
        if discount.is_zero() {
            return Err(RenewFinanceError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        result += cf / discount;
    }

    Ok(result)
}

/// Internal Rate of Return of an equity cash-flow vector, via
/// Newton-Raphson on NPV(r) = Σ cf[j] / (1+r)^j.
///
/// Returns None when no meaningful IRR exists: fewer than two flows, a
/// non-negative initial flow, no positive inflow, a stationary derivative,
/// or a step that leaves the realistic rate band. There is no bisection
/// fallback; an unconverged search is reported as None, never guessed.
pub fn solve_irr(cash_flows: &[Money], guess: Rate) -> Option<Rate> {
    if cash_flows.len() < 2 {
        return None;
    }
    if cash_flows[0] >= Decimal::ZERO {
        return None;
    }
    if !cash_flows[1..].iter().any(|cf| *cf > Decimal::ZERO) {
        return None;
    }

    let mut rate = guess;

    for _ in 0..MAX_IRR_ITERATIONS {
        let mut npv_val = Decimal::ZERO;
        let mut dnpv = Decimal::ZERO;
        let one_plus_r = Decimal::ONE + rate;

        let mut discount = Decimal::ONE;
        for (t, cf) in cash_flows.iter().enumerate() {
            if t > 0 {
                discount *= one_plus_r;
            }
            if discount.is_zero() {
                break;
            }
            npv_val += cf / discount;
            if t > 0 {
                let t_dec = Decimal::from(t as i64);
                dnpv -= t_dec * cf / (discount * one_plus_r);
            }
        }

        if npv_val.abs() < IRR_TOLERANCE {
            return Some(rate);
        }

        if dnpv.abs() < IRR_TOLERANCE {
            return None;
        }

        rate -= npv_val / dnpv;

        if rate <= IRR_MIN_RATE || rate >= IRR_MAX_RATE {
            return None;
        }
    }

    None
}

/// Constant annuity payment for a loan: P·r·(1+r)^n / ((1+r)^n − 1),
/// or P/n when the rate is zero. Compounding via iterative multiplication.
pub fn annuity_payment(principal: Money, rate: Rate, periods: u32) -> Money {
    if principal <= Decimal::ZERO || periods == 0 {
        return Decimal::ZERO;
    }
    if rate.is_zero() {
        return principal / Decimal::from(periods);
    }

    let one_plus_r = Decimal::ONE + rate;
    let mut compound = Decimal::ONE;
    for _ in 0..periods {
        compound *= one_plus_r;
    }

    if compound == Decimal::ONE {
        return principal / Decimal::from(periods);
    }

    principal * rate * compound / (compound - Decimal::ONE)
}
