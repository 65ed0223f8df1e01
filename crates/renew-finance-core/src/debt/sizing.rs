use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::debt::schedule::{
    build_amortization_schedule, build_sculpted_schedule, DebtBasisYear, DebtSchedule,
};
use crate::error::RenewFinanceError;
use crate::types::{DebtParams, DebtStructure, EquityTiming, Money, Rate};
use crate::RenewFinanceResult;

/// Iteration cap on the debt-sizing binary search. Explicit rather than
/// convergence-only, so the loop is auditable and testable.
const MAX_SIZING_ITERATIONS: u32 = 50;
/// Bound width at which the search stops, $M.
const SIZING_TOLERANCE: Decimal = dec!(0.0001);

/// A sized facility: the drawn amount, the achieved gearing and the full
/// repayment schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizedDebt {
    pub debt_amount: Money,
    pub gearing: Rate,
    pub schedule: DebtSchedule,
}

impl SizedDebt {
    pub fn unlevered() -> SizedDebt {
        SizedDebt {
            debt_amount: Decimal::ZERO,
            gearing: Decimal::ZERO,
            schedule: DebtSchedule::unlevered(),
        }
    }
}

/// Size project debt for one asset against its pre-debt cash flows.
///
/// Amortization keeps gearing fixed at the maximum; sculpting solves for the
/// largest debt whose DSCR-constrained schedule still fully repays within
/// the tenor.
pub fn size_debt(
    capex: Money,
    basis: &[DebtBasisYear],
    params: &DebtParams,
) -> RenewFinanceResult<SizedDebt> {
    if capex <= Decimal::ZERO {
        return Err(RenewFinanceError::InvalidInput {
            field: "capex".into(),
            reason: "Capex must be positive to size debt".into(),
        });
    }
    if params.max_gearing < Decimal::ZERO || params.max_gearing > Decimal::ONE {
        return Err(RenewFinanceError::InvalidInput {
            field: "max_gearing".into(),
            reason: format!("Gearing must be between 0 and 1, got {}", params.max_gearing),
        });
    }
    if params.interest_rate < Decimal::ZERO {
        return Err(RenewFinanceError::InvalidInput {
            field: "interest_rate".into(),
            reason: "Interest rate cannot be negative".into(),
        });
    }

    match params.structure {
        DebtStructure::Amortization => {
            let debt_amount = capex * params.max_gearing;
            let schedule = build_amortization_schedule(
                debt_amount,
                params.interest_rate,
                params.tenor_years,
                basis,
            );
            Ok(SizedDebt {
                debt_amount,
                gearing: params.max_gearing,
                schedule,
            })
        }
        DebtStructure::Sculpting => Ok(solve_maximum_debt(capex, basis, params)),
    }
}

/// Binary search for the maximum sculpted debt that still fully repays.
///
/// Feasibility is monotone in the drawn amount (more debt is strictly harder
/// to repay under a fixed DSCR ceiling), so a feasible midpoint raises the
/// lower bound and an infeasible one lowers the upper bound. No feasible
/// midpoint at all degrades to zero debt.
fn solve_maximum_debt(capex: Money, basis: &[DebtBasisYear], params: &DebtParams) -> SizedDebt {
    let mut lower_bound = Decimal::ZERO;
    let mut upper_bound = capex * params.max_gearing;
    let mut best: Option<(Money, DebtSchedule)> = None;

    for _ in 0..MAX_SIZING_ITERATIONS {
        if upper_bound - lower_bound < SIZING_TOLERANCE {
            break;
        }

        let midpoint = (lower_bound + upper_bound) / dec!(2);
        let schedule = build_sculpted_schedule(
            midpoint,
            params.interest_rate,
            params.tenor_years,
            basis,
            params.target_dscr_contract,
            params.target_dscr_merchant,
        );

        if schedule.fully_repaid {
            best = Some((midpoint, schedule));
            lower_bound = midpoint;
        } else {
            upper_bound = midpoint;
        }
    }

    match best {
        Some((debt_amount, schedule)) => SizedDebt {
            debt_amount,
            gearing: if capex > Decimal::ZERO {
                debt_amount / capex
            } else {
                Decimal::ZERO
            },
            schedule,
        },
        None => SizedDebt::unlevered(),
    }
}

/// Construction-phase equity outlays: the leading (negative) entries of the
/// equity cash-flow vector. Either the full amount at period 0, or spread
/// evenly over ceil(months/12) years before operations begin.
pub fn construction_equity_outlays(equity: Money, timing: &EquityTiming) -> Vec<Money> {
    if equity <= Decimal::ZERO {
        return vec![Decimal::ZERO];
    }
    if timing.upfront || timing.construction_duration_months == 0 {
        return vec![-equity];
    }

    let years = timing.construction_duration_months.div_ceil(12);
    let per_year = equity / Decimal::from(years);
    vec![-per_year; years as usize]
}
