pub mod cashflow;
pub mod schedule;
pub mod sizing;

pub use cashflow::{debt_basis_years, equity_cash_flow_vector, period_cashflows, PeriodCashFlow};
pub use schedule::{
    blended_target_dscr, build_amortization_schedule, build_sculpted_schedule, DebtBasisYear,
    DebtSchedule, DebtScheduleEntry,
};
pub use sizing::{construction_equity_outlays, size_debt, SizedDebt};
