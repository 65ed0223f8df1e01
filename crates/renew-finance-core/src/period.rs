use std::fmt;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::RenewFinanceError;
use crate::RenewFinanceResult;

/// A point on the analysis timeline: a calendar year, a quarter within a
/// year, or an exact date. Price providers and the revenue engine accept any
/// of the three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKey {
    Year(i32),
    Quarter { year: i32, quarter: u8 },
    Date(NaiveDate),
}

impl PeriodKey {
    /// Parse a period key from its wire form: a 4-digit year, `"YYYY-Qn"`,
    /// or `"D/MM/YYYY"`.
    pub fn parse(s: &str) -> RenewFinanceResult<PeriodKey> {
        let trimmed = s.trim();

        if let Some((year_str, quarter_str)) = trimmed.split_once("-Q") {
            let year: i32 = year_str
                .parse()
                .map_err(|_| bad_period(trimmed, "quarter key year"))?;
            let quarter: u8 = quarter_str
                .parse()
                .map_err(|_| bad_period(trimmed, "quarter number"))?;
            if !(1..=4).contains(&quarter) {
                return Err(bad_period(trimmed, "quarter must be 1-4"));
            }
            return Ok(PeriodKey::Quarter { year, quarter });
        }

        if trimmed.contains('/') {
            let date = NaiveDate::parse_from_str(trimmed, "%d/%m/%Y")
                .map_err(|_| bad_period(trimmed, "expected D/MM/YYYY"))?;
            return Ok(PeriodKey::Date(date));
        }

        let year: i32 = trimmed
            .parse()
            .map_err(|_| bad_period(trimmed, "expected a 4-digit year"))?;
        Ok(PeriodKey::Year(year))
    }

    pub fn year(&self) -> i32 {
        match self {
            PeriodKey::Year(y) => *y,
            PeriodKey::Quarter { year, .. } => *year,
            PeriodKey::Date(d) => d.year(),
        }
    }

    pub fn quarter(&self) -> Option<u8> {
        match self {
            PeriodKey::Year(_) => None,
            PeriodKey::Quarter { quarter, .. } => Some(*quarter),
            PeriodKey::Date(d) => Some((d.month0() / 3 + 1) as u8),
        }
    }

    /// Fraction of a year this period covers. A date key stands for its
    /// containing month.
    pub fn fraction_of_year(&self) -> Decimal {
        match self {
            PeriodKey::Year(_) => Decimal::ONE,
            PeriodKey::Quarter { .. } => dec!(0.25),
            PeriodKey::Date(_) => Decimal::ONE / dec!(12),
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodKey::Year(y) => write!(f, "{y}"),
            PeriodKey::Quarter { year, quarter } => write!(f, "{year}-Q{quarter}"),
            PeriodKey::Date(d) => write!(f, "{}", d.format("%-d/%m/%Y")),
        }
    }
}

fn bad_period(raw: &str, reason: &str) -> RenewFinanceError {
    RenewFinanceError::DateError(format!("Cannot parse period '{raw}': {reason}"))
}

/// Extract the calendar year from an asset or contract date. Upstream data
/// mixes "D/MM/YYYY", ISO "YYYY-MM-DD" and bare "YYYY" forms.
pub fn parse_start_year(raw: &str) -> RenewFinanceResult<i32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RenewFinanceError::DateError("Empty start date".into()));
    }

    if trimmed.contains('/') {
        let parts: Vec<&str> = trimmed.split('/').collect();
        if let Some(year_part) = parts.get(2) {
            if let Ok(year) = year_part.parse() {
                return Ok(year);
            }
        }
        return Err(RenewFinanceError::DateError(format!(
            "Cannot parse start date '{trimmed}'"
        )));
    }

    if let Some((year_part, _)) = trimmed.split_once('-') {
        if let Ok(year) = year_part.parse() {
            return Ok(year);
        }
    }

    trimmed
        .parse()
        .map_err(|_| RenewFinanceError::DateError(format!("Cannot parse start date '{trimmed}'")))
}
