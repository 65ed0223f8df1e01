use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::period::PeriodKey;
use crate::types::Technology;

/// What is being priced in a merchant lookup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceKind {
    /// Green certificate price, $/MWh
    Green,
    /// Wholesale energy price, $/MWh
    Energy,
    /// Storage charge/discharge spread for a given duration, $/MWh
    Spread { duration_hours: Decimal },
}

/// Boundary to the external merchant-price service. A pure, memoizable
/// lookup: same arguments, same answer, no retries. None means the service
/// has no curve for the request.
pub trait MerchantPriceProvider {
    fn price(
        &self,
        technology: Technology,
        kind: &PriceKind,
        region: &str,
        period: &PeriodKey,
    ) -> Option<Decimal>;
}

/// Deterministic price book: flat base prices escalated from a reference
/// year, with storage spreads interpolated between standard duration points.
/// Ships as the default provider for tests, the CLI and the bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticPriceBook {
    /// Green certificate base price, $/MWh
    pub green_price: Decimal,
    /// Wholesale energy base price, $/MWh
    pub energy_price: Decimal,
    /// (duration hours, spread $/MWh), ascending by duration
    pub storage_spreads: Vec<(Decimal, Decimal)>,
    /// Annual escalation, percent
    pub escalation_pct: Decimal,
    /// Escalation reference year; earlier periods are not de-escalated
    pub reference_year: i32,
}

impl Default for StaticPriceBook {
    fn default() -> Self {
        StaticPriceBook {
            green_price: dec!(35),
            energy_price: dec!(65),
            storage_spreads: vec![
                (dec!(0.5), dec!(160)),
                (dec!(1), dec!(180)),
                (dec!(2), dec!(200)),
                (dec!(4), dec!(220)),
            ],
            escalation_pct: dec!(2.5),
            reference_year: 2025,
        }
    }
}

impl StaticPriceBook {
    fn escalation_factor(&self, year: i32) -> Decimal {
        let years = year - self.reference_year;
        if years <= 0 || self.escalation_pct.is_zero() {
            return Decimal::ONE;
        }
        let annual = Decimal::ONE + self.escalation_pct / Decimal::from(100);
        let mut factor = Decimal::ONE;
        for _ in 0..years {
            factor *= annual;
        }
        factor
    }

    /// Linear interpolation between standard duration points; clamps to the
    /// nearest endpoint outside the covered range.
    fn interpolate_spread(&self, duration_hours: Decimal) -> Option<Decimal> {
        let points = &self.storage_spreads;
        let (first, last) = match (points.first(), points.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return None,
        };

        if duration_hours <= first.0 {
            return Some(first.1);
        }
        if duration_hours >= last.0 {
            return Some(last.1);
        }

        for pair in points.windows(2) {
            let (lower, upper) = (pair[0], pair[1]);
            if duration_hours >= lower.0 && duration_hours <= upper.0 {
                if upper.0 == lower.0 {
                    return Some(lower.1);
                }
                let ratio = (duration_hours - lower.0) / (upper.0 - lower.0);
                return Some(lower.1 + ratio * (upper.1 - lower.1));
            }
        }

        None
    }
}

impl MerchantPriceProvider for StaticPriceBook {
    fn price(
        &self,
        _technology: Technology,
        kind: &PriceKind,
        _region: &str,
        period: &PeriodKey,
    ) -> Option<Decimal> {
        let base = match kind {
            PriceKind::Green => Some(self.green_price),
            PriceKind::Energy => Some(self.energy_price),
            PriceKind::Spread { duration_hours } => self.interpolate_spread(*duration_hours),
        }?;
        Some(base * self.escalation_factor(period.year()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_prices_at_reference_year() {
        let book = StaticPriceBook::default();
        let period = PeriodKey::Year(2025);
        assert_eq!(
            book.price(Technology::Solar, &PriceKind::Green, "NSW", &period),
            Some(dec!(35))
        );
        assert_eq!(
            book.price(Technology::Wind, &PriceKind::Energy, "VIC", &period),
            Some(dec!(65))
        );
    }

    #[test]
    fn test_escalation_compounds() {
        let book = StaticPriceBook::default();
        let period = PeriodKey::Year(2027);
        // 65 * 1.025^2
        let expected = dec!(65) * dec!(1.025) * dec!(1.025);
        assert_eq!(
            book.price(Technology::Solar, &PriceKind::Energy, "NSW", &period),
            Some(expected)
        );
    }

    #[test]
    fn test_no_de_escalation_before_reference() {
        let book = StaticPriceBook::default();
        let period = PeriodKey::Year(2020);
        assert_eq!(
            book.price(Technology::Solar, &PriceKind::Green, "NSW", &period),
            Some(dec!(35))
        );
    }

    #[test]
    fn test_spread_exact_point() {
        let book = StaticPriceBook::default();
        let period = PeriodKey::Year(2025);
        let kind = PriceKind::Spread {
            duration_hours: dec!(2),
        };
        assert_eq!(
            book.price(Technology::Storage, &kind, "SA", &period),
            Some(dec!(200))
        );
    }

    #[test]
    fn test_spread_interpolates_between_points() {
        let book = StaticPriceBook::default();
        let period = PeriodKey::Year(2025);
        let kind = PriceKind::Spread {
            duration_hours: dec!(3),
        };
        // Halfway between 2h (200) and 4h (220)
        assert_eq!(
            book.price(Technology::Storage, &kind, "SA", &period),
            Some(dec!(210))
        );
    }

    #[test]
    fn test_spread_clamps_outside_range() {
        let book = StaticPriceBook::default();
        let period = PeriodKey::Year(2025);
        let short = PriceKind::Spread {
            duration_hours: dec!(0.25),
        };
        let long = PriceKind::Spread {
            duration_hours: dec!(8),
        };
        assert_eq!(
            book.price(Technology::Storage, &short, "SA", &period),
            Some(dec!(160))
        );
        assert_eq!(
            book.price(Technology::Storage, &long, "SA", &period),
            Some(dec!(220))
        );
    }

    #[test]
    fn test_empty_spread_table_returns_none() {
        let book = StaticPriceBook {
            storage_spreads: vec![],
            ..StaticPriceBook::default()
        };
        let period = PeriodKey::Year(2025);
        let kind = PriceKind::Spread {
            duration_hours: dec!(2),
        };
        assert_eq!(book.price(Technology::Storage, &kind, "SA", &period), None);
    }
}
