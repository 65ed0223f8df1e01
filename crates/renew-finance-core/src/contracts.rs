use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Money;

/// Offtake variants available to solar and wind assets. Prices are $/MWh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenewableOfftake {
    /// Bundled PPA selling green certificates and energy together
    Bundled {
        green_price: Decimal,
        energy_price: Decimal,
        #[serde(default)]
        floor: Option<Decimal>,
    },
    /// Green-certificate-only offtake
    GreenOnly {
        strike_price: Decimal,
        #[serde(default)]
        floor: Option<Decimal>,
    },
    /// Energy-only offtake
    EnergyOnly {
        strike_price: Decimal,
        #[serde(default)]
        floor: Option<Decimal>,
    },
}

/// Offtake variants available to storage assets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageOfftake {
    /// Contract-for-difference on the charge/discharge spread, $/MWh
    Cfd { strike_spread: Decimal },
    /// Capacity tolling agreement, $/MW/hr
    Tolling { hourly_rate: Decimal },
    /// Fixed annual revenue, $M/yr
    FixedRevenue { annual_revenue: Money },
}

/// A contracted offtake for a renewable asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewableContract {
    #[serde(flatten)]
    pub offtake: RenewableOfftake,
    /// Share of output sold under this contract, percent
    pub buyers_pct: Decimal,
    /// Annual price indexation, percent
    #[serde(default)]
    pub indexation_pct: Decimal,
    pub start_year: i32,
    pub end_year: i32,
}

/// A contracted offtake for a storage asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageContract {
    #[serde(flatten)]
    pub offtake: StorageOfftake,
    /// Share of capacity/throughput sold under this contract, percent
    pub buyers_pct: Decimal,
    /// Annual price indexation, percent
    #[serde(default)]
    pub indexation_pct: Decimal,
    pub start_year: i32,
    pub end_year: i32,
}

/// An asset's contract book, split by technology family so each revenue
/// computation dispatches exhaustively over its own variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "family", content = "contracts", rename_all = "snake_case")]
pub enum ContractBook {
    Renewable(Vec<RenewableContract>),
    Storage(Vec<StorageContract>),
}

impl Default for ContractBook {
    fn default() -> Self {
        ContractBook::Renewable(Vec::new())
    }
}

impl RenewableContract {
    pub fn active_in(&self, year: i32) -> bool {
        year >= self.start_year && year <= self.end_year
    }

    pub fn indexation_factor(&self, year: i32) -> Decimal {
        indexation_factor(self.indexation_pct, year - self.start_year)
    }
}

impl StorageContract {
    pub fn active_in(&self, year: i32) -> bool {
        year >= self.start_year && year <= self.end_year
    }

    pub fn indexation_factor(&self, year: i32) -> Decimal {
        indexation_factor(self.indexation_pct, year - self.start_year)
    }
}

/// (1 + pct/100)^years via iterative multiplication; years before the
/// contract start contribute no indexation.
fn indexation_factor(indexation_pct: Decimal, years_elapsed: i32) -> Decimal {
    if years_elapsed <= 0 || indexation_pct.is_zero() {
        return Decimal::ONE;
    }
    let annual = Decimal::ONE + indexation_pct / Decimal::from(100);
    let mut factor = Decimal::ONE;
    for _ in 0..years_elapsed {
        factor *= annual;
    }
    factor
}

/// Apply a bundled-contract price floor: when green + energy falls below the
/// floor, both components are rescaled proportionally to meet it (split
/// evenly when both are zero).
pub fn apply_bundled_floor(
    green_price: Decimal,
    energy_price: Decimal,
    floor: Option<Decimal>,
) -> (Decimal, Decimal) {
    let Some(floor_value) = floor else {
        return (green_price, energy_price);
    };
    let total = green_price + energy_price;
    if total >= floor_value {
        return (green_price, energy_price);
    }
    if total > Decimal::ZERO {
        let scale = floor_value / total;
        (green_price * scale, energy_price * scale)
    } else {
        let half = floor_value / Decimal::from(2);
        (half, half)
    }
}

/// Apply a single-strike floor.
pub fn apply_floor(price: Decimal, floor: Option<Decimal>) -> Decimal {
    match floor {
        Some(floor_value) => price.max(floor_value),
        None => price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn green_contract() -> RenewableContract {
        RenewableContract {
            offtake: RenewableOfftake::GreenOnly {
                strike_price: dec!(40),
                floor: None,
            },
            buyers_pct: dec!(60),
            indexation_pct: dec!(2),
            start_year: 2025,
            end_year: 2034,
        }
    }

    #[test]
    fn test_active_window() {
        let c = green_contract();
        assert!(!c.active_in(2024));
        assert!(c.active_in(2025));
        assert!(c.active_in(2034));
        assert!(!c.active_in(2035));
    }

    #[test]
    fn test_indexation_compounds() {
        let c = green_contract();
        assert_eq!(c.indexation_factor(2025), Decimal::ONE);
        // Two years at 2%: 1.02^2 = 1.0404
        assert_eq!(c.indexation_factor(2027), dec!(1.0404));
    }

    #[test]
    fn test_indexation_zero_pct() {
        let mut c = green_contract();
        c.indexation_pct = Decimal::ZERO;
        assert_eq!(c.indexation_factor(2030), Decimal::ONE);
    }

    #[test]
    fn test_bundled_floor_rescales_proportionally() {
        // 20 + 30 = 50 < floor 60: scale both by 1.2
        let (g, e) = apply_bundled_floor(dec!(20), dec!(30), Some(dec!(60)));
        assert_eq!(g, dec!(24));
        assert_eq!(e, dec!(36));
    }

    #[test]
    fn test_bundled_floor_not_binding() {
        let (g, e) = apply_bundled_floor(dec!(40), dec!(40), Some(dec!(60)));
        assert_eq!((g, e), (dec!(40), dec!(40)));
    }

    #[test]
    fn test_bundled_floor_zero_prices_split_evenly() {
        let (g, e) = apply_bundled_floor(Decimal::ZERO, Decimal::ZERO, Some(dec!(50)));
        assert_eq!((g, e), (dec!(25), dec!(25)));
    }

    #[test]
    fn test_single_floor() {
        assert_eq!(apply_floor(dec!(35), Some(dec!(42))), dec!(42));
        assert_eq!(apply_floor(dec!(55), Some(dec!(42))), dec!(55));
        assert_eq!(apply_floor(dec!(35), None), dec!(35));
    }
}
