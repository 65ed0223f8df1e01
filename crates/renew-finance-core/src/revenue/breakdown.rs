use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::contracts::{
    apply_bundled_floor, apply_floor, ContractBook, RenewableOfftake, StorageOfftake,
};
use crate::period::{parse_start_year, PeriodKey};
use crate::revenue::prices::{MerchantPriceProvider, PriceKind};
use crate::types::{Asset, RevenueBreakdown, Technology};
use crate::RenewFinanceResult;

const HOURS_IN_YEAR: Decimal = dec!(8760);
const DAYS_IN_YEAR: Decimal = dec!(365);
/// $/MWh revenue figures divide by this to land in $M
const PER_MWH_TO_MILLIONS: Decimal = dec!(1000000);

const VOLUME_STRESS: Decimal = dec!(0.20);
const PRICE_STRESS: Decimal = dec!(0.20);

/// Stress case applied on top of the base revenue decomposition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    #[default]
    Base,
    /// Volume and merchant price stress combined
    Worst,
    /// Volume stress on every bucket
    Volume,
    /// Price stress on merchant buckets only
    Price,
}

/// Decompose one asset-period into contracted/merchant green/energy revenue
/// and generated volume. Periods before the operations start or past the
/// asset life yield a zero breakdown.
pub fn revenue_breakdown(
    asset: &Asset,
    period: &PeriodKey,
    provider: &dyn MerchantPriceProvider,
    scenario: Scenario,
) -> RenewFinanceResult<RevenueBreakdown> {
    let start_year = parse_start_year(&asset.operations_start)?;
    let year = period.year();
    let years_operating = year - start_year;

    if years_operating < 0 || years_operating >= asset.asset_life_years as i32 {
        return Ok(RevenueBreakdown::default());
    }

    let breakdown = match asset.technology {
        Technology::Storage => storage_breakdown(asset, period, years_operating, provider),
        Technology::Solar | Technology::Wind => {
            renewable_breakdown(asset, period, years_operating, provider)
        }
    };

    Ok(apply_scenario_stress(breakdown, scenario))
}

fn renewable_breakdown(
    asset: &Asset,
    period: &PeriodKey,
    years_operating: i32,
    provider: &dyn MerchantPriceProvider,
) -> RevenueBreakdown {
    let year = period.year();
    let generation = asset.capacity_mw
        * HOURS_IN_YEAR
        * capacity_factor(asset, period)
        * period.fraction_of_year()
        * degradation_factor(asset.annual_degradation_pct, years_operating)
        * asset.volume_loss_pct
        / Decimal::from(100);

    let mut green_pct = Decimal::ZERO;
    let mut energy_pct = Decimal::ZERO;
    let mut contracted_green = Decimal::ZERO;
    let mut contracted_energy = Decimal::ZERO;

    if let ContractBook::Renewable(contracts) = &asset.contracts {
        for contract in contracts.iter().filter(|c| c.active_in(year)) {
            let indexation = contract.indexation_factor(year);
            let volume = generation * contract.buyers_pct / Decimal::from(100);

            match &contract.offtake {
                RenewableOfftake::Bundled {
                    green_price,
                    energy_price,
                    floor,
                } => {
                    let (green, energy) = apply_bundled_floor(
                        green_price * indexation,
                        energy_price * indexation,
                        *floor,
                    );
                    contracted_green += volume * green / PER_MWH_TO_MILLIONS;
                    contracted_energy += volume * energy / PER_MWH_TO_MILLIONS;
                    green_pct += contract.buyers_pct;
                    energy_pct += contract.buyers_pct;
                }
                RenewableOfftake::GreenOnly {
                    strike_price,
                    floor,
                } => {
                    let price = apply_floor(strike_price * indexation, *floor);
                    contracted_green += volume * price / PER_MWH_TO_MILLIONS;
                    green_pct += contract.buyers_pct;
                }
                RenewableOfftake::EnergyOnly {
                    strike_price,
                    floor,
                } => {
                    let price = apply_floor(strike_price * indexation, *floor);
                    contracted_energy += volume * price / PER_MWH_TO_MILLIONS;
                    energy_pct += contract.buyers_pct;
                }
            }
        }
    }

    let hundred = Decimal::from(100);
    let merchant_green_volume = generation * (hundred - green_pct.min(hundred)) / hundred;
    let merchant_energy_volume = generation * (hundred - energy_pct.min(hundred)) / hundred;

    let green_price = provider
        .price(asset.technology, &PriceKind::Green, &asset.region, period)
        .unwrap_or(Decimal::ZERO);
    let energy_price = provider
        .price(asset.technology, &PriceKind::Energy, &asset.region, period)
        .unwrap_or(Decimal::ZERO);

    RevenueBreakdown {
        contracted_green,
        contracted_energy,
        merchant_green: merchant_green_volume * green_price / PER_MWH_TO_MILLIONS,
        merchant_energy: merchant_energy_volume * energy_price / PER_MWH_TO_MILLIONS,
        volume_mwh: generation,
    }
}

fn storage_breakdown(
    asset: &Asset,
    period: &PeriodKey,
    years_operating: i32,
    provider: &dyn MerchantPriceProvider,
) -> RevenueBreakdown {
    let year = period.year();
    let fraction = period.fraction_of_year();
    let throughput = asset.storage_volume_mwh
        * DAYS_IN_YEAR
        * fraction
        * degradation_factor(asset.annual_degradation_pct, years_operating)
        * asset.volume_loss_pct
        / Decimal::from(100);

    let mut contracted_pct = Decimal::ZERO;
    let mut contracted_energy = Decimal::ZERO;

    if let ContractBook::Storage(contracts) = &asset.contracts {
        for contract in contracts.iter().filter(|c| c.active_in(year)) {
            let indexation = contract.indexation_factor(year);
            let buyer_share = contract.buyers_pct / Decimal::from(100);

            match &contract.offtake {
                StorageOfftake::Cfd { strike_spread } => {
                    contracted_energy +=
                        throughput * strike_spread * indexation * buyer_share / PER_MWH_TO_MILLIONS;
                }
                StorageOfftake::Tolling { hourly_rate } => {
                    contracted_energy += asset.capacity_mw
                        * HOURS_IN_YEAR
                        * fraction
                        * hourly_rate
                        * indexation
                        * buyer_share
                        / PER_MWH_TO_MILLIONS;
                }
                StorageOfftake::FixedRevenue { annual_revenue } => {
                    contracted_energy += annual_revenue * indexation * fraction;
                }
            }
            contracted_pct += contract.buyers_pct;
        }
    }

    let hundred = Decimal::from(100);
    let merchant_pct = (hundred - contracted_pct.min(hundred)).max(Decimal::ZERO);
    let merchant_throughput = throughput * merchant_pct / hundred;

    let duration_hours = if asset.capacity_mw > Decimal::ZERO {
        asset.storage_volume_mwh / asset.capacity_mw
    } else {
        dec!(2)
    };
    let spread = provider
        .price(
            asset.technology,
            &PriceKind::Spread { duration_hours },
            &asset.region,
            period,
        )
        .unwrap_or(Decimal::ZERO);

    RevenueBreakdown {
        contracted_green: Decimal::ZERO,
        contracted_energy,
        merchant_green: Decimal::ZERO,
        merchant_energy: merchant_throughput * spread / PER_MWH_TO_MILLIONS,
        volume_mwh: throughput,
    }
}

/// Quarterly factor when the period names a quarter, else the average of
/// the asset's available quarterly factors, else a regional default.
fn capacity_factor(asset: &Asset, period: &PeriodKey) -> Decimal {
    if let Some(factors) = &asset.quarterly_capacity_factors {
        if let Some(quarter) = period.quarter() {
            return factors[(quarter - 1) as usize] / Decimal::from(100);
        }
        let sum: Decimal = factors.iter().copied().sum();
        return sum / Decimal::from(400);
    }

    default_capacity_factor(asset.technology, &asset.region)
}

fn default_capacity_factor(technology: Technology, region: &str) -> Decimal {
    match technology {
        Technology::Solar => match region {
            "QLD" => dec!(0.29),
            "NSW" => dec!(0.28),
            "VIC" => dec!(0.25),
            "SA" => dec!(0.27),
            "WA" => dec!(0.26),
            "TAS" => dec!(0.23),
            _ => dec!(0.25),
        },
        Technology::Wind => match region {
            "QLD" => dec!(0.32),
            "NSW" => dec!(0.35),
            "VIC" => dec!(0.38),
            "SA" => dec!(0.40),
            "WA" => dec!(0.37),
            "TAS" => dec!(0.42),
            _ => dec!(0.35),
        },
        Technology::Storage => Decimal::ZERO,
    }
}

fn degradation_factor(annual_degradation_pct: Decimal, years_operating: i32) -> Decimal {
    if years_operating <= 0 || annual_degradation_pct.is_zero() {
        return Decimal::ONE;
    }
    let annual = Decimal::ONE - annual_degradation_pct / Decimal::from(100);
    let mut factor = Decimal::ONE;
    for _ in 0..years_operating {
        factor *= annual;
    }
    factor
}

fn apply_scenario_stress(breakdown: RevenueBreakdown, scenario: Scenario) -> RevenueBreakdown {
    let volume_keep = Decimal::ONE - VOLUME_STRESS;
    let price_keep = Decimal::ONE - PRICE_STRESS;

    match scenario {
        Scenario::Base => breakdown,
        Scenario::Worst => RevenueBreakdown {
            contracted_green: breakdown.contracted_green * volume_keep,
            contracted_energy: breakdown.contracted_energy * volume_keep,
            merchant_green: breakdown.merchant_green * volume_keep * price_keep,
            merchant_energy: breakdown.merchant_energy * volume_keep * price_keep,
            volume_mwh: breakdown.volume_mwh,
        },
        Scenario::Volume => RevenueBreakdown {
            contracted_green: breakdown.contracted_green * volume_keep,
            contracted_energy: breakdown.contracted_energy * volume_keep,
            merchant_green: breakdown.merchant_green * volume_keep,
            merchant_energy: breakdown.merchant_energy * volume_keep,
            volume_mwh: breakdown.volume_mwh,
        },
        Scenario::Price => RevenueBreakdown {
            merchant_green: breakdown.merchant_green * price_keep,
            merchant_energy: breakdown.merchant_energy * price_keep,
            ..breakdown
        },
    }
}
