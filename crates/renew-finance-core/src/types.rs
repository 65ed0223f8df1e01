use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::contracts::ContractBook;

/// All monetary values, in $M unless stated otherwise. Wraps Decimal to
/// prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Fields carrying the upstream
/// percentage convention are suffixed `_pct`.
pub type Rate = Decimal;

/// Generation technology of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Technology {
    Solar,
    Wind,
    Storage,
}

impl Technology {
    pub fn as_str(&self) -> &'static str {
        match self {
            Technology::Solar => "solar",
            Technology::Wind => "wind",
            Technology::Storage => "storage",
        }
    }
}

/// A single asset in the portfolio. Immutable during a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    pub technology: Technology,
    /// Nameplate capacity in MW
    pub capacity_mw: Decimal,
    /// Storage volume in MWh (storage assets only)
    #[serde(default)]
    pub storage_volume_mwh: Decimal,
    /// Region / state used for merchant price lookups
    pub region: String,
    /// Commercial operations date, as "D/MM/YYYY", "YYYY-MM-DD" or "YYYY"
    pub operations_start: String,
    /// Operating life in years from the operations start
    pub asset_life_years: u32,
    /// Annual output degradation, percent (0.5 = 0.5%/yr)
    #[serde(default)]
    pub annual_degradation_pct: Decimal,
    /// Marginal-loss / auxiliary-load factor, percent of gross output kept
    #[serde(default = "default_volume_loss_pct")]
    pub volume_loss_pct: Decimal,
    /// Capacity factors per calendar quarter, percent (renewables only)
    #[serde(default)]
    pub quarterly_capacity_factors: Option<[Decimal; 4]>,
    /// Offtake contract book
    #[serde(default)]
    pub contracts: ContractBook,
}

fn default_volume_loss_pct() -> Decimal {
    Decimal::from(95)
}

/// How project debt amortizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtStructure {
    /// Level-payment annuity over the tenor
    Amortization,
    /// DSCR-sculpted repayment, auto-sized by binary search
    Sculpting,
}

/// Debt sizing parameters for one asset (or the portfolio facility).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtParams {
    /// Maximum debt / capex
    pub max_gearing: Rate,
    /// Target DSCR applied to contracted revenue
    pub target_dscr_contract: Decimal,
    /// Target DSCR applied to merchant revenue
    pub target_dscr_merchant: Decimal,
    /// Annual interest rate
    pub interest_rate: Rate,
    /// Repayment period in years
    pub tenor_years: u32,
    pub structure: DebtStructure,
}

/// Construction-phase equity drawdown timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityTiming {
    /// true: the full equity outlay lands at period 0
    pub upfront: bool,
    /// Construction duration; equity is spread over ceil(months/12) years
    /// when not upfront
    #[serde(default)]
    pub construction_duration_months: u32,
}

/// Cost and financing assumptions for one asset, keyed by asset name.
/// An optional `"portfolio"` entry drives the refinancing case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetCostProfile {
    /// Total construction cost, $M
    pub capex: Money,
    /// Year-one operating cost, $M/yr
    pub operating_cost: Money,
    /// Annual opex escalation, percent
    #[serde(default)]
    pub operating_cost_escalation_pct: Decimal,
    /// Terminal value realised in the final operating year, $M
    #[serde(default)]
    pub terminal_value: Money,
    pub debt: DebtParams,
    pub equity_timing: EquityTiming,
}

/// Per-asset, per-period revenue decomposition. All revenue figures in $M,
/// volume in MWh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevenueBreakdown {
    pub contracted_green: Money,
    pub contracted_energy: Money,
    pub merchant_green: Money,
    pub merchant_energy: Money,
    pub volume_mwh: Decimal,
}

impl RevenueBreakdown {
    pub fn total(&self) -> Money {
        self.contracted_green + self.contracted_energy + self.merchant_green + self.merchant_energy
    }

    pub fn contracted(&self) -> Money {
        self.contracted_green + self.contracted_energy
    }

    pub fn merchant(&self) -> Money {
        self.merchant_green + self.merchant_energy
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
