pub mod breakdown;
pub mod prices;

pub use breakdown::{revenue_breakdown, Scenario};
pub use prices::{MerchantPriceProvider, PriceKind, StaticPriceBook};
