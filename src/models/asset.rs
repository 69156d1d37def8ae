use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Classification of asset types, used for primary-provider selection.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum AssetClass {
    /// Cryptocurrencies (primary: CoinGecko)
    Crypto,
    /// Equities and index trackers (primary: Twelve Data)
    Equity,
    /// Commodities (primary: Twelve Data)
    Commodity,
    /// FX pairs (primary: Twelve Data)
    Forex,
}

/// Where a returned series or snapshot came from.
///
/// Attached to every result so consumers and tests can distinguish live
/// data from simulated data instead of inferring it from logs.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum DataSource {
    /// Fetched from an upstream provider (possibly via a stale cache entry)
    Live,
    /// Generated by the synthetic random-walk generator
    Synthetic,
}

/// Identifies what is being asked for.
///
/// Constructed transiently per request. The mapping from `display_name` to
/// each provider's own symbol vocabulary is a fixed static table owned by
/// the [`symbols`](crate::symbols) module.
#[derive(Clone, Debug)]
pub struct AssetQuery {
    /// Dashboard-facing name ("Bitcoin", "Gold", "S&P 500", ...)
    pub display_name: String,

    /// Asset class, selects the primary provider
    pub asset_class: AssetClass,

    /// How many days of history to fetch
    pub lookback_days: u32,
}

impl AssetQuery {
    pub fn new(display_name: impl Into<String>, asset_class: AssetClass, lookback_days: u32) -> Self {
        Self {
            display_name: display_name.into(),
            asset_class,
            lookback_days,
        }
    }
}

/// A spot price with 24h change, normalized across providers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssetSnapshot {
    /// Provider-vocabulary symbol the snapshot was fetched under
    pub symbol: String,

    /// Current/most recent price
    pub price: Decimal,

    /// 24h percent change (zero when the provider doesn't report one)
    pub change_percent: Decimal,

    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,

    /// Live or synthetic
    pub source: DataSource,
}
