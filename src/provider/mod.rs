//! Market data provider adapters.
//!
//! One adapter per upstream source, each knowing that provider's URL
//! shape, response schema, and in-body error conventions. All adapters
//! normalize into [`NormalizedBar`](crate::models::NormalizedBar) /
//! [`AssetSnapshot`](crate::models::AssetSnapshot) so the service layer
//! never sees provider-specific JSON.

pub mod alpha_vantage;
pub mod coingecko;
pub mod twelve_data;

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::errors::MarketDataError;
use crate::models::{AssetClass, AssetQuery, AssetSnapshot, NormalizedBar};

pub use alpha_vantage::AlphaVantageProvider;
pub use coingecko::CoinGeckoProvider;
pub use twelve_data::TwelveDataProvider;

/// Trait for market data providers.
///
/// Implement this trait to add support for a new upstream source. The
/// service walks providers in fallback order, consulting
/// [`supports`](Self::supports) to pick the primary for an asset class.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unique identifier, a constant like "COINGECKO" or "TWELVE_DATA".
    /// Used for logging and for error attribution.
    fn id(&self) -> &'static str;

    /// Whether this provider serves the given asset class.
    fn supports(&self, asset_class: AssetClass) -> bool;

    /// Fetch a daily history for the query's lookback window.
    ///
    /// Returns bars in ascending chronological order with the `change`
    /// field computed against each previous close.
    async fn fetch_history(&self, query: &AssetQuery) -> Result<Vec<NormalizedBar>, MarketDataError>;

    /// Fetch the current spot price with 24h change.
    async fn fetch_snapshot(&self, query: &AssetQuery) -> Result<AssetSnapshot, MarketDataError>;

    /// Batch spot prices for several provider-vocabulary ids in one call.
    ///
    /// Only providers with a batch endpoint implement this; the default
    /// reports it as unsupported so the service falls through to
    /// per-asset snapshots.
    async fn fetch_spot_prices(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, AssetSnapshot>, MarketDataError> {
        let _ = ids;
        Err(MarketDataError::Provider {
            provider: self.id().to_string(),
            message: "batch spot prices not supported".to_string(),
        })
    }
}

/// Parse a provider's stringly-typed decimal field, attributing parse
/// failures to the provider as a schema error.
pub(crate) fn parse_decimal(
    raw: &str,
    provider: &str,
    field: &str,
) -> Result<Decimal, MarketDataError> {
    Decimal::from_str(raw).map_err(|_| MarketDataError::Schema {
        provider: provider.to_string(),
        message: format!("unparseable {}: {:?}", field, raw),
    })
}
