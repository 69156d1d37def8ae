//! CoinGecko market data provider.
//!
//! Crypto spot prices via `/simple/price` (batchable, with 24h change)
//! and daily history via `/coins/{id}/market_chart`. The free tier
//! needs no API key; rate limiting arrives as an in-body `status`
//! object with error code 429.
//!
//! `market_chart` returns price/volume point pairs rather than OHLC
//! candles, at sub-daily granularity for short windows. The adapter
//! folds the points into one bar per calendar day: open is the first
//! observation, high/low the day's extremes, close the last.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::config::ProviderConfig;
use crate::errors::MarketDataError;
use crate::models::{compute_changes, AssetClass, AssetQuery, AssetSnapshot, DataSource, NormalizedBar};
use crate::provider::MarketDataProvider;
use crate::symbols;
use crate::transport::ProxyClient;

const PROVIDER_ID: &str = "COINGECKO";

/// CoinGecko provider for cryptocurrencies.
pub struct CoinGeckoProvider {
    client: ProxyClient,
    config: ProviderConfig,
}

#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    /// `[epoch_millis, price]` pairs, ascending
    prices: Vec<(f64, f64)>,
    /// `[epoch_millis, volume]` pairs, paired with `prices` by index
    #[serde(default)]
    total_volumes: Vec<(f64, f64)>,
}

impl CoinGeckoProvider {
    pub fn new(client: ProxyClient, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    fn ensure_usable(&self) -> Result<(), MarketDataError> {
        if !self.config.is_usable(false) {
            return Err(MarketDataError::Unconfigured {
                provider: PROVIDER_ID.to_string(),
            });
        }
        Ok(())
    }

    /// Resolve the CoinGecko coin id for a display name.
    fn coin_id(display_name: &str) -> Result<&'static str, MarketDataError> {
        symbols::coingecko_id(display_name)
            .ok_or_else(|| MarketDataError::SymbolNotFound(display_name.to_string()))
    }
}

/// Reject bodies carrying CoinGecko's in-body error object, which it
/// embeds in otherwise-200 responses when rate limiting.
fn check_body_error(body: &Value) -> Result<(), MarketDataError> {
    let Some(status) = body.get("status") else {
        return Ok(());
    };
    let code = status.get("error_code").and_then(Value::as_i64);
    let message = status
        .get("error_message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    match code {
        Some(429) => Err(MarketDataError::RateLimited {
            provider: PROVIDER_ID.to_string(),
        }),
        Some(_) | None => Err(MarketDataError::Provider {
            provider: PROVIDER_ID.to_string(),
            message,
        }),
    }
}

/// Fold market-chart points into one daily bar per calendar day and
/// compute per-bar changes.
fn normalize_market_chart(body: Value) -> Result<Vec<NormalizedBar>, MarketDataError> {
    check_body_error(&body)?;

    let chart: MarketChartResponse =
        serde_json::from_value(body).map_err(|e| MarketDataError::Schema {
            provider: PROVIDER_ID.to_string(),
            message: format!("unexpected market_chart shape: {}", e),
        })?;

    if chart.prices.is_empty() {
        return Err(MarketDataError::Schema {
            provider: PROVIDER_ID.to_string(),
            message: "empty prices array".to_string(),
        });
    }

    struct DayAccumulator {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    }

    // Points arrive ascending, so first-seen is the day's open and
    // last-seen its close.
    let mut days: Vec<(chrono::NaiveDate, DayAccumulator)> = Vec::new();
    for (index, (ts_millis, price)) in chart.prices.iter().enumerate() {
        let Some(instant) = DateTime::<Utc>::from_timestamp_millis(*ts_millis as i64) else {
            continue;
        };
        let date = instant.date_naive();
        let volume = chart
            .total_volumes
            .get(index)
            .map(|(_, v)| *v)
            .unwrap_or(0.0);

        match days.last_mut() {
            Some((day, acc)) if *day == date => {
                acc.high = acc.high.max(*price);
                acc.low = acc.low.min(*price);
                acc.close = *price;
                acc.volume = volume;
            }
            _ => days.push((
                date,
                DayAccumulator {
                    open: *price,
                    high: *price,
                    low: *price,
                    close: *price,
                    volume,
                },
            )),
        }
    }

    let mut bars: Vec<NormalizedBar> = days
        .into_iter()
        .map(|(date, acc)| {
            NormalizedBar::from_parts(
                date,
                dec(acc.open),
                dec(acc.high),
                dec(acc.low),
                dec(acc.close),
                acc.volume.max(0.0) as u64,
                Decimal::ZERO,
            )
        })
        .collect();
    compute_changes(&mut bars);
    Ok(bars)
}

/// Extract per-id snapshots from a `/simple/price` body.
fn normalize_simple_price(body: Value) -> Result<HashMap<String, AssetSnapshot>, MarketDataError> {
    check_body_error(&body)?;

    let Value::Object(entries) = body else {
        return Err(MarketDataError::Schema {
            provider: PROVIDER_ID.to_string(),
            message: "simple/price body is not an object".to_string(),
        });
    };

    let now = Utc::now();
    let mut snapshots = HashMap::new();
    for (id, fields) in entries {
        let Some(price) = fields.get("usd").and_then(Value::as_f64) else {
            continue;
        };
        let change = fields
            .get("usd_24h_change")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        snapshots.insert(
            id.clone(),
            AssetSnapshot {
                symbol: id,
                price: dec(price).round_dp(2),
                change_percent: dec(change).round_dp(2),
                timestamp: now,
                source: DataSource::Live,
            },
        );
    }

    if snapshots.is_empty() {
        return Err(MarketDataError::Schema {
            provider: PROVIDER_ID.to_string(),
            message: "no usable entries in simple/price body".to_string(),
        });
    }
    Ok(snapshots)
}

fn dec(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

#[async_trait]
impl MarketDataProvider for CoinGeckoProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn supports(&self, asset_class: AssetClass) -> bool {
        asset_class == AssetClass::Crypto
    }

    async fn fetch_history(&self, query: &AssetQuery) -> Result<Vec<NormalizedBar>, MarketDataError> {
        self.ensure_usable()?;
        let id = Self::coin_id(&query.display_name)?;
        let url = format!(
            "{}/coins/{}/market_chart?vs_currency=usd&days={}",
            self.config.base_url, id, query.lookback_days
        );
        debug!("fetching {} day history for {} from CoinGecko", query.lookback_days, id);

        let body = self.client.get_json(&url).await?;
        normalize_market_chart(body)
    }

    async fn fetch_snapshot(&self, query: &AssetQuery) -> Result<AssetSnapshot, MarketDataError> {
        self.ensure_usable()?;
        let id = Self::coin_id(&query.display_name)?;
        let mut snapshots = self.fetch_spot_prices(&[id.to_string()]).await?;
        snapshots
            .remove(id)
            .ok_or_else(|| MarketDataError::Schema {
                provider: PROVIDER_ID.to_string(),
                message: format!("simple/price body missing id {:?}", id),
            })
    }

    async fn fetch_spot_prices(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, AssetSnapshot>, MarketDataError> {
        self.ensure_usable()?;
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd&include_24hr_change=true",
            self.config.base_url,
            ids.join(",")
        );

        let body = self.client.get_json(&url).await?;
        normalize_simple_price(body)
    }
}
