//! Twelve Data market data provider.
//!
//! Primary source for equities, commodities, and FX pairs: spot quotes
//! via `/quote` and daily candles via `/time_series`. Requires an API
//! key; the free tier signals exhaustion with an in-body error object
//! (`status: "error"`, code 429, or an "API credits" message) inside a
//! 200 response.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use log::debug;
use serde::Deserialize;
use serde_json::Value;

use crate::config::ProviderConfig;
use crate::errors::MarketDataError;
use crate::models::{compute_changes, AssetClass, AssetQuery, AssetSnapshot, DataSource, NormalizedBar};
use crate::provider::{parse_decimal, MarketDataProvider};
use crate::symbols;
use crate::transport::ProxyClient;

const PROVIDER_ID: &str = "TWELVE_DATA";

/// Twelve Data provider for equities, commodities, and forex.
pub struct TwelveDataProvider {
    client: ProxyClient,
    config: ProviderConfig,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    close: Option<String>,
    percent_change: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    values: Option<Vec<SeriesValue>>,
}

#[derive(Debug, Deserialize)]
struct SeriesValue {
    datetime: String,
    open: String,
    high: String,
    low: String,
    close: String,
    /// Absent for FX pairs
    volume: Option<String>,
}

impl TwelveDataProvider {
    pub fn new(client: ProxyClient, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    fn ensure_usable(&self) -> Result<&str, MarketDataError> {
        if !self.config.is_usable(true) {
            return Err(MarketDataError::Unconfigured {
                provider: PROVIDER_ID.to_string(),
            });
        }
        Ok(self.config.api_key.as_deref().unwrap_or_default())
    }

    fn symbol(display_name: &str) -> Result<&'static str, MarketDataError> {
        symbols::quote_symbol(display_name)
            .ok_or_else(|| MarketDataError::SymbolNotFound(display_name.to_string()))
    }
}

/// Reject in-body error objects. Rate-limit exhaustion arrives as
/// `code: 429` or a message mentioning API credits.
fn check_body_error(body: &Value) -> Result<(), MarketDataError> {
    if body.get("status").and_then(Value::as_str) != Some("error") {
        return Ok(());
    }
    let code = body.get("code").and_then(Value::as_i64);
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    if code == Some(429) || message.contains("API credits") {
        return Err(MarketDataError::RateLimited {
            provider: PROVIDER_ID.to_string(),
        });
    }
    Err(MarketDataError::Provider {
        provider: PROVIDER_ID.to_string(),
        message,
    })
}

fn normalize_quote(symbol: &str, body: Value) -> Result<AssetSnapshot, MarketDataError> {
    check_body_error(&body)?;

    let quote: QuoteResponse = serde_json::from_value(body).map_err(|e| MarketDataError::Schema {
        provider: PROVIDER_ID.to_string(),
        message: format!("unexpected quote shape: {}", e),
    })?;
    let close = quote.close.ok_or_else(|| MarketDataError::Schema {
        provider: PROVIDER_ID.to_string(),
        message: "quote missing close".to_string(),
    })?;

    Ok(AssetSnapshot {
        symbol: symbol.to_string(),
        price: parse_decimal(&close, PROVIDER_ID, "close")?.round_dp(2),
        change_percent: match quote.percent_change {
            Some(raw) => parse_decimal(&raw, PROVIDER_ID, "percent_change")?.round_dp(2),
            None => rust_decimal::Decimal::ZERO,
        },
        timestamp: Utc::now(),
        source: DataSource::Live,
    })
}

/// Twelve Data emits values newest first; sort ascending before
/// computing changes.
fn normalize_time_series(body: Value) -> Result<Vec<NormalizedBar>, MarketDataError> {
    check_body_error(&body)?;

    let series: TimeSeriesResponse =
        serde_json::from_value(body).map_err(|e| MarketDataError::Schema {
            provider: PROVIDER_ID.to_string(),
            message: format!("unexpected time_series shape: {}", e),
        })?;
    let values = series.values.ok_or_else(|| MarketDataError::Schema {
        provider: PROVIDER_ID.to_string(),
        message: "time_series missing values".to_string(),
    })?;
    if values.is_empty() {
        return Err(MarketDataError::Schema {
            provider: PROVIDER_ID.to_string(),
            message: "empty values array".to_string(),
        });
    }

    let mut bars = Vec::with_capacity(values.len());
    for value in &values {
        // daily candles carry a plain date; intraday ones append a time
        let date_part = value.datetime.get(..10).unwrap_or(&value.datetime);
        let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| {
            MarketDataError::Schema {
                provider: PROVIDER_ID.to_string(),
                message: format!("unparseable datetime: {:?}", value.datetime),
            }
        })?;
        let volume = value
            .volume
            .as_deref()
            .and_then(|v| v.parse::<f64>().ok())
            .map(|v| v.max(0.0) as u64)
            .unwrap_or(0);

        bars.push(NormalizedBar::from_parts(
            date,
            parse_decimal(&value.open, PROVIDER_ID, "open")?,
            parse_decimal(&value.high, PROVIDER_ID, "high")?,
            parse_decimal(&value.low, PROVIDER_ID, "low")?,
            parse_decimal(&value.close, PROVIDER_ID, "close")?,
            volume,
            rust_decimal::Decimal::ZERO,
        ));
    }

    bars.sort_by_key(|bar| bar.date);
    compute_changes(&mut bars);
    Ok(bars)
}

#[async_trait]
impl MarketDataProvider for TwelveDataProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn supports(&self, asset_class: AssetClass) -> bool {
        matches!(
            asset_class,
            AssetClass::Equity | AssetClass::Commodity | AssetClass::Forex
        )
    }

    async fn fetch_history(&self, query: &AssetQuery) -> Result<Vec<NormalizedBar>, MarketDataError> {
        let api_key = self.ensure_usable()?;
        let symbol = Self::symbol(&query.display_name)?;
        let url = format!(
            "{}/time_series?symbol={}&interval=1day&outputsize={}&apikey={}",
            self.config.base_url,
            urlencoding::encode(symbol),
            query.lookback_days,
            api_key
        );
        debug!("fetching {} day history for {} from Twelve Data", query.lookback_days, symbol);

        let body = self.client.get_json(&url).await?;
        normalize_time_series(body)
    }

    async fn fetch_snapshot(&self, query: &AssetQuery) -> Result<AssetSnapshot, MarketDataError> {
        let api_key = self.ensure_usable()?;
        let symbol = Self::symbol(&query.display_name)?;
        let url = format!(
            "{}/quote?symbol={}&apikey={}",
            self.config.base_url,
            urlencoding::encode(symbol),
            api_key
        );

        let body = self.client.get_json(&url).await?;
        normalize_quote(symbol, body)
    }
}
