//! Alpha Vantage market data provider.
//!
//! Secondary source in the fallback chain: spot quotes via
//! `GLOBAL_QUOTE` and daily history via `TIME_SERIES_DAILY`. The free
//! tier is limited to 5 calls per minute and signals exhaustion by
//! replacing the payload with a `Note` or `Information` field inside a
//! 200 response.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use log::debug;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::config::ProviderConfig;
use crate::errors::MarketDataError;
use crate::models::{compute_changes, AssetClass, AssetQuery, AssetSnapshot, DataSource, NormalizedBar};
use crate::provider::{parse_decimal, MarketDataProvider};
use crate::symbols;
use crate::transport::ProxyClient;

const PROVIDER_ID: &str = "ALPHA_VANTAGE";

/// Alpha Vantage provider, used when the primary is rate limited or
/// unconfigured.
pub struct AlphaVantageProvider {
    client: ProxyClient,
    config: ProviderConfig,
}

/// TIME_SERIES_DAILY response
#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyQuote>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailyQuote {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

/// GLOBAL_QUOTE response
#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    quote: Option<GlobalQuote>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "05. price")]
    price: String,
    #[serde(rename = "10. change percent")]
    change_percent: Option<String>,
}

impl AlphaVantageProvider {
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

    /// Alpha Vantage shares Twelve Data's symbol vocabulary here.
    fn symbol(display_name: &str) -> Result<&'static str, MarketDataError> {
        symbols::quote_symbol(display_name)
            .ok_or_else(|| MarketDataError::SymbolNotFound(display_name.to_string()))
    }
}

/// Map the `Note`/`Information`/`Error Message` trio onto the error
/// taxonomy. A note mentioning call frequency is the rate-limit signal.
fn body_error(
    error_message: Option<String>,
    note: Option<String>,
    information: Option<String>,
) -> Option<MarketDataError> {
    if let Some(message) = error_message {
        return Some(MarketDataError::Provider {
            provider: PROVIDER_ID.to_string(),
            message,
        });
    }
    if let Some(notice) = note.or(information) {
        if notice.contains("call frequency") || notice.contains("rate limit") || notice.contains("premium") {
            return Some(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }
        return Some(MarketDataError::Provider {
            provider: PROVIDER_ID.to_string(),
            message: notice,
        });
    }
    None
}

fn normalize_time_series(body: Value) -> Result<Vec<NormalizedBar>, MarketDataError> {
    let response: TimeSeriesResponse =
        serde_json::from_value(body).map_err(|e| MarketDataError::Schema {
            provider: PROVIDER_ID.to_string(),
            message: format!("unexpected TIME_SERIES_DAILY shape: {}", e),
        })?;
    if let Some(err) = body_error(response.error_message, response.note, response.information) {
        return Err(err);
    }
    let time_series = response.time_series.ok_or_else(|| MarketDataError::Schema {
        provider: PROVIDER_ID.to_string(),
        message: "missing Time Series (Daily)".to_string(),
    })?;

    let mut bars = Vec::with_capacity(time_series.len());
    for (date_str, quote) in &time_series {
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|_| {
            MarketDataError::Schema {
                provider: PROVIDER_ID.to_string(),
                message: format!("unparseable date key: {:?}", date_str),
            }
        })?;
        let volume = quote.volume.parse::<f64>().map(|v| v.max(0.0) as u64).unwrap_or(0);

        bars.push(NormalizedBar::from_parts(
            date,
            parse_decimal(&quote.open, PROVIDER_ID, "open")?,
            parse_decimal(&quote.high, PROVIDER_ID, "high")?,
            parse_decimal(&quote.low, PROVIDER_ID, "low")?,
            parse_decimal(&quote.close, PROVIDER_ID, "close")?,
            volume,
            Decimal::ZERO,
        ));
    }
    if bars.is_empty() {
        return Err(MarketDataError::Schema {
            provider: PROVIDER_ID.to_string(),
            message: "empty Time Series (Daily)".to_string(),
        });
    }

    // map keys carry no order
    bars.sort_by_key(|bar| bar.date);
    compute_changes(&mut bars);
    Ok(bars)
}

fn normalize_global_quote(symbol: &str, body: Value) -> Result<AssetSnapshot, MarketDataError> {
    let response: GlobalQuoteResponse =
        serde_json::from_value(body).map_err(|e| MarketDataError::Schema {
            provider: PROVIDER_ID.to_string(),
            message: format!("unexpected GLOBAL_QUOTE shape: {}", e),
        })?;
    if let Some(err) = body_error(response.error_message, response.note, response.information) {
        return Err(err);
    }
    let quote = response.quote.ok_or_else(|| MarketDataError::Schema {
        provider: PROVIDER_ID.to_string(),
        message: "missing Global Quote".to_string(),
    })?;

    // "1.2345%" with a trailing percent sign
    let change_percent = match quote.change_percent.as_deref() {
        Some(raw) => parse_decimal(raw.trim_end_matches('%'), PROVIDER_ID, "change percent")?,
        None => Decimal::ZERO,
    };

    Ok(AssetSnapshot {
        symbol: symbol.to_string(),
        price: parse_decimal(&quote.price, PROVIDER_ID, "price")?.round_dp(2),
        change_percent: change_percent.round_dp(2),
        timestamp: Utc::now(),
        source: DataSource::Live,
    })
}

#[async_trait]
impl MarketDataProvider for AlphaVantageProvider {
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
        // compact covers 100 days; anything longer needs the full dump
        let outputsize = if query.lookback_days > 100 { "full" } else { "compact" };
        let url = format!(
            "{}?function=TIME_SERIES_DAILY&symbol={}&outputsize={}&apikey={}",
            self.config.base_url,
            urlencoding::encode(symbol),
            outputsize,
            api_key
        );
        debug!("fetching {} day history for {} from Alpha Vantage", query.lookback_days, symbol);

        let body = self.client.get_json(&url).await?;
        let mut bars = normalize_time_series(body)?;
        // trim the compact/full dump down to the requested window
        let window = query.lookback_days as usize;
        if bars.len() > window {
            let excess = bars.len() - window;
            bars.drain(..excess);
            compute_changes(&mut bars);
        }
        Ok(bars)
    }

    async fn fetch_snapshot(&self, query: &AssetQuery) -> Result<AssetSnapshot, MarketDataError> {
        let api_key = self.ensure_usable()?;
        let symbol = Self::symbol(&query.display_name)?;
        let url = format!(
            "{}?function=GLOBAL_QUOTE&symbol={}&apikey={}",
            self.config.base_url,
            urlencoding::encode(symbol),
            api_key
        );

        let body = self.client.get_json(&url).await?;
        normalize_global_quote(symbol, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_time_series_sorted_from_unordered_map() {
        let body = json!({
            "Time Series (Daily)": {
                "2024-01-16": {"1. open": "101.0", "2. high": "103.0", "3. low": "100.0", "4. close": "102.0", "5. volume": "2000"},
                "2024-01-15": {"1. open": "99.0", "2. high": "101.0", "3. low": "98.0", "4. close": "100.0", "5. volume": "1000"}
            }
        });
        let bars = normalize_time_series(body).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(bars[0].change, dec!(0));
        assert_eq!(bars[1].change, dec!(2));
        assert_eq!(bars[1].price, dec!(102));
    }

    #[test]
    fn test_note_with_call_frequency_is_rate_limit() {
        let body = json!({
            "Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."
        });
        let err = normalize_time_series(body).unwrap_err();
        assert!(matches!(err, MarketDataError::RateLimited { .. }));
    }

    #[test]
    fn test_information_field_is_also_checked() {
        let body = json!({
            "Information": "This endpoint requires a premium subscription."
        });
        let err = normalize_global_quote("SPY", body).unwrap_err();
        assert!(matches!(err, MarketDataError::RateLimited { .. }));
    }

    #[test]
    fn test_error_message_is_provider_error() {
        let body = json!({"Error Message": "Invalid API call."});
        let err = normalize_time_series(body).unwrap_err();
        assert!(matches!(err, MarketDataError::Provider { .. }));
    }

    #[test]
    fn test_missing_series_is_schema_error() {
        let err = normalize_time_series(json!({})).unwrap_err();
        assert!(matches!(err, MarketDataError::Schema { .. }));
    }

    #[test]
    fn test_global_quote_normalization() {
        let body = json!({
            "Global Quote": {
                "01. symbol": "SPY",
                "05. price": "4203.4567",
                "10. change percent": "0.8912%"
            }
        });
        let snapshot = normalize_global_quote("SPY", body).unwrap();

        assert_eq!(snapshot.price, dec!(4203.46));
        assert_eq!(snapshot.change_percent, dec!(0.89));
        assert_eq!(snapshot.source, DataSource::Live);
    }
}
