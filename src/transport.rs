//! HTTP transport with CORS-relay fan-out.
//!
//! The dashboard historically ran without a backend, so calls to most
//! financial APIs had to be bounced through public CORS relays. A
//! server-side process can hit the providers directly, and the direct
//! attempt always goes first; the relay list is kept as legacy
//! compatibility for deployments that still sit behind a browser-style
//! egress filter. Stale-cache fallback after total fan-out failure is
//! handled one layer up, in the service, which owns the cache key.

use std::time::Duration;

use log::{debug, warn};
use reqwest::Client;
use serde_json::Value;

use crate::errors::MarketDataError;

/// Public CORS relays, tried in order after the direct attempt fails.
/// Each expects the target URL appended, percent-encoded.
const CORS_RELAYS: [&str; 3] = [
    "https://api.allorigins.win/raw?url=",
    "https://api.codetabs.com/v1/proxy?quest=",
    "https://corsproxy.io/?",
];

/// A JSON GET client that falls back through the relay list.
#[derive(Clone, Debug)]
pub struct ProxyClient {
    client: Client,
}

impl ProxyClient {
    /// Build a client with the given per-request timeout.
    pub fn new(request_timeout: Duration) -> Result<Self, MarketDataError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| MarketDataError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// GET a URL and parse the body as JSON, trying the direct route
    /// first and then each relay in order. Returns the first successful
    /// 2xx JSON body; errors only once every route is exhausted.
    pub async fn get_json(&self, target_url: &str) -> Result<Value, MarketDataError> {
        match self.attempt(target_url).await {
            Ok(body) => return Ok(body),
            Err(e) => {
                debug!("direct fetch failed for {}: {}", target_url, e);
            }
        }

        for relay in CORS_RELAYS {
            let relayed = format!("{}{}", relay, urlencoding::encode(target_url));
            match self.attempt(&relayed).await {
                Ok(body) => {
                    debug!("relay {} answered for {}", relay, target_url);
                    return Ok(body);
                }
                Err(e) => {
                    warn!("relay {} failed for {}: {}", relay, target_url, e);
                }
            }
        }

        Err(MarketDataError::Network(format!(
            "direct fetch and all {} relays failed for {}",
            CORS_RELAYS.len(),
            target_url
        )))
    }

    /// One GET attempt. Non-2xx statuses are errors; 429 is surfaced as
    /// a distinct message so adapters can map it to a rate-limit error.
    async fn attempt(&self, url: &str) -> Result<Value, MarketDataError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MarketDataError::Network(format!(
                "HTTP {} from {}",
                status.as_u16(),
                url
            )));
        }
        let body = response.json::<Value>().await?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_order_is_fixed() {
        assert!(CORS_RELAYS[0].contains("allorigins.win"));
        assert!(CORS_RELAYS[1].contains("codetabs.com"));
        assert!(CORS_RELAYS[2].contains("corsproxy.io"));
    }

    #[test]
    fn test_relayed_url_is_percent_encoded() {
        let target = "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin&vs_currencies=usd";
        let relayed = format!("{}{}", CORS_RELAYS[0], urlencoding::encode(target));
        assert!(relayed.starts_with("https://api.allorigins.win/raw?url=https%3A%2F%2F"));
        assert!(!relayed[CORS_RELAYS[0].len()..].contains('?'));
    }

    #[tokio::test]
    async fn test_client_builds_with_timeout() {
        let client = ProxyClient::new(Duration::from_secs(30));
        assert!(client.is_ok());
    }
}
