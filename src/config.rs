//! Service configuration.
//!
//! An explicit configuration struct constructed once by the host and passed
//! into [`MarketDataService`](crate::service::MarketDataService) by value.
//! Nothing here lives in ambient global state.

use std::time::Duration;

/// Configuration for one upstream provider.
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    /// Whether this provider may be called at all
    pub enabled: bool,

    /// API key, where the provider requires one
    pub api_key: Option<String>,

    /// Base URL for the provider's REST API
    pub base_url: String,
}

impl ProviderConfig {
    /// CoinGecko defaults. No key needed on the free tier.
    pub fn coingecko() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: "https://api.coingecko.com/api/v3".to_string(),
        }
    }

    /// Twelve Data defaults. Unusable until a key is supplied.
    pub fn twelve_data() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: "https://api.twelvedata.com".to_string(),
        }
    }

    /// Alpha Vantage defaults. Unusable until a key is supplied.
    pub fn alpha_vantage() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: "https://www.alphavantage.co/query".to_string(),
        }
    }

    /// NewsAPI defaults. Unusable until a key is supplied.
    pub fn newsapi() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: "https://newsapi.org/v2".to_string(),
        }
    }

    /// Set the API key, enabling keyed usage.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Whether this provider can actually be used: enabled, and keyed
    /// when a key is required.
    pub fn is_usable(&self, requires_key: bool) -> bool {
        if !self.enabled {
            return false;
        }
        if requires_key {
            return self.api_key.as_deref().is_some_and(|k| !k.is_empty());
        }
        true
    }
}

/// Top-level configuration consumed by the market data service.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Skip the network entirely and serve synthetic data
    pub use_mock_data: bool,

    /// Response cache time-to-live
    pub cache_ttl: Duration,

    /// Default history window when a query doesn't specify one
    pub default_lookback_days: u32,

    /// Per-request HTTP timeout
    pub request_timeout: Duration,

    pub coingecko: ProviderConfig,
    pub twelve_data: ProviderConfig,
    pub alpha_vantage: ProviderConfig,
    pub newsapi: ProviderConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            use_mock_data: false,
            cache_ttl: Duration::from_secs(600),
            default_lookback_days: 30,
            request_timeout: Duration::from_secs(30),
            coingecko: ProviderConfig::coingecko(),
            twelve_data: ProviderConfig::twelve_data(),
            alpha_vantage: ProviderConfig::alpha_vantage(),
            newsapi: ProviderConfig::newsapi(),
        }
    }
}

impl ServiceConfig {
    /// A configuration that never touches the network.
    pub fn mock_only() -> Self {
        Self {
            use_mock_data: true,
            ..Self::default()
        }
    }
}
