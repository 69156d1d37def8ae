//! TradeDesk Market Data Crate
//!
//! This crate provides the market-data acquisition, caching, and
//! normalization core for the TradeDesk dashboard.
//!
//! # Overview
//!
//! The crate supports:
//! - Multiple asset classes: crypto, equities, commodities, FX
//! - Multiple providers: CoinGecko, Twelve Data, Alpha Vantage
//! - A shared TTL response cache with stale-entry emergency fallback
//! - CORS-relay fan-out for environments without a backend proxy
//! - Synthetic series generation as a terminal, never-failing fallback
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! |   Dashboard      | --> |    AssetQuery    |  (display name + class)
//! +------------------+     +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          | MarketDataService|  (cache check, fallback chain)
//!                          +------------------+
//!                             |            |
//!                             v            v
//!                    +-------------+  +------------+
//!                    |  Provider   |  | Synthetic  |  (terminal fallback)
//!                    +-------------+  +------------+
//!                             |
//!                             v
//!                     +-------------+
//!                     | ProxyClient |  (direct fetch, then relay fan-out)
//!                     +-------------+
//!                             |
//!                             v
//!                     +--------------+
//!                     | MarketSeries |  (normalized, source-tagged)
//!                     +--------------+
//! ```
//!
//! # Core Types
//!
//! - [`AssetQuery`] - What is being asked for (name, class, lookback)
//! - [`NormalizedBar`] - One OHLCV point in the common internal shape
//! - [`MarketSeries`] - An ordered bar sequence tagged with its [`DataSource`]
//! - [`AssetSnapshot`] - A spot price with 24h change
//! - [`MarketDataService`] - The orchestrator owning cache and providers

pub mod analytics;
pub mod cache;
pub mod config;
pub mod errors;
pub mod models;
pub mod news;
pub mod provider;
pub mod service;
pub mod symbols;
pub mod synthetic;
pub mod transport;

// Re-export all public types from models
pub use models::{
    AssetClass, AssetQuery, AssetSnapshot, DataSource, MarketSeries, NormalizedBar,
};

// Re-export provider types
pub use provider::alpha_vantage::AlphaVantageProvider;
pub use provider::coingecko::CoinGeckoProvider;
pub use provider::twelve_data::TwelveDataProvider;
pub use provider::MarketDataProvider;

// Re-export service and supporting types
pub use cache::ResponseCache;
pub use config::{ProviderConfig, ServiceConfig};
pub use errors::{FallbackClass, MarketDataError};
pub use news::{Article, NewsCategory, NewsService};
pub use service::MarketDataService;
pub use synthetic::SyntheticGenerator;
pub use transport::ProxyClient;
