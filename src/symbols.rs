//! Static symbol-mapping tables.
//!
//! The dashboard addresses assets by display name ("Bitcoin", "Gold");
//! each provider has its own symbol vocabulary. These tables own that
//! mapping, along with the base prices and volatilities the synthetic
//! generator uses when no live data is available.

use lazy_static::lazy_static;
use std::collections::HashMap;

use crate::models::AssetClass;

lazy_static! {
    /// Baseline prices for the synthetic generator, per display name.
    static ref BASE_PRICES: HashMap<&'static str, f64> = {
        let mut m = HashMap::new();
        m.insert("S&P 500", 4200.0);
        m.insert("NASDAQ", 13000.0);
        m.insert("FTSE", 7500.0);
        m.insert("Gold", 1950.0);
        m.insert("Silver", 23.0);
        m.insert("Oil", 85.0);
        m.insert("Crude Oil", 85.0);
        m.insert("Natural Gas", 2.8);
        m.insert("Bitcoin", 65000.0);
        m.insert("Ethereum", 3200.0);
        m.insert("QQQ", 350.0);
        m
    };

    /// Per-asset volatility fractions for the synthetic generator.
    static ref VOLATILITIES: HashMap<&'static str, f64> = {
        let mut m = HashMap::new();
        m.insert("S&P 500", 0.015);
        m.insert("NASDAQ", 0.02);
        m.insert("FTSE", 0.012);
        m.insert("Gold", 0.01);
        m.insert("Silver", 0.025);
        m.insert("Oil", 0.03);
        m.insert("Crude Oil", 0.03);
        m.insert("Natural Gas", 0.04);
        m.insert("Bitcoin", 0.05);
        m.insert("Ethereum", 0.06);
        m.insert("QQQ", 0.022);
        m
    };
}

/// Fallback base price for assets absent from every table.
pub const DEFAULT_BASE_PRICE: f64 = 100.0;

/// Fallback volatility for assets absent from every table.
pub const DEFAULT_VOLATILITY: f64 = 0.02;

/// CoinGecko coin id for a display name.
pub fn coingecko_id(display_name: &str) -> Option<&'static str> {
    match display_name {
        "Bitcoin" => Some("bitcoin"),
        "Ethereum" => Some("ethereum"),
        _ => None,
    }
}

/// Quote-API symbol (Twelve Data / Alpha Vantage vocabulary) for a
/// display name.
pub fn quote_symbol(display_name: &str) -> Option<&'static str> {
    match display_name {
        "S&P 500" => Some("SPY"),
        "NASDAQ" => Some("QQQ"),
        "QQQ" => Some("QQQ"),
        "FTSE" => Some("ISF.LON"),
        "Gold" => Some("XAU/USD"),
        "Silver" => Some("XAG/USD"),
        "Oil" | "Crude Oil" => Some("USOIL"),
        "Natural Gas" => Some("NATGAS"),
        _ => None,
    }
}

/// Provider-vocabulary symbol for a display name in a given class.
pub fn provider_symbol(display_name: &str, asset_class: AssetClass) -> Option<&'static str> {
    match asset_class {
        AssetClass::Crypto => coingecko_id(display_name),
        _ => quote_symbol(display_name),
    }
}

/// Asset class for a display name. Names missing from every symbol table
/// default to [`AssetClass::Equity`]; they end up synthetic either way.
pub fn asset_class(display_name: &str) -> AssetClass {
    if coingecko_id(display_name).is_some() {
        return AssetClass::Crypto;
    }
    match display_name {
        "Gold" | "Silver" | "Oil" | "Crude Oil" | "Natural Gas" => AssetClass::Commodity,
        name if name.len() == 7 && name.as_bytes().get(3) == Some(&b'/') => AssetClass::Forex,
        _ => AssetClass::Equity,
    }
}

/// Synthetic-generator base price for a display name.
pub fn base_price(display_name: &str) -> f64 {
    BASE_PRICES
        .get(display_name)
        .copied()
        .unwrap_or(DEFAULT_BASE_PRICE)
}

/// Synthetic-generator volatility for a display name.
pub fn volatility(display_name: &str) -> f64 {
    VOLATILITIES
        .get(display_name)
        .copied()
        .unwrap_or(DEFAULT_VOLATILITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_mapping() {
        assert_eq!(coingecko_id("Bitcoin"), Some("bitcoin"));
        assert_eq!(coingecko_id("Ethereum"), Some("ethereum"));
        assert_eq!(coingecko_id("Gold"), None);
    }

    #[test]
    fn test_quote_mapping() {
        assert_eq!(quote_symbol("Gold"), Some("XAU/USD"));
        assert_eq!(quote_symbol("S&P 500"), Some("SPY"));
        assert_eq!(quote_symbol("Bitcoin"), None);
    }

    #[test]
    fn test_unknown_asset_gets_defaults() {
        assert_eq!(provider_symbol("Moon Futures", AssetClass::Equity), None);
        assert_eq!(base_price("Moon Futures"), DEFAULT_BASE_PRICE);
        assert_eq!(volatility("Moon Futures"), DEFAULT_VOLATILITY);
    }

    #[test]
    fn test_asset_class_detection() {
        assert_eq!(asset_class("Bitcoin"), AssetClass::Crypto);
        assert_eq!(asset_class("Gold"), AssetClass::Commodity);
        assert_eq!(asset_class("S&P 500"), AssetClass::Equity);
        assert_eq!(asset_class("EUR/USD"), AssetClass::Forex);
    }
}
