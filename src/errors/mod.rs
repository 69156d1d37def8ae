//! Error types and fallback classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all market data operations
//! - [`FallbackClass`]: Classification for determining fallback behavior

mod fallback;

pub use fallback::FallbackClass;

use thiserror::Error;

/// Errors that can occur during market data operations.
///
/// Each variant is classified into a [`FallbackClass`] via the
/// [`fallback_class`](Self::fallback_class) method, which determines how the
/// service reacts: try the next provider in the chain, or go straight to the
/// synthetic generator. Adapter-level errors never escape the service
/// boundary as failures; exhaustion always degrades to synthetic data.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The fetch failed at the network layer: the request errored, returned
    /// a non-2xx status, or every relay in the fan-out list was exhausted.
    #[error("network error: {0}")]
    Network(String),

    /// The provider rate limited the request, either with HTTP 429 or with
    /// an in-body signal embedded in a 200 response.
    #[error("rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The response parsed as JSON but is missing fields the adapter
    /// expected. Another provider may still have the data.
    #[error("schema error from {provider}: {message}")]
    Schema {
        /// The provider whose response failed to parse
        provider: String,
        /// What was missing or malformed
        message: String,
    },

    /// The provider has no API key or is disabled in configuration.
    /// Skip it and try the next provider.
    #[error("provider not configured: {provider}")]
    Unconfigured {
        /// The provider that is not usable
        provider: String,
    },

    /// A provider-specific error was reported in the response body.
    #[error("provider error: {provider} - {message}")]
    Provider {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The asset name has no entry in any symbol-mapping table.
    /// No provider can answer; synthesize directly.
    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    /// Every provider in the chain was tried and all failed.
    #[error("all providers failed")]
    AllProvidersFailed,
}

impl MarketDataError {
    /// Returns the fallback classification for this error.
    ///
    /// - [`FallbackClass::NextProvider`]: Try the next provider in the chain
    /// - [`FallbackClass::Synthetic`]: Skip the chain, generate synthetic data
    ///
    /// # Examples
    ///
    /// ```
    /// use tradedesk_market_data::errors::{FallbackClass, MarketDataError};
    ///
    /// let error = MarketDataError::RateLimited { provider: "TWELVE_DATA".to_string() };
    /// assert_eq!(error.fallback_class(), FallbackClass::NextProvider);
    ///
    /// let error = MarketDataError::SymbolNotFound("Moon Futures".to_string());
    /// assert_eq!(error.fallback_class(), FallbackClass::Synthetic);
    /// ```
    pub fn fallback_class(&self) -> FallbackClass {
        match self {
            // Another provider may still answer
            Self::Network(_)
            | Self::RateLimited { .. }
            | Self::Schema { .. }
            | Self::Unconfigured { .. }
            | Self::Provider { .. } => FallbackClass::NextProvider,

            // No provider knows this asset, or none are left
            Self::SymbolNotFound(_) | Self::AllProvidersFailed => FallbackClass::Synthetic,
        }
    }
}

impl From<reqwest::Error> for MarketDataError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_tries_next_provider() {
        let error = MarketDataError::RateLimited {
            provider: "TWELVE_DATA".to_string(),
        };
        assert_eq!(error.fallback_class(), FallbackClass::NextProvider);
    }

    #[test]
    fn test_network_tries_next_provider() {
        let error = MarketDataError::Network("connection refused".to_string());
        assert_eq!(error.fallback_class(), FallbackClass::NextProvider);
    }

    #[test]
    fn test_schema_tries_next_provider() {
        let error = MarketDataError::Schema {
            provider: "ALPHA_VANTAGE".to_string(),
            message: "missing Time Series (Daily)".to_string(),
        };
        assert_eq!(error.fallback_class(), FallbackClass::NextProvider);
    }

    #[test]
    fn test_unconfigured_tries_next_provider() {
        let error = MarketDataError::Unconfigured {
            provider: "ALPHA_VANTAGE".to_string(),
        };
        assert_eq!(error.fallback_class(), FallbackClass::NextProvider);
    }

    #[test]
    fn test_symbol_not_found_goes_synthetic() {
        let error = MarketDataError::SymbolNotFound("Unknown Asset".to_string());
        assert_eq!(error.fallback_class(), FallbackClass::Synthetic);
    }

    #[test]
    fn test_all_providers_failed_goes_synthetic() {
        let error = MarketDataError::AllProvidersFailed;
        assert_eq!(error.fallback_class(), FallbackClass::Synthetic);
    }

    #[test]
    fn test_error_display() {
        let error = MarketDataError::RateLimited {
            provider: "TWELVE_DATA".to_string(),
        };
        assert_eq!(format!("{}", error), "rate limited: TWELVE_DATA");

        let error = MarketDataError::Provider {
            provider: "ALPHA_VANTAGE".to_string(),
            message: "Invalid API call".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "provider error: ALPHA_VANTAGE - Invalid API call"
        );
    }
}
