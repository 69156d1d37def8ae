//! Market data models
//!
//! This module contains the core data types for market data operations:
//! - `bar` - The common normalized time-series record (NormalizedBar) and
//!   the source-tagged series wrapper (MarketSeries)
//! - `asset` - Asset classification and request identity (AssetClass,
//!   AssetQuery, AssetSnapshot, DataSource)

mod asset;
mod bar;

pub use asset::{AssetClass, AssetQuery, AssetSnapshot, DataSource};
pub use bar::{compute_changes, MarketSeries, NormalizedBar};
