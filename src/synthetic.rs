//! Synthetic random-walk series generation.
//!
//! The terminal fallback of the fetch chain: whenever live data is
//! disabled, unavailable, or exhausted, the generator produces a
//! plausible-looking OHLCV series so the dashboard always has something
//! to draw. Shapes are deterministic under a fixed seed, which is how
//! the tests pin down the walk.

use chrono::{Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::models::{compute_changes, AssetSnapshot, DataSource, MarketSeries, NormalizedBar};
use crate::symbols;

/// Center of the per-step drift draw. 0.48 rather than 0.5, so the walk
/// carries a slight upward bias across most draws. Intentional product
/// behavior: mock charts are expected to trend up.
const DRIFT_CENTER: f64 = 0.48;

/// Base daily volume before the recency multiplier, drawn uniformly
/// from `[VOLUME_FLOOR, VOLUME_FLOOR + VOLUME_SPREAD)`.
const VOLUME_FLOOR: f64 = 50_000.0;
const VOLUME_SPREAD: f64 = 50_000.0;

/// Random-walk OHLCV generator.
pub struct SyntheticGenerator {
    rng: StdRng,
}

impl Default for SyntheticGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticGenerator {
    /// Generator with an entropy-derived seed.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Generator with a fixed seed, for reproducible series.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate a full series for a display name, using the static
    /// base-price and volatility tables. Unknown names fall back to
    /// the default base price and volatility rather than failing.
    pub fn generate_series(&mut self, display_name: &str, days: u32) -> MarketSeries {
        let bars = self.generate(
            symbols::base_price(display_name),
            symbols::volatility(display_name),
            days,
        );
        MarketSeries {
            asset: display_name.to_string(),
            source: DataSource::Synthetic,
            bars,
        }
    }

    /// Walk `days` steps from oldest to newest, starting at `base_price`.
    ///
    /// Each step applies a multiplicative drift of
    /// `(rand - DRIFT_CENTER) * volatility`. Open/high/low are jittered
    /// off the step's close, and volume scales up toward recent days.
    pub fn generate(&mut self, base_price: f64, volatility: f64, days: u32) -> Vec<NormalizedBar> {
        let today = Utc::now().date_naive();
        let mut bars = Vec::with_capacity(days as usize);
        let mut price = base_price;
        let mut prev_price = base_price;

        for i in (0..days).rev() {
            let date = today - ChronoDuration::days(i as i64);

            let drift = (self.rng.gen::<f64>() - DRIFT_CENTER) * volatility;
            price *= 1.0 + drift;

            let volume_base = VOLUME_FLOOR + self.rng.gen::<f64>() * VOLUME_SPREAD;
            let recency = 1.0 + f64::from(days - i) / f64::from(days) * 0.5;
            let volume = (volume_base * recency).floor() as u64;

            let high = price * (1.0 + self.rng.gen::<f64>() * volatility);
            let low = price * (1.0 - self.rng.gen::<f64>() * volatility);
            let open = prev_price * (1.0 + (self.rng.gen::<f64>() - 0.5) * volatility * 0.5);

            bars.push(NormalizedBar::from_parts(
                date,
                dec(open),
                dec(high),
                dec(low),
                dec(price),
                volume,
                Decimal::ZERO,
            ));
            prev_price = price;
        }

        compute_changes(&mut bars);
        bars
    }

    /// A synthetic spot snapshot: the table base price perturbed by one
    /// volatility-bounded draw.
    pub fn spot(&mut self, display_name: &str) -> AssetSnapshot {
        let base = symbols::base_price(display_name);
        let volatility = symbols::volatility(display_name);
        let change = (self.rng.gen::<f64>() - 0.5) * volatility;

        AssetSnapshot {
            symbol: display_name.to_string(),
            price: dec(base * (1.0 + change)).round_dp(2),
            change_percent: dec(change * 100.0).round_dp(2),
            timestamp: Utc::now(),
            source: DataSource::Synthetic,
        }
    }
}

/// f64 to Decimal; NaN/infinite inputs collapse to zero, which cannot
/// occur for the bounded draws above.
fn dec(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}
