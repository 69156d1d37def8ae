use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::asset::DataSource;

/// One point of a normalized time series.
///
/// Every provider payload and every synthetic series is mapped into this
/// shape. Invariants: `price == close`, prices are rounded to 2 decimal
/// places, `volume` is a truncated non-negative integer, and sequences are
/// ordered oldest to newest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBar {
    /// Calendar day of the bar
    pub date: NaiveDate,

    /// Midnight UTC of `date`, in epoch milliseconds
    pub timestamp: i64,

    /// Opening price
    pub open: Decimal,

    /// High price
    pub high: Decimal,

    /// Low price
    pub low: Decimal,

    /// Closing price
    pub close: Decimal,

    /// Always equal to `close`; kept as a separate field because chart
    /// consumers address series by `price`
    pub price: Decimal,

    /// Trading volume, truncated to an integer
    pub volume: u64,

    /// Percent change versus the previous bar's close; zero for the first
    /// bar of a series
    pub change: Decimal,
}

impl NormalizedBar {
    /// Build a bar from raw OHLCV parts, applying the normalization rules:
    /// 2-decimal rounding and the `price == close` invariant.
    pub fn from_parts(
        date: NaiveDate,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: u64,
        change: Decimal,
    ) -> Self {
        let close = close.round_dp(2);
        Self {
            date,
            timestamp: Self::epoch_millis(date),
            open: open.round_dp(2),
            high: high.round_dp(2),
            low: low.round_dp(2),
            price: close,
            close,
            volume,
            change: change.round_dp(2),
        }
    }

    /// Epoch milliseconds for midnight UTC of a calendar day.
    pub fn epoch_millis(date: NaiveDate) -> i64 {
        let midnight = date.and_hms_opt(0, 0, 0).expect("midnight is valid");
        Utc.from_utc_datetime(&midnight).timestamp_millis()
    }
}

/// Recompute the `change` field of an ascending bar sequence from each
/// bar's close versus the previous close. The first bar's change is zero.
///
/// Adapters call this after sorting, so the percent moves are consistent
/// regardless of the order the provider emitted the points in.
pub fn compute_changes(bars: &mut [NormalizedBar]) {
    let mut prev_close: Option<Decimal> = None;
    for bar in bars.iter_mut() {
        bar.change = match prev_close {
            Some(prev) if !prev.is_zero() => {
                ((bar.close - prev) / prev * Decimal::new(100, 0)).round_dp(2)
            }
            _ => Decimal::ZERO,
        };
        prev_close = Some(bar.close);
    }
}

/// An ordered bar sequence for one asset, tagged with where it came from.
///
/// The tag lets downstream consumers distinguish "no live data available"
/// from "deliberately simulated" without inferring it from log lines.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarketSeries {
    /// Display name of the asset ("Bitcoin", "S&P 500", ...)
    pub asset: String,

    /// Whether the bars came from a live provider or the generator
    pub source: DataSource,

    /// Bars in ascending chronological order
    pub bars: Vec<NormalizedBar>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_from_parts_rounds_and_mirrors_close() {
        let bar = NormalizedBar::from_parts(
            day(15),
            dec!(100.005),
            dec!(101.239),
            dec!(99.001),
            dec!(100.125),
            12345,
            dec!(1.234),
        );
        assert_eq!(bar.open, dec!(100.01));
        assert_eq!(bar.high, dec!(101.24));
        assert_eq!(bar.low, dec!(99.00));
        assert_eq!(bar.close, dec!(100.13));
        assert_eq!(bar.price, bar.close);
        assert_eq!(bar.change, dec!(1.23));
    }

    #[test]
    fn test_epoch_millis_is_midnight_utc() {
        let bar = NormalizedBar::from_parts(
            day(15),
            dec!(1),
            dec!(1),
            dec!(1),
            dec!(1),
            0,
            dec!(0),
        );
        // 2024-01-15T00:00:00Z
        assert_eq!(bar.timestamp, 1_705_276_800_000);
    }

    #[test]
    fn test_compute_changes() {
        let mut bars = vec![
            NormalizedBar::from_parts(day(1), dec!(100), dec!(100), dec!(100), dec!(100), 0, dec!(0)),
            NormalizedBar::from_parts(day(2), dec!(100), dec!(100), dec!(100), dec!(110), 0, dec!(0)),
            NormalizedBar::from_parts(day(3), dec!(100), dec!(100), dec!(100), dec!(99), 0, dec!(0)),
        ];
        compute_changes(&mut bars);

        assert_eq!(bars[0].change, dec!(0));
        assert_eq!(bars[1].change, dec!(10));
        assert_eq!(bars[2].change, dec!(-10));
    }
}
