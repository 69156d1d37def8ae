//! Aggregation helpers over normalized series.
//!
//! Pure functions consumed by the rendering layer: summary statistics,
//! top gainers/losers across a dashboard refresh, and chart-ready
//! category/value pairs. Nothing here touches the network or the cache.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{MarketSeries, NormalizedBar};

/// Direction of a series across its window, last close versus first.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum Trend {
    Up,
    Down,
}

/// Summary statistics for one bar sequence.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeriesStats {
    pub avg_price: Decimal,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub total_volume: u64,
    /// Percent change from the first close to the last
    pub price_change: Decimal,
    pub current_price: Decimal,
    pub trend: Trend,
}

/// One asset's standing in a dashboard refresh.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PerformanceEntry {
    pub asset: String,
    pub change: Decimal,
    pub price: Decimal,
}

/// Top three gainers and losers across a set of series.
#[derive(Clone, Debug, Serialize)]
pub struct TopPerformers {
    /// Best first
    pub gainers: Vec<PerformanceEntry>,
    /// Worst first
    pub losers: Vec<PerformanceEntry>,
}

/// Parallel category/value arrays in the shape charting consumers take.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartSeries<T> {
    pub categories: Vec<String>,
    pub data: Vec<T>,
}

/// Summary statistics over an ascending bar sequence. Empty input has
/// no statistics.
pub fn calculate_stats(bars: &[NormalizedBar]) -> Option<SeriesStats> {
    let first = bars.first()?;
    let last = bars.last()?;

    let mut min_price = first.price;
    let mut max_price = first.price;
    let mut sum = Decimal::ZERO;
    let mut total_volume: u64 = 0;
    for bar in bars {
        min_price = min_price.min(bar.price);
        max_price = max_price.max(bar.price);
        sum += bar.price;
        total_volume = total_volume.saturating_add(bar.volume);
    }

    let price_change = if bars.len() > 1 && !first.price.is_zero() {
        ((last.price - first.price) / first.price * Decimal::new(100, 0)).round_dp(2)
    } else {
        Decimal::ZERO
    };

    Some(SeriesStats {
        avg_price: (sum / Decimal::from(bars.len() as u64)).round_dp(2),
        min_price,
        max_price,
        total_volume,
        price_change,
        current_price: last.price,
        trend: if last.price > first.price {
            Trend::Up
        } else {
            Trend::Down
        },
    })
}

/// Rank assets by window change and return the three best and three
/// worst. With fewer than six series the two lists overlap, matching
/// what the dashboard has always displayed.
pub fn top_performers(series: &[MarketSeries]) -> TopPerformers {
    let mut performance: Vec<PerformanceEntry> = series
        .iter()
        .filter_map(|s| {
            let stats = calculate_stats(&s.bars)?;
            Some(PerformanceEntry {
                asset: s.asset.clone(),
                change: stats.price_change,
                price: stats.current_price,
            })
        })
        .collect();
    performance.sort_by(|a, b| b.change.cmp(&a.change));

    let gainers: Vec<PerformanceEntry> = performance.iter().take(3).cloned().collect();
    let losers: Vec<PerformanceEntry> = performance
        .iter()
        .rev()
        .take(3)
        .cloned()
        .collect();

    TopPerformers { gainers, losers }
}

/// Total volume per asset, sorted descending, as chart categories/data.
pub fn aggregate_volume(series: &[MarketSeries]) -> ChartSeries<u64> {
    let mut volumes: Vec<(String, u64)> = series
        .iter()
        .map(|s| {
            let total = s
                .bars
                .iter()
                .fold(0u64, |sum, bar| sum.saturating_add(bar.volume));
            (s.asset.clone(), total)
        })
        .collect();
    volumes.sort_by(|a, b| b.1.cmp(&a.1));

    ChartSeries {
        categories: volumes.iter().map(|(asset, _)| asset.clone()).collect(),
        data: volumes.into_iter().map(|(_, volume)| volume).collect(),
    }
}

/// Window price change per asset, in input order.
pub fn price_changes(series: &[MarketSeries]) -> ChartSeries<Decimal> {
    let changes: Vec<(String, Decimal)> = series
        .iter()
        .filter_map(|s| {
            let stats = calculate_stats(&s.bars)?;
            Some((s.asset.clone(), stats.price_change))
        })
        .collect();

    ChartSeries {
        categories: changes.iter().map(|(asset, _)| asset.clone()).collect(),
        data: changes.into_iter().map(|(_, change)| change).collect(),
    }
}

/// A named inclusive date range offered by the range picker.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PresetRange {
    pub name: &'static str,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// The range-picker presets, all ending today.
pub fn preset_ranges(today: NaiveDate) -> Vec<PresetRange> {
    let days_back = |n: i64| today - chrono::Duration::days(n);
    vec![
        PresetRange {
            name: "Today",
            start: today,
            end: today,
        },
        PresetRange {
            name: "Last 7 Days",
            start: days_back(7),
            end: today,
        },
        PresetRange {
            name: "Last 30 Days",
            start: days_back(30),
            end: today,
        },
        PresetRange {
            name: "Last 90 Days",
            start: days_back(90),
            end: today,
        },
        PresetRange {
            name: "This Month",
            start: today.with_day(1).unwrap_or(today),
            end: today,
        },
    ]
}

/// Bars whose date falls within the inclusive range. An unset bound is
/// open on that side.
pub fn filter_by_date_range(
    bars: &[NormalizedBar],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<NormalizedBar> {
    bars.iter()
        .filter(|bar| start.is_none_or(|s| bar.date >= s))
        .filter(|bar| end.is_none_or(|e| bar.date <= e))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataSource;
    use rust_decimal_macros::dec;

    fn bar(day: u32, close: Decimal, volume: u64) -> NormalizedBar {
        NormalizedBar::from_parts(
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            close,
            close,
            close,
            close,
            volume,
            dec!(0),
        )
    }

    fn series(asset: &str, closes: &[(u32, Decimal, u64)]) -> MarketSeries {
        MarketSeries {
            asset: asset.to_string(),
            source: DataSource::Synthetic,
            bars: closes.iter().map(|(d, c, v)| bar(*d, *c, *v)).collect(),
        }
    }

    #[test]
    fn test_stats_over_known_bars() {
        let bars = vec![
            bar(1, dec!(100), 1000),
            bar(2, dec!(110), 2000),
            bar(3, dec!(90), 3000),
        ];
        let stats = calculate_stats(&bars).unwrap();

        assert_eq!(stats.avg_price, dec!(100));
        assert_eq!(stats.min_price, dec!(90));
        assert_eq!(stats.max_price, dec!(110));
        assert_eq!(stats.total_volume, 6000);
        assert_eq!(stats.price_change, dec!(-10));
        assert_eq!(stats.current_price, dec!(90));
        assert_eq!(stats.trend, Trend::Down);
    }

    #[test]
    fn test_stats_on_empty_input() {
        assert!(calculate_stats(&[]).is_none());
    }

    #[test]
    fn test_single_bar_has_zero_change() {
        let stats = calculate_stats(&[bar(1, dec!(50), 10)]).unwrap();
        assert_eq!(stats.price_change, dec!(0));
        assert_eq!(stats.trend, Trend::Down);
    }

    #[test]
    fn test_top_performers_ranking() {
        let all = vec![
            series("A", &[(1, dec!(100), 0), (2, dec!(110), 0)]), // +10%
            series("B", &[(1, dec!(100), 0), (2, dec!(95), 0)]),  // -5%
            series("C", &[(1, dec!(100), 0), (2, dec!(120), 0)]), // +20%
            series("D", &[(1, dec!(100), 0), (2, dec!(80), 0)]),  // -20%
        ];
        let performers = top_performers(&all);

        assert_eq!(performers.gainers.len(), 3);
        assert_eq!(performers.gainers[0].asset, "C");
        assert_eq!(performers.gainers[1].asset, "A");

        assert_eq!(performers.losers[0].asset, "D");
        assert_eq!(performers.losers[0].change, dec!(-20));
        assert_eq!(performers.losers[1].asset, "B");
    }

    #[test]
    fn test_volume_aggregation_sorted_descending() {
        let all = vec![
            series("A", &[(1, dec!(1), 100), (2, dec!(1), 100)]),
            series("B", &[(1, dec!(1), 500)]),
        ];
        let chart = aggregate_volume(&all);

        assert_eq!(chart.categories, vec!["B", "A"]);
        assert_eq!(chart.data, vec![500, 200]);
    }

    #[test]
    fn test_price_changes_keep_input_order() {
        let all = vec![
            series("A", &[(1, dec!(100), 0), (2, dec!(110), 0)]),
            series("B", &[(1, dec!(100), 0), (2, dec!(95), 0)]),
        ];
        let chart = price_changes(&all);

        assert_eq!(chart.categories, vec!["A", "B"]);
        assert_eq!(chart.data, vec![dec!(10), dec!(-5)]);
    }

    #[test]
    fn test_preset_ranges() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let ranges = preset_ranges(today);

        assert_eq!(ranges.len(), 5);
        assert_eq!(ranges[0].name, "Today");
        assert_eq!(ranges[0].start, today);
        assert_eq!(
            ranges[1].start,
            NaiveDate::from_ymd_opt(2024, 3, 8).unwrap()
        );
        let this_month = ranges.last().unwrap();
        assert_eq!(this_month.start, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert!(ranges.iter().all(|r| r.end == today));
    }

    #[test]
    fn test_date_range_filter() {
        let bars = vec![bar(1, dec!(1), 0), bar(5, dec!(1), 0), bar(9, dec!(1), 0)];
        let from = NaiveDate::from_ymd_opt(2024, 1, 2);
        let to = NaiveDate::from_ymd_opt(2024, 1, 8);

        assert_eq!(filter_by_date_range(&bars, from, to).len(), 1);
        assert_eq!(filter_by_date_range(&bars, from, None).len(), 2);
        assert_eq!(filter_by_date_range(&bars, None, None).len(), 3);
    }
}
