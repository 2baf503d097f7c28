//! Indicator engine: trailing-window statistics as of one evaluation date.
//!
//! Every snapshot is a pure function of (series, benchmark, date). The
//! [`IndicatorCache`] holds per-symbol prefix sums so window means cost O(1);
//! it is built once per run and passed by reference into every call.

use std::collections::HashMap;

use chrono::NaiveDate;

use super::error::SepaError;
use super::series::{PriceBar, PriceSeries};

/// One trading year of daily bars; the minimum history for a snapshot.
pub const MIN_PRICE_BARS: usize = 252;

/// Trading days in "one month" for the SMA200 slope check.
const MONTH_BARS: usize = 21;

/// Window for the average-volume figure carried on the snapshot.
const VOLUME_WINDOW: usize = 20;

/// Derived values at a single evaluation date. Recomputed per date, never
/// persisted across runs.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub date: NaiveDate,
    pub close: f64,
    pub sma50: f64,
    pub sma150: f64,
    pub sma200: f64,
    pub sma200_month_ago: f64,
    pub high_52w: f64,
    pub low_52w: f64,
    /// Symbol trailing return minus benchmark trailing return, in percent,
    /// over the 252-bar window.
    pub rs_differential: f64,
    pub avg_volume_20: f64,
}

#[derive(Debug)]
struct PrefixSums {
    close: Vec<f64>,
    volume: Vec<f64>,
}

impl PrefixSums {
    fn build(bars: &[PriceBar]) -> Self {
        let mut close = Vec::with_capacity(bars.len() + 1);
        let mut volume = Vec::with_capacity(bars.len() + 1);
        close.push(0.0);
        volume.push(0.0);
        for bar in bars {
            close.push(close[close.len() - 1] + bar.close);
            volume.push(volume[volume.len() - 1] + bar.volume as f64);
        }
        Self { close, volume }
    }

    /// Mean close over the `window` bars ending at `end` (inclusive).
    fn mean_close(&self, end: usize, window: usize) -> f64 {
        (self.close[end + 1] - self.close[end + 1 - window]) / window as f64
    }

    fn mean_volume(&self, end: usize, window: usize) -> f64 {
        (self.volume[end + 1] - self.volume[end + 1 - window]) / window as f64
    }
}

/// Per-symbol prefix sums, scoped to one screening or backtest run.
#[derive(Debug, Default)]
pub struct IndicatorCache {
    sums: HashMap<String, PrefixSums>,
}

impl IndicatorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and store prefix sums for a series. Idempotent per symbol.
    pub fn prime(&mut self, series: &PriceSeries) {
        self.sums
            .entry(series.symbol.clone())
            .or_insert_with(|| PrefixSums::build(series.bars()));
    }

    fn mean_close(&self, series: &PriceSeries, end: usize, window: usize) -> f64 {
        match self.sums.get(&series.symbol) {
            Some(sums) => sums.mean_close(end, window),
            None => windowed_mean(series.bars(), end, window, |b| b.close),
        }
    }

    fn mean_volume(&self, series: &PriceSeries, end: usize, window: usize) -> f64 {
        match self.sums.get(&series.symbol) {
            Some(sums) => sums.mean_volume(end, window),
            None => windowed_mean(series.bars(), end, window, |b| b.volume as f64),
        }
    }
}

fn windowed_mean(bars: &[PriceBar], end: usize, window: usize, f: impl Fn(&PriceBar) -> f64) -> f64 {
    bars[end + 1 - window..=end].iter().map(f).sum::<f64>() / window as f64
}

fn require_history(series: &PriceSeries, date: NaiveDate) -> Result<usize, SepaError> {
    let index = series
        .index_of(date)
        .ok_or_else(|| SepaError::NoData {
            symbol: series.symbol.clone(),
        })?;
    if index + 1 < MIN_PRICE_BARS {
        return Err(SepaError::InsufficientData {
            symbol: series.symbol.clone(),
            bars: index + 1,
            minimum: MIN_PRICE_BARS,
        });
    }
    Ok(index)
}

/// Compute the indicator snapshot for `series` as of `date`.
///
/// Both the symbol and the benchmark must have a bar at `date` and at least
/// [`MIN_PRICE_BARS`] of trailing history ending there.
pub fn snapshot(
    cache: &IndicatorCache,
    series: &PriceSeries,
    benchmark: &PriceSeries,
    date: NaiveDate,
) -> Result<IndicatorSnapshot, SepaError> {
    let index = require_history(series, date)?;
    let bench_index = require_history(benchmark, date)?;

    let bars = series.bars();
    let close = bars[index].close;

    let window = &bars[index + 1 - MIN_PRICE_BARS..=index];
    let high_52w = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let low_52w = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);

    let base = bars[index + 1 - MIN_PRICE_BARS].close;
    let bench_bars = benchmark.bars();
    let bench_base = bench_bars[bench_index + 1 - MIN_PRICE_BARS].close;
    let symbol_return = close / base - 1.0;
    let bench_return = bench_bars[bench_index].close / bench_base - 1.0;

    Ok(IndicatorSnapshot {
        date,
        close,
        sma50: cache.mean_close(series, index, 50),
        sma150: cache.mean_close(series, index, 150),
        sma200: cache.mean_close(series, index, 200),
        sma200_month_ago: cache.mean_close(series, index - MONTH_BARS, 200),
        high_52w,
        low_52w,
        rs_differential: (symbol_return - bench_return) * 100.0,
        avg_volume_20: cache.mean_volume(series, index, VOLUME_WINDOW),
    })
}

/// Seeded exponential moving average of closes for a whole series.
///
/// k = 2/(n+1), seeded with the first n-bar SMA; the warmup prefix is `None`.
pub fn ema_series(series: &PriceSeries, period: usize) -> Vec<Option<f64>> {
    let bars = series.bars();
    if period == 0 {
        return vec![None; bars.len()];
    }

    let mut values = Vec::with_capacity(bars.len());
    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = 0.0;
    let mut sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if i < period - 1 {
            sum += bar.close;
            values.push(None);
        } else if i == period - 1 {
            sum += bar.close;
            ema = sum / period as f64;
            values.push(Some(ema));
        } else {
            ema = bar.close * k + ema * (1.0 - k);
            values.push(Some(ema));
        }
    }

    values
}
