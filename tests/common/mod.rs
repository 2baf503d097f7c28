#![allow(dead_code)]

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};

use sepatrader::domain::backtest::BacktestConfig;
use sepatrader::domain::error::SepaError;
use sepatrader::domain::series::PriceBar;
use sepatrader::domain::signal::ScorerConfig;
use sepatrader::domain::sizing::SizingConfig;
use sepatrader::domain::vcp::VcpConfig;
use sepatrader::ports::data_port::DataPort;

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 1, 1).unwrap()
}

pub fn bar(i: usize, close: f64, low: f64, volume: i64) -> PriceBar {
    PriceBar {
        date: start_date() + Duration::days(i as i64),
        open: close,
        high: close,
        low,
        close,
        volume,
    }
}

pub fn flat_bars(len: usize, close: f64) -> Vec<PriceBar> {
    (0..len).map(|i| bar(i, close, close, 1_000)).collect()
}

/// A 252-bar ramp from 60 to ~80, a three-contraction VCP base resolved by a
/// volume-confirmed breakout at 103, then the caller's (close, low, volume)
/// tail.
pub fn breakout_bars(tail: &[(f64, f64, i64)]) -> Vec<PriceBar> {
    let mut bars = Vec::new();
    let growth = (80.0f64 / 60.0).powf(1.0 / 251.0);
    for i in 0..252 {
        let close = 60.0 * growth.powi(i as i32);
        bars.push(bar(i, close, close, 1_000));
    }

    let base: &[(f64, i64)] = &[
        (84.0, 1_000),
        (88.0, 1_000),
        (92.0, 1_000),
        (96.0, 1_000),
        (100.0, 900),
        (97.0, 900),
        (93.0, 900),
        (88.0, 900),
        (85.0, 900),
        (88.0, 1_000),
        (92.0, 1_000),
        (96.0, 1_000),
        (100.0, 700),
        (97.0, 700),
        (94.0, 700),
        (91.0, 700),
        (93.0, 1_000),
        (96.0, 1_000),
        (99.0, 1_000),
        (100.0, 500),
        (98.0, 500),
        (96.0, 500),
        (98.0, 1_000),
        (103.0, 2_000),
    ];
    for (offset, &(close, volume)) in base.iter().enumerate() {
        bars.push(bar(252 + offset, close, close, volume));
    }

    let tail_start = 252 + base.len();
    for (offset, &(close, low, volume)) in tail.iter().enumerate() {
        bars.push(bar(tail_start + offset, close, low, volume));
    }

    bars
}

pub fn config_covering(bars: &[PriceBar]) -> BacktestConfig {
    BacktestConfig {
        start_date: bars[0].date,
        end_date: bars[bars.len() - 1].date,
        initial_capital: 100_000.0,
        max_concurrent_positions: 10,
        trailing_stop_period: 10,
        sizing: SizingConfig::default(),
        scorer: ScorerConfig::default(),
        vcp: VcpConfig::default(),
    }
}

pub fn write_csv(dir: &std::path::Path, symbol: &str, bars: &[PriceBar]) {
    let mut content = String::from("date,open,high,low,close,volume\n");
    for b in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.date, b.open, b.high, b.low, b.close, b.volume
        ));
    }
    std::fs::write(dir.join(format!("{symbol}.csv")), content).unwrap();
}

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, SepaError> {
        let bars = self.data.get(symbol).ok_or_else(|| SepaError::NoData {
            symbol: symbol.to_string(),
        })?;
        Ok(bars
            .iter()
            .filter(|b| b.date >= start_date && b.date <= end_date)
            .cloned()
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, SepaError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn data_range(&self, symbol: &str) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SepaError> {
        Ok(self.data.get(symbol).and_then(|bars| {
            if bars.is_empty() {
                None
            } else {
                Some((bars[0].date, bars[bars.len() - 1].date, bars.len()))
            }
        }))
    }
}
