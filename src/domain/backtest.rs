//! Backtest simulator: chronological replay of signals over the universe.
//!
//! One pass over the merged trading calendar. Each day processes exits for
//! every open position first, then evaluates entries, then marks equity.
//! Signal evaluation fans out across symbols; all state mutation (cash,
//! open positions, the equity curve) happens serially on one
//! [`BacktestState`] owned by the run.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use rayon::prelude::*;

use super::error::SepaError;
use super::indicator::{self, IndicatorCache};
use super::metrics::Metrics;
use super::series::PriceSeries;
use super::signal::{self, ScorerConfig, Signal, SignalCategory};
use super::sizing::{size_position, SizingConfig};
use super::trend_template;
use super::vcp::{self, VcpConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StopLoss,
    TrailingStop,
    EndOfPeriod,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExitReason::StopLoss => "STOP_LOSS",
            ExitReason::TrailingStop => "TRAILING_STOP",
            ExitReason::EndOfPeriod => "END_OF_PERIOD",
        };
        write!(f, "{label}")
    }
}

/// One position lifecycle. Created on entry, mutated only by the simulator,
/// closed exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub symbol: String,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub stop_price: f64,
    pub shares: i64,
    pub exit_date: Option<NaiveDate>,
    pub exit_price: Option<f64>,
    pub exit_reason: Option<ExitReason>,
    pub status: TradeStatus,
}

impl Trade {
    pub fn market_value(&self, price: f64) -> f64 {
        self.shares as f64 * price
    }

    /// Realized profit; zero while the trade is open.
    pub fn pnl(&self) -> f64 {
        self.exit_price
            .map_or(0.0, |exit| (exit - self.entry_price) * self.shares as f64)
    }

    /// Realized return in percent; zero while the trade is open.
    pub fn pnl_pct(&self) -> f64 {
        self.exit_price
            .map_or(0.0, |exit| (exit / self.entry_price - 1.0) * 100.0)
    }

    pub fn holding_days(&self) -> i64 {
        self.exit_date
            .map_or(0, |exit| (exit - self.entry_date).num_days())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Portfolio state for one simulation run. Created at the start, consumed
/// into the result at the end; nothing survives across runs.
#[derive(Debug)]
pub struct BacktestState {
    pub cash: f64,
    pub initial_capital: f64,
    pub open_positions: BTreeMap<String, Trade>,
    pub closed_trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl BacktestState {
    pub fn new(initial_capital: f64) -> Self {
        BacktestState {
            cash: initial_capital,
            initial_capital,
            open_positions: BTreeMap::new(),
            closed_trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub max_concurrent_positions: usize,
    /// EMA period for the trailing stop on profitable positions.
    pub trailing_stop_period: usize,
    pub sizing: SizingConfig,
    pub scorer: ScorerConfig,
    pub vcp: VcpConfig,
}

#[derive(Debug)]
pub struct BacktestResult {
    pub closed_trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub metrics: Metrics,
    /// Entries dropped by the position sizer during the run.
    pub entries_skipped: usize,
}

enum EntryOutcome {
    Entered,
    InsufficientCash,
}

/// Replay the universe chronologically and return the closed-trade ledger,
/// equity curve and summary statistics.
///
/// The universe is assumed pre-validated (see [`super::universe`]); a
/// per-symbol evaluation failure just skips that symbol for that day.
pub fn run_backtest(
    universe: &[PriceSeries],
    benchmark: &PriceSeries,
    config: &BacktestConfig,
) -> Result<BacktestResult, SepaError> {
    let mut cache = IndicatorCache::new();
    for series in universe {
        cache.prime(series);
    }
    cache.prime(benchmark);

    let trailing_ema: BTreeMap<&str, Vec<Option<f64>>> = universe
        .iter()
        .map(|s| {
            (
                s.symbol.as_str(),
                indicator::ema_series(s, config.trailing_stop_period),
            )
        })
        .collect();

    let by_symbol: BTreeMap<&str, &PriceSeries> =
        universe.iter().map(|s| (s.symbol.as_str(), s)).collect();

    let timeline: Vec<NaiveDate> = universe
        .iter()
        .flat_map(|s| s.bars().iter().map(|b| b.date))
        .filter(|d| *d >= config.start_date && *d <= config.end_date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    if timeline.is_empty() {
        return Err(SepaError::NoData {
            symbol: "universe".into(),
        });
    }

    let mut state = BacktestState::new(config.initial_capital);
    let mut last_close: BTreeMap<String, f64> = BTreeMap::new();
    let mut entries_skipped = 0usize;

    for &day in &timeline {
        for series in universe {
            if let Some(bar) = series.bar(day) {
                last_close.insert(series.symbol.clone(), bar.close);
            }
        }

        process_exits(&mut state, day, &by_symbol, &trailing_ema);

        let mut candidates: Vec<Signal> = universe
            .par_iter()
            .filter(|s| !state.open_positions.contains_key(&s.symbol))
            .filter_map(|s| entry_signal(&cache, s, benchmark, day, config))
            .collect();
        signal::rank(&mut candidates);

        for candidate in &candidates {
            if state.open_positions.len() >= config.max_concurrent_positions {
                break;
            }
            match apply_entry(&mut state, candidate, &last_close, &config.sizing) {
                Ok(EntryOutcome::Entered) | Ok(EntryOutcome::InsufficientCash) => {}
                Err(e) => {
                    eprintln!("warning: skipping entry for {} on {day}: {e}", candidate.symbol);
                    entries_skipped += 1;
                }
            }
        }

        let equity = mark_to_market(&state, &last_close);
        state.equity_curve.push(EquityPoint { date: day, equity });
    }

    // Force-close whatever is still open at each symbol's last bar in range.
    let open_symbols: Vec<String> = state.open_positions.keys().cloned().collect();
    for symbol in open_symbols {
        if let Some(series) = by_symbol.get(symbol.as_str()) {
            let last = series
                .bars()
                .iter()
                .rev()
                .find(|b| b.date <= config.end_date);
            if let Some(bar) = last {
                close_position(&mut state, &symbol, bar.date, bar.close, ExitReason::EndOfPeriod);
            }
        }
    }

    let metrics = Metrics::compute(
        &state.closed_trades,
        &state.equity_curve,
        state.initial_capital,
    );

    Ok(BacktestResult {
        closed_trades: state.closed_trades,
        equity_curve: state.equity_curve,
        metrics,
        entries_skipped,
    })
}

/// Evaluate one symbol for a new entry on `day`.
///
/// Only a breakout confirmed on `day` itself is actionable: the signal's
/// entry price is the breakout close, which is only a tradeable fill on the
/// breakout bar. Older breakouts remain visible to screening but do not
/// trigger simulated entries.
fn entry_signal(
    cache: &IndicatorCache,
    series: &PriceSeries,
    benchmark: &PriceSeries,
    day: NaiveDate,
    config: &BacktestConfig,
) -> Option<Signal> {
    series.index_of(day)?;
    let snap = indicator::snapshot(cache, series, benchmark, day).ok()?;
    let trend = trend_template::evaluate(&snap);
    let status = vcp::detect(series, day, &config.vcp).ok()?;
    if status.breakout_date != Some(day) {
        return None;
    }

    let signal = signal::score(&series.symbol, day, snap.close, &trend, &status, &config.scorer);
    matches!(
        signal.category,
        SignalCategory::StrongBuy | SignalCategory::Buy
    )
    .then_some(signal)
}

fn apply_entry(
    state: &mut BacktestState,
    signal: &Signal,
    last_close: &BTreeMap<String, f64>,
    sizing: &SizingConfig,
) -> Result<EntryOutcome, SepaError> {
    let equity = mark_to_market(state, last_close);
    let shares = size_position(
        &signal.symbol,
        equity,
        signal.entry_price,
        signal.stop_price,
        sizing,
    )?;

    let cost = shares as f64 * signal.entry_price;
    if cost > state.cash {
        return Ok(EntryOutcome::InsufficientCash);
    }

    state.cash -= cost;
    state.open_positions.insert(
        signal.symbol.clone(),
        Trade {
            symbol: signal.symbol.clone(),
            entry_date: signal.date,
            entry_price: signal.entry_price,
            stop_price: signal.stop_price,
            shares,
            exit_date: None,
            exit_price: None,
            exit_reason: None,
            status: TradeStatus::Open,
        },
    );
    Ok(EntryOutcome::Entered)
}

/// Two-pass exit check: collect triggered positions, then close them.
///
/// The hard stop triggers on the day's low; the trailing stop (the greater
/// of the initial stop and the trailing EMA) triggers on the close once the
/// position is profitable. When both trigger on the same bar the position
/// exits at the tighter, higher level.
fn process_exits(
    state: &mut BacktestState,
    day: NaiveDate,
    by_symbol: &BTreeMap<&str, &PriceSeries>,
    trailing_ema: &BTreeMap<&str, Vec<Option<f64>>>,
) {
    let mut to_exit: Vec<(String, f64, ExitReason)> = Vec::new();

    for (symbol, trade) in &state.open_positions {
        let Some(series) = by_symbol.get(symbol.as_str()) else {
            continue;
        };
        let Some(index) = series.index_of(day) else {
            continue;
        };
        let bar = series.bar_at(index);

        let stop_hit = bar.low <= trade.stop_price;

        let mut trailing_level = None;
        if bar.close > trade.entry_price {
            let ema = trailing_ema
                .get(symbol.as_str())
                .and_then(|values| values.get(index).copied().flatten());
            if let Some(ema) = ema {
                let level = ema.max(trade.stop_price);
                if bar.close < level {
                    trailing_level = Some(level);
                }
            }
        }

        let exit = match (stop_hit, trailing_level) {
            (true, Some(level)) if level > trade.stop_price => {
                Some((level, ExitReason::TrailingStop))
            }
            (true, _) => Some((trade.stop_price, ExitReason::StopLoss)),
            (false, Some(_)) => Some((bar.close, ExitReason::TrailingStop)),
            (false, None) => None,
        };

        if let Some((price, reason)) = exit {
            to_exit.push((symbol.clone(), price, reason));
        }
    }

    for (symbol, price, reason) in to_exit {
        close_position(state, &symbol, day, price, reason);
    }
}

fn close_position(
    state: &mut BacktestState,
    symbol: &str,
    day: NaiveDate,
    price: f64,
    reason: ExitReason,
) {
    if let Some(mut trade) = state.open_positions.remove(symbol) {
        state.cash += trade.shares as f64 * price;
        trade.exit_date = Some(day);
        trade.exit_price = Some(price);
        trade.exit_reason = Some(reason);
        trade.status = TradeStatus::Closed;
        state.closed_trades.push(trade);
    }
}

fn mark_to_market(state: &BacktestState, last_close: &BTreeMap<String, f64>) -> f64 {
    let positions: f64 = state
        .open_positions
        .values()
        .map(|trade| {
            let price = last_close
                .get(&trade.symbol)
                .copied()
                .unwrap_or(trade.entry_price);
            trade.market_value(price)
        })
        .sum();
    state.cash + positions
}
