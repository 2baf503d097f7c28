//! Signal scoring: trend template plus VCP status → categorical recommendation.

use chrono::NaiveDate;
use rayon::prelude::*;

use super::error::{SepaError, SymbolError};
use super::indicator::{self, IndicatorCache};
use super::series::PriceSeries;
use super::trend_template::{self, TrendScore};
use super::vcp::{self, VcpConfig, VcpStatus};

pub const MAX_COMPOSITE_SCORE: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SignalCategory {
    StrongBuy,
    Buy,
    Watch,
    None,
}

impl std::fmt::Display for SignalCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SignalCategory::StrongBuy => "STRONG BUY",
            SignalCategory::Buy => "BUY",
            SignalCategory::Watch => "WATCH",
            SignalCategory::None => "NONE",
        };
        write!(f, "{label}")
    }
}

/// One recommendation for one symbol on one date. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub symbol: String,
    pub date: NaiveDate,
    pub category: SignalCategory,
    pub composite_score: u8,
    pub entry_price: f64,
    pub stop_price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScorerConfig {
    /// Fractional distance of the initial stop below entry.
    pub stop_fraction: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        ScorerConfig { stop_fraction: 0.075 }
    }
}

/// Combine a trend score and VCP status into a signal.
///
/// Composite = trend score (0-8), +1 if the pattern is detected, +1 if the
/// breakout is confirmed. Entry is the breakout close when confirmed, else
/// the current close; the stop sits `stop_fraction` below entry.
pub fn score(
    symbol: &str,
    date: NaiveDate,
    close: f64,
    trend: &TrendScore,
    vcp: &VcpStatus,
    config: &ScorerConfig,
) -> Signal {
    let mut composite = trend.score();
    if vcp.detected {
        composite += 1;
    }
    if vcp.breakout_confirmed {
        composite += 1;
    }

    let category = if composite >= 9 && vcp.breakout_confirmed {
        SignalCategory::StrongBuy
    } else if composite >= 7 && vcp.detected {
        SignalCategory::Buy
    } else if composite >= 5 {
        SignalCategory::Watch
    } else {
        SignalCategory::None
    };

    let entry_price = if vcp.breakout_confirmed {
        vcp.breakout_close.unwrap_or(close)
    } else {
        close
    };

    Signal {
        symbol: symbol.to_string(),
        date,
        category,
        composite_score: composite,
        entry_price,
        stop_price: entry_price * (1.0 - config.stop_fraction),
    }
}

/// Order signals for reporting: strongest category first, then composite
/// score, then symbol so equal scores stay deterministic.
pub fn rank(signals: &mut [Signal]) {
    signals.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then(b.composite_score.cmp(&a.composite_score))
            .then(a.symbol.cmp(&b.symbol))
    });
}

/// Screen the whole universe as of one date (live mode).
///
/// Per-symbol evaluation fans out across threads; failures are recorded per
/// symbol and never abort the pass. Symbols scoring `None` are dropped, the
/// rest come back ranked.
pub fn screen_universe(
    universe: &[PriceSeries],
    benchmark: &PriceSeries,
    as_of: NaiveDate,
    scorer: &ScorerConfig,
    vcp_config: &VcpConfig,
) -> (Vec<Signal>, Vec<SymbolError>) {
    let mut cache = IndicatorCache::new();
    for series in universe {
        cache.prime(series);
    }
    cache.prime(benchmark);

    let outcomes: Vec<Result<Signal, SymbolError>> = universe
        .par_iter()
        .map(|series| {
            evaluate(&cache, series, benchmark, as_of, scorer, vcp_config).map_err(|error| {
                SymbolError {
                    symbol: series.symbol.clone(),
                    error,
                }
            })
        })
        .collect();

    let mut signals = Vec::new();
    let mut skipped = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(signal) if signal.category != SignalCategory::None => signals.push(signal),
            Ok(_) => {}
            Err(err) => skipped.push(err),
        }
    }

    rank(&mut signals);
    (signals, skipped)
}

/// Full evaluation chain for one symbol on one date.
pub fn evaluate(
    cache: &IndicatorCache,
    series: &PriceSeries,
    benchmark: &PriceSeries,
    date: NaiveDate,
    scorer: &ScorerConfig,
    vcp_config: &VcpConfig,
) -> Result<Signal, SepaError> {
    let snap = indicator::snapshot(cache, series, benchmark, date)?;
    let trend = trend_template::evaluate(&snap);
    let status = vcp::detect(series, date, vcp_config)?;
    Ok(score(&series.symbol, date, snap.close, &trend, &status, scorer))
}
