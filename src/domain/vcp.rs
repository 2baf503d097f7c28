//! Volatility contraction pattern detection.
//!
//! A VCP is a base of successive pullbacks, each shallower than the last and
//! on lower average volume, resolved by a close above the base's resistance
//! on well-above-average volume. Swings are found with a minimum-move zig-zag
//! over closes so sub-threshold noise never counts as a contraction leg.

use chrono::NaiveDate;

use super::error::SepaError;
use super::series::{PriceBar, PriceSeries};

/// Window for the breakout-day average-volume comparison.
const BREAKOUT_VOLUME_WINDOW: usize = 20;

/// Fewer bars than this in the lookback window cannot form a pattern.
const MIN_WINDOW_BARS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct VcpConfig {
    /// Bars scanned for the pattern, ending at the evaluation date.
    pub lookback_bars: usize,
    /// Minimum move, in percent, for a swing leg to register.
    pub min_swing_pct: f64,
    /// Breakout volume must be at least this multiple of average volume.
    pub breakout_volume_ratio: f64,
    /// Minimum qualifying contractions for a pattern.
    pub min_contractions: usize,
}

impl Default for VcpConfig {
    fn default() -> Self {
        VcpConfig {
            lookback_bars: 60,
            min_swing_pct: 2.0,
            breakout_volume_ratio: 1.5,
            min_contractions: 2,
        }
    }
}

/// Pattern state as of one evaluation date.
///
/// `detected` requires both the contraction sequence and a confirmed
/// breakout. A qualifying sequence with no breakout yet reports its
/// contraction count with `detected == false`, the watch state.
#[derive(Debug, Clone, PartialEq)]
pub struct VcpStatus {
    pub detected: bool,
    pub contraction_count: usize,
    pub breakout_confirmed: bool,
    pub breakout_date: Option<NaiveDate>,
    pub breakout_close: Option<f64>,
}

impl VcpStatus {
    pub fn none() -> Self {
        VcpStatus {
            detected: false,
            contraction_count: 0,
            breakout_confirmed: false,
            breakout_date: None,
            breakout_close: None,
        }
    }

    fn watch(contraction_count: usize) -> Self {
        VcpStatus {
            contraction_count,
            ..VcpStatus::none()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SwingKind {
    Peak,
    Trough,
}

#[derive(Debug, Clone, Copy)]
struct SwingPoint {
    index: usize,
    kind: SwingKind,
}

/// One completed peak-to-trough leg.
#[derive(Debug, Clone, Copy)]
struct Contraction {
    peak_index: usize,
    trough_index: usize,
    depth_pct: f64,
    avg_volume: f64,
}

/// Scan `series` as of `date` for a volatility contraction pattern.
pub fn detect(
    series: &PriceSeries,
    date: NaiveDate,
    config: &VcpConfig,
) -> Result<VcpStatus, SepaError> {
    let index = series.index_of(date).ok_or_else(|| SepaError::NoData {
        symbol: series.symbol.clone(),
    })?;

    let start = (index + 1).saturating_sub(config.lookback_bars);
    let window = &series.bars()[start..=index];
    if window.len() < MIN_WINDOW_BARS {
        return Ok(VcpStatus::none());
    }

    let pivots = swing_points(window, config.min_swing_pct / 100.0);
    let legs = contraction_legs(window, &pivots);
    if legs.is_empty() {
        return Ok(VcpStatus::none());
    }

    // Most recent maximal run of strictly shrinking pullbacks. Equal depths
    // break the run, so the tie rule in swing_points (extend the leg) is the
    // only place equality is resolved.
    let mut run_start = legs.len() - 1;
    while run_start > 0 && legs[run_start].depth_pct < legs[run_start - 1].depth_pct {
        run_start -= 1;
    }
    let run = &legs[run_start..];
    let count = run.len();

    if count < config.min_contractions {
        return Ok(VcpStatus::watch(count));
    }

    // Accumulation signature: volume must dry up across the whole run.
    let volume_declining = run.windows(2).all(|w| w[1].avg_volume < w[0].avg_volume);
    if !volume_declining {
        return Ok(VcpStatus::watch(count));
    }

    let resistance = window[run[0].peak_index..=run[count - 1].trough_index]
        .iter()
        .map(|b| b.close)
        .fold(f64::MIN, f64::max);

    for rel in run[count - 1].trough_index + 1..window.len() {
        let bar = &window[rel];
        if bar.close <= resistance {
            continue;
        }
        let Some(avg) = trailing_avg_volume(series.bars(), start + rel) else {
            continue;
        };
        if bar.volume as f64 >= config.breakout_volume_ratio * avg {
            return Ok(VcpStatus {
                detected: true,
                contraction_count: count,
                breakout_confirmed: true,
                breakout_date: Some(bar.date),
                breakout_close: Some(bar.close),
            });
        }
    }

    Ok(VcpStatus::watch(count))
}

/// Zig-zag pivots over closes. A reversal registers only once price moves
/// `threshold` (fractional) away from the running extreme; ties extend the
/// current leg, so the later of two equal extremes wins.
fn swing_points(window: &[PriceBar], threshold: f64) -> Vec<SwingPoint> {
    let closes: Vec<f64> = window.iter().map(|b| b.close).collect();
    let mut pivots = Vec::new();

    // rising == Some(true) once the first leg direction is established
    let mut rising: Option<bool> = None;
    let mut extreme = 0usize;
    let mut hi = 0usize;
    let mut lo = 0usize;

    for i in 1..closes.len() {
        let close = closes[i];
        match rising {
            None => {
                if close >= closes[hi] {
                    hi = i;
                }
                if close <= closes[lo] {
                    lo = i;
                }
                if close >= closes[lo] * (1.0 + threshold) {
                    pivots.push(SwingPoint {
                        index: lo,
                        kind: SwingKind::Trough,
                    });
                    rising = Some(true);
                    extreme = hi;
                } else if close <= closes[hi] * (1.0 - threshold) {
                    pivots.push(SwingPoint {
                        index: hi,
                        kind: SwingKind::Peak,
                    });
                    rising = Some(false);
                    extreme = lo;
                }
            }
            Some(true) => {
                if close >= closes[extreme] {
                    extreme = i;
                } else if close <= closes[extreme] * (1.0 - threshold) {
                    pivots.push(SwingPoint {
                        index: extreme,
                        kind: SwingKind::Peak,
                    });
                    rising = Some(false);
                    extreme = i;
                }
            }
            Some(false) => {
                if close <= closes[extreme] {
                    extreme = i;
                } else if close >= closes[extreme] * (1.0 + threshold) {
                    pivots.push(SwingPoint {
                        index: extreme,
                        kind: SwingKind::Trough,
                    });
                    rising = Some(true);
                    extreme = i;
                }
            }
        }
    }

    pivots
}

/// Pair each confirmed peak with the trough that follows it.
fn contraction_legs(window: &[PriceBar], pivots: &[SwingPoint]) -> Vec<Contraction> {
    let mut legs = Vec::new();
    for pair in pivots.windows(2) {
        let (first, second) = (pair[0], pair[1]);
        if first.kind != SwingKind::Peak || second.kind != SwingKind::Trough {
            continue;
        }
        let peak = window[first.index].close;
        let trough = window[second.index].close;
        let leg = &window[first.index..=second.index];
        legs.push(Contraction {
            peak_index: first.index,
            trough_index: second.index,
            depth_pct: (peak - trough) / peak * 100.0,
            avg_volume: leg.iter().map(|b| b.volume as f64).sum::<f64>() / leg.len() as f64,
        });
    }
    legs
}

/// Mean volume of up to [`BREAKOUT_VOLUME_WINDOW`] bars preceding `index`.
fn trailing_avg_volume(bars: &[PriceBar], index: usize) -> Option<f64> {
    let len = BREAKOUT_VOLUME_WINDOW.min(index);
    if len == 0 {
        return None;
    }
    let sum: f64 = bars[index - len..index].iter().map(|b| b.volume as f64).sum();
    Some(sum / len as f64)
}
