//! Minervini trend template: eight price/moving-average criteria.
//!
//! All eight criteria are always evaluated together; there is no partial
//! evaluation. The result keeps both the count and which criteria passed.

use super::indicator::IndicatorSnapshot;

pub const CRITERIA_COUNT: u8 = 8;

/// Report labels, indexed by criterion number.
pub const CRITERION_LABELS: [&str; CRITERIA_COUNT as usize] = [
    "close above SMA150 and SMA200",
    "SMA150 above SMA200",
    "SMA200 rising over one month",
    "SMA50 above SMA150 and SMA200",
    "close above SMA50",
    "close at least 25% above 52-week low",
    "close within 25% of 52-week high",
    "outperforming benchmark",
];

/// Outcome of a trend-template evaluation: a bitset of passed criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendScore {
    bits: u8,
}

impl TrendScore {
    /// Number of criteria passed, 0..=8.
    pub fn score(&self) -> u8 {
        self.bits.count_ones() as u8
    }

    /// Whether criterion `index` (0-based) passed.
    pub fn passed(&self, index: u8) -> bool {
        index < CRITERIA_COUNT && self.bits & (1 << index) != 0
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }
}

pub fn evaluate(snap: &IndicatorSnapshot) -> TrendScore {
    let checks = [
        snap.close > snap.sma150 && snap.close > snap.sma200,
        snap.sma150 > snap.sma200,
        snap.sma200 > snap.sma200_month_ago,
        snap.sma50 > snap.sma150 && snap.sma50 > snap.sma200,
        snap.close > snap.sma50,
        snap.close >= 1.25 * snap.low_52w,
        snap.close >= 0.75 * snap.high_52w,
        snap.rs_differential > 0.0,
    ];

    let mut bits = 0u8;
    for (i, &passed) in checks.iter().enumerate() {
        if passed {
            bits |= 1 << i;
        }
    }
    TrendScore { bits }
}
