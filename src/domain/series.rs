//! Price bars and validated per-symbol price series.

use chrono::NaiveDate;
use std::collections::HashMap;

use super::error::SepaError;

/// Largest calendar gap between consecutive bars before the series is
/// considered broken (covers exchange holidays, catches delistings).
pub const MAX_CALENDAR_GAP_DAYS: i64 = 21;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// An ordered price history for one symbol.
///
/// Construction validates ordering, so every `PriceSeries` in circulation is
/// strictly increasing by date with no duplicates and no oversized gaps.
/// Bars are read-only after construction.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    pub symbol: String,
    bars: Vec<PriceBar>,
    date_index: HashMap<NaiveDate, usize>,
}

impl PriceSeries {
    pub fn new(symbol: String, bars: Vec<PriceBar>) -> Result<Self, SepaError> {
        if bars.is_empty() {
            return Err(SepaError::NoData { symbol });
        }

        for pair in bars.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.date == prev.date {
                return Err(SepaError::DataGap {
                    symbol,
                    reason: format!("duplicate date {}", next.date),
                });
            }
            if next.date < prev.date {
                return Err(SepaError::DataGap {
                    symbol,
                    reason: format!("out-of-order date {} after {}", next.date, prev.date),
                });
            }
            let gap = (next.date - prev.date).num_days();
            if gap > MAX_CALENDAR_GAP_DAYS {
                return Err(SepaError::DataGap {
                    symbol,
                    reason: format!("{gap}-day gap between {} and {}", prev.date, next.date),
                });
            }
        }

        let date_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date, i))
            .collect();

        Ok(Self {
            symbol,
            bars,
            date_index,
        })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn bar_at(&self, index: usize) -> &PriceBar {
        &self.bars[index]
    }

    pub fn bar(&self, date: NaiveDate) -> Option<&PriceBar> {
        self.index_of(date).map(|i| &self.bars[i])
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }

    pub fn first_bar(&self) -> &PriceBar {
        &self.bars[0]
    }

    pub fn last_bar(&self) -> &PriceBar {
        &self.bars[self.bars.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str, close: f64) -> PriceBar {
        PriceBar {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 10_000,
        }
    }

    #[test]
    fn new_builds_date_index() {
        let series = PriceSeries::new(
            "RELIANCE".into(),
            vec![
                bar("2024-01-01", 100.0),
                bar("2024-01-02", 101.0),
                bar("2024-01-03", 102.0),
            ],
        )
        .unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(
            series.index_of(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
            Some(1)
        );
        let looked_up = series.bar(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert!((looked_up.unwrap().close - 102.0).abs() < f64::EPSILON);
    }

    #[test]
    fn new_rejects_empty() {
        let result = PriceSeries::new("RELIANCE".into(), vec![]);
        assert!(matches!(result, Err(SepaError::NoData { .. })));
    }

    #[test]
    fn new_rejects_duplicate_date() {
        let result = PriceSeries::new(
            "RELIANCE".into(),
            vec![bar("2024-01-01", 100.0), bar("2024-01-01", 101.0)],
        );
        assert!(matches!(result, Err(SepaError::DataGap { .. })));
    }

    #[test]
    fn new_rejects_out_of_order() {
        let result = PriceSeries::new(
            "RELIANCE".into(),
            vec![bar("2024-01-02", 100.0), bar("2024-01-01", 101.0)],
        );
        assert!(matches!(result, Err(SepaError::DataGap { .. })));
    }

    #[test]
    fn new_rejects_oversized_gap() {
        let result = PriceSeries::new(
            "RELIANCE".into(),
            vec![bar("2024-01-01", 100.0), bar("2024-02-15", 101.0)],
        );
        assert!(matches!(result, Err(SepaError::DataGap { .. })));
    }

    #[test]
    fn holiday_gap_is_tolerated() {
        // 10 calendar days between bars is within tolerance
        let result = PriceSeries::new(
            "RELIANCE".into(),
            vec![bar("2024-01-01", 100.0), bar("2024-01-11", 101.0)],
        );
        assert!(result.is_ok());
    }

    #[test]
    fn first_and_last_bar() {
        let series = PriceSeries::new(
            "RELIANCE".into(),
            vec![bar("2024-01-01", 100.0), bar("2024-01-02", 105.0)],
        )
        .unwrap();

        assert_eq!(
            series.first_bar().date,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert!((series.last_bar().close - 105.0).abs() < f64::EPSILON);
    }

    #[test]
    fn lookup_missing_date() {
        let series =
            PriceSeries::new("RELIANCE".into(), vec![bar("2024-01-01", 100.0)]).unwrap();
        assert!(series.bar(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()).is_none());
    }
}
