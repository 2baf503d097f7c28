//! Market-data access port trait.
//!
//! The core only ever sees materialized ordered bars; where they come from
//! (CSV files, a database, a download) is the adapter's business.

use chrono::NaiveDate;

use crate::domain::error::SepaError;
use crate::domain::series::PriceBar;

pub trait DataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, SepaError>;

    fn list_symbols(&self) -> Result<Vec<String>, SepaError>;

    /// (first date, last date, bar count) for a symbol, `None` if unknown.
    fn data_range(&self, symbol: &str) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SepaError>;
}
