//! CSV file data adapter.
//!
//! One file per symbol under a base directory, named `<SYMBOL>.csv`, with
//! the header `date,open,high,low,close,volume` and ISO dates.

use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use csv::StringRecord;

use crate::domain::error::SepaError;
use crate::domain::series::PriceBar;
use crate::ports::data_port::DataPort;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }

    fn read_all(&self, symbol: &str) -> Result<Vec<PriceBar>, SepaError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|_| SepaError::NoData {
            symbol: symbol.to_string(),
        })?;

        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| SepaError::MalformedRecord {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            })?;
            bars.push(parse_bar(symbol, &record)?);
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

fn field<'a>(symbol: &str, record: &'a StringRecord, index: usize, name: &str) -> Result<&'a str, SepaError> {
    record.get(index).ok_or_else(|| SepaError::MalformedRecord {
        symbol: symbol.to_string(),
        reason: format!("missing {name} column"),
    })
}

fn parse_bar(symbol: &str, record: &StringRecord) -> Result<PriceBar, SepaError> {
    let malformed = |name: &str, value: &str| SepaError::MalformedRecord {
        symbol: symbol.to_string(),
        reason: format!("invalid {name} value {value:?}"),
    };

    let date_str = field(symbol, record, 0, "date")?;
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| malformed("date", date_str))?;

    let price = |index: usize, name: &str| -> Result<f64, SepaError> {
        let raw = field(symbol, record, index, name)?;
        raw.parse().map_err(|_| malformed(name, raw))
    };

    let open = price(1, "open")?;
    let high = price(2, "high")?;
    let low = price(3, "low")?;
    let close = price(4, "close")?;

    let volume_str = field(symbol, record, 5, "volume")?;
    let volume = volume_str
        .parse()
        .map_err(|_| malformed("volume", volume_str))?;

    Ok(PriceBar {
        date,
        open,
        high,
        low,
        close,
        volume,
    })
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, SepaError> {
        let mut bars = self.read_all(symbol)?;
        bars.retain(|b| b.date >= start_date && b.date <= end_date);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, SepaError> {
        let entries = fs::read_dir(&self.base_path)?;

        let mut symbols = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if let Some(symbol) = name.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn data_range(&self, symbol: &str) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SepaError> {
        let bars = match self.read_all(symbol) {
            Ok(bars) => bars,
            Err(SepaError::NoData { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        if bars.is_empty() {
            return Ok(None);
        }
        Ok(Some((
            bars[0].date,
            bars[bars.len() - 1].date,
            bars.len(),
        )))
    }
}
