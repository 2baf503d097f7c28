//! Symbol universe parsing and validation.
//!
//! Each symbol must produce a structurally valid series with a full trading
//! year of history; failures are recorded against the symbol and skipped so
//! one bad symbol never aborts a run.

use chrono::NaiveDate;

use super::error::{SepaError, SymbolError};
use super::indicator::MIN_PRICE_BARS;
use super::series::PriceSeries;
use crate::ports::data_port::DataPort;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

/// Parse a comma-separated symbol list: trimmed, uppercased, no blanks or
/// duplicates.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols: Vec<String> = Vec::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if symbols.contains(&symbol) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

pub struct UniverseValidation {
    pub series: Vec<PriceSeries>,
    pub skipped: Vec<SymbolError>,
}

/// Fetch and validate every symbol. Fatal only when no symbol survives.
pub fn validate_universe(
    data_port: &dyn DataPort,
    symbols: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<UniverseValidation, SepaError> {
    let mut series = Vec::new();
    let mut skipped = Vec::new();

    for symbol in symbols {
        match load_series(data_port, symbol, start_date, end_date) {
            Ok(s) => {
                eprintln!("  {}: {} bars [OK]", symbol, s.len());
                series.push(s);
            }
            Err(error) => {
                eprintln!("warning: skipping {symbol} ({error})");
                skipped.push(SymbolError {
                    symbol: symbol.clone(),
                    error,
                });
            }
        }
    }

    if series.is_empty() {
        return Err(SepaError::InsufficientData {
            symbol: "universe".into(),
            bars: 0,
            minimum: MIN_PRICE_BARS,
        });
    }

    if !skipped.is_empty() {
        eprintln!(
            "Proceeding with {} of {} symbols",
            series.len(),
            series.len() + skipped.len()
        );
    }

    Ok(UniverseValidation { series, skipped })
}

/// Fetch one symbol and hold it to the full validation bar: structural
/// integrity via [`PriceSeries::new`] plus the minimum-history requirement.
pub fn load_series(
    data_port: &dyn DataPort,
    symbol: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<PriceSeries, SepaError> {
    let bars = data_port.fetch_bars(symbol, start_date, end_date)?;
    let series = PriceSeries::new(symbol.to_string(), bars)?;
    if series.len() < MIN_PRICE_BARS {
        return Err(SepaError::InsufficientData {
            symbol: symbol.to_string(),
            bars: series.len(),
            minimum: MIN_PRICE_BARS,
        });
    }
    Ok(series)
}
