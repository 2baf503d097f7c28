//! Domain error types.

/// A per-symbol failure recorded during a screening or backtest run.
///
/// Symbols that fail validation or evaluation are skipped, never silently
/// dropped: the error travels with the run output so reports can surface it.
#[derive(Debug)]
pub struct SymbolError {
    pub symbol: String,
    pub error: SepaError,
}

/// Top-level error type for sepatrader.
#[derive(Debug, thiserror::Error)]
pub enum SepaError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("data gap in {symbol}: {reason}")]
    DataGap { symbol: String, reason: String },

    #[error("malformed price record for {symbol}: {reason}")]
    MalformedRecord { symbol: String, reason: String },

    #[error("risk calculation failed for {symbol}: {reason}")]
    RiskCalculation { symbol: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl From<&SepaError> for std::process::ExitCode {
    fn from(err: &SepaError) -> Self {
        let code: u8 = match err {
            SepaError::Io(_) | SepaError::Csv(_) => 1,
            SepaError::ConfigParse { .. }
            | SepaError::ConfigMissing { .. }
            | SepaError::ConfigInvalid { .. } => 2,
            SepaError::RiskCalculation { .. } => 4,
            SepaError::NoData { .. }
            | SepaError::InsufficientData { .. }
            | SepaError::DataGap { .. }
            | SepaError::MalformedRecord { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
