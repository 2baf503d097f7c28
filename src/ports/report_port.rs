//! Report generation port trait.

use std::path::Path;

use crate::domain::backtest::{BacktestConfig, BacktestResult};
use crate::domain::error::{SepaError, SymbolError};
use crate::domain::signal::Signal;
use crate::domain::sizing::SizingConfig;

/// Port for writing screening and backtest reports.
pub trait ReportPort {
    fn write_screen(
        &self,
        signals: &[Signal],
        skipped: &[SymbolError],
        sizing: &SizingConfig,
        output_path: &Path,
    ) -> Result<(), SepaError>;

    fn write_backtest(
        &self,
        result: &BacktestResult,
        config: &BacktestConfig,
        skipped: &[SymbolError],
        output_path: &Path,
    ) -> Result<(), SepaError>;
}
