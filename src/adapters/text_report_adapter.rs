//! Plain-text report adapter, plus CSV exports of signals and trades.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::domain::backtest::{BacktestConfig, BacktestResult, Trade};
use crate::domain::error::{SepaError, SymbolError};
use crate::domain::signal::{Signal, SignalCategory};
use crate::domain::sizing::{position_size_pct, SizingConfig};
use crate::ports::report_port::ReportPort;

pub struct TextReportAdapter;

impl TextReportAdapter {
    pub fn render_screen(
        &self,
        signals: &[Signal],
        skipped: &[SymbolError],
        sizing: &SizingConfig,
    ) -> String {
        let mut out = String::new();
        out.push_str("SEPA SCREENING RESULTS\n");
        out.push_str("======================\n");

        if let Some(first) = signals.first() {
            out.push_str(&format!("As of: {}\n", first.date));
        }

        let count = |category: SignalCategory| {
            signals.iter().filter(|s| s.category == category).count()
        };
        out.push_str(&format!(
            "Signals: {} (STRONG BUY {} / BUY {} / WATCH {})\n\n",
            signals.len(),
            count(SignalCategory::StrongBuy),
            count(SignalCategory::Buy),
            count(SignalCategory::Watch),
        ));

        for (rank, signal) in signals.iter().enumerate() {
            let size = position_size_pct(signal.entry_price, signal.stop_price, sizing);
            out.push_str(&format!(
                "{:3}. {:<12} {:<11} {:>2}/10  entry {:>10.2}  stop {:>10.2}  size {:.1}%\n",
                rank + 1,
                signal.symbol,
                signal.category.to_string(),
                signal.composite_score,
                signal.entry_price,
                signal.stop_price,
                size,
            ));
        }

        if signals.is_empty() {
            out.push_str("No symbols passed the screening criteria.\n");
        }

        push_skipped(&mut out, skipped);
        out
    }

    pub fn render_backtest(
        &self,
        result: &BacktestResult,
        config: &BacktestConfig,
        skipped: &[SymbolError],
    ) -> String {
        let m = &result.metrics;
        let final_equity = result
            .equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(config.initial_capital);

        let mut out = String::new();
        out.push_str("SEPA STRATEGY BACKTEST RESULTS\n");
        out.push_str("==============================\n");
        out.push_str(&format!(
            "Period: {} to {}\n",
            config.start_date, config.end_date
        ));
        out.push_str(&format!("Initial capital: {:.2}\n", config.initial_capital));
        out.push_str(&format!("Final equity:    {final_equity:.2}\n\n"));

        out.push_str("Performance\n");
        out.push_str("-----------\n");
        out.push_str(&format!("Total return:      {:.2}%\n", m.total_return * 100.0));
        out.push_str(&format!(
            "Annualized return: {:.2}%\n",
            m.annualized_return * 100.0
        ));
        out.push_str(&format!("Max drawdown:      -{:.1}%\n", m.max_drawdown * 100.0));
        out.push_str(&format!("Sharpe ratio:      {:.2}\n", m.sharpe_ratio));
        out.push_str(&format!("Sortino ratio:     {:.2}\n\n", m.sortino_ratio));

        out.push_str("Trading statistics\n");
        out.push_str("------------------\n");
        out.push_str(&format!(
            "Total trades: {} (won {} / lost {} / breakeven {})\n",
            m.total_trades, m.trades_won, m.trades_lost, m.trades_breakeven
        ));
        out.push_str(&format!("Win rate:          {:.1}%\n", m.win_rate * 100.0));
        out.push_str(&format!("Average win:       {:+.2}%\n", m.avg_win_pct));
        out.push_str(&format!("Average loss:      {:+.2}%\n", m.avg_loss_pct));
        out.push_str(&format!("Largest win:       {:+.2}%\n", m.largest_win_pct));
        out.push_str(&format!("Largest loss:      {:+.2}%\n", m.largest_loss_pct));
        out.push_str(&format!("Profit factor:     {:.2}\n", m.profit_factor));
        out.push_str(&format!("Avg holding days:  {:.1}\n", m.avg_holding_days));
        out.push_str(&format!(
            "Max consecutive losses: {}\n",
            m.max_consecutive_losses
        ));
        if result.entries_skipped > 0 {
            out.push_str(&format!(
                "Entries skipped by sizer: {}\n",
                result.entries_skipped
            ));
        }

        push_skipped(&mut out, skipped);
        out
    }

    /// Write the ranked signal table as CSV.
    pub fn export_signals_csv(
        &self,
        signals: &[Signal],
        sizing: &SizingConfig,
        path: &Path,
    ) -> Result<(), SepaError> {
        let mut writer = csv::Writer::from_path(path)?;
        for signal in signals {
            writer
                .serialize(SignalRow::from_signal(signal, sizing))
                .map_err(csv_error)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the closed-trade ledger as CSV.
    pub fn export_trades_csv(&self, trades: &[Trade], path: &Path) -> Result<(), SepaError> {
        let mut writer = csv::Writer::from_path(path)?;
        for trade in trades {
            writer.serialize(TradeRow::from_trade(trade)).map_err(csv_error)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl ReportPort for TextReportAdapter {
    fn write_screen(
        &self,
        signals: &[Signal],
        skipped: &[SymbolError],
        sizing: &SizingConfig,
        output_path: &Path,
    ) -> Result<(), SepaError> {
        fs::write(output_path, self.render_screen(signals, skipped, sizing))?;
        Ok(())
    }

    fn write_backtest(
        &self,
        result: &BacktestResult,
        config: &BacktestConfig,
        skipped: &[SymbolError],
        output_path: &Path,
    ) -> Result<(), SepaError> {
        fs::write(output_path, self.render_backtest(result, config, skipped))?;
        Ok(())
    }
}

fn push_skipped(out: &mut String, skipped: &[SymbolError]) {
    if skipped.is_empty() {
        return;
    }
    out.push_str("\nSkipped symbols:\n");
    for entry in skipped {
        out.push_str(&format!("  {}: {}\n", entry.symbol, entry.error));
    }
}

fn csv_error(e: csv::Error) -> SepaError {
    SepaError::Io(std::io::Error::other(e))
}

#[derive(Debug, Serialize)]
struct SignalRow {
    symbol: String,
    date: String,
    category: String,
    composite_score: u8,
    entry_price: f64,
    stop_price: f64,
    position_size_pct: f64,
}

impl SignalRow {
    fn from_signal(signal: &Signal, sizing: &SizingConfig) -> Self {
        SignalRow {
            symbol: signal.symbol.clone(),
            date: signal.date.to_string(),
            category: signal.category.to_string(),
            composite_score: signal.composite_score,
            entry_price: signal.entry_price,
            stop_price: signal.stop_price,
            position_size_pct: position_size_pct(signal.entry_price, signal.stop_price, sizing),
        }
    }
}

#[derive(Debug, Serialize)]
struct TradeRow {
    symbol: String,
    entry_date: String,
    exit_date: String,
    entry_price: f64,
    exit_price: f64,
    shares: i64,
    pnl: f64,
    pnl_pct: f64,
    holding_days: i64,
    exit_reason: String,
}

impl TradeRow {
    fn from_trade(trade: &Trade) -> Self {
        TradeRow {
            symbol: trade.symbol.clone(),
            entry_date: trade.entry_date.to_string(),
            exit_date: trade.exit_date.map(|d| d.to_string()).unwrap_or_default(),
            entry_price: trade.entry_price,
            exit_price: trade.exit_price.unwrap_or(0.0),
            shares: trade.shares,
            pnl: trade.pnl(),
            pnl_pct: trade.pnl_pct(),
            holding_days: trade.holding_days(),
            exit_reason: trade
                .exit_reason
                .map(|r| r.to_string())
                .unwrap_or_default(),
        }
    }
}
