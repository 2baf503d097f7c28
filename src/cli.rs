//! CLI definition and dispatch.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::text_report_adapter::TextReportAdapter;
use crate::domain::backtest::{run_backtest, BacktestConfig};
use crate::domain::error::SepaError;
use crate::domain::signal::{screen_universe, ScorerConfig};
use crate::domain::sizing::SizingConfig;
use crate::domain::universe::{load_series, parse_symbols, validate_universe};
use crate::domain::vcp::VcpConfig;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

/// Calendar days fetched ahead of the first evaluation date so every symbol
/// can carry a full trading year of bars.
const WARMUP_CALENDAR_DAYS: i64 = 550;

#[derive(Parser, Debug)]
#[command(name = "sepatrader", about = "SEPA trend screener and backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Screen the universe for current entry signals
    Screen {
        #[arg(short, long)]
        config: PathBuf,
        /// Report file; prints to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Override the configured symbol list
        #[arg(long)]
        symbols: Option<String>,
        /// Evaluation date (YYYY-MM-DD); defaults to the benchmark's last bar
        #[arg(long)]
        date: Option<String>,
        /// Also export the ranked signal table as CSV
        #[arg(long)]
        signals_csv: Option<PathBuf>,
    },
    /// Run a historical backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Report file; prints to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Override the configured symbol list
        #[arg(long)]
        symbols: Option<String>,
        /// Also export the closed-trade ledger as CSV
        #[arg(long)]
        trades_csv: Option<PathBuf>,
    },
    /// List symbols available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the stored date range for symbols
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Validate a config file without running anything
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Screen {
            config,
            output,
            symbols,
            date,
            signals_csv,
        } => run_screen(
            &config,
            output.as_deref(),
            symbols.as_deref(),
            date.as_deref(),
            signals_csv.as_deref(),
        ),
        Command::Backtest {
            config,
            output,
            symbols,
            trades_csv,
        } => run_backtest_command(
            &config,
            output.as_deref(),
            symbols.as_deref(),
            trades_csv.as_deref(),
        ),
        Command::ListSymbols { config } => run_list_symbols(&config),
        Command::Info { config, symbol } => run_info(&config, symbol.as_deref()),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_screen(
    config_path: &Path,
    output: Option<&Path>,
    symbols_override: Option<&str>,
    date_override: Option<&str>,
    signals_csv: Option<&Path>,
) -> Result<(), SepaError> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    let (scorer, vcp, sizing) = build_screen_params(&adapter)?;

    let data_port = CsvAdapter::new(data_dir(&adapter)?);
    let benchmark_symbol = benchmark_symbol(&adapter);

    let as_of = match date_override {
        Some(value) => parse_date(value, "screen", "date")?,
        None => {
            let range = data_port
                .data_range(&benchmark_symbol)?
                .ok_or_else(|| SepaError::NoData {
                    symbol: benchmark_symbol.clone(),
                })?;
            range.1
        }
    };
    let history_start = as_of - Duration::days(WARMUP_CALENDAR_DAYS);

    let benchmark = load_series(&data_port, &benchmark_symbol, history_start, as_of)?;
    let symbols = universe_symbols(symbols_override, &adapter)?;

    eprintln!("Validating {} symbols...", symbols.len());
    let validation = validate_universe(&data_port, &symbols, history_start, as_of)?;

    eprintln!("Screening {} symbols as of {as_of}", validation.series.len());
    let (signals, evaluation_skipped) =
        screen_universe(&validation.series, &benchmark, as_of, &scorer, &vcp);

    let mut skipped = validation.skipped;
    skipped.extend(evaluation_skipped);

    let reporter = TextReportAdapter;
    match output {
        Some(path) => {
            reporter.write_screen(&signals, &skipped, &sizing, path)?;
            eprintln!("Report written to {}", path.display());
        }
        None => print!("{}", reporter.render_screen(&signals, &skipped, &sizing)),
    }

    if let Some(path) = signals_csv {
        reporter.export_signals_csv(&signals, &sizing, path)?;
        eprintln!("Signals written to {}", path.display());
    }

    Ok(())
}

fn run_backtest_command(
    config_path: &Path,
    output: Option<&Path>,
    symbols_override: Option<&str>,
    trades_csv: Option<&Path>,
) -> Result<(), SepaError> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    let config = build_backtest_config(&adapter)?;

    let data_port = CsvAdapter::new(data_dir(&adapter)?);
    let benchmark_symbol = benchmark_symbol(&adapter);
    let history_start = config.start_date - Duration::days(WARMUP_CALENDAR_DAYS);

    let benchmark = load_series(&data_port, &benchmark_symbol, history_start, config.end_date)?;
    let symbols = universe_symbols(symbols_override, &adapter)?;

    eprintln!("Validating {} symbols...", symbols.len());
    let validation = validate_universe(&data_port, &symbols, history_start, config.end_date)?;

    eprintln!(
        "Running backtest: {} symbols, {} to {}",
        validation.series.len(),
        config.start_date,
        config.end_date,
    );
    let result = run_backtest(&validation.series, &benchmark, &config)?;

    let m = &result.metrics;
    eprintln!("\n=== Results ===");
    eprintln!("Total Return:     {:.2}%", m.total_return * 100.0);
    eprintln!("Annualized:       {:.2}%", m.annualized_return * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", m.sharpe_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", m.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", m.total_trades);
    eprintln!("Win Rate:         {:.1}%", m.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", m.profit_factor);

    let reporter = TextReportAdapter;
    match output {
        Some(path) => {
            reporter.write_backtest(&result, &config, &validation.skipped, path)?;
            eprintln!("Report written to {}", path.display());
        }
        None => print!(
            "{}",
            reporter.render_backtest(&result, &config, &validation.skipped)
        ),
    }

    if let Some(path) = trades_csv {
        reporter.export_trades_csv(&result.closed_trades, path)?;
        eprintln!("Trades written to {}", path.display());
    }

    Ok(())
}

fn run_list_symbols(config_path: &Path) -> Result<(), SepaError> {
    let adapter = load_config(config_path)?;
    let data_port = CsvAdapter::new(data_dir(&adapter)?);
    for symbol in data_port.list_symbols()? {
        println!("{symbol}");
    }
    Ok(())
}

fn run_info(config_path: &Path, symbol: Option<&str>) -> Result<(), SepaError> {
    let adapter = load_config(config_path)?;
    let data_port = CsvAdapter::new(data_dir(&adapter)?);

    let symbols = match symbol {
        Some(s) => vec![s.to_uppercase()],
        None => data_port.list_symbols()?,
    };

    for symbol in symbols {
        match data_port.data_range(&symbol)? {
            Some((first, last, bars)) => println!("{symbol}: {first} to {last} ({bars} bars)"),
            None => println!("{symbol}: no data"),
        }
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), SepaError> {
    let adapter = load_config(config_path)?;
    build_screen_params(&adapter)?;
    build_backtest_config(&adapter)?;
    let dir = data_dir(&adapter)?;
    if !dir.is_dir() {
        return Err(SepaError::ConfigInvalid {
            section: "data".into(),
            key: "dir".into(),
            reason: format!("{} is not a directory", dir.display()),
        });
    }
    universe_symbols(None, &adapter)?;
    eprintln!("Config OK");
    Ok(())
}

fn load_config(path: &Path) -> Result<FileConfigAdapter, SepaError> {
    FileConfigAdapter::from_file(path).map_err(|e| SepaError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn data_dir(adapter: &dyn ConfigPort) -> Result<PathBuf, SepaError> {
    adapter
        .get_string("data", "dir")
        .map(PathBuf::from)
        .ok_or_else(|| SepaError::ConfigMissing {
            section: "data".into(),
            key: "dir".into(),
        })
}

fn benchmark_symbol(adapter: &dyn ConfigPort) -> String {
    adapter
        .get_string("universe", "benchmark")
        .unwrap_or_else(|| "NIFTY50".to_string())
}

fn universe_symbols(
    symbols_override: Option<&str>,
    adapter: &dyn ConfigPort,
) -> Result<Vec<String>, SepaError> {
    let raw = match symbols_override {
        Some(list) => list.to_string(),
        None => adapter.get_string("universe", "symbols").ok_or_else(|| {
            SepaError::ConfigMissing {
                section: "universe".into(),
                key: "symbols".into(),
            }
        })?,
    };

    parse_symbols(&raw).map_err(|e| SepaError::ConfigInvalid {
        section: "universe".into(),
        key: "symbols".into(),
        reason: e.to_string(),
    })
}

fn parse_date(value: &str, section: &str, key: &str) -> Result<NaiveDate, SepaError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| SepaError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: "expected YYYY-MM-DD".into(),
    })
}

fn require_range(
    section: &str,
    key: &str,
    value: f64,
    min_exclusive: f64,
    max_exclusive: f64,
) -> Result<f64, SepaError> {
    if value > min_exclusive && value < max_exclusive {
        Ok(value)
    } else {
        Err(SepaError::ConfigInvalid {
            section: section.into(),
            key: key.into(),
            reason: format!("{value} is outside ({min_exclusive}, {max_exclusive})"),
        })
    }
}

/// Read and validate the screening parameter bundle.
pub fn build_screen_params(
    adapter: &dyn ConfigPort,
) -> Result<(ScorerConfig, VcpConfig, SizingConfig), SepaError> {
    let scorer = ScorerConfig {
        stop_fraction: require_range(
            "screen",
            "stop_fraction",
            adapter.get_double("screen", "stop_fraction", 0.075),
            0.0,
            0.5,
        )?,
    };

    let lookback_bars = adapter.get_int("screen", "vcp_lookback", 60);
    if lookback_bars < 10 {
        return Err(SepaError::ConfigInvalid {
            section: "screen".into(),
            key: "vcp_lookback".into(),
            reason: format!("{lookback_bars} is below the minimum of 10 bars"),
        });
    }
    let min_contractions = adapter.get_int("screen", "min_contractions", 2);
    if min_contractions < 1 {
        return Err(SepaError::ConfigInvalid {
            section: "screen".into(),
            key: "min_contractions".into(),
            reason: "at least one contraction is required".into(),
        });
    }
    let vcp = VcpConfig {
        lookback_bars: lookback_bars as usize,
        min_swing_pct: require_range(
            "screen",
            "min_swing_pct",
            adapter.get_double("screen", "min_swing_pct", 2.0),
            0.0,
            50.0,
        )?,
        breakout_volume_ratio: require_range(
            "screen",
            "breakout_volume_ratio",
            adapter.get_double("screen", "breakout_volume_ratio", 1.5),
            1.0,
            100.0,
        )?,
        min_contractions: min_contractions as usize,
    };

    let sizing = SizingConfig {
        risk_per_trade: require_range(
            "backtest",
            "risk_per_trade",
            adapter.get_double("backtest", "risk_per_trade", 0.01),
            0.0,
            1.0,
        )?,
        max_position_fraction: require_range(
            "backtest",
            "max_position_fraction",
            adapter.get_double("backtest", "max_position_fraction", 0.05),
            0.0,
            1.0,
        )?,
    };

    Ok((scorer, vcp, sizing))
}

/// Read and validate the backtest parameter bundle.
pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, SepaError> {
    let start_str = adapter
        .get_string("backtest", "start_date")
        .ok_or_else(|| SepaError::ConfigMissing {
            section: "backtest".into(),
            key: "start_date".into(),
        })?;
    let end_str = adapter
        .get_string("backtest", "end_date")
        .ok_or_else(|| SepaError::ConfigMissing {
            section: "backtest".into(),
            key: "end_date".into(),
        })?;

    let start_date = parse_date(&start_str, "backtest", "start_date")?;
    let end_date = parse_date(&end_str, "backtest", "end_date")?;
    if start_date >= end_date {
        return Err(SepaError::ConfigInvalid {
            section: "backtest".into(),
            key: "end_date".into(),
            reason: format!("{end_date} is not after {start_date}"),
        });
    }

    let initial_capital = adapter.get_double("backtest", "initial_capital", 1_000_000.0);
    if initial_capital <= 0.0 {
        return Err(SepaError::ConfigInvalid {
            section: "backtest".into(),
            key: "initial_capital".into(),
            reason: "capital must be positive".into(),
        });
    }

    let max_concurrent_positions = adapter.get_int("backtest", "max_concurrent_positions", 10);
    if max_concurrent_positions < 1 {
        return Err(SepaError::ConfigInvalid {
            section: "backtest".into(),
            key: "max_concurrent_positions".into(),
            reason: "at least one position slot is required".into(),
        });
    }

    let trailing_stop_period = adapter.get_int("backtest", "trailing_stop_period", 10);
    if trailing_stop_period < 2 {
        return Err(SepaError::ConfigInvalid {
            section: "backtest".into(),
            key: "trailing_stop_period".into(),
            reason: "trailing stop period must be at least 2 bars".into(),
        });
    }

    let (scorer, vcp, sizing) = build_screen_params(adapter)?;

    Ok(BacktestConfig {
        start_date,
        end_date,
        initial_capital,
        max_concurrent_positions: max_concurrent_positions as usize,
        trailing_stop_period: trailing_stop_period as usize,
        sizing,
        scorer,
        vcp,
    })
}
