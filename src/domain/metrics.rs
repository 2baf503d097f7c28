//! Performance statistics over a closed-trade ledger and equity curve.
//!
//! Pure reduction: the analyzer never mutates its inputs.

use super::backtest::{EquityPoint, Trade};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: i64,
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    /// Mean percentage return of winning trades.
    pub avg_win_pct: f64,
    /// Mean percentage return of losing trades (negative).
    pub avg_loss_pct: f64,
    pub largest_win_pct: f64,
    pub largest_loss_pct: f64,
    pub avg_holding_days: f64,
    pub max_consecutive_losses: usize,
}

impl Metrics {
    pub fn compute(trades: &[Trade], equity_curve: &[EquityPoint], initial_capital: f64) -> Self {
        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital);

        let total_return = if initial_capital > 0.0 {
            (final_equity - initial_capital) / initial_capital
        } else {
            0.0
        };

        let years = equity_curve.len() as f64 / TRADING_DAYS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return > -1.0 {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve);
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(equity_curve);

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut gross_profit = 0.0_f64;
        let mut gross_loss = 0.0_f64;
        let mut win_pct_sum = 0.0_f64;
        let mut loss_pct_sum = 0.0_f64;
        let mut largest_win_pct = 0.0_f64;
        let mut largest_loss_pct = 0.0_f64;
        let mut holding_days_sum = 0i64;
        let mut consecutive_losses = 0usize;
        let mut max_consecutive_losses = 0usize;

        for trade in trades {
            let pnl = trade.pnl();
            let pct = trade.pnl_pct();

            if pnl > 0.0 {
                trades_won += 1;
                gross_profit += pnl;
                win_pct_sum += pct;
                if pct > largest_win_pct {
                    largest_win_pct = pct;
                }
                consecutive_losses = 0;
            } else if pnl < 0.0 {
                trades_lost += 1;
                gross_loss += pnl.abs();
                loss_pct_sum += pct;
                if pct < largest_loss_pct {
                    largest_loss_pct = pct;
                }
                consecutive_losses += 1;
                if consecutive_losses > max_consecutive_losses {
                    max_consecutive_losses = consecutive_losses;
                }
            } else {
                trades_breakeven += 1;
                consecutive_losses = 0;
            }

            holding_days_sum += trade.holding_days();
        }

        let total_trades = trades.len();
        let win_rate = if total_trades > 0 {
            trades_won as f64 / total_trades as f64
        } else {
            0.0
        };

        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else if gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        Metrics {
            total_return,
            annualized_return,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
            total_trades,
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate,
            profit_factor,
            avg_win_pct: if trades_won > 0 {
                win_pct_sum / trades_won as f64
            } else {
                0.0
            },
            avg_loss_pct: if trades_lost > 0 {
                loss_pct_sum / trades_lost as f64
            } else {
                0.0
            },
            largest_win_pct,
            largest_loss_pct,
            avg_holding_days: if total_trades > 0 {
                holding_days_sum as f64 / total_trades as f64
            } else {
                0.0
            },
            max_consecutive_losses,
        }
    }
}

/// Largest peak-to-trough decline and the longest stretch under a peak.
fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, i64) {
    if equity_curve.is_empty() {
        return (0.0, 0);
    }

    let mut peak = equity_curve[0].equity;
    let mut max_dd = 0.0_f64;
    let mut max_duration = 0i64;
    let mut current_duration = 0i64;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
            current_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - point.equity) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
            current_duration += 1;
            if current_duration > max_duration {
                max_duration = current_duration;
            }
        }
    }

    (max_dd, max_duration)
}

fn compute_risk_adjusted(equity_curve: &[EquityPoint]) -> (f64, f64) {
    if equity_curve.len() < 2 {
        return (0.0, 0.0);
    }

    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            if prev > 0.0 {
                (w[1].equity - prev) / prev
            } else {
                0.0
            }
        })
        .collect();

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;

    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    let sharpe = if stddev > 0.0 {
        mean / stddev * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let downside_variance = returns
        .iter()
        .filter(|&&r| r < 0.0)
        .map(|r| r.powi(2))
        .sum::<f64>()
        / n;
    let downside_stddev = downside_variance.sqrt();

    let sortino = if downside_stddev > 0.0 {
        mean / downside_stddev * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    (sharpe, sortino)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::{ExitReason, TradeStatus};
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn curve(values: &[f64]) -> Vec<EquityPoint> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &equity)| EquityPoint {
                date: start + Duration::days(i as i64),
                equity,
            })
            .collect()
    }

    fn trade(entry_price: f64, exit_price: f64, shares: i64, days: i64) -> Trade {
        let entry_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        Trade {
            symbol: "RELIANCE".into(),
            entry_date,
            entry_price,
            stop_price: entry_price * 0.925,
            shares,
            exit_date: Some(entry_date + Duration::days(days)),
            exit_price: Some(exit_price),
            exit_reason: Some(ExitReason::StopLoss),
            status: TradeStatus::Closed,
        }
    }

    #[test]
    fn empty_inputs_are_all_zero() {
        let metrics = Metrics::compute(&[], &[], 100_000.0);
        assert_eq!(metrics.total_trades, 0);
        assert_relative_eq!(metrics.total_return, 0.0);
        assert_relative_eq!(metrics.win_rate, 0.0);
        assert_relative_eq!(metrics.profit_factor, 0.0);
    }

    #[test]
    fn total_return_from_curve() {
        let metrics = Metrics::compute(&[], &curve(&[100_000.0, 112_000.0]), 100_000.0);
        assert_relative_eq!(metrics.total_return, 0.12);
    }

    #[test]
    fn flat_year_annualizes_to_zero() {
        let metrics = Metrics::compute(&[], &curve(&vec![100_000.0; 252]), 100_000.0);
        assert_relative_eq!(metrics.annualized_return, 0.0);
    }

    #[test]
    fn one_year_return_annualizes_to_itself() {
        let mut values = vec![100_000.0; 251];
        values.push(120_000.0);
        let metrics = Metrics::compute(&[], &curve(&values), 100_000.0);
        assert_relative_eq!(metrics.annualized_return, 0.2, max_relative = 1e-9);
    }

    #[test]
    fn profit_factor_two_to_one() {
        // equal notional: +10% and -5% → gross 100 vs 50
        let trades = vec![trade(100.0, 110.0, 10, 5), trade(100.0, 95.0, 10, 5)];
        let metrics = Metrics::compute(&trades, &curve(&[100_000.0, 100_050.0]), 100_000.0);
        assert_relative_eq!(metrics.profit_factor, 2.0);
    }

    #[test]
    fn profit_factor_with_no_losses_is_infinite() {
        let trades = vec![trade(100.0, 110.0, 10, 5)];
        let metrics = Metrics::compute(&trades, &curve(&[100_000.0, 100_100.0]), 100_000.0);
        assert!(metrics.profit_factor.is_infinite());
    }

    #[test]
    fn win_loss_percentages() {
        let trades = vec![
            trade(100.0, 110.0, 10, 4), // +10%
            trade(200.0, 240.0, 5, 6),  // +20%
            trade(100.0, 95.0, 10, 2),  // -5%
        ];
        let metrics = Metrics::compute(&trades, &curve(&[100_000.0, 100_250.0]), 100_000.0);

        assert_eq!(metrics.trades_won, 2);
        assert_eq!(metrics.trades_lost, 1);
        assert_relative_eq!(metrics.win_rate, 2.0 / 3.0);
        assert_relative_eq!(metrics.avg_win_pct, 15.0, max_relative = 1e-9);
        assert_relative_eq!(metrics.avg_loss_pct, -5.0, max_relative = 1e-9);
        assert_relative_eq!(metrics.largest_win_pct, 20.0, max_relative = 1e-9);
        assert_relative_eq!(metrics.largest_loss_pct, -5.0, max_relative = 1e-9);
        assert_relative_eq!(metrics.avg_holding_days, 4.0);
    }

    #[test]
    fn breakeven_trades_counted_separately() {
        let trades = vec![trade(100.0, 100.0, 10, 3), trade(100.0, 110.0, 10, 3)];
        let metrics = Metrics::compute(&trades, &curve(&[100_000.0, 100_100.0]), 100_000.0);
        assert_eq!(metrics.trades_breakeven, 1);
        assert_relative_eq!(metrics.win_rate, 0.5);
    }

    #[test]
    fn max_drawdown_peak_to_trough() {
        let metrics = Metrics::compute(
            &[],
            &curve(&[100.0, 110.0, 90.0, 95.0, 80.0, 100.0]),
            100.0,
        );
        assert_relative_eq!(metrics.max_drawdown, (110.0 - 80.0) / 110.0);
    }

    #[test]
    fn drawdown_duration_counts_days_under_peak() {
        let metrics = Metrics::compute(
            &[],
            &curve(&[100.0, 110.0, 100.0, 90.0, 85.0, 95.0]),
            100.0,
        );
        assert_eq!(metrics.max_drawdown_duration, 4);
    }

    #[test]
    fn sharpe_positive_for_steady_gains() {
        let values: Vec<f64> = (0..253).map(|i| 100_000.0 * (1.0 + 0.0005 * i as f64)).collect();
        let metrics = Metrics::compute(&[], &curve(&values), 100_000.0);
        assert!(metrics.sharpe_ratio > 0.0);
        assert!(metrics.sortino_ratio >= 0.0);
    }

    #[test]
    fn sharpe_zero_for_flat_curve() {
        let metrics = Metrics::compute(&[], &curve(&vec![100_000.0; 30]), 100_000.0);
        assert_relative_eq!(metrics.sharpe_ratio, 0.0);
    }

    #[test]
    fn consecutive_losses() {
        let trades = vec![
            trade(100.0, 95.0, 10, 1),
            trade(100.0, 95.0, 10, 1),
            trade(100.0, 110.0, 10, 1),
            trade(100.0, 95.0, 10, 1),
            trade(100.0, 95.0, 10, 1),
            trade(100.0, 95.0, 10, 1),
        ];
        let metrics = Metrics::compute(&trades, &curve(&[100_000.0, 99_000.0]), 100_000.0);
        assert_eq!(metrics.max_consecutive_losses, 3);
    }
}
