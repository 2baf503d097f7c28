//! Property tests: score bounds, sizing limits, detector totality and
//! simulator determinism over generated inputs.

mod common;

use common::*;
use proptest::prelude::*;
use sepatrader::domain::backtest::run_backtest;
use sepatrader::domain::error::SepaError;
use sepatrader::domain::indicator::IndicatorSnapshot;
use sepatrader::domain::series::PriceSeries;
use sepatrader::domain::signal::{score, ScorerConfig, SignalCategory};
use sepatrader::domain::sizing::{size_position, SizingConfig};
use sepatrader::domain::trend_template;
use sepatrader::domain::vcp::{self, VcpConfig, VcpStatus};

proptest! {
    #[test]
    fn trend_and_composite_scores_stay_in_bounds(
        close in 1.0f64..1_000.0,
        sma50 in 1.0f64..1_000.0,
        sma150 in 1.0f64..1_000.0,
        sma200 in 1.0f64..1_000.0,
        sma200_month_ago in 1.0f64..1_000.0,
        high_52w in 1.0f64..1_000.0,
        low_52w in 1.0f64..1_000.0,
        rs_differential in -50.0f64..50.0,
        detected: bool,
        breakout_confirmed: bool,
    ) {
        let snap = IndicatorSnapshot {
            date: start_date(),
            close,
            sma50,
            sma150,
            sma200,
            sma200_month_ago,
            high_52w,
            low_52w,
            rs_differential,
            avg_volume_20: 10_000.0,
        };
        let trend = trend_template::evaluate(&snap);
        prop_assert!(trend.score() <= 8);

        let status = VcpStatus {
            detected,
            contraction_count: if detected { 2 } else { 0 },
            breakout_confirmed,
            breakout_date: None,
            breakout_close: breakout_confirmed.then_some(close),
        };
        let signal = score("SYM", start_date(), close, &trend, &status, &ScorerConfig::default());

        prop_assert!(signal.composite_score <= 10);
        prop_assert!(signal.stop_price < signal.entry_price);
        if signal.category == SignalCategory::StrongBuy {
            prop_assert!(breakout_confirmed);
        }
    }

    #[test]
    fn sized_positions_respect_risk_and_notional_limits(
        capital in 10_000.0f64..10_000_000.0,
        entry_price in 1.0f64..5_000.0,
        stop_distance in 0.01f64..0.5,
    ) {
        let stop_price = entry_price * (1.0 - stop_distance);
        let config = SizingConfig::default();

        match size_position("SYM", capital, entry_price, stop_price, &config) {
            Ok(shares) => {
                prop_assert!(shares > 0);
                prop_assert!(
                    shares as f64 * entry_price <= capital * config.max_position_fraction + 1e-6
                );
                prop_assert!(
                    shares as f64 * (entry_price - stop_price)
                        <= capital * config.risk_per_trade + 1e-6
                );
            }
            // capital too small for a single share is the only legal failure here
            Err(e) => prop_assert!(matches!(e, SepaError::RiskCalculation { .. }), "unexpected error: {:?}", e),
        }
    }

    #[test]
    fn vcp_detection_is_total_over_random_walks(
        closes in prop::collection::vec(10.0f64..200.0, 12..100),
        volumes in prop::collection::vec(100i64..100_000, 12..100),
    ) {
        let bars = closes
            .iter()
            .zip(volumes.iter().cycle())
            .enumerate()
            .map(|(i, (&close, &volume))| bar(i, close, close, volume))
            .collect();
        let series = PriceSeries::new("SYM".into(), bars).unwrap();

        let status = vcp::detect(&series, series.last_bar().date, &VcpConfig::default()).unwrap();

        // a confirmed breakout is the only path to detection
        prop_assert_eq!(status.detected, status.breakout_confirmed);
        if status.detected {
            prop_assert!(status.contraction_count >= 2);
            prop_assert!(status.breakout_close.is_some());
        }
    }

    #[test]
    fn backtest_is_deterministic_and_settles_to_cash(
        tail in prop::collection::vec((90.0f64..115.0, 0i64..4), 1..10),
    ) {
        let tail: Vec<(f64, f64, i64)> = tail
            .iter()
            .map(|&(close, v)| (close, close - 1.0, 1_000 + v * 500))
            .collect();
        let bars = breakout_bars(&tail);
        let benchmark = PriceSeries::new("NIFTY50".into(), flat_bars(bars.len(), 100.0)).unwrap();
        let series = PriceSeries::new("SYM".into(), bars.clone()).unwrap();
        let config = config_covering(&bars);

        let first = run_backtest(&[series.clone()], &benchmark, &config).unwrap();
        let second = run_backtest(&[series], &benchmark, &config).unwrap();

        prop_assert_eq!(&first.closed_trades, &second.closed_trades);
        prop_assert_eq!(&first.equity_curve, &second.equity_curve);

        // every position is closed by the end, so the final equity is pure cash
        let realized: f64 = first.closed_trades.iter().map(|t| t.pnl()).sum();
        let final_equity = first.equity_curve.last().unwrap().equity;
        prop_assert!((final_equity - (config.initial_capital + realized)).abs() < 1e-6);
    }
}
