//! Risk-based position sizing.

use super::error::SepaError;

#[derive(Debug, Clone, PartialEq)]
pub struct SizingConfig {
    /// Fraction of capital put at risk per trade.
    pub risk_per_trade: f64,
    /// Ceiling on any one position's notional as a fraction of capital.
    pub max_position_fraction: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        SizingConfig {
            risk_per_trade: 0.01,
            max_position_fraction: 0.05,
        }
    }
}

/// Shares to buy so the stop-out loss equals `risk_per_trade` of capital,
/// capped so the notional never exceeds `max_position_fraction` of capital.
pub fn size_position(
    symbol: &str,
    capital: f64,
    entry_price: f64,
    stop_price: f64,
    config: &SizingConfig,
) -> Result<i64, SepaError> {
    let risk_per_share = entry_price - stop_price;
    if risk_per_share <= 0.0 {
        return Err(SepaError::RiskCalculation {
            symbol: symbol.to_string(),
            reason: format!("entry {entry_price} is not above stop {stop_price}"),
        });
    }

    let risk_amount = capital * config.risk_per_trade;
    let mut shares = (risk_amount / risk_per_share).floor() as i64;

    let max_shares = (capital * config.max_position_fraction / entry_price).floor() as i64;
    if shares > max_shares {
        shares = max_shares;
    }

    if shares <= 0 {
        return Err(SepaError::RiskCalculation {
            symbol: symbol.to_string(),
            reason: "computed position size is zero".to_string(),
        });
    }

    Ok(shares)
}

/// Recommended position size as a percentage of capital, for screening
/// reports. Risk-based, capped at the position ceiling.
pub fn position_size_pct(entry_price: f64, stop_price: f64, config: &SizingConfig) -> f64 {
    let risk_per_share = entry_price - stop_price;
    if risk_per_share <= 0.0 || entry_price <= 0.0 {
        return 0.0;
    }
    let pct = config.risk_per_trade / (risk_per_share / entry_price) * 100.0;
    pct.min(config.max_position_fraction * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn risk_sized_then_capped() {
        // risk_amount = 10_000, risk/share = 8 → 1250 shares,
        // but 1250 × 100 > 5% of capital → capped at 500
        let shares =
            size_position("RELIANCE", 1_000_000.0, 100.0, 92.0, &SizingConfig::default()).unwrap();
        assert_eq!(shares, 500);
    }

    #[test]
    fn uncapped_when_risk_size_is_small() {
        // risk_amount = 1_000, risk/share = 10 → 100 shares; cap is 500
        let shares =
            size_position("RELIANCE", 100_000.0, 10.0, 0.0, &SizingConfig::default());
        assert_eq!(shares.unwrap(), 100);
    }

    #[test]
    fn entry_equal_to_stop_fails() {
        let result =
            size_position("RELIANCE", 1_000_000.0, 100.0, 100.0, &SizingConfig::default());
        assert!(matches!(result, Err(SepaError::RiskCalculation { .. })));
    }

    #[test]
    fn entry_below_stop_fails() {
        let result =
            size_position("RELIANCE", 1_000_000.0, 95.0, 100.0, &SizingConfig::default());
        assert!(matches!(result, Err(SepaError::RiskCalculation { .. })));
    }

    #[test]
    fn zero_size_fails() {
        // capital too small for even one share under the cap
        let result = size_position("RELIANCE", 1_000.0, 100.0, 92.0, &SizingConfig::default());
        assert!(matches!(result, Err(SepaError::RiskCalculation { .. })));
    }

    #[test]
    fn notional_never_exceeds_cap() {
        let config = SizingConfig::default();
        let capital = 250_000.0;
        let shares = size_position("RELIANCE", capital, 40.0, 38.5, &config).unwrap();
        assert!(shares as f64 * 40.0 <= capital * config.max_position_fraction);
    }

    #[test]
    fn size_pct_risk_based() {
        // 7% stop distance at 1% risk → 14.3% raw, capped at 5%
        let pct = position_size_pct(100.0, 93.0, &SizingConfig::default());
        assert_relative_eq!(pct, 5.0);
    }

    #[test]
    fn size_pct_wide_stop() {
        // 25% stop distance at 1% risk → 4%, inside the cap
        let pct = position_size_pct(100.0, 75.0, &SizingConfig::default());
        assert_relative_eq!(pct, 4.0);
    }

    #[test]
    fn size_pct_degenerate_inputs() {
        let config = SizingConfig::default();
        assert_eq!(position_size_pct(100.0, 100.0, &config), 0.0);
        assert_eq!(position_size_pct(0.0, -5.0, &config), 0.0);
    }
}
