//! Trade-trigger decision tree.
//!
//! Pure: takes a scored observation and returns either an order to place or
//! the gate that declined. The engine owns all state changes.

use std::time::Duration;

use execution_core::OrderSide;
use model::MarketSnapshot;
use num_traits::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::config::EngineConfig;
use crate::error::SkipReason;
use crate::sizing::quantize_size;

/// Cap on `|z|` when sizing.
pub const MAX_SIZE_MULTIPLIER: f64 = 3.0;

/// One scored observation for a symbol.
#[derive(Debug, Clone)]
pub struct Observation<'a> {
    pub snapshot: &'a MarketSnapshot,
    /// `(mark - index) / index`.
    pub deviation: f64,
    pub z: f64,
    /// Remaining cooldown, `None` when the symbol may trigger.
    pub cooldown_remaining: Option<Duration>,
}

/// An order the engine should place.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeDecision {
    pub side: OrderSide,
    pub price: Decimal,
    pub size: Decimal,
    pub deviation: f64,
    pub z: f64,
}

impl TradeDecision {
    pub fn notional(&self) -> Decimal {
        self.price * self.size
    }
}

/// Basis deviation of mark from index.
///
/// Returns `None` when the index is zero.
pub fn basis_deviation(mark: Decimal, index: Decimal) -> Option<f64> {
    if index.is_zero() {
        return None;
    }
    ((mark - index) / index).to_f64()
}

/// Gates that need no instrument metadata: prices, threshold, cooldown,
/// funding, spread and carry alignment. Returns the side to trade.
pub fn direction(obs: &Observation<'_>, config: &EngineConfig) -> Result<OrderSide, SkipReason> {
    let snap = obs.snapshot;
    if !snap.has_valid_prices() {
        return Err(SkipReason::InvalidPrices);
    }

    if obs.z.abs() < config.z_threshold {
        return Err(SkipReason::BelowThreshold {
            z: obs.z,
            threshold: config.z_threshold,
        });
    }

    if let Some(remaining) = obs.cooldown_remaining {
        return Err(SkipReason::Cooldown {
            remaining_ms: remaining.as_millis() as u64,
        });
    }

    let rate = snap.funding_rate;
    if rate.abs() > config.funding_rate_max_abs {
        return Err(SkipReason::FundingTooHigh {
            rate,
            max: config.funding_rate_max_abs,
        });
    }

    let ratio = snap.spread() / snap.index;
    if ratio > config.spread_max_ratio {
        return Err(SkipReason::SpreadTooWide {
            ratio,
            max: config.spread_max_ratio,
        });
    }

    // Mark above index: short toward convergence, only while funding pays shorts
    let aligned = if obs.deviation > 0.0 {
        rate >= Decimal::ZERO
    } else {
        rate <= Decimal::ZERO
    };
    if !aligned {
        return Err(SkipReason::CarryMisaligned {
            deviation: obs.deviation,
            rate,
        });
    }

    Ok(if obs.deviation > 0.0 {
        OrderSide::Sell
    } else {
        OrderSide::Buy
    })
}

/// Size the order from `|z|`, pick the top-of-book price and apply the
/// notional cap.
pub fn size_order(
    obs: &Observation<'_>,
    side: OrderSide,
    size_increment: Decimal,
    config: &EngineConfig,
) -> Result<TradeDecision, SkipReason> {
    let snap = obs.snapshot;
    let multiplier =
        Decimal::from_f64(obs.z.abs().min(MAX_SIZE_MULTIPLIER)).unwrap_or(Decimal::ONE);
    let size = quantize_size(
        config.base_size * multiplier,
        size_increment,
        config.min_size_for(&snap.symbol),
    );

    let book_price = match side {
        OrderSide::Sell => snap.best_ask,
        OrderSide::Buy => snap.best_bid,
    };
    let price = book_price
        .filter(|p| *p > Decimal::ZERO)
        .unwrap_or(snap.last);

    let decision = TradeDecision {
        side,
        price,
        size,
        deviation: obs.deviation,
        z: obs.z,
    };
    if decision.notional() > config.max_notional_usd {
        return Err(SkipReason::NotionalTooLarge {
            notional: decision.notional(),
            max: config.max_notional_usd,
        });
    }

    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const INC: Decimal = dec!(0.001);

    fn evaluate(
        obs: &Observation<'_>,
        size_increment: Decimal,
        config: &EngineConfig,
    ) -> Result<TradeDecision, SkipReason> {
        let side = direction(obs, config)?;
        size_order(obs, side, size_increment, config)
    }

    fn snapshot(funding: Decimal) -> MarketSnapshot {
        MarketSnapshot {
            symbol: "cmt_btcusdt".into(),
            last: dec!(50000),
            mark: dec!(50050),
            index: dec!(50000),
            best_bid: Some(dec!(49999)),
            best_ask: Some(dec!(50001)),
            funding_rate: funding,
            timestamp_ms: 0,
        }
    }

    fn obs(snapshot: &MarketSnapshot, deviation: f64, z: f64) -> Observation<'_> {
        Observation {
            snapshot,
            deviation,
            z,
            cooldown_remaining: None,
        }
    }

    #[test]
    fn test_basis_deviation() {
        let dev = basis_deviation(dec!(101), dec!(100)).unwrap();
        assert!((dev - 0.01).abs() < 1e-12);
        assert!(basis_deviation(dec!(1), dec!(0)).is_none());
    }

    #[test]
    fn test_positive_deviation_positive_funding_shorts() {
        let config = EngineConfig::default();
        let snap = snapshot(dec!(0.0001));

        let decision = evaluate(&obs(&snap, 0.001, 2.5), INC, &config).unwrap();
        assert_eq!(decision.side, OrderSide::Sell);
        // Short executes at the ask
        assert_eq!(decision.price, dec!(50001));
        // 0.001 * 2.5 = 0.0025 -> 0.003
        assert_eq!(decision.size, dec!(0.003));
    }

    #[test]
    fn test_positive_deviation_negative_funding_skips() {
        let config = EngineConfig::default();
        let snap = snapshot(dec!(-0.0001));

        let err = evaluate(&obs(&snap, 0.001, 2.5), INC, &config).unwrap_err();
        assert_eq!(err.label(), "carry_misaligned");
    }

    #[test]
    fn test_negative_deviation_goes_long_at_bid() {
        let config = EngineConfig::default();
        let snap = snapshot(dec!(-0.0001));

        let decision = evaluate(&obs(&snap, -0.001, -2.0), INC, &config).unwrap();
        assert_eq!(decision.side, OrderSide::Buy);
        assert_eq!(decision.price, dec!(49999));

        let snap = snapshot(dec!(0.0001));
        assert_eq!(
            evaluate(&obs(&snap, -0.001, -2.0), INC, &config).unwrap_err().label(),
            "carry_misaligned"
        );
    }

    #[test]
    fn test_zero_funding_allows_both_directions() {
        let config = EngineConfig::default();
        let snap = snapshot(dec!(0));
        assert_eq!(
            evaluate(&obs(&snap, 0.001, 2.0), INC, &config).unwrap().side,
            OrderSide::Sell
        );
        assert_eq!(
            evaluate(&obs(&snap, -0.001, -2.0), INC, &config).unwrap().side,
            OrderSide::Buy
        );
    }

    #[test]
    fn test_below_threshold() {
        let config = EngineConfig::default();
        let snap = snapshot(dec!(0));
        let err = evaluate(&obs(&snap, 0.001, 1.19), INC, &config).unwrap_err();
        assert!(matches!(err, SkipReason::BelowThreshold { .. }));
    }

    #[test]
    fn test_cooldown_gate() {
        let config = EngineConfig::default();
        let snap = snapshot(dec!(0));
        let mut o = obs(&snap, 0.001, 3.0);
        o.cooldown_remaining = Some(Duration::from_secs(30));

        assert_eq!(
            evaluate(&o, INC, &config).unwrap_err(),
            SkipReason::Cooldown {
                remaining_ms: 30_000
            }
        );
    }

    #[test]
    fn test_funding_gate() {
        let config = EngineConfig::default();
        let snap = snapshot(dec!(0.02));
        let err = evaluate(&obs(&snap, 0.001, 3.0), INC, &config).unwrap_err();
        assert_eq!(err.label(), "funding_too_high");
    }

    #[test]
    fn test_spread_gate() {
        let config = EngineConfig::default();
        let mut snap = snapshot(dec!(0));
        snap.best_bid = Some(dec!(49000));
        snap.best_ask = Some(dec!(51000));
        let err = evaluate(&obs(&snap, 0.001, 3.0), INC, &config).unwrap_err();
        assert_eq!(err.label(), "spread_too_wide");

        // A missing bid counts as zero, so the spread is the whole ask
        let mut snap = snapshot(dec!(0));
        snap.best_bid = None;
        let err = evaluate(&obs(&snap, 0.001, 3.0), INC, &config).unwrap_err();
        assert_eq!(err.label(), "spread_too_wide");
    }

    #[test]
    fn test_notional_gate() {
        let mut config = EngineConfig::default();
        config.max_notional_usd = dec!(100);
        let snap = snapshot(dec!(0));
        // 0.003 * 50001 = 150.003
        let err = evaluate(&obs(&snap, 0.001, 2.5), INC, &config).unwrap_err();
        assert_eq!(
            err,
            SkipReason::NotionalTooLarge {
                notional: dec!(150.003),
                max: dec!(100)
            }
        );
    }

    #[test]
    fn test_size_capped_at_three() {
        let config = EngineConfig::default();
        let snap = snapshot(dec!(0));
        let decision = evaluate(&obs(&snap, 0.001, 9.0), INC, &config).unwrap();
        assert_eq!(decision.size, dec!(0.003));
    }

    #[test]
    fn test_min_size_applies() {
        let mut config = EngineConfig::default();
        config.min_size.insert("cmt_btcusdt".into(), dec!(0.005));
        let snap = snapshot(dec!(0));
        let decision = evaluate(&obs(&snap, 0.001, 2.0), INC, &config).unwrap();
        assert_eq!(decision.size, dec!(0.005));
    }

    #[test]
    fn test_empty_book_side_uses_last() {
        let mut config = EngineConfig::default();
        config.spread_max_ratio = dec!(10);
        let mut snap = snapshot(dec!(0));
        snap.best_ask = None;
        let decision = evaluate(&obs(&snap, 0.001, 2.0), INC, &config).unwrap();
        assert_eq!(decision.price, dec!(50000));
    }

    #[test]
    fn test_invalid_prices() {
        let config = EngineConfig::default();
        let mut snap = snapshot(dec!(0));
        snap.mark = dec!(0);
        assert_eq!(
            evaluate(&obs(&snap, 0.0, 5.0), INC, &config).unwrap_err(),
            SkipReason::InvalidPrices
        );
    }
}
