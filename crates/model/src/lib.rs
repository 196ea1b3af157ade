//! Exchange-independent market and account types.
//!
//! The REST layer parses wire responses into these; the engine only ever
//! sees these.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of an exchange-held position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// Parse `long`/`short` in any case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "long" => Some(Self::Long),
            "short" => Some(Self::Short),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Short => "short",
        }
    }
}

/// Everything one tick needs to evaluate a symbol.
///
/// Zero means the exchange sent nothing parseable for that field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    /// Last traded price.
    pub last: Decimal,
    /// Mark price from the ticker.
    pub mark: Decimal,
    /// Index price from the dedicated index endpoint.
    pub index: Decimal,
    /// Best bid from the order book, if the book has a bid side.
    pub best_bid: Option<Decimal>,
    /// Best ask from the order book, if the book has an ask side.
    pub best_ask: Option<Decimal>,
    /// Current funding rate, zero if the exchange returned none.
    pub funding_rate: Decimal,
    /// Exchange timestamp of the ticker in milliseconds.
    pub timestamp_ms: i64,
}

impl MarketSnapshot {
    /// Mark, index and last are all non-zero.
    pub fn has_valid_prices(&self) -> bool {
        !self.mark.is_zero() && !self.index.is_zero() && !self.last.is_zero()
    }

    /// Best ask minus best bid, treating a missing side as zero.
    pub fn spread(&self) -> Decimal {
        self.best_ask.unwrap_or(Decimal::ZERO) - self.best_bid.unwrap_or(Decimal::ZERO)
    }
}

/// Static trading parameters for one contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSpec {
    pub symbol: String,
    pub tick_size: Decimal,
    /// Smallest tradable size step.
    pub size_increment: Decimal,
    pub maker_fee_rate: Decimal,
    pub taker_fee_rate: Decimal,
}

/// A position as reported by the exchange account endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangePosition {
    pub symbol: String,
    pub side: PositionSide,
    /// Zero when the exchange reported no usable leverage.
    pub leverage: Decimal,
    pub size: Decimal,
}

/// USDT collateral summary.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Collateral {
    pub available: Decimal,
    pub equity: Decimal,
}

impl Collateral {
    /// True when neither figure is known.
    pub fn is_unknown(&self) -> bool {
        self.available.is_zero() && self.equity.is_zero()
    }
}
