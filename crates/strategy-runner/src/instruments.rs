//! Contract metadata cache and fee lookup.

use std::collections::HashMap;

use execution_core::OrderType;
use model::InstrumentSpec;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Taker fee assumed when contract metadata is unavailable.
pub const DEFAULT_TAKER_FEE_RATE: Decimal = dec!(0.0006);
/// Maker fee assumed when contract metadata is unavailable.
pub const DEFAULT_MAKER_FEE_RATE: Decimal = dec!(0.0002);

/// Contract metadata fetched once per symbol.
///
/// Only successful lookups are stored, so a failed fetch is retried the next
/// time the symbol needs it.
#[derive(Debug, Default)]
pub struct InstrumentCache {
    specs: HashMap<String, InstrumentSpec>,
}

impl InstrumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &str) -> Option<&InstrumentSpec> {
        self.specs.get(symbol)
    }

    pub fn insert(&mut self, spec: InstrumentSpec) {
        self.specs.insert(spec.symbol.clone(), spec);
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.specs.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// Fee rate for an order of `order_type`: taker for market, maker for limit.
///
/// A missing spec or a non-positive rate falls back to the defaults.
pub fn fee_rate(spec: Option<&InstrumentSpec>, order_type: OrderType) -> Decimal {
    let (rate, default) = match order_type {
        OrderType::Market => (spec.map(|s| s.taker_fee_rate), DEFAULT_TAKER_FEE_RATE),
        OrderType::Limit => (spec.map(|s| s.maker_fee_rate), DEFAULT_MAKER_FEE_RATE),
    };
    rate.filter(|r| *r > Decimal::ZERO).unwrap_or(default)
}
