//! Engine-side open positions and realized PnL.

use std::collections::HashMap;
use std::time::Duration;

use execution_core::{OrderSide, OrderType};
use rust_decimal::Decimal;
use tokio::time::Instant;

/// An exposure the engine opened and has not yet closed.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub order_id: String,
    /// Side of the opening order.
    pub side: OrderSide,
    pub entry_price: Decimal,
    pub entry_time: Instant,
    pub order_type: OrderType,
    pub size: Decimal,
}

impl Position {
    /// Whether the position has been held for at least `hold`.
    ///
    /// A position opened at `now` is never due, so it cannot be closed in
    /// the pass that opened it.
    pub fn is_due(&self, now: Instant, hold: Duration) -> bool {
        self.entry_time < now && now.saturating_duration_since(self.entry_time) >= hold
    }
}

/// Result of settling one position at an exit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub gross: Decimal,
    pub fee: Decimal,
    pub net: Decimal,
}

/// Settle `position` at `exit_price` with fee charged on entry notional.
pub fn settle(position: &Position, exit_price: Decimal, fee_rate: Decimal) -> Settlement {
    let per_unit = match position.side {
        OrderSide::Buy => exit_price - position.entry_price,
        OrderSide::Sell => position.entry_price - exit_price,
    };
    let gross = per_unit * position.size;
    let fee = fee_rate * position.entry_price * position.size;
    Settlement {
        gross,
        fee,
        net: gross - fee,
    }
}

/// Realized totals for one symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SymbolPnl {
    pub net: Decimal,
    pub closed: u64,
}

/// Open positions and realized PnL, per symbol.
#[derive(Debug, Default)]
pub struct PositionBook {
    open: HashMap<String, Vec<Position>>,
    realized: HashMap<String, SymbolPnl>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, symbol: &str, position: Position) {
        self.open
            .entry(symbol.to_string())
            .or_default()
            .push(position);
    }

    pub fn positions(&self, symbol: &str) -> &[Position] {
        self.open.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Remove and return every position of `symbol` held for at least `hold`.
    pub fn take_due(&mut self, symbol: &str, now: Instant, hold: Duration) -> Vec<Position> {
        let Some(positions) = self.open.get_mut(symbol) else {
            return Vec::new();
        };
        let (due, kept): (Vec<_>, Vec<_>) = positions
            .drain(..)
            .partition(|p| p.is_due(now, hold));
        *positions = kept;
        due
    }

    /// Put back a position whose close failed.
    pub fn restore(&mut self, symbol: &str, position: Position) {
        self.open(symbol, position);
    }

    pub fn book(&mut self, symbol: &str, net: Decimal) {
        let entry = self.realized.entry(symbol.to_string()).or_default();
        entry.net += net;
        entry.closed += 1;
    }

    pub fn realized(&self, symbol: &str) -> SymbolPnl {
        self.realized.get(symbol).copied().unwrap_or_default()
    }

    pub fn realized_by_symbol(&self) -> impl Iterator<Item = (&str, &SymbolPnl)> {
        self.realized.iter().map(|(s, p)| (s.as_str(), p))
    }

    pub fn total_realized(&self) -> Decimal {
        self.realized.values().map(|p| p.net).sum()
    }

    pub fn open_count(&self) -> usize {
        self.open.values().map(Vec::len).sum()
    }

    /// Aggregate `(long, short)` open size for `symbol`.
    pub fn exposure(&self, symbol: &str) -> (Decimal, Decimal) {
        self.positions(symbol)
            .iter()
            .fold((Decimal::ZERO, Decimal::ZERO), |(long, short), p| match p.side {
                OrderSide::Buy => (long + p.size, short),
                OrderSide::Sell => (long, short + p.size),
            })
    }

    /// Symbols with at least one open position.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.open
            .iter()
            .filter(|(_, ps)| !ps.is_empty())
            .map(|(s, _)| s.as_str())
    }
}
