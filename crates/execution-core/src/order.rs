//! Order types and status enums.

use std::fmt;

use chrono::{DateTime, Utc};
use model::PositionSide;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }

    /// The side that unwinds this one.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Exposure opened by an order on this side.
    pub fn position_side(&self) -> PositionSide {
        match self {
            Self::Buy => PositionSide::Long,
            Self::Sell => PositionSide::Short,
        }
    }

    /// Side of the order that opens `side`.
    pub fn opening(side: PositionSide) -> Self {
        match side {
            PositionSide::Long => Self::Buy,
            PositionSide::Short => Self::Sell,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Limit,
    Market,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Limit => "limit",
            Self::Market => "market",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Accepted by the backend, not yet known to be filled.
    New,
    /// Completely filled.
    Filled,
    /// The backend failed to handle the order.
    Error,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Filled => "filled",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An order as reported by a [`Trader`](crate::Trader) backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Backend-assigned identifier (exchange order id, or a local id for paper).
    pub id: String,
    /// Contract symbol (e.g., "cmt_btcusdt").
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    /// Requested price; zero for market orders.
    pub price: Decimal,
    pub size: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Create a new order in `New` status stamped with the current time.
    pub fn new(
        id: String,
        symbol: String,
        side: OrderSide,
        order_type: OrderType,
        price: Decimal,
        size: Decimal,
    ) -> Self {
        Self {
            id,
            symbol,
            side,
            order_type,
            price,
            size,
            status: OrderStatus::New,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_side_display() {
        assert_eq!(OrderSide::Buy.as_str(), "buy");
        assert_eq!(OrderSide::Sell.to_string(), "sell");
    }

    #[test]
    fn test_opposite_and_position_side() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
        assert_eq!(OrderSide::Buy.position_side(), PositionSide::Long);
        assert_eq!(OrderSide::Sell.position_side(), PositionSide::Short);
        assert_eq!(OrderSide::opening(PositionSide::Short), OrderSide::Sell);
    }

    #[test]
    fn test_new_order() {
        let order = Order::new(
            "paper_1".into(),
            "cmt_btcusdt".into(),
            OrderSide::Buy,
            OrderType::Limit,
            dec!(50000),
            dec!(0.002),
        );

        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.side, OrderSide::Buy);
        assert_eq!(order.price * order.size, dec!(100));
        assert_eq!(OrderType::Limit.to_string(), "limit");
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&OrderStatus::Filled).unwrap();
        assert_eq!(json, "\"filled\"");
    }
}
