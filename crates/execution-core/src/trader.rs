//! The execution capability the engine trades through.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::ExecutionError;
use crate::order::{Order, OrderSide, OrderType};

/// An order execution backend.
///
/// The engine only ever talks to this trait; concrete backends (simulated or
/// live) are chosen at startup.
#[async_trait]
pub trait Trader: Send + Sync {
    /// Open exposure on `side`.
    async fn place_order(
        &self,
        symbol: &str,
        side: OrderSide,
        order_type: OrderType,
        price: Decimal,
        size: Decimal,
    ) -> Result<Order, ExecutionError>;

    /// Unwind exposure that was opened on `side`.
    ///
    /// Implementations execute on the opposite side; callers pass the side
    /// the position was opened with.
    async fn close_position(
        &self,
        symbol: &str,
        side: OrderSide,
        order_type: OrderType,
        price: Decimal,
        size: Decimal,
    ) -> Result<Order, ExecutionError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}
