//! Simulated execution backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use common::logging;
use execution_core::{
    generate_client_order_id, ExecutionError, Order, OrderSide, OrderStatus, OrderType, Trader,
};

/// A fill the worker should apply once `due` passes.
#[derive(Debug)]
struct ScheduledFill {
    order_id: String,
    due: Instant,
}

/// Fakes fills a fixed delay after each order is accepted.
///
/// Orders live in an internal table that only this type touches. Fills are
/// applied by a worker task, so the table is updated concurrently with the
/// caller.
pub struct PaperTrader {
    orders: Arc<DashMap<String, Order>>,
    fill_tx: mpsc::UnboundedSender<ScheduledFill>,
    fill_delay: Duration,
}

impl PaperTrader {
    /// Create a paper trader and spawn its fill worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(fill_delay: Duration) -> Self {
        let orders = Arc::new(DashMap::new());
        let (fill_tx, fill_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_fill_worker(Arc::clone(&orders), fill_rx));

        Self {
            orders,
            fill_tx,
            fill_delay,
        }
    }

    /// Look up an order by id.
    pub fn order(&self, id: &str) -> Option<Order> {
        self.orders.get(id).map(|o| o.clone())
    }

    /// Number of orders ever accepted.
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn fill_delay(&self) -> Duration {
        self.fill_delay
    }

    fn accept(
        &self,
        symbol: &str,
        side: OrderSide,
        order_type: OrderType,
        price: Decimal,
        size: Decimal,
    ) -> Result<Order, ExecutionError> {
        if size <= Decimal::ZERO {
            return Err(ExecutionError::InvalidOrder(format!(
                "size must be positive, got {size}"
            )));
        }

        let id = generate_client_order_id("paper");
        let order = Order::new(
            id.clone(),
            symbol.to_string(),
            side,
            order_type,
            price,
            size,
        );
        self.orders.insert(id.clone(), order.clone());

        self.fill_tx
            .send(ScheduledFill {
                order_id: id,
                due: Instant::now() + self.fill_delay,
            })
            .map_err(|_| ExecutionError::Unavailable("paper fill worker stopped".into()))?;

        Ok(order)
    }
}

#[async_trait]
impl Trader for PaperTrader {
    async fn place_order(
        &self,
        symbol: &str,
        side: OrderSide,
        order_type: OrderType,
        price: Decimal,
        size: Decimal,
    ) -> Result<Order, ExecutionError> {
        let order = self.accept(symbol, side, order_type, price, size)?;
        info!(
            target: logging::TRADES,
            id = %order.id,
            symbol,
            side = %side,
            order_type = %order_type,
            price = %price,
            size = %size,
            "paper order created"
        );
        Ok(order)
    }

    async fn close_position(
        &self,
        symbol: &str,
        side: OrderSide,
        order_type: OrderType,
        price: Decimal,
        size: Decimal,
    ) -> Result<Order, ExecutionError> {
        let order = self.accept(symbol, side.opposite(), order_type, price, size)?;
        info!(
            target: logging::TRADES,
            id = %order.id,
            symbol,
            position_side = %side.position_side().as_str(),
            order_type = %order_type,
            size = %size,
            "paper close created"
        );
        Ok(order)
    }

    fn name(&self) -> &'static str {
        "paper"
    }
}

impl std::fmt::Debug for PaperTrader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaperTrader")
            .field("orders", &self.orders.len())
            .field("fill_delay", &self.fill_delay)
            .finish()
    }
}

/// Apply fills in arrival order. Delays are uniform, so due times never
/// decrease. Exits once the trader is dropped.
async fn run_fill_worker(
    orders: Arc<DashMap<String, Order>>,
    mut fill_rx: mpsc::UnboundedReceiver<ScheduledFill>,
) {
    while let Some(fill) = fill_rx.recv().await {
        tokio::time::sleep_until(fill.due).await;

        if let Some(mut order) = orders.get_mut(&fill.order_id) {
            order.status = OrderStatus::Filled;
            info!(
                target: logging::INFO,
                id = %order.id,
                symbol = %order.symbol,
                order_type = %order.order_type,
                "paper order filled"
            );
        }
    }
    debug!("paper fill worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test(start_paused = true)]
    async fn test_fill_after_delay() {
        let trader = PaperTrader::new(Duration::from_secs(2));

        let order = trader
            .place_order("cmt_btcusdt", OrderSide::Buy, OrderType::Limit, dec!(50000), dec!(0.002))
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.side, OrderSide::Buy);
        assert!(order.id.starts_with("paper_"));

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert_eq!(trader.order(&order.id).unwrap().status, OrderStatus::New);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(trader.order(&order.id).unwrap().status, OrderStatus::Filled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_inverts_side() {
        let trader = PaperTrader::new(Duration::from_secs(2));

        let order = trader
            .close_position("cmt_ethusdt", OrderSide::Sell, OrderType::Market, dec!(0), dec!(0.01))
            .await
            .unwrap();

        assert_eq!(order.side, OrderSide::Buy);
        assert_eq!(order.order_type, OrderType::Market);
        assert_eq!(trader.order_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_order_fills_on_its_own_schedule() {
        let trader = PaperTrader::new(Duration::from_secs(2));

        let first = trader
            .place_order("cmt_btcusdt", OrderSide::Buy, OrderType::Limit, dec!(1), dec!(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        let second = trader
            .place_order("cmt_btcusdt", OrderSide::Sell, OrderType::Limit, dec!(1), dec!(1))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(trader.order(&first.id).unwrap().status, OrderStatus::Filled);
        assert_eq!(trader.order(&second.id).unwrap().status, OrderStatus::New);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(trader.order(&second.id).unwrap().status, OrderStatus::Filled);
    }

    #[tokio::test]
    async fn test_rejects_non_positive_size() {
        let trader = PaperTrader::new(Duration::from_secs(2));
        let err = trader
            .place_order("cmt_btcusdt", OrderSide::Buy, OrderType::Limit, dec!(1), dec!(0))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidOrder(_)));
        assert_eq!(trader.order_count(), 0);
        assert!(trader.order("missing").is_none());
    }
}
