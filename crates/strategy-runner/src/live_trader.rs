//! Exchange execution backend.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{error, info};

use common::logging;
use execution_core::{
    generate_client_order_id, ExecutionError, Order, OrderSide, OrderType, Trader,
};
use weex_rest::{PlaceOrderRequest, WeexRestClient, WeexRestError};

/// Places real orders through the WEEX REST API.
///
/// Orders come back in `New` status; fills are not tracked.
#[derive(Debug)]
pub struct LiveTrader {
    client: Arc<WeexRestClient>,
}

impl LiveTrader {
    pub fn new(client: Arc<WeexRestClient>) -> Self {
        Self { client }
    }

    async fn submit(
        &self,
        symbol: &str,
        position_side: OrderSide,
        closing: bool,
        order_type: OrderType,
        price: Decimal,
        size: Decimal,
    ) -> Result<Order, ExecutionError> {
        let request = build_order_request(
            symbol,
            position_side,
            closing,
            order_type,
            price,
            size,
            generate_client_order_id("bot"),
        );

        let response = self.client.place_order(&request).await.map_err(|e| {
            error!(
                target: logging::ERROR,
                symbol,
                closing,
                client_oid = %request.client_oid,
                error = %e,
                "live order failed"
            );
            to_execution_error(e)
        })?;

        let executed_side = if closing {
            position_side.opposite()
        } else {
            position_side
        };

        info!(
            target: logging::TRADES,
            symbol,
            order_id = %response.order_id,
            side = %executed_side,
            order_type = %order_type,
            closing,
            "live order submitted"
        );

        Ok(Order::new(
            response.order_id,
            symbol.to_string(),
            executed_side,
            order_type,
            price,
            size,
        ))
    }
}

#[async_trait]
impl Trader for LiveTrader {
    async fn place_order(
        &self,
        symbol: &str,
        side: OrderSide,
        order_type: OrderType,
        price: Decimal,
        size: Decimal,
    ) -> Result<Order, ExecutionError> {
        self.submit(symbol, side, false, order_type, price, size).await
    }

    async fn close_position(
        &self,
        symbol: &str,
        side: OrderSide,
        order_type: OrderType,
        price: Decimal,
        size: Decimal,
    ) -> Result<Order, ExecutionError> {
        self.submit(symbol, side, true, order_type, price, size).await
    }

    fn name(&self) -> &'static str {
        "live"
    }
}

/// Map an order onto the exchange's request fields.
///
/// `side` is the side the position was (or is being) opened with; `closing`
/// selects the close variant of the order kind.
pub fn build_order_request(
    symbol: &str,
    side: OrderSide,
    closing: bool,
    order_type: OrderType,
    price: Decimal,
    size: Decimal,
    client_oid: String,
) -> PlaceOrderRequest {
    let order_kind = match (side, closing) {
        (OrderSide::Buy, false) => "1",
        (OrderSide::Sell, false) => "2",
        (OrderSide::Buy, true) => "3",
        (OrderSide::Sell, true) => "4",
    };

    let (match_price, price) = match order_type {
        OrderType::Market => ("1", None),
        OrderType::Limit => ("0", Some(format!("{:.8}", price))),
    };

    PlaceOrderRequest {
        symbol: symbol.to_string(),
        client_oid,
        size: format!("{:.8}", size),
        order_kind: order_kind.to_string(),
        order_type: "0".to_string(),
        match_price: match_price.to_string(),
        price,
    }
}

fn to_execution_error(e: WeexRestError) -> ExecutionError {
    if e.is_network() {
        ExecutionError::Unavailable(e.to_string())
    } else {
        ExecutionError::Rejected(e.to_string())
    }
}
